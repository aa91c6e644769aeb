//! Shared type definitions for the replicated lobby session directory.
//!
//! This crate is the single source of truth for every type that crosses the
//! boundary of the lobby state machine: inbound events, outbound
//! notifications, the persisted statistics blob, and list projections.
//! Types flow downstream to `TypeScript` via `ts-rs` for the lobby UI.
//!
//! # Modules
//!
//! - [`ids`] -- String newtypes for viewer identifiers and session names
//! - [`status`] -- The [`UsersStatus`] variant reported by session relays
//! - [`events`] -- Inbound [`LobbyEvent`]s and outbound [`Notification`]s
//! - [`stats`] -- Daily usage records and the persisted statistics blob
//! - [`directory`] -- Session list rows

pub mod directory;
pub mod events;
pub mod ids;
pub mod stats;
pub mod status;

// Re-export all public types at crate root for convenience.
pub use directory::SessionSummary;
pub use events::{LobbyEvent, Notification, SequencedEvent};
pub use ids::{SessionName, ViewerId};
pub use stats::{DailyStats, MaxRecords, PersistedStats, StatCounter};
pub use status::{STARTING_DESCRIPTION, StructuredStatus, UsersStatus};
