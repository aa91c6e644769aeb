//! Deterministic state machine for the replicated lobby session directory.
//!
//! Every lobby replica feeds the same totally ordered event stream into a
//! [`Lobby`] and ends up with the same presence registry, session directory
//! and usage statistics. Time only enters through event timestamps, and
//! session expiry runs on a deterministic timer table.
//!
//! # Modules
//!
//! - [`clock`] -- Logical clock and UTC day derivation.
//! - [`config`] -- Configuration loading from `lobby-config.yaml` into
//!   strongly-typed structs.
//! - [`scheduler`] -- Cancellable, deterministic timer table.
//! - [`presence`] -- Connected viewers and their session back-references.
//! - [`directory`] -- Session records keyed by name.
//! - [`stats`] -- Daily usage aggregation with bounded history.
//! - [`persistence`] -- [`StatsSink`] trait and in-memory sinks.
//! - [`integrity`] -- Cross-structure invariant checks.
//! - [`lobby`] -- The event loop tying the above together.
//!
//! [`Lobby`]: lobby::Lobby
//! [`StatsSink`]: persistence::StatsSink

pub mod clock;
pub mod config;
pub mod directory;
pub mod integrity;
pub mod lobby;
pub mod persistence;
pub mod presence;
pub mod scheduler;
pub mod stats;
