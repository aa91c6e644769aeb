//! Read-only projections of the session directory for list renderers.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::{SessionName, ViewerId};
use crate::status::UsersStatus;

/// One row of the lobby's session list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SessionSummary {
    /// Session name.
    pub name: SessionName,
    /// Last reported status.
    pub users: UsersStatus,
    /// Text to render for the session (`"starting ..."` if none).
    pub description: String,
    /// Creation timestamp reported by the first relay.
    pub since: i64,
    /// Logical time of the most recent report.
    pub last_active: u64,
    /// Current relay, if any.
    pub relay: Option<ViewerId>,
    /// Number of lobby viewers reporting this session.
    pub reporting_viewers: u32,
}
