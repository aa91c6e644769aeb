//! Inbound events and outbound notifications.
//!
//! Events arrive from the ordering service already totally ordered and
//! stamped with the logical time at which every replica applies them.
//! Notifications are what the state machine publishes back to viewers.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::{SessionName, ViewerId};
use crate::status::UsersStatus;

/// An event from the ordering service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum LobbyEvent {
    /// A viewer connected to the lobby.
    ViewerJoined {
        /// The viewer that joined.
        viewer_id: ViewerId,
    },
    /// A viewer disconnected from the lobby.
    ViewerLeft {
        /// The viewer that left.
        viewer_id: ViewerId,
    },
    /// A viewer reported that it is inside a session, and how that session
    /// is doing.
    ReportStatus {
        /// The reporting viewer.
        viewer_id: ViewerId,
        /// The session being reported.
        session_name: SessionName,
        /// The reporter's own timestamp (ms), used as the session's `since`
        /// when the report creates it.
        observed_at: i64,
        /// Headcount status of the session.
        users: UsersStatus,
    },
}

impl LobbyEvent {
    /// The viewer this event concerns.
    pub const fn viewer_id(&self) -> &ViewerId {
        match self {
            Self::ViewerJoined { viewer_id }
            | Self::ViewerLeft { viewer_id }
            | Self::ReportStatus { viewer_id, .. } => viewer_id,
        }
    }
}

/// An event together with the logical time (ms) assigned by the ordering
/// service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SequencedEvent {
    /// Logical time at which the event is applied.
    pub at: u64,
    /// The event itself.
    #[serde(flatten)]
    pub event: LobbyEvent,
}

/// A notification published by the lobby state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Notification {
    /// A different viewer now relays status for the session.
    RelayChanged {
        /// The session whose relay changed.
        session_name: SessionName,
        /// The new relay.
        viewer_id: ViewerId,
    },
    /// The session was created, updated or removed; listings should be
    /// re-rendered.
    DirectoryChanged {
        /// The session that changed.
        session_name: SessionName,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequenced_event_wire_shape() {
        let json = r#"{"at":1000,"type":"report_status","viewer_id":"v1","session_name":"Alpha","observed_at":5,"users":{"count":1}}"#;
        let parsed: Result<SequencedEvent, _> = serde_json::from_str(json);
        assert!(parsed.is_ok(), "{parsed:?}");
        let parsed = parsed.ok();
        assert_eq!(parsed.as_ref().map(|e| e.at), Some(1000));
        assert_eq!(
            parsed.map(|e| e.event.viewer_id().clone()),
            Some(ViewerId::from("v1"))
        );
    }

    #[test]
    fn notification_serializes_tagged() {
        let note = Notification::DirectoryChanged {
            session_name: SessionName::from("Alpha"),
        };
        let json = serde_json::to_string(&note).unwrap_or_default();
        assert_eq!(json, r#"{"type":"directory_changed","session_name":"Alpha"}"#);
    }
}
