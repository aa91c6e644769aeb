//! Daily usage statistics and their persisted shape.
//!
//! The persisted blob is the only state that outlives a lobby session. It is
//! stored and loaded by an external collaborator and never interpreted
//! beyond this shape, so field names follow the JSON contract
//! (`prehistoricCount`, `maxInLobby`, ...).

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// One of the five counters tracked per day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum StatCounter {
    /// Most viewers connected to the lobby at once.
    MaxInLobby,
    /// Most users inside sessions at once, summed over sessions.
    MaxInSessions,
    /// Most users inside a single session.
    MaxInSession,
    /// Most sessions listed at once.
    MaxSessions,
    /// Number of sessions created during the day.
    NumSessions,
}

impl StatCounter {
    /// Every counter, in display order.
    pub const ALL: [Self; 5] = [
        Self::MaxInLobby,
        Self::MaxInSessions,
        Self::MaxInSession,
        Self::MaxSessions,
        Self::NumSessions,
    ];
}

/// Usage record for one UTC day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct DailyStats {
    /// Start of the UTC day in ms since the epoch.
    pub date: i64,
    /// See [`StatCounter::MaxInLobby`].
    pub max_in_lobby: u32,
    /// See [`StatCounter::MaxInSessions`].
    pub max_in_sessions: u32,
    /// See [`StatCounter::MaxInSession`].
    pub max_in_session: u32,
    /// See [`StatCounter::MaxSessions`].
    pub max_sessions: u32,
    /// See [`StatCounter::NumSessions`].
    pub num_sessions: u32,
}

impl DailyStats {
    /// Empty record for the given day.
    pub const fn for_day(date: i64) -> Self {
        Self {
            date,
            max_in_lobby: 0,
            max_in_sessions: 0,
            max_in_session: 0,
            max_sessions: 0,
            num_sessions: 0,
        }
    }

    /// Read a counter by key.
    pub const fn get(&self, counter: StatCounter) -> u32 {
        match counter {
            StatCounter::MaxInLobby => self.max_in_lobby,
            StatCounter::MaxInSessions => self.max_in_sessions,
            StatCounter::MaxInSession => self.max_in_session,
            StatCounter::MaxSessions => self.max_sessions,
            StatCounter::NumSessions => self.num_sessions,
        }
    }
}

/// The blob handed to and received from the persistence collaborator.
///
/// The last record of `history` may be the day still in progress, so a blob
/// can hold one record more than the configured history cap. Consumers
/// must not treat that record as finalized; the lobby merges it back into
/// its current day on restart.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct PersistedStats {
    /// Days oldest first; the last one may still be in progress.
    #[serde(default)]
    pub history: Vec<DailyStats>,
    /// Sessions created on days that have since been evicted from history.
    #[serde(default)]
    pub prehistoric_count: u64,
}

/// Record-holding days, one per counter.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct MaxRecords {
    /// Day with the highest [`StatCounter::MaxInLobby`].
    pub max_in_lobby: Option<DailyStats>,
    /// Day with the highest [`StatCounter::MaxInSessions`].
    pub max_in_sessions: Option<DailyStats>,
    /// Day with the highest [`StatCounter::MaxInSession`].
    pub max_in_session: Option<DailyStats>,
    /// Day with the highest [`StatCounter::MaxSessions`].
    pub max_sessions: Option<DailyStats>,
    /// Day with the highest [`StatCounter::NumSessions`].
    pub num_sessions: Option<DailyStats>,
}

impl MaxRecords {
    /// The record-holding day for a counter.
    pub const fn get(&self, counter: StatCounter) -> Option<&DailyStats> {
        match counter {
            StatCounter::MaxInLobby => self.max_in_lobby.as_ref(),
            StatCounter::MaxInSessions => self.max_in_sessions.as_ref(),
            StatCounter::MaxInSession => self.max_in_session.as_ref(),
            StatCounter::MaxSessions => self.max_sessions.as_ref(),
            StatCounter::NumSessions => self.num_sessions.as_ref(),
        }
    }

    /// Store the record-holding day for a counter.
    pub const fn set(&mut self, counter: StatCounter, day: Option<DailyStats>) {
        match counter {
            StatCounter::MaxInLobby => self.max_in_lobby = day,
            StatCounter::MaxInSessions => self.max_in_sessions = day,
            StatCounter::MaxInSession => self.max_in_session = day,
            StatCounter::MaxSessions => self.max_sessions = day,
            StatCounter::NumSessions => self.num_sessions = day,
        }
    }
}
