//! Session records and the name-keyed directory that owns them.
//!
//! The directory is pure storage. Which records exist, who relays them and
//! when they expire is decided by [`crate::lobby::Lobby`]; this module only
//! guarantees that each name maps to at most one record and offers the
//! listing order the lobby UI uses.

use std::collections::{BTreeMap, BTreeSet};

use lobby_types::{SessionName, SessionSummary, UsersStatus, ViewerId};

use crate::scheduler::TimerHandle;

/// One listed session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    /// Unique session name.
    pub name: SessionName,
    /// Last reported users status.
    pub users: UsersStatus,
    /// Viewers currently reporting this session.
    pub viewers: BTreeSet<ViewerId>,
    /// The viewer speaking for the session. Always a member of `viewers`.
    pub relay: Option<ViewerId>,
    /// Creation time as reported by the first relay.
    pub since: i64,
    /// Logical time of the most recent report.
    pub last_active: u64,
    /// Pending watchdog timer.
    pub expiry: Option<TimerHandle>,
}

impl SessionRecord {
    /// A freshly created record with no reporters yet.
    pub fn new(name: SessionName, since: i64) -> Self {
        Self {
            name,
            users: UsersStatus::default(),
            viewers: BTreeSet::new(),
            relay: None,
            since,
            last_active: 0,
            expiry: None,
        }
    }

    /// Reported headcount, if the status carries one.
    pub fn headcount(&self) -> Option<u32> {
        self.users.count()
    }

    /// Whether the relay (if any) is one of the reporting viewers.
    pub fn relay_is_reporting(&self) -> bool {
        self.relay
            .as_ref()
            .is_none_or(|relay| self.viewers.contains(relay))
    }

    /// List projection of this record.
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            name: self.name.clone(),
            users: self.users.clone(),
            description: self.users.display_text().to_owned(),
            since: self.since,
            last_active: self.last_active,
            relay: self.relay.clone(),
            reporting_viewers: u32::try_from(self.viewers.len()).unwrap_or(u32::MAX),
        }
    }
}

/// Name-keyed collection of session records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionDirectory {
    sessions: BTreeMap<SessionName, SessionRecord>,
}

impl SessionDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the record for `name`, creating it with `since` if absent.
    /// The flag is `true` when the record was created by this call.
    pub fn ensure(&mut self, name: &SessionName, since: i64) -> (&mut SessionRecord, bool) {
        let created = !self.sessions.contains_key(name);
        let record = self
            .sessions
            .entry(name.clone())
            .or_insert_with(|| SessionRecord::new(name.clone(), since));
        (record, created)
    }

    /// Look up a record.
    pub fn get(&self, name: &str) -> Option<&SessionRecord> {
        self.sessions.get(name)
    }

    /// Look up a record for mutation.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut SessionRecord> {
        self.sessions.get_mut(name)
    }

    /// Remove a record, returning it.
    pub fn remove(&mut self, name: &str) -> Option<SessionRecord> {
        self.sessions.remove(name)
    }

    /// Whether a session with this name is listed.
    pub fn contains(&self, name: &str) -> bool {
        self.sessions.contains_key(name)
    }

    /// Number of listed sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no sessions are listed.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Records in name order.
    pub fn iter(&self) -> impl Iterator<Item = &SessionRecord> {
        self.sessions.values()
    }

    /// Reported headcounts of every session that carries one.
    pub fn headcounts(&self) -> Vec<u32> {
        self.sessions
            .values()
            .filter_map(SessionRecord::headcount)
            .collect()
    }

    /// Session list as rendered by the lobby: newest `since` first, name as
    /// tie-break so every replica renders the same order.
    pub fn listing(&self) -> Vec<SessionSummary> {
        let mut rows: Vec<&SessionRecord> = self.sessions.values().collect();
        rows.sort_by(|a, b| b.since.cmp(&a.since).then_with(|| a.name.cmp(&b.name)));
        rows.into_iter().map(SessionRecord::summary).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_creates_once() {
        let mut directory = SessionDirectory::new();
        let name = SessionName::from("Alpha");

        let (_, created) = directory.ensure(&name, 100);
        assert!(created);
        let (record, created) = directory.ensure(&name, 999);
        assert!(!created);
        // The original creation time is kept.
        assert_eq!(record.since, 100);
        assert_eq!(directory.len(), 1);
    }

    #[test]
    fn listing_is_newest_first() {
        let mut directory = SessionDirectory::new();
        for (name, since) in [("Game 1", 200), ("Demo", 100), ("Game 2", 300), ("Beta", 300)] {
            directory.ensure(&SessionName::from(name), since);
        }
        let names: Vec<String> = directory
            .listing()
            .into_iter()
            .map(|row| row.name.into_inner())
            .collect();
        assert_eq!(names, vec!["Beta", "Game 2", "Game 1", "Demo"]);
    }

    #[test]
    fn summary_describes_unstarted_session() {
        let record = SessionRecord::new(SessionName::from("Alpha"), 1);
        let summary = record.summary();
        assert_eq!(summary.description, lobby_types::STARTING_DESCRIPTION);
        assert_eq!(summary.reporting_viewers, 0);
        assert!(record.relay_is_reporting());
    }

    #[test]
    fn relay_membership_check() {
        let mut record = SessionRecord::new(SessionName::from("Alpha"), 1);
        record.relay = Some(ViewerId::from("v1"));
        assert!(!record.relay_is_reporting());
        record.viewers.insert(ViewerId::from("v1"));
        assert!(record.relay_is_reporting());
    }

    #[test]
    fn headcounts_skip_uncounted_sessions() {
        let mut directory = SessionDirectory::new();
        let (record, _) = directory.ensure(&SessionName::from("a"), 0);
        record.users = UsersStatus::structured(3, "three", None);
        directory.ensure(&SessionName::from("b"), 0);
        assert_eq!(directory.headcounts(), vec![3]);
    }
}
