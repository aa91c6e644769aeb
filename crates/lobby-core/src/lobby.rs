//! The lobby state machine: presence, session directory and statistics
//! driven by totally ordered events and self-scheduled timers.
//!
//! Every replica owns one [`Lobby`] and feeds it the same
//! [`SequencedEvent`] stream. Processing an event runs in two steps:
//!
//! 1. **Timers** -- every watchdog due at or before the event's logical time
//!    fires, in due-time then registration order. A timer due at exactly the
//!    event's time fires before the event.
//! 2. **Event** -- the event is applied to the presence registry, which may
//!    create, refresh or expire session records.
//!
//! Each mutation is folded into the statistics aggregator, and directory
//! changes are published as [`Notification`]s returned to the caller. Nothing
//! here reads a wall clock or iterates a hash map, so replicas that see the
//! same stream end in the same state.
//!
//! # Session lifetime
//!
//! A session is created by the first status report naming it and stays
//! listed while reports keep arriving. Every report re-arms a watchdog of
//! `session.timeout_secs`; if it fires, the session is removed. A session is
//! also removed at once when the departing reporter was its last user
//! (reported headcount of exactly 1), or when its last reporter leaves
//! after the relay already left. When only the relay leaves, the relay is
//! cleared and the watchdog renewed so another participant can take over.

use lobby_types::{
    LobbyEvent, MaxRecords, Notification, PersistedStats, SequencedEvent, SessionName,
    SessionSummary, UsersStatus, ViewerId,
};
use tracing::{debug, info, warn};

use crate::clock::{ClockError, LogicalClock, day_start};
use crate::config::LobbyConfig;
use crate::directory::{SessionDirectory, SessionRecord};
use crate::integrity::{self, IntegrityReport};
use crate::persistence::StatsSink;
use crate::presence::{PresenceRegistry, Viewer};
use crate::scheduler::{FiredTimer, Scheduler, SchedulerError, TimerTarget};
use crate::stats::{Observation, StatsAggregator, StatsError};

/// Errors surfaced to the caller of [`Lobby::handle`].
///
/// Validation errors are reported before anything is mutated: the event is
/// rejected and the lobby stays exactly as it was.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LobbyError {
    /// A status report without a usable headcount.
    #[error("invalid status for session {session_name}: {reason}")]
    InvalidStatus {
        /// The session named in the report.
        session_name: SessionName,
        /// What is wrong with the payload.
        reason: String,
    },

    /// A status report naming an empty session.
    #[error("session name must not be empty")]
    InvalidSessionName,

    /// The event's logical time is unusable.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },

    /// The statistics aggregator rejected an observation.
    #[error("statistics error: {source}")]
    Stats {
        /// The underlying statistics error.
        #[from]
        source: StatsError,
    },

    /// A watchdog could not be scheduled.
    #[error("scheduler error: {source}")]
    Scheduler {
        /// The underlying scheduler error.
        #[from]
        source: SchedulerError,
    },
}

/// Why a session left the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExpiryCause {
    /// The watchdog fired.
    Timeout,
    /// The departing reporter was the last user or last reporter.
    LastViewerLeft,
}

/// Full replica state, for comparing replicas and for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaState {
    /// Current logical time.
    pub now: u64,
    /// Pending timers.
    pub scheduler: Scheduler,
    /// Listed sessions.
    pub directory: SessionDirectory,
    /// Connected viewers.
    pub presence: PresenceRegistry,
    /// Usage statistics.
    pub stats: StatsAggregator,
}

/// One replica of the lobby state machine.
#[derive(Debug)]
pub struct Lobby<S: StatsSink> {
    timeout_millis: u64,
    max_users: u32,
    clock: LogicalClock,
    scheduler: Scheduler,
    directory: SessionDirectory,
    presence: PresenceRegistry,
    stats: StatsAggregator,
    sink: S,
    outbox: Vec<Notification>,
    baseline_sessions: u64,
    sessions_created: u64,
}

impl<S: StatsSink> Lobby<S> {
    /// Create a replica from configuration and the persisted statistics
    /// blob handed over by the persistence collaborator.
    pub fn new(config: &LobbyConfig, persisted: PersistedStats, sink: S) -> Self {
        let stats = StatsAggregator::from_persisted(persisted, config.stats.history_cap);
        let baseline_sessions = stats.total_sessions();
        Self {
            timeout_millis: config.session.timeout_millis(),
            max_users: config.session.max_users,
            clock: LogicalClock::default(),
            scheduler: Scheduler::new(),
            directory: SessionDirectory::new(),
            presence: PresenceRegistry::new(),
            stats,
            sink,
            outbox: Vec::new(),
            baseline_sessions,
            sessions_created: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Entry points
    // -----------------------------------------------------------------------

    /// Apply one ordered event, firing every timer due up to its logical
    /// time first. Returns the notifications produced, in order.
    ///
    /// # Errors
    ///
    /// - [`LobbyError::InvalidSessionName`] / [`LobbyError::InvalidStatus`]
    ///   for a malformed status report.
    /// - [`LobbyError::Clock`] if the event's time precedes the current
    ///   logical time or cannot be mapped to a calendar day.
    ///
    /// All of these are detected before any state changes.
    pub fn handle(&mut self, sequenced: SequencedEvent) -> Result<Vec<Notification>, LobbyError> {
        validate(&sequenced.event)?;
        self.check_time(sequenced.at)?;
        self.run_timers(sequenced.at)?;
        self.apply(sequenced.event)?;
        Ok(self.drain())
    }

    /// Move logical time forward without an event, firing due timers.
    ///
    /// # Errors
    ///
    /// Returns [`LobbyError::Clock`] if `now` precedes the current logical
    /// time or cannot be mapped to a calendar day.
    pub fn advance_to(&mut self, now: u64) -> Result<Vec<Notification>, LobbyError> {
        self.check_time(now)?;
        self.run_timers(now)?;
        Ok(self.drain())
    }

    fn check_time(&self, at: u64) -> Result<(), LobbyError> {
        let mut trial = self.clock;
        trial.advance_to(at)?;
        day_start(at)?;
        Ok(())
    }

    fn drain(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.outbox)
    }

    // -----------------------------------------------------------------------
    // Timers
    // -----------------------------------------------------------------------

    fn run_timers(&mut self, until: u64) -> Result<(), LobbyError> {
        while let Some(fired) = self.scheduler.pop_due(until) {
            self.clock.advance_to(fired.due.max(self.clock.now()))?;
            self.on_timer(fired)?;
        }
        self.clock.advance_to(until)?;
        Ok(())
    }

    fn on_timer(&mut self, fired: FiredTimer) -> Result<(), LobbyError> {
        match fired.target {
            TimerTarget::SessionExpiry { session_name } => {
                let current = self
                    .directory
                    .get(session_name.as_str())
                    .is_some_and(|record| record.expiry == Some(fired.handle));
                if !current {
                    debug!(session = %session_name, handle = %fired.handle, "Ignoring stale session timer");
                    return Ok(());
                }
                self.expire_session(&session_name, ExpiryCause::Timeout);
                self.observe(0)
            }
        }
    }

    fn arm_watchdog(&mut self, name: &SessionName) -> Result<(), LobbyError> {
        let due = self.clock.now().saturating_add(self.timeout_millis);
        let Some(record) = self.directory.get_mut(name.as_str()) else {
            return Ok(());
        };
        if let Some(previous) = record.expiry.take() {
            self.scheduler.cancel(previous);
        }
        let handle = self.scheduler.schedule(
            due,
            TimerTarget::SessionExpiry {
                session_name: name.clone(),
            },
        )?;
        record.expiry = Some(handle);
        debug!(session = %name, %handle, due, "Session watchdog armed");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    fn apply(&mut self, event: LobbyEvent) -> Result<(), LobbyError> {
        match event {
            LobbyEvent::ViewerJoined { viewer_id } => self.viewer_joined(viewer_id),
            LobbyEvent::ViewerLeft { viewer_id } => self.viewer_left(&viewer_id),
            LobbyEvent::ReportStatus {
                viewer_id,
                session_name,
                observed_at,
                users,
            } => self.report_status(&viewer_id, session_name, observed_at, users),
        }
    }

    fn viewer_joined(&mut self, viewer_id: ViewerId) -> Result<(), LobbyError> {
        if self.presence.contains(viewer_id.as_str()) {
            warn!(viewer = %viewer_id, "Duplicate join, replacing viewer");
            self.depart(viewer_id.as_str())?;
        }
        self.presence.join(viewer_id.clone());
        info!(now = self.clock.now(), viewer = %viewer_id, viewers = self.presence.len(), "Viewer joined");
        self.observe(0)
    }

    fn viewer_left(&mut self, viewer_id: &ViewerId) -> Result<(), LobbyError> {
        if !self.presence.contains(viewer_id.as_str()) {
            warn!(viewer = %viewer_id, "Leave for unknown viewer ignored");
            return Ok(());
        }
        self.depart(viewer_id.as_str())?;
        info!(now = self.clock.now(), viewer = %viewer_id, viewers = self.presence.len(), "Viewer left");
        self.observe(0)
    }

    fn depart(&mut self, viewer_id: &str) -> Result<(), LobbyError> {
        let Some(Viewer { id, session }) = self.presence.leave(viewer_id) else {
            return Ok(());
        };
        match session {
            Some(name) => self.detach(&id, &name),
            None => Ok(()),
        }
    }

    /// Remove `viewer` from the reporting set of `name`, applying the
    /// departure rules. The viewer's own back-reference is left to the
    /// caller.
    fn detach(&mut self, viewer: &ViewerId, name: &SessionName) -> Result<(), LobbyError> {
        let Some(record) = self.directory.get_mut(name.as_str()) else {
            warn!(viewer = %viewer, session = %name, "Viewer referenced a session that no longer exists");
            return Ok(());
        };
        if !record.viewers.remove(viewer) {
            warn!(viewer = %viewer, session = %name, "Viewer was not in the session's reporting set");
        }
        let was_relay = record.relay.as_ref() == Some(viewer);
        if was_relay {
            record.relay = None;
        }
        let last_user = record.headcount() == Some(1);
        let abandoned = record.viewers.is_empty() && !was_relay;

        if last_user || abandoned {
            self.expire_session(name, ExpiryCause::LastViewerLeft);
        } else if was_relay {
            info!(session = %name, viewer = %viewer, "Relay left, waiting for a new relay");
            self.arm_watchdog(name)?;
        }
        Ok(())
    }

    fn report_status(
        &mut self,
        viewer_id: &ViewerId,
        session_name: SessionName,
        observed_at: i64,
        users: UsersStatus,
    ) -> Result<(), LobbyError> {
        if !self.presence.contains(viewer_id.as_str()) {
            warn!(viewer = %viewer_id, session = %session_name, "Status report from unknown viewer ignored");
            return Ok(());
        }

        if let Some(previous) = self.presence.session_of(viewer_id.as_str()).cloned()
            && previous != session_name
        {
            warn!(viewer = %viewer_id, from = %previous, to = %session_name, "Viewer changed session");
            self.presence.set_session(viewer_id.as_str(), None);
            self.detach(viewer_id, &previous)?;
        }

        let now = self.clock.now();
        let (record, created) = self.directory.ensure(&session_name, observed_at);
        record.last_active = now;
        record.users = users;
        record.viewers.insert(viewer_id.clone());
        let relay_changed = record.relay.as_ref() != Some(viewer_id);
        if relay_changed {
            record.relay = Some(viewer_id.clone());
        }
        self.presence
            .set_session(viewer_id.as_str(), Some(session_name.clone()));

        if created {
            self.sessions_created = self.sessions_created.saturating_add(1);
            info!(now, session = %session_name, since = observed_at, "Session created");
        }
        if relay_changed {
            info!(now, session = %session_name, viewer = %viewer_id, "Relay changed");
            self.outbox.push(Notification::RelayChanged {
                session_name: session_name.clone(),
                viewer_id: viewer_id.clone(),
            });
        }
        self.arm_watchdog(&session_name)?;
        self.outbox
            .push(Notification::DirectoryChanged { session_name });
        self.observe(u32::from(created))
    }

    fn expire_session(&mut self, name: &SessionName, cause: ExpiryCause) {
        let Some(record) = self.directory.remove(name.as_str()) else {
            return;
        };
        for viewer in &record.viewers {
            self.presence.clear_session_if(viewer.as_str(), name.as_str());
        }
        if let Some(handle) = record.expiry {
            self.scheduler.cancel(handle);
        }
        info!(now = self.clock.now(), session = %name, ?cause, "Session expired");
        self.outbox.push(Notification::DirectoryChanged {
            session_name: record.name,
        });
    }

    fn observe(&mut self, sessions_created: u32) -> Result<(), LobbyError> {
        let observation = Observation::from_headcounts(
            saturating_u32(self.presence.len()),
            &self.directory.headcounts(),
            saturating_u32(self.directory.len()),
            sessions_created,
        );
        if self.stats.observe(self.clock.now(), &observation)? {
            let blob = self.stats.persisted();
            debug!(
                history = blob.history.len(),
                prehistoric_count = blob.prehistoric_count,
                "Persisting usage statistics"
            );
            self.sink.persist(&blob);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Current logical time.
    pub const fn now(&self) -> u64 {
        self.clock.now()
    }

    /// Look up a session record.
    pub fn session(&self, name: &str) -> Option<&SessionRecord> {
        self.directory.get(name)
    }

    /// Session list, newest first.
    pub fn sessions(&self) -> Vec<SessionSummary> {
        self.directory.listing()
    }

    /// The viewer currently relaying `name`.
    pub fn relay_of(&self, name: &str) -> Option<&ViewerId> {
        self.directory.get(name).and_then(|record| record.relay.as_ref())
    }

    /// Look up a connected viewer.
    pub fn viewer(&self, id: &str) -> Option<&Viewer> {
        self.presence.get(id)
    }

    /// Number of connected viewers.
    pub fn viewer_count(&self) -> usize {
        self.presence.len()
    }

    /// Viewers in the lobby who are not inside any session.
    pub fn idle_viewer_count(&self) -> usize {
        self.presence.idle_count()
    }

    /// Whether a session has reached the advisory `max_users` capacity.
    /// Unknown sessions and sessions without a headcount are not full.
    pub fn session_is_full(&self, name: &str) -> bool {
        self.directory
            .get(name)
            .and_then(SessionRecord::headcount)
            .is_some_and(|count| count >= self.max_users)
    }

    /// Usage statistics.
    pub const fn stats(&self) -> &StatsAggregator {
        &self.stats
    }

    /// Record-holding days, for display.
    pub fn max_records(&self) -> MaxRecords {
        self.stats.max_records()
    }

    /// Number of pending watchdog timers.
    pub fn pending_timers(&self) -> usize {
        self.scheduler.len()
    }

    /// The persistence sink.
    pub const fn sink(&self) -> &S {
        &self.sink
    }

    /// Clone of the full replica state.
    pub fn replica_state(&self) -> ReplicaState {
        ReplicaState {
            now: self.clock.now(),
            scheduler: self.scheduler.clone(),
            directory: self.directory.clone(),
            presence: self.presence.clone(),
            stats: self.stats.clone(),
        }
    }

    /// Check the cross-structure invariants of this replica.
    pub fn verify_integrity(&self) -> IntegrityReport {
        integrity::verify(
            &self.scheduler,
            &self.directory,
            &self.presence,
            &self.stats,
            self.baseline_sessions.saturating_add(self.sessions_created),
        )
    }
}

/// Reject malformed events before anything is mutated.
fn validate(event: &LobbyEvent) -> Result<(), LobbyError> {
    let LobbyEvent::ReportStatus {
        session_name,
        users,
        ..
    } = event
    else {
        return Ok(());
    };
    if session_name.as_str().trim().is_empty() {
        return Err(LobbyError::InvalidSessionName);
    }
    if users.count().is_none() {
        return Err(LobbyError::InvalidStatus {
            session_name: session_name.clone(),
            reason: "status carries no user count".to_owned(),
        });
    }
    Ok(())
}

fn saturating_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStatsSink;

    fn lobby() -> Lobby<MemoryStatsSink> {
        Lobby::new(
            &LobbyConfig::default(),
            PersistedStats::default(),
            MemoryStatsSink::new(),
        )
    }

    /// 2024-03-10T01:00:00Z
    const T0: u64 = 1_710_032_400_000;

    fn at(offset: u64, event: LobbyEvent) -> SequencedEvent {
        SequencedEvent {
            at: T0 + offset,
            event,
        }
    }

    fn join(id: &str) -> LobbyEvent {
        LobbyEvent::ViewerJoined {
            viewer_id: ViewerId::from(id),
        }
    }

    fn leave(id: &str) -> LobbyEvent {
        LobbyEvent::ViewerLeft {
            viewer_id: ViewerId::from(id),
        }
    }

    fn report(id: &str, session: &str, count: u32) -> LobbyEvent {
        LobbyEvent::ReportStatus {
            viewer_id: ViewerId::from(id),
            session_name: SessionName::from(session),
            observed_at: 1_000,
            users: UsersStatus::structured(count, format!("{count} users"), None),
        }
    }

    fn changed(name: &str) -> Notification {
        Notification::DirectoryChanged {
            session_name: SessionName::from(name),
        }
    }

    #[test]
    fn first_report_creates_session_and_relay() {
        let mut lobby = lobby();
        lobby.handle(at(0, join("v1"))).unwrap();
        let notes = lobby.handle(at(10, report("v1", "Alpha", 1))).unwrap();

        assert_eq!(
            notes,
            vec![
                Notification::RelayChanged {
                    session_name: SessionName::from("Alpha"),
                    viewer_id: ViewerId::from("v1"),
                },
                changed("Alpha"),
            ]
        );
        let record = lobby.session("Alpha").unwrap();
        assert_eq!(record.since, 1_000);
        assert_eq!(record.last_active, T0 + 10);
        assert_eq!(lobby.relay_of("Alpha"), Some(&ViewerId::from("v1")));
        assert_eq!(lobby.pending_timers(), 1);
        assert_eq!(lobby.idle_viewer_count(), 0);
    }

    #[test]
    fn repeated_report_keeps_relay_quietly() {
        let mut lobby = lobby();
        lobby.handle(at(0, join("v1"))).unwrap();
        lobby.handle(at(0, report("v1", "Alpha", 1))).unwrap();
        let notes = lobby.handle(at(1_000, report("v1", "Alpha", 2))).unwrap();
        assert_eq!(notes, vec![changed("Alpha")]);
        assert_eq!(lobby.pending_timers(), 1);
    }

    #[test]
    fn watchdog_expires_silent_session() {
        let mut lobby = lobby();
        lobby.handle(at(0, join("v1"))).unwrap();
        lobby.handle(at(0, report("v1", "Alpha", 3))).unwrap();

        assert!(lobby.advance_to(T0 + 4_999).unwrap().is_empty());
        assert_eq!(lobby.advance_to(T0 + 5_000).unwrap(), vec![changed("Alpha")]);
        assert!(lobby.session("Alpha").is_none());
        assert_eq!(lobby.viewer("v1").unwrap().session, None);
        assert_eq!(lobby.pending_timers(), 0);
    }

    #[test]
    fn timer_due_at_event_time_fires_first() {
        let mut lobby = lobby();
        lobby.handle(at(0, join("v1"))).unwrap();
        lobby.handle(at(0, report("v1", "Alpha", 3))).unwrap();

        // The report at exactly the due time sees an expired session and
        // recreates it.
        let notes = lobby.handle(at(5_000, report("v1", "Alpha", 3))).unwrap();
        assert_eq!(
            notes,
            vec![
                changed("Alpha"),
                Notification::RelayChanged {
                    session_name: SessionName::from("Alpha"),
                    viewer_id: ViewerId::from("v1"),
                },
                changed("Alpha"),
            ]
        );
        assert_eq!(lobby.stats().current().num_sessions, 2);
    }

    #[test]
    fn last_user_leaving_expires_immediately() {
        let mut lobby = lobby();
        lobby.handle(at(0, join("v1"))).unwrap();
        lobby.handle(at(0, report("v1", "Alpha", 1))).unwrap();
        let notes = lobby.handle(at(100, leave("v1"))).unwrap();
        assert_eq!(notes, vec![changed("Alpha")]);
        assert!(lobby.session("Alpha").is_none());
        assert_eq!(lobby.pending_timers(), 0);
    }

    #[test]
    fn relay_leaving_opens_takeover_window() {
        let mut lobby = lobby();
        lobby.handle(at(0, join("relay"))).unwrap();
        lobby.handle(at(0, report("relay", "Alpha", 4))).unwrap();
        let notes = lobby.handle(at(2_000, leave("relay"))).unwrap();
        assert!(notes.is_empty());

        let record = lobby.session("Alpha").unwrap();
        assert_eq!(record.relay, None);
        assert!(record.viewers.is_empty());

        // Window renewed from the departure, not from the last report.
        assert!(lobby.advance_to(T0 + 6_999).unwrap().is_empty());
        assert!(lobby.session("Alpha").is_some());
        assert_eq!(lobby.advance_to(T0 + 7_000).unwrap(), vec![changed("Alpha")]);
    }

    #[test]
    fn new_relay_takes_over_within_window() {
        let mut lobby = lobby();
        lobby.handle(at(0, join("relay"))).unwrap();
        lobby.handle(at(0, report("relay", "Alpha", 4))).unwrap();
        lobby.handle(at(1_000, leave("relay"))).unwrap();
        lobby.handle(at(2_000, join("next"))).unwrap();
        let notes = lobby.handle(at(3_000, report("next", "Alpha", 3))).unwrap();

        assert_eq!(notes.len(), 2);
        assert_eq!(lobby.relay_of("Alpha"), Some(&ViewerId::from("next")));
        assert_eq!(lobby.session("Alpha").unwrap().since, 1_000);
        assert_eq!(lobby.stats().current().num_sessions, 1);
    }

    #[test]
    fn switching_sessions_detaches_first() {
        let mut lobby = lobby();
        lobby.handle(at(0, join("v1"))).unwrap();
        lobby.handle(at(0, report("v1", "A", 1))).unwrap();
        let notes = lobby.handle(at(10, report("v1", "B", 2))).unwrap();

        // A had a single user, so it fast-expires before B is attached.
        assert_eq!(notes.first(), Some(&changed("A")));
        assert!(lobby.session("A").is_none());
        assert_eq!(lobby.viewer("v1").unwrap().session, Some(SessionName::from("B")));
        assert!(lobby.verify_integrity().is_consistent());
    }

    #[test]
    fn switching_away_clears_relay_of_busy_session() {
        let mut lobby = lobby();
        lobby.handle(at(0, join("v1"))).unwrap();
        lobby.handle(at(0, join("v2"))).unwrap();
        lobby.handle(at(0, report("v1", "A", 5))).unwrap();
        lobby.handle(at(1, report("v2", "A", 5))).unwrap();
        lobby.handle(at(2, report("v2", "B", 1))).unwrap();

        let record = lobby.session("A").unwrap();
        assert_eq!(record.relay, None);
        assert!(record.viewers.contains("v1"));
        assert!(lobby.verify_integrity().is_consistent());
    }

    #[test]
    fn duplicate_join_replaces_viewer() {
        let mut lobby = lobby();
        lobby.handle(at(0, join("v1"))).unwrap();
        lobby.handle(at(0, report("v1", "Alpha", 1))).unwrap();
        let notes = lobby.handle(at(5, join("v1"))).unwrap();

        assert_eq!(notes, vec![changed("Alpha")]);
        assert_eq!(lobby.viewer_count(), 1);
        assert_eq!(lobby.viewer("v1").unwrap().session, None);
    }

    #[test]
    fn unknown_viewers_are_ignored() {
        let mut lobby = lobby();
        assert!(lobby.handle(at(0, leave("ghost"))).unwrap().is_empty());
        assert!(lobby.handle(at(0, report("ghost", "Alpha", 1))).unwrap().is_empty());
        assert!(lobby.sessions().is_empty());
    }

    #[test]
    fn malformed_status_is_rejected_without_change() {
        let mut lobby = lobby();
        lobby.handle(at(0, join("v1"))).unwrap();
        let before = lobby.replica_state();

        let bad = LobbyEvent::ReportStatus {
            viewer_id: ViewerId::from("v1"),
            session_name: SessionName::from("Alpha"),
            observed_at: 0,
            users: UsersStatus::Simple("nobody knows".to_owned()),
        };
        let result = lobby.handle(at(9_000, bad));
        assert!(matches!(result, Err(LobbyError::InvalidStatus { .. })));

        let unnamed = report("v1", "  ", 1);
        assert_eq!(lobby.handle(at(9_000, unnamed)), Err(LobbyError::InvalidSessionName));
        assert_eq!(lobby.replica_state(), before);
    }

    #[test]
    fn time_regression_is_rejected() {
        let mut lobby = lobby();
        lobby.handle(at(1_000, join("v1"))).unwrap();
        let result = lobby.handle(at(999, join("v2")));
        assert!(matches!(result, Err(LobbyError::Clock { .. })));
        assert_eq!(lobby.viewer_count(), 1);
        assert_eq!(lobby.now(), T0 + 1_000);
    }

    #[test]
    fn capacity_is_advisory() {
        let mut lobby = lobby();
        lobby.handle(at(0, join("v1"))).unwrap();
        lobby.handle(at(0, report("v1", "Full", 8))).unwrap();
        assert!(lobby.session_is_full("Full"));
        assert!(!lobby.session_is_full("Missing"));
    }

    #[test]
    fn statistics_are_persisted_on_change() {
        let mut lobby = lobby();
        lobby.handle(at(0, join("v1"))).unwrap();
        let writes = lobby.sink().writes();
        assert!(writes >= 1);

        lobby.handle(at(0, report("v1", "Alpha", 2))).unwrap();
        assert!(lobby.sink().writes() > writes);
        let blob = lobby.sink().latest().unwrap();
        assert_eq!(blob.history.last().map(|d| d.num_sessions), Some(1));
        assert_eq!(blob.history.last().map(|d| d.max_in_session), Some(2));
    }

    #[test]
    fn listing_shows_newest_first() {
        let mut lobby = lobby();
        lobby.handle(at(0, join("a"))).unwrap();
        lobby.handle(at(0, join("b"))).unwrap();
        lobby
            .handle(at(
                0,
                LobbyEvent::ReportStatus {
                    viewer_id: ViewerId::from("a"),
                    session_name: SessionName::from("Old"),
                    observed_at: 100,
                    users: UsersStatus::Simple("1 user".to_owned()),
                },
            ))
            .unwrap();
        lobby
            .handle(at(
                0,
                LobbyEvent::ReportStatus {
                    viewer_id: ViewerId::from("b"),
                    session_name: SessionName::from("New"),
                    observed_at: 200,
                    users: UsersStatus::Simple("2 users".to_owned()),
                },
            ))
            .unwrap();
        let names: Vec<SessionName> = lobby.sessions().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec![SessionName::from("New"), SessionName::from("Old")]);
    }
}
