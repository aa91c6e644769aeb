//! Cross-structure integrity checks for a lobby replica.
//!
//! The presence registry, the session directory, the timer table and the
//! statistics aggregator each keep their own state. The lobby keeps them in
//! step on every transition; this module re-derives the relationships from
//! scratch and reports every one that no longer holds:
//!
//! - the relay of a session is one of its reporting viewers;
//! - a session with no reporting viewer still has a pending watchdog, so it
//!   cannot linger forever;
//! - every session watchdog refers to a pending timer;
//! - a viewer's session back-reference names a listed session that lists
//!   the viewer, and vice versa;
//! - history never exceeds its cap once the first day has started (a
//!   loaded blob may hold one extra record until then);
//! - sessions are conserved:
//!
//! ```text
//! sum(history.num_sessions) + current.num_sessions + prehistoric_count
//!     == sessions loaded at start-up + sessions created since
//! ```
//!
//! A violation is a bug in the state machine, not a user error, so the
//! result is a report rather than an error type.

use crate::directory::SessionDirectory;
use crate::presence::PresenceRegistry;
use crate::scheduler::Scheduler;
use crate::stats::StatsAggregator;

/// Outcome of an integrity check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityReport {
    /// Every invariant holds.
    Consistent,
    /// One human-readable line per violated invariant.
    Violations(Vec<String>),
}

impl IntegrityReport {
    /// Whether every invariant holds.
    pub const fn is_consistent(&self) -> bool {
        matches!(self, Self::Consistent)
    }
}

/// Re-derive every cross-structure invariant. `expected_sessions` is the
/// number of sessions the statistics must account for.
pub fn verify(
    scheduler: &Scheduler,
    directory: &SessionDirectory,
    presence: &PresenceRegistry,
    stats: &StatsAggregator,
    expected_sessions: u64,
) -> IntegrityReport {
    let mut violations = Vec::new();

    for record in directory.iter() {
        let name = &record.name;
        if !record.relay_is_reporting() {
            violations.push(format!("session {name}: relay is not a reporting viewer"));
        }
        match record.expiry {
            Some(handle) if !scheduler.is_pending(handle) => {
                violations.push(format!("session {name}: watchdog {handle} is not pending"));
            }
            None if record.viewers.is_empty() => {
                violations.push(format!("session {name}: no reporters and no watchdog"));
            }
            _ => {}
        }
        for viewer in &record.viewers {
            if presence.session_of(viewer.as_str()) != Some(name) {
                violations.push(format!(
                    "session {name}: viewer {viewer} does not point back at it"
                ));
            }
        }
    }

    for viewer in presence.iter() {
        let Some(session) = &viewer.session else {
            continue;
        };
        let listed = directory
            .get(session.as_str())
            .is_some_and(|record| record.viewers.contains(&viewer.id));
        if !listed {
            violations.push(format!(
                "viewer {}: session {session} does not list it",
                viewer.id
            ));
        }
    }

    if stats.day_started() && stats.history().len() > stats.history_cap() {
        violations.push(format!(
            "statistics history holds {} days, cap is {}",
            stats.history().len(),
            stats.history_cap()
        ));
    }

    let counted = stats.total_sessions();
    if counted != expected_sessions {
        violations.push(format!(
            "statistics account for {counted} sessions, expected {expected_sessions}"
        ));
    }

    if violations.is_empty() {
        IntegrityReport::Consistent
    } else {
        IntegrityReport::Violations(violations)
    }
}
