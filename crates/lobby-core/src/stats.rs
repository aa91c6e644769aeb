//! Rolling daily usage statistics with bounded, record-preserving history.
//!
//! The aggregator keeps one in-progress [`DailyStats`] record for the
//! current UTC day and a history of finalized days. Every mutation of the
//! lobby is folded in through [`StatsAggregator::observe`]; counters only
//! ever rise within a day.
//!
//! # Rollover
//!
//! When an observation falls on a later day than `current`:
//!
//! - If no day has been started yet (first observation since start-up),
//!   the persisted history may already hold a record for that
//!   day, written by another lobby replica earlier the same day. That
//!   record is taken out of history and merged into `current`, so a
//!   restarted lobby keeps counting where the previous one stopped.
//! - Otherwise `current` is finalized into history and a fresh record is
//!   started.
//!
//! # Compaction
//!
//! History is capped. When over the cap, the oldest record that is not the
//! sole holder of any counter's all-time maximum is evicted and its session count
//! folded into `prehistoric_count`, so
//!
//! ```text
//! sum(history.num_sessions) + current.num_sessions + prehistoric_count
//! ```
//!
//! always equals the number of sessions ever created.

use std::collections::BTreeSet;

use lobby_types::{DailyStats, MaxRecords, PersistedStats, StatCounter};
use tracing::debug;

use crate::clock::{ClockError, day_start};

/// Errors that can occur while folding an observation.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StatsError {
    /// The observation time could not be mapped to a day.
    #[error("cannot derive statistics day: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },
}

/// Snapshot of the lobby taken after a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Observation {
    /// Viewers connected to the lobby.
    pub viewers: u32,
    /// Users inside sessions, summed over sessions.
    pub in_sessions: u32,
    /// Users inside the fullest session.
    pub in_largest_session: u32,
    /// Sessions listed.
    pub sessions: u32,
    /// Sessions created by the mutation being observed.
    pub sessions_created: u32,
}

impl Observation {
    /// Build an observation from per-session headcounts.
    pub fn from_headcounts(viewers: u32, headcounts: &[u32], sessions: u32, sessions_created: u32) -> Self {
        Self {
            viewers,
            in_sessions: headcounts
                .iter()
                .fold(0_u32, |sum, count| sum.saturating_add(*count)),
            in_largest_session: headcounts.iter().copied().max().unwrap_or(0),
            sessions,
            sessions_created,
        }
    }
}

/// Daily usage aggregator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsAggregator {
    current: DailyStats,
    day_started: bool,
    history: Vec<DailyStats>,
    prehistoric_count: u64,
    history_cap: usize,
}

impl StatsAggregator {
    /// Create an aggregator with empty history.
    pub fn new(history_cap: usize) -> Self {
        Self::from_persisted(PersistedStats::default(), history_cap)
    }

    /// Restore an aggregator from a persisted blob.
    ///
    /// The blob may hold the day that is still in progress; it stays in
    /// history until the first observation adopts it, and history is only
    /// compacted after that first rollover.
    pub fn from_persisted(persisted: PersistedStats, history_cap: usize) -> Self {
        Self {
            current: DailyStats::default(),
            day_started: false,
            history: persisted.history,
            prehistoric_count: persisted.prehistoric_count,
            history_cap: history_cap.max(1),
        }
    }

    /// Fold an observation taken at logical time `now` into the current day.
    ///
    /// Returns `true` if anything that is persisted or displayed changed,
    /// in which case the caller should hand [`persisted`](Self::persisted)
    /// to the persistence collaborator.
    ///
    /// # Errors
    ///
    /// Returns [`StatsError::Clock`] if `now` cannot be mapped to a day; no
    /// state is changed in that case.
    pub fn observe(&mut self, now: u64, observation: &Observation) -> Result<bool, StatsError> {
        let day = day_start(now)?;
        let mut changed = false;

        if !self.day_started || day > self.current.date {
            self.roll_over(day);
            changed = true;
        }

        let current = &mut self.current;
        changed |= raise(&mut current.max_in_lobby, observation.viewers);
        changed |= raise(&mut current.max_in_sessions, observation.in_sessions);
        changed |= raise(&mut current.max_in_session, observation.in_largest_session);
        changed |= raise(&mut current.max_sessions, observation.sessions);
        if observation.sessions_created > 0 {
            current.num_sessions = current
                .num_sessions
                .saturating_add(observation.sessions_created);
            changed = true;
        }

        Ok(changed)
    }

    fn roll_over(&mut self, day: i64) {
        if !self.day_started {
            self.day_started = true;
            let restored = self
                .history
                .iter()
                .position(|record| record.date == day)
                .map(|index| self.history.remove(index));
            let fresh = DailyStats::for_day(day);
            self.current = match restored {
                Some(record) => {
                    debug!(day, "Resuming statistics day from history");
                    merge(&merge(&fresh, &self.current), &record)
                }
                None => merge(&fresh, &self.current),
            };
        } else {
            debug!(finalized = self.current.date, day, "Statistics day rollover");
            self.history.push(self.current);
            self.current = DailyStats::for_day(day);
        }
        self.compact();
    }

    fn compact(&mut self) {
        while self.history.len() > self.history_cap {
            let protected = record_holders(&self.history);
            let victim = oldest_index(&self.history, |index| !protected.contains(&index))
                .or_else(|| oldest_index(&self.history, |_| true));
            let Some(index) = victim else {
                break;
            };
            let evicted = self.history.remove(index);
            self.prehistoric_count = self
                .prehistoric_count
                .saturating_add(u64::from(evicted.num_sessions));
            debug!(
                date = evicted.date,
                num_sessions = evicted.num_sessions,
                prehistoric_count = self.prehistoric_count,
                "Evicted statistics day"
            );
        }
    }

    /// Per counter, the historical day holding the maximum (earliest day
    /// wins ties). Days in `current` are not considered.
    pub fn max_records(&self) -> MaxRecords {
        let mut records = MaxRecords::default();
        for counter in StatCounter::ALL {
            let holder = record_index(&self.history, counter)
                .and_then(|index| self.history.get(index))
                .copied();
            records.set(counter, holder);
        }
        records
    }

    /// The blob to hand to the persistence collaborator: finalized history
    /// followed by the in-progress day, once one has been started.
    pub fn persisted(&self) -> PersistedStats {
        let mut history = self.history.clone();
        if self.day_started {
            history.push(self.current);
        }
        PersistedStats {
            history,
            prehistoric_count: self.prehistoric_count,
        }
    }

    /// Whether an observation has started the current day.
    pub const fn day_started(&self) -> bool {
        self.day_started
    }

    /// The in-progress day.
    pub const fn current(&self) -> &DailyStats {
        &self.current
    }

    /// Finalized days, oldest first.
    pub fn history(&self) -> &[DailyStats] {
        &self.history
    }

    /// Sessions attributed to evicted days.
    pub const fn prehistoric_count(&self) -> u64 {
        self.prehistoric_count
    }

    /// Configured history cap.
    pub const fn history_cap(&self) -> usize {
        self.history_cap
    }

    /// Every session ever counted: history, current day and prehistory.
    pub fn total_sessions(&self) -> u64 {
        self.history
            .iter()
            .map(|record| u64::from(record.num_sessions))
            .fold(
                u64::from(self.current.num_sessions).saturating_add(self.prehistoric_count),
                u64::saturating_add,
            )
    }
}

/// Raise `slot` to `value` if larger. Returns whether it changed.
fn raise(slot: &mut u32, value: u32) -> bool {
    if value > *slot {
        *slot = value;
        true
    } else {
        false
    }
}

/// Elementwise maximum of the peak counters, sum of created sessions. The
/// date is taken from `base`.
fn merge(base: &DailyStats, other: &DailyStats) -> DailyStats {
    DailyStats {
        date: base.date,
        max_in_lobby: base.max_in_lobby.max(other.max_in_lobby),
        max_in_sessions: base.max_in_sessions.max(other.max_in_sessions),
        max_in_session: base.max_in_session.max(other.max_in_session),
        max_sessions: base.max_sessions.max(other.max_sessions),
        num_sessions: base.num_sessions.saturating_add(other.num_sessions),
    }
}

/// Index of the record holding the maximum of `counter`, earliest date on
/// ties.
fn record_index(history: &[DailyStats], counter: StatCounter) -> Option<usize> {
    history
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            b.get(counter)
                .cmp(&a.get(counter))
                .then_with(|| a.date.cmp(&b.date))
        })
        .map(|(index, _)| index)
}

/// Indices of every record that is the only one reaching the maximum of at
/// least one counter. A maximum shared by several days protects none of them.
fn record_holders(history: &[DailyStats]) -> BTreeSet<usize> {
    StatCounter::ALL
        .iter()
        .filter_map(|counter| sole_record_index(history, *counter))
        .collect()
}

fn sole_record_index(history: &[DailyStats], counter: StatCounter) -> Option<usize> {
    let best = history.iter().map(|record| record.get(counter)).max()?;
    let mut holders = history
        .iter()
        .enumerate()
        .filter(|(_, record)| record.get(counter) == best);
    let (index, _) = holders.next()?;
    holders.next().is_none().then_some(index)
}

/// Index of the oldest record accepted by `eligible`.
fn oldest_index(history: &[DailyStats], eligible: impl Fn(usize) -> bool) -> Option<usize> {
    history
        .iter()
        .enumerate()
        .filter(|(index, _)| eligible(*index))
        .min_by_key(|(_, record)| record.date)
        .map(|(index, _)| index)
}
