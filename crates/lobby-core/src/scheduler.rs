//! Deterministic scheduled-callback table.
//!
//! Timers are plain data: a handle, a due time and a [`TimerTarget`] naming
//! what to do when the timer fires. The lobby looks the target up by name
//! at fire time instead of capturing the session itself, so a session that
//! was removed and recreated under the same name never receives a callback
//! meant for its predecessor.
//!
//! Handles are allocated from a per-replica counter. Because every replica
//! schedules the same timers in the same order, handles agree across
//! replicas, and ordering by `(due, handle)` gives "due time, then
//! registration order" for simultaneous timers.

use std::collections::BTreeMap;

use lobby_types::SessionName;

/// Errors that can occur when scheduling timers.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SchedulerError {
    /// The handle counter cannot advance any further.
    #[error("timer handle space exhausted")]
    HandlesExhausted,
}

/// Opaque, cancellable reference to a scheduled callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerHandle(u64);

impl TimerHandle {
    /// Raw sequence number of the handle.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl core::fmt::Display for TimerHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

/// What a timer does when it fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerTarget {
    /// Expire the named session if this timer is still its watchdog.
    SessionExpiry {
        /// The session to check.
        session_name: SessionName,
    },
}

/// A timer that has come due.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiredTimer {
    /// The handle it was scheduled under.
    pub handle: TimerHandle,
    /// Logical time it was due.
    pub due: u64,
    /// What to do.
    pub target: TimerTarget,
}

/// Table of pending timers ordered by due time, then registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scheduler {
    next_handle: u64,
    queue: BTreeMap<(u64, TimerHandle), TimerTarget>,
    pending: BTreeMap<TimerHandle, u64>,
}

impl Scheduler {
    /// Create an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `target` to fire at logical time `due`.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::HandlesExhausted`] if no handle is left.
    pub fn schedule(&mut self, due: u64, target: TimerTarget) -> Result<TimerHandle, SchedulerError> {
        let handle = TimerHandle(self.next_handle);
        self.next_handle = self
            .next_handle
            .checked_add(1)
            .ok_or(SchedulerError::HandlesExhausted)?;
        self.queue.insert((due, handle), target);
        self.pending.insert(handle, due);
        Ok(handle)
    }

    /// Cancel a pending timer. Returns `false` (and does nothing) if the
    /// handle already fired or was cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        match self.pending.remove(&handle) {
            Some(due) => {
                self.queue.remove(&(due, handle));
                true
            }
            None => false,
        }
    }

    /// Whether the handle is still waiting to fire.
    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.pending.contains_key(&handle)
    }

    /// Due time of a pending handle.
    pub fn due_time(&self, handle: TimerHandle) -> Option<u64> {
        self.pending.get(&handle).copied()
    }

    /// Due time of the earliest pending timer.
    pub fn next_due(&self) -> Option<u64> {
        self.queue.keys().next().map(|(due, _)| *due)
    }

    /// Remove and return the earliest timer due at or before `now`.
    pub fn pop_due(&mut self, now: u64) -> Option<FiredTimer> {
        let (due, handle) = *self.queue.keys().next()?;
        if due > now {
            return None;
        }
        let target = self.queue.remove(&(due, handle))?;
        self.pending.remove(&handle);
        Some(FiredTimer {
            handle,
            due,
            target,
        })
    }

    /// Number of pending timers.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether no timers are pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn expiry(name: &str) -> TimerTarget {
        TimerTarget::SessionExpiry {
            session_name: SessionName::from(name),
        }
    }

    #[test]
    fn fires_in_due_order() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(300, expiry("c")).unwrap();
        scheduler.schedule(100, expiry("a")).unwrap();
        scheduler.schedule(200, expiry("b")).unwrap();

        let fired: Vec<u64> = std::iter::from_fn(|| scheduler.pop_due(1_000))
            .map(|t| t.due)
            .collect();
        assert_eq!(fired, vec![100, 200, 300]);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn ties_fire_in_registration_order() {
        let mut scheduler = Scheduler::new();
        let first = scheduler.schedule(500, expiry("first")).unwrap();
        let second = scheduler.schedule(500, expiry("second")).unwrap();

        assert_eq!(scheduler.pop_due(500).map(|t| t.handle), Some(first));
        assert_eq!(scheduler.pop_due(500).map(|t| t.handle), Some(second));
    }

    #[test]
    fn nothing_fires_before_due() {
        let mut scheduler = Scheduler::new();
        let handle = scheduler.schedule(5_000, expiry("a")).unwrap();
        assert_eq!(scheduler.pop_due(4_999), None);
        assert!(scheduler.is_pending(handle));
        assert_eq!(scheduler.next_due(), Some(5_000));
        assert_eq!(scheduler.due_time(handle), Some(5_000));
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut scheduler = Scheduler::new();
        let handle = scheduler.schedule(10, expiry("a")).unwrap();
        assert!(scheduler.cancel(handle));
        assert!(!scheduler.cancel(handle));
        assert_eq!(scheduler.pop_due(u64::MAX), None);
    }

    #[test]
    fn cancelling_fired_handle_is_noop() {
        let mut scheduler = Scheduler::new();
        let handle = scheduler.schedule(10, expiry("a")).unwrap();
        let other = scheduler.schedule(20, expiry("b")).unwrap();
        assert!(scheduler.pop_due(10).is_some());
        assert!(!scheduler.cancel(handle));
        assert!(scheduler.is_pending(other));
        assert_eq!(scheduler.len(), 1);
    }

    #[test]
    fn identical_schedules_produce_identical_handles() {
        let mut left = Scheduler::new();
        let mut right = Scheduler::new();
        for due in [30, 10, 20] {
            let a = left.schedule(due, expiry("x")).unwrap();
            let b = right.schedule(due, expiry("x")).unwrap();
            assert_eq!(a, b);
        }
        assert_eq!(left, right);
    }
}
