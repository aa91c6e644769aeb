//! Logical clock for the lobby state machine.
//!
//! The clock is the single source of truth for time inside a replica. It
//! only ever moves to timestamps handed over by the ordering service, which
//! stamps every event identically for all replicas, so expiry and day
//! rollover decisions never depend on a local wall clock.
//!
//! # Design Principles
//!
//! - Time is a millisecond count and never moves backwards.
//! - Calendar derivations (start of day) are computed in UTC from the
//!   millisecond count, never stored independently.

use chrono::{DateTime, Utc};

/// Milliseconds in one second.
const MILLIS_PER_SECOND: u64 = 1_000;

/// Errors that can occur during clock operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ClockError {
    /// The ordering service delivered a timestamp earlier than the current
    /// logical time.
    #[error("logical time regression: at {current}ms, asked to move to {requested}ms")]
    Regression {
        /// Current logical time.
        current: u64,
        /// The rejected timestamp.
        requested: u64,
    },

    /// The timestamp cannot be represented as a calendar date.
    #[error("timestamp {millis}ms is outside the representable calendar range")]
    OutOfRange {
        /// The offending timestamp.
        millis: u64,
    },
}

/// Monotonic logical clock in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LogicalClock {
    now: u64,
}

impl LogicalClock {
    /// Create a clock at the given logical time.
    pub const fn starting_at(now: u64) -> Self {
        Self { now }
    }

    /// Current logical time in milliseconds.
    pub const fn now(&self) -> u64 {
        self.now
    }

    /// Move the clock forward to `to`. Moving to the current time is allowed.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::Regression`] if `to` is earlier than the
    /// current time; the clock is left unchanged.
    pub const fn advance_to(&mut self, to: u64) -> Result<u64, ClockError> {
        if to < self.now {
            return Err(ClockError::Regression {
                current: self.now,
                requested: to,
            });
        }
        self.now = to;
        Ok(to)
    }
}

/// Convert a duration in seconds to logical milliseconds, saturating.
pub const fn seconds_to_millis(seconds: u64) -> u64 {
    seconds.saturating_mul(MILLIS_PER_SECOND)
}

/// Start of the UTC day containing `millis`, in ms since the epoch.
///
/// # Errors
///
/// Returns [`ClockError::OutOfRange`] if the timestamp does not map to a
/// calendar date.
pub fn day_start(millis: u64) -> Result<i64, ClockError> {
    let signed = i64::try_from(millis).map_err(|_err| ClockError::OutOfRange { millis })?;
    let instant: DateTime<Utc> =
        DateTime::from_timestamp_millis(signed).ok_or(ClockError::OutOfRange { millis })?;
    instant
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc().timestamp_millis())
        .ok_or(ClockError::OutOfRange { millis })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const DAY: u64 = 86_400_000;

    #[test]
    fn clock_starts_at_given_time() {
        assert_eq!(LogicalClock::default().now(), 0);
        assert_eq!(LogicalClock::starting_at(42).now(), 42);
    }

    #[test]
    fn clock_advances_and_allows_equal_time() {
        let mut clock = LogicalClock::default();
        assert_eq!(clock.advance_to(1_000), Ok(1_000));
        assert_eq!(clock.advance_to(1_000), Ok(1_000));
        assert_eq!(clock.now(), 1_000);
    }

    #[test]
    fn clock_rejects_regression() {
        let mut clock = LogicalClock::starting_at(5_000);
        let result = clock.advance_to(4_999);
        assert_eq!(
            result,
            Err(ClockError::Regression {
                current: 5_000,
                requested: 4_999
            })
        );
        assert_eq!(clock.now(), 5_000);
    }

    #[test]
    fn day_start_truncates_to_utc_midnight() {
        assert_eq!(day_start(0).unwrap(), 0);
        assert_eq!(day_start(DAY - 1).unwrap(), 0);
        assert_eq!(day_start(DAY).unwrap(), 86_400_000);
        // 2024-03-10T15:30:00Z
        assert_eq!(day_start(1_710_084_600_000).unwrap(), 1_710_028_800_000);
    }

    #[test]
    fn day_start_rejects_unrepresentable_time() {
        assert!(day_start(u64::MAX).is_err());
    }

    #[test]
    fn seconds_convert_to_millis() {
        assert_eq!(seconds_to_millis(5), 5_000);
        assert_eq!(seconds_to_millis(u64::MAX), u64::MAX);
    }
}
