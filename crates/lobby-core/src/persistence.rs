//! Persistence seam for usage statistics.
//!
//! The lobby never stores anything itself. Whenever the statistics change it
//! hands the full [`PersistedStats`] blob to a [`StatsSink`]; whoever
//! implements the sink decides where the blob goes. The blob handed back at
//! start-up is passed to [`crate::lobby::Lobby::new`].

use lobby_types::PersistedStats;

/// Receiver of the persisted statistics blob.
///
/// Implementations must not fail the state transition that produced the
/// blob: persistence is fire-and-forget from the state machine's point of
/// view, so `persist` has no error channel. Sinks that can fail should log
/// and retry on the next call.
pub trait StatsSink {
    /// Store the latest blob, replacing any previous one.
    fn persist(&mut self, stats: &PersistedStats);
}

/// A sink that discards every blob.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStatsSink;

impl StatsSink for NullStatsSink {
    fn persist(&mut self, _stats: &PersistedStats) {}
}

/// A sink that keeps the most recent blob in memory and counts writes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStatsSink {
    latest: Option<PersistedStats>,
    writes: u64,
}

impl MemoryStatsSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently persisted blob.
    pub const fn latest(&self) -> Option<&PersistedStats> {
        self.latest.as_ref()
    }

    /// How many blobs were persisted.
    pub const fn writes(&self) -> u64 {
        self.writes
    }
}

impl StatsSink for MemoryStatsSink {
    fn persist(&mut self, stats: &PersistedStats) {
        self.latest = Some(stats.clone());
        self.writes = self.writes.saturating_add(1);
    }
}

impl<S: StatsSink + ?Sized> StatsSink for &mut S {
    fn persist(&mut self, stats: &PersistedStats) {
        (**self).persist(stats);
    }
}
