//! JSON file persistence for the usage statistics blob.
//!
//! The blob is small and rewritten whole on every change. It is written to a
//! sibling temporary file first and renamed into place, so a crash mid-write
//! leaves the previous blob intact.

use std::path::{Path, PathBuf};

use lobby_core::persistence::StatsSink;
use lobby_types::PersistedStats;
use tracing::{debug, info, warn};

use crate::error::EngineError;

/// Load the blob at `path`, or an empty one if the file does not exist.
///
/// # Errors
///
/// Returns [`EngineError::Io`] if the file exists but cannot be read, or
/// [`EngineError::Json`] if it is not a valid blob.
pub fn load(path: &Path) -> Result<PersistedStats, EngineError> {
    if !path.exists() {
        info!(path = %path.display(), "No statistics file, starting with empty history");
        return Ok(PersistedStats::default());
    }
    let contents = std::fs::read_to_string(path).map_err(|source| EngineError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let stats: PersistedStats =
        serde_json::from_str(&contents).map_err(|source| EngineError::Json {
            path: path.to_path_buf(),
            line: 1,
            source,
        })?;
    info!(
        path = %path.display(),
        days = stats.history.len(),
        prehistoric_count = stats.prehistoric_count,
        "Statistics loaded"
    );
    Ok(stats)
}

/// A [`StatsSink`] that writes each blob to a JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStatsSink {
    path: PathBuf,
    failures: u64,
}

impl JsonFileStatsSink {
    /// Create a sink writing to `path`.
    pub const fn new(path: PathBuf) -> Self {
        Self { path, failures: 0 }
    }

    /// Number of writes that failed so far.
    pub const fn failures(&self) -> u64 {
        self.failures
    }

    fn write(&self, stats: &PersistedStats) -> Result<(), EngineError> {
        let json = serde_json::to_string_pretty(stats).map_err(|source| EngineError::Json {
            path: self.path.clone(),
            line: 1,
            source,
        })?;
        let staging = self.path.with_extension("json.tmp");
        std::fs::write(&staging, json).map_err(|source| EngineError::Io {
            path: staging.clone(),
            source,
        })?;
        std::fs::rename(&staging, &self.path).map_err(|source| EngineError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl StatsSink for JsonFileStatsSink {
    fn persist(&mut self, stats: &PersistedStats) {
        match self.write(stats) {
            Ok(()) => debug!(path = %self.path.display(), "Statistics written"),
            Err(e) => {
                self.failures = self.failures.saturating_add(1);
                warn!(error = %e, failures = self.failures, "Failed to persist statistics");
            }
        }
    }
}
