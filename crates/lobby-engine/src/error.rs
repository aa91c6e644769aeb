//! Error types for the lobby engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps every failure mode
//! during start-up and while reading or writing during replay. Events the
//! lobby rejects are not errors here; the replay logs and skips them.

use std::path::PathBuf;

/// Top-level error for the lobby engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: lobby_core::config::ConfigError,
    },

    /// Reading input or writing output failed.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        /// The file or stream involved.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A persisted blob or event line is not valid JSON.
    #[error("malformed JSON in {} line {line}: {source}", .path.display())]
    Json {
        /// The file the JSON came from.
        path: PathBuf,
        /// One-based line number (1 for whole-file blobs).
        line: usize,
        /// The underlying JSON error.
        source: serde_json::Error,
    },
}
