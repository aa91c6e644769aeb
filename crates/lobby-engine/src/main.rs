//! Lobby replica binary.
//!
//! Replays an ordered event log through one [`Lobby`] replica, prints every
//! notification as a JSON line on stdout and keeps the usage statistics blob
//! on disk up to date.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `lobby-config.yaml` (or `LOBBY_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Load the persisted statistics blob (`LOBBY_STATS`)
//! 4. Replay the event log named on the command line, or stdin
//! 5. Log the final directory and statistics
//!
//! [`Lobby`]: lobby_core::lobby::Lobby

mod error;
mod event_log;
mod store;

use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use lobby_core::config::LobbyConfig;
use lobby_core::integrity::IntegrityReport;
use lobby_core::lobby::Lobby;
use lobby_core::persistence::StatsSink;
use lobby_types::Notification;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::event_log::EventLog;
use crate::store::JsonFileStatsSink;

/// Environment variable naming the configuration file.
const CONFIG_ENV: &str = "LOBBY_CONFIG";

/// Environment variable naming the statistics blob file.
const STATS_ENV: &str = "LOBBY_STATS";

/// Application entry point for the lobby engine.
///
/// # Errors
///
/// Returns an error if configuration or the statistics blob cannot be
/// loaded, or if the event log is unreadable or holds a line that is not a
/// valid event. Events the lobby rejects are logged and skipped.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config = load_config()?;

    // 2. Initialize structured logging. RUST_LOG wins over the config file.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    info!(
        timeout_secs = config.session.timeout_secs,
        max_users = config.session.max_users,
        history_cap = config.stats.history_cap,
        "lobby-engine starting"
    );

    // 3. Load persisted statistics.
    let stats_path = env_path(STATS_ENV, "lobby-stats.json");
    let persisted = store::load(&stats_path)?;
    let mut lobby = Lobby::new(&config, persisted, JsonFileStatsSink::new(stats_path));

    // 4. Replay events.
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let summary = match std::env::args_os().nth(1) {
        Some(path) => {
            let path = PathBuf::from(path);
            let file = std::fs::File::open(&path).map_err(|source| EngineError::Io {
                path: path.clone(),
                source,
            })?;
            replay(&mut lobby, BufReader::new(file), &path, &mut out)?
        }
        None => replay(
            &mut lobby,
            std::io::stdin().lock(),
            Path::new("<stdin>"),
            &mut out,
        )?,
    };

    // 5. Log results.
    let stats = lobby.stats().current();
    info!(
        applied = summary.applied,
        rejected = summary.rejected,
        now = lobby.now(),
        sessions = lobby.sessions().len(),
        viewers = lobby.viewer_count(),
        idle_viewers = lobby.idle_viewer_count(),
        max_in_lobby = stats.max_in_lobby,
        num_sessions = stats.num_sessions,
        persist_failures = lobby.sink().failures(),
        "lobby-engine shutdown complete"
    );
    Ok(())
}

/// Outcome of a replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ReplaySummary {
    /// Events the lobby applied.
    applied: u64,
    /// Events the lobby rejected; each one is logged and skipped.
    rejected: u64,
}

/// Feed every event of the log into `lobby`, writing notifications to `out`.
///
/// An event the lobby rejects leaves the replica unchanged, so it is logged
/// and the replay moves on to the next line.
///
/// # Errors
///
/// Returns an error if the log cannot be read, a line is not a valid event
/// or a notification cannot be written.
fn replay<R: BufRead, S: StatsSink>(
    lobby: &mut Lobby<S>,
    reader: R,
    path: &Path,
    out: &mut impl Write,
) -> Result<ReplaySummary, EngineError> {
    let mut summary = ReplaySummary::default();

    for entry in EventLog::new(reader, path) {
        let (line, event) = entry?;
        let notifications = match lobby.handle(event) {
            Ok(notifications) => notifications,
            Err(source) => {
                summary.rejected = summary.rejected.saturating_add(1);
                warn!(line, error = %source, "Event rejected");
                continue;
            }
        };
        emit(out, &notifications)?;
        summary.applied = summary.applied.saturating_add(1);

        if let IntegrityReport::Violations(violations) = lobby.verify_integrity() {
            for violation in violations {
                warn!(line, %violation, "Replica integrity violation");
            }
        }
    }
    Ok(summary)
}

/// Write notifications to `out`, one JSON object per line.
fn emit(out: &mut impl Write, notifications: &[Notification]) -> Result<(), EngineError> {
    let stdout_path = || PathBuf::from("<stdout>");
    for notification in notifications {
        let json = serde_json::to_string(notification).map_err(|source| EngineError::Json {
            path: stdout_path(),
            line: 0,
            source,
        })?;
        writeln!(out, "{json}").map_err(|source| EngineError::Io {
            path: stdout_path(),
            source,
        })?;
    }
    Ok(())
}

/// Load the lobby configuration.
///
/// Looks for the config file relative to the current working directory
/// unless `LOBBY_CONFIG` names one.
fn load_config() -> Result<LobbyConfig, EngineError> {
    let config_path = env_path(CONFIG_ENV, "lobby-config.yaml");
    if config_path.exists() {
        Ok(LobbyConfig::from_file(&config_path)?)
    } else {
        let mut config = LobbyConfig::default();
        config.logging.apply_env_overrides();
        Ok(config)
    }
}

/// Path from an environment variable, or `default`.
fn env_path(var: &str, default: &str) -> PathBuf {
    std::env::var_os(var).map_or_else(|| PathBuf::from(default), PathBuf::from)
}
