//! Configuration loading and typed config structures for the lobby.
//!
//! The canonical configuration lives in `lobby-config.yaml` at the project
//! root. This module defines strongly-typed structs that mirror the YAML
//! structure, and provides a loader that reads and validates the file.
//! Every replica of a lobby must run with the same `session` and `stats`
//! sections, otherwise their expiry and compaction decisions diverge.

use std::path::Path;

use serde::Deserialize;

use crate::clock::seconds_to_millis;

/// Environment variable that overrides `logging.level`.
pub const LOG_LEVEL_ENV: &str = "LOBBY_LOG_LEVEL";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The configuration parsed but holds an unusable value.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level lobby configuration.
///
/// Mirrors the structure of `lobby-config.yaml`. All fields have defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LobbyConfig {
    /// Session directory settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// Usage statistics settings.
    #[serde(default)]
    pub stats: StatsConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl LobbyConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// The `LOBBY_LOG_LEVEL` environment variable overrides
    /// `logging.level`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.logging.apply_env_overrides();
        Ok(config)
    }

    /// Parse and validate configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                reason: "session.timeout_secs must be at least 1".to_owned(),
            });
        }
        if self.session.max_users == 0 {
            return Err(ConfigError::Invalid {
                reason: "session.max_users must be at least 1".to_owned(),
            });
        }
        if self.stats.history_cap == 0 {
            return Err(ConfigError::Invalid {
                reason: "stats.history_cap must be at least 1".to_owned(),
            });
        }
        Ok(())
    }
}

/// Session directory configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionConfig {
    /// Logical seconds without a status report before a session expires.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Advisory capacity per session. Callers check it before admitting a
    /// user into a session; the directory itself never enforces it.
    #[serde(default = "default_max_users")]
    pub max_users: u32,
}

impl SessionConfig {
    /// The watchdog interval in logical milliseconds.
    pub const fn timeout_millis(&self) -> u64 {
        seconds_to_millis(self.timeout_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_users: default_max_users(),
        }
    }
}

/// Usage statistics configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StatsConfig {
    /// Maximum number of finalized days kept in history.
    #[serde(default = "default_history_cap")]
    pub history_cap: usize,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            history_cap: default_history_cap(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default `tracing` filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl LoggingConfig {
    /// Replace `level` with `LOBBY_LOG_LEVEL` when it is set and non-empty.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = std::env::var(LOG_LEVEL_ENV)
            && !level.trim().is_empty()
        {
            self.level = level;
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

const fn default_timeout_secs() -> u64 {
    5
}

const fn default_max_users() -> u32 {
    8
}

const fn default_history_cap() -> usize {
    100
}

fn default_log_level() -> String {
    "info".to_owned()
}
