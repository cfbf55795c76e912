//! Runtime configuration for embedding hosts.
//!
//! # Invariants
//! - Defaults are usable without any environment.
//! - `max_attempts` is at least one.

use crate::db::transaction::RetryPolicy;
use crate::db::DbOptions;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_DB_PATH: &str = "CONFSEAT_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "CONFSEAT_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "CONFSEAT_LOG_DIR";
pub const ENV_TX_MAX_ATTEMPTS: &str = "CONFSEAT_TX_MAX_ATTEMPTS";
pub const ENV_TX_BACKOFF_MS: &str = "CONFSEAT_TX_BACKOFF_MS";
pub const ENV_BUSY_TIMEOUT_MS: &str = "CONFSEAT_BUSY_TIMEOUT_MS";

const DEFAULT_DB_PATH: &str = "confseat.sqlite3";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    /// File logging stays off when unset.
    pub log_dir: Option<PathBuf>,
    pub tx_max_attempts: u32,
    pub tx_backoff_ms: u64,
    pub busy_timeout_ms: u64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        let options = DbOptions::default();
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            log_level: default_log_spec().to_string(),
            log_dir: None,
            tx_max_attempts: retry.max_attempts,
            tx_backoff_ms: duration_millis(retry.backoff),
            busy_timeout_ms: duration_millis(options.busy_timeout),
        }
    }
}

impl CoreConfig {
    /// Reads overrides from the process environment on top of defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`CoreConfig::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = non_blank(lookup(ENV_DB_PATH)) {
            config.db_path = PathBuf::from(value);
        }
        if let Some(value) = non_blank(lookup(ENV_LOG_LEVEL)) {
            config.log_level = value;
        }
        if let Some(value) = non_blank(lookup(ENV_LOG_DIR)) {
            config.log_dir = Some(PathBuf::from(value));
        }
        if let Some(value) = non_blank(lookup(ENV_TX_MAX_ATTEMPTS)) {
            config.tx_max_attempts = parse_number(ENV_TX_MAX_ATTEMPTS, &value)?;
        }
        if let Some(value) = non_blank(lookup(ENV_TX_BACKOFF_MS)) {
            config.tx_backoff_ms = parse_number(ENV_TX_BACKOFF_MS, &value)?;
        }
        if let Some(value) = non_blank(lookup(ENV_BUSY_TIMEOUT_MS)) {
            config.busy_timeout_ms = parse_number(ENV_BUSY_TIMEOUT_MS, &value)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tx_max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: ENV_TX_MAX_ATTEMPTS,
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.tx_max_attempts,
            backoff: Duration::from_millis(self.tx_backoff_ms),
        }
    }

    pub fn db_options(&self) -> DbOptions {
        DbOptions {
            busy_timeout: Duration::from_millis(self.busy_timeout_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue { key: &'static str, value: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { key, value } => {
                write!(f, "invalid value `{value}` for `{key}`")
            }
        }
    }
}

impl Error for ConfigError {}

fn default_log_spec() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
