//! File logging for confseat hosts.
//!
//! Every core log line is a `key=value` record that starts with
//! `event=<name> module=<component> status=<outcome>` and carries ids and
//! counts only. Components and their events:
//!
//! | module | events |
//! |---|---|
//! | `db` | `db_open`, `db_migrate`, `db_migrate_step`, `tx_retry` |
//! | `seat_ledger` | `seat_register`, `seat_unregister` |
//! | `wishlist` | `wishlist_add`, `wishlist_remove` |
//! | `derived_cache` | `announcement_recompute`, `featured_recompute` |
//! | `tasks` | `task_enqueue`, `task_requeue`, `task_run` |
//! | `*_service` | `conference_create`, `conference_update`, `conference_query`, `session_create`, `speaker_create`, `profile_save` |
//! | `logging` / `config` | `logging_start`, `config_loaded` |
//!
//! The level is a flexi_logger spec, so one component can be turned up on
//! its own, e.g. `info, confseat_core::tasks=debug`.

use crate::config::CoreConfig;
use flexi_logger::{
    Cleanup, Criterion, FileSpec, LogSpecification, Logger, LoggerHandle, Naming, WriteMode,
};
use log::info;
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

const LOG_FILE_BASENAME: &str = "confseat";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const MAX_LOG_FILES: usize = 5;

static ACTIVE_LOGGER: OnceCell<ActiveLogger> = OnceCell::new();

struct ActiveLogger {
    settings: LogSettings,
    _handle: LoggerHandle,
}

/// Where and how verbosely the process logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// flexi_logger level spec, e.g. `info` or `warn, confseat_core::db=debug`.
    pub spec: String,
    /// Absolute directory for rotated `confseat*.log` files.
    pub dir: PathBuf,
}

impl LogSettings {
    /// `None` when the config leaves file logging off.
    pub fn from_config(config: &CoreConfig) -> Option<Self> {
        config.log_dir.as_ref().map(|dir| Self {
            spec: config.log_level.trim().to_string(),
            dir: dir.clone(),
        })
    }
}

#[derive(Debug)]
pub enum LoggingError {
    InvalidSpec { spec: String, reason: String },
    RelativeDir(PathBuf),
    CreateDir { dir: PathBuf, source: std::io::Error },
    Backend(String),
    /// The process already logs with different settings.
    AlreadyActive { active: LogSettings },
}

impl Display for LoggingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidSpec { spec, reason } => {
                write!(f, "invalid log level spec `{spec}`: {reason}")
            }
            Self::RelativeDir(dir) => {
                write!(f, "log directory must be absolute, got `{}`", dir.display())
            }
            Self::CreateDir { dir, source } => write!(
                f,
                "failed to create log directory `{}`: {source}",
                dir.display()
            ),
            Self::Backend(message) => write!(f, "failed to start logger: {message}"),
            Self::AlreadyActive { active } => write!(
                f,
                "logging already active with spec `{}` at `{}`",
                active.spec,
                active.dir.display()
            ),
        }
    }
}

impl Error for LoggingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CreateDir { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Starts rotating file logging once per process.
///
/// Repeating the call with equal settings is a no-op; different settings
/// after a successful start fail with `AlreadyActive`.
pub fn init_logging(settings: &LogSettings) -> Result<(), LoggingError> {
    let spec = parse_spec(&settings.spec)?;
    if !settings.dir.is_absolute() {
        return Err(LoggingError::RelativeDir(settings.dir.clone()));
    }

    let active = ACTIVE_LOGGER.get_or_try_init(|| start_logger(settings, spec))?;
    if active.settings != *settings {
        return Err(LoggingError::AlreadyActive {
            active: active.settings.clone(),
        });
    }
    Ok(())
}

/// Starts file logging when `config.log_dir` is set.
///
/// Returns `Ok(false)` without touching the logger when no directory is
/// configured, so hosts that install their own `log` backend keep it.
pub fn init_logging_from_config(config: &CoreConfig) -> Result<bool, LoggingError> {
    let Some(settings) = LogSettings::from_config(config) else {
        return Ok(false);
    };
    init_logging(&settings)?;
    info!(
        "event=config_loaded module=config status=ok db_path={} tx_max_attempts={} tx_backoff_ms={} busy_timeout_ms={}",
        config.db_path.display(),
        config.tx_max_attempts,
        config.tx_backoff_ms,
        config.busy_timeout_ms
    );
    Ok(true)
}

fn parse_spec(spec: &str) -> Result<LogSpecification, LoggingError> {
    LogSpecification::parse(spec).map_err(|err| LoggingError::InvalidSpec {
        spec: spec.to_string(),
        reason: err.to_string(),
    })
}

fn start_logger(
    settings: &LogSettings,
    spec: LogSpecification,
) -> Result<ActiveLogger, LoggingError> {
    std::fs::create_dir_all(&settings.dir).map_err(|source| LoggingError::CreateDir {
        dir: settings.dir.clone(),
        source,
    })?;

    let handle = Logger::with(spec)
        .log_to_file(
            FileSpec::default()
                .directory(settings.dir.as_path())
                .basename(LOG_FILE_BASENAME),
        )
        .rotate(
            Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(MAX_LOG_FILES),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(|err| LoggingError::Backend(err.to_string()))?;

    info!(
        "event=logging_start module=logging status=ok version={} spec=\"{}\" log_dir={}",
        env!("CARGO_PKG_VERSION"),
        settings.spec,
        settings.dir.display()
    );
    Ok(ActiveLogger {
        settings: settings.clone(),
        _handle: handle,
    })
}
