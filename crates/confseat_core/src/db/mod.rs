//! SQLite storage bootstrap, schema migration and transaction entry points.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the conference core.
//! - Apply schema migrations in deterministic order.
//! - Run transactional units of work with bounded contention retry.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Core code must not read/write application data before migrations succeed.
//! - Contention is reported only as `SQLITE_BUSY` / `SQLITE_LOCKED`.

use rusqlite::ErrorCode;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;
pub mod transaction;

pub use open::{open_db, open_db_in_memory, open_db_with_options, DbOptions};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl DbError {
    /// Returns whether the failure came from write-lock contention.
    pub fn is_contention(&self) -> bool {
        match self {
            Self::Sqlite(err) => is_contention(err),
            Self::UnsupportedSchemaVersion { .. } => false,
        }
    }
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Returns whether a raw SQLite error is a busy/locked contention failure.
pub fn is_contention(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(failure, _) => matches!(
            failure.code,
            ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
        ),
        _ => false,
    }
}
