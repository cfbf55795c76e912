//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections.
//! - Configure connection pragmas required by core behavior.
//! - Trigger schema migrations before returning a usable connection.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON`.
//! - Returned connections have migrations fully applied.

use super::migrations::apply_migrations;
use super::DbResult;
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection tuning applied during bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbOptions {
    /// How long SQLite waits on a held write lock before reporting busy.
    pub busy_timeout: Duration,
}

impl Default for DbOptions {
    fn default() -> Self {
        Self {
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }
}

/// Opens a SQLite database file and applies all pending migrations.
///
/// # Side effects
/// - Performs connection bootstrap and migration checks.
/// - Emits `db_open` logging events with duration and status.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    open_db_with_options(path, &DbOptions::default())
}

/// Opens a SQLite database file with explicit connection options.
pub fn open_db_with_options(path: impl AsRef<Path>, options: &DbOptions) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode=file");

    let conn = Connection::open(path).map_err(|err| {
        error!(
            "event=db_open module=db status=error mode=file duration_ms={} error_code=db_open_failed error={}",
            started_at.elapsed().as_millis(),
            err
        );
        err
    })?;

    finish_open(conn, options, "file", started_at)
}

/// Opens an in-memory SQLite database and applies all pending migrations.
pub fn open_db_in_memory() -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode=memory");

    let conn = Connection::open_in_memory().map_err(|err| {
        error!(
            "event=db_open module=db status=error mode=memory duration_ms={} error_code=db_open_failed error={}",
            started_at.elapsed().as_millis(),
            err
        );
        err
    })?;

    finish_open(conn, &DbOptions::default(), "memory", started_at)
}

fn finish_open(
    mut conn: Connection,
    options: &DbOptions,
    mode: &str,
    started_at: Instant,
) -> DbResult<Connection> {
    match bootstrap_connection(&mut conn, options) {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode={} duration_ms={}",
                mode,
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_bootstrap_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn bootstrap_connection(conn: &mut Connection, options: &DbOptions) -> DbResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(options.busy_timeout)?;
    let upgrade = apply_migrations(conn)?;
    if !upgrade.is_noop() {
        info!(
            "event=db_migrate module=db status=ok from_version={} to_version={}",
            upgrade.from, upgrade.to
        );
    }
    Ok(())
}
