//! Schema upgrades keyed by `PRAGMA user_version`.
//!
//! # Invariants
//! - Steps are numbered `1..=N` with no gaps; step `n` upgrades version
//!   `n - 1` to `n`.
//! - A connection either ends at [`latest_version`] or keeps its old
//!   version; partial upgrades never commit.
//! - A database newer than this build is refused untouched.

use crate::db::{DbError, DbResult};
use log::debug;
use rusqlite::{Connection, TransactionBehavior};

struct SchemaStep {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const SCHEMA_STEPS: &[SchemaStep] = &[
    SchemaStep {
        version: 1,
        name: "profiles_conferences",
        sql: include_str!("0001_init.sql"),
    },
    SchemaStep {
        version: 2,
        name: "sessions_speakers",
        sql: include_str!("0002_sessions_speakers.sql"),
    },
    SchemaStep {
        version: 3,
        name: "profile_lists",
        sql: include_str!("0003_profile_lists.sql"),
    },
];

/// Version range covered by one [`apply_migrations`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaUpgrade {
    pub from: u32,
    pub to: u32,
}

impl SchemaUpgrade {
    pub fn is_noop(&self) -> bool {
        self.from == self.to
    }
}

pub fn latest_version() -> u32 {
    SCHEMA_STEPS.len() as u32
}

/// Brings the schema up to [`latest_version`] inside one immediate
/// transaction, so concurrent openers of a fresh file serialize.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<SchemaUpgrade> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let from: u32 = tx.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    let latest = latest_version();

    if from > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from,
            latest_supported: latest,
        });
    }

    for step in SCHEMA_STEPS.iter().skip(from as usize) {
        tx.execute_batch(step.sql)?;
        tx.pragma_update(None, "user_version", step.version)?;
        debug!(
            "event=db_migrate_step module=db status=ok version={} name={}",
            step.version, step.name
        );
    }
    tx.commit()?;

    Ok(SchemaUpgrade { from, to: latest })
}
