//! Transaction runner with bounded contention retry.
//!
//! # Responsibility
//! - Execute one unit of work inside a SQLite transaction.
//! - Retry the whole unit when the store reports write-lock contention.
//!
//! # Invariants
//! - The body is re-run from scratch on every attempt, so it must re-read
//!   every value it decides on.
//! - A failed or aborted attempt never commits partial writes.
//! - After `max_attempts` contended attempts the caller gets
//!   `RetriesExhausted`, never a silent success.

use log::{debug, warn};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::thread;
use std::time::Duration;

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BACKOFF: Duration = Duration::from_millis(25);

/// Bounded retry settings for contended transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Must be >= 1.
    pub max_attempts: u32,
    /// Base delay between attempts; attempt `n` sleeps `n * backoff`.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: DEFAULT_BACKOFF,
        }
    }
}

/// Raised when every allowed attempt hit contention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetriesExhausted {
    pub attempts: u32,
}

impl Display for RetriesExhausted {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "transaction could not commit after {} attempts",
            self.attempts
        )
    }
}

impl Error for RetriesExhausted {}

/// Errors that can tell whether they were caused by store contention.
pub trait Contention {
    fn is_contention(&self) -> bool;
}

/// Runs `body` in a transaction, committing on success.
///
/// `body` errors abort the attempt and roll back. Contended attempts are
/// retried according to `policy`; other errors are returned unchanged.
pub fn run_in_transaction<T, E, F>(
    conn: &mut Connection,
    behavior: TransactionBehavior,
    policy: &RetryPolicy,
    mut body: F,
) -> Result<T, E>
where
    E: Contention + From<rusqlite::Error> + From<RetriesExhausted>,
    F: FnMut(&Transaction<'_>) -> Result<T, E>,
{
    retry_on_contention(policy, || {
        let tx = conn.transaction_with_behavior(behavior)?;
        let value = body(&tx)?;
        tx.commit()?;
        Ok(value)
    })
}

/// Re-runs `attempt` while it fails with contention, up to `policy`.
///
/// Used directly by read-only work that needs no write transaction.
pub fn retry_on_contention<T, E, F>(policy: &RetryPolicy, mut attempt: F) -> Result<T, E>
where
    E: Contention + From<RetriesExhausted>,
    F: FnMut() -> Result<T, E>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut tries = 0;

    loop {
        tries += 1;
        match attempt() {
            Ok(value) => return Ok(value),
            Err(err) if err.is_contention() => {
                if tries >= max_attempts {
                    warn!(
                        "event=tx_retry module=db status=exhausted attempts={}",
                        tries
                    );
                    return Err(E::from(RetriesExhausted { attempts: tries }));
                }
                debug!(
                    "event=tx_retry module=db status=retry attempt={} max_attempts={}",
                    tries, max_attempts
                );
                thread::sleep(policy.backoff * tries);
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        retry_on_contention, run_in_transaction, Contention, RetriesExhausted, RetryPolicy,
    };
    use rusqlite::ffi;
    use rusqlite::{Connection, TransactionBehavior};
    use std::time::Duration;

    #[derive(Debug)]
    enum TestError {
        Sqlite(rusqlite::Error),
        Exhausted(u32),
        Abort,
    }

    impl Contention for TestError {
        fn is_contention(&self) -> bool {
            matches!(self, Self::Sqlite(err) if crate::db::is_contention(err))
        }
    }

    impl From<rusqlite::Error> for TestError {
        fn from(value: rusqlite::Error) -> Self {
            Self::Sqlite(value)
        }
    }

    impl From<RetriesExhausted> for TestError {
        fn from(value: RetriesExhausted) -> Self {
            Self::Exhausted(value.attempts)
        }
    }

    fn busy_error() -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(ffi::Error::new(ffi::SQLITE_BUSY), None)
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            backoff: Duration::from_millis(0),
        }
    }

    fn table_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (v INTEGER NOT NULL);")
            .unwrap();
        conn
    }

    fn row_count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM t;", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn commits_on_success() {
        let mut conn = table_conn();
        let value: i64 = run_in_transaction(
            &mut conn,
            TransactionBehavior::Immediate,
            &fast_policy(3),
            |tx| -> Result<i64, TestError> {
                tx.execute("INSERT INTO t (v) VALUES (7);", [])?;
                Ok(7)
            },
        )
        .unwrap();
        assert_eq!(value, 7);
        assert_eq!(row_count(&conn), 1);
    }

    #[test]
    fn aborted_body_rolls_back() {
        let mut conn = table_conn();
        let err = run_in_transaction(
            &mut conn,
            TransactionBehavior::Immediate,
            &fast_policy(3),
            |tx| -> Result<(), TestError> {
                tx.execute("INSERT INTO t (v) VALUES (1);", [])?;
                Err(TestError::Abort)
            },
        )
        .unwrap_err();
        assert!(matches!(err, TestError::Abort));
        assert_eq!(row_count(&conn), 0);
    }

    #[test]
    fn contention_is_retried_until_success() {
        let mut conn = table_conn();
        let mut calls = 0;
        run_in_transaction(
            &mut conn,
            TransactionBehavior::Immediate,
            &fast_policy(3),
            |tx| -> Result<(), TestError> {
                calls += 1;
                tx.execute("INSERT INTO t (v) VALUES (1);", [])?;
                if calls < 3 {
                    return Err(TestError::Sqlite(busy_error()));
                }
                Ok(())
            },
        )
        .unwrap();
        assert_eq!(calls, 3);
        assert_eq!(row_count(&conn), 1);
    }

    #[test]
    fn contention_beyond_limit_reports_exhaustion() {
        let mut conn = table_conn();
        let mut calls = 0;
        let err = run_in_transaction(
            &mut conn,
            TransactionBehavior::Immediate,
            &fast_policy(2),
            |_tx| -> Result<(), TestError> {
                calls += 1;
                Err(TestError::Sqlite(busy_error()))
            },
        )
        .unwrap_err();
        assert_eq!(calls, 2);
        assert!(matches!(err, TestError::Exhausted(2)));
    }

    #[test]
    fn non_transactional_work_retries_then_reports_exhaustion() {
        let mut calls = 0;
        let value = retry_on_contention(&fast_policy(3), || -> Result<u32, TestError> {
            calls += 1;
            if calls < 2 {
                return Err(TestError::Sqlite(busy_error()));
            }
            Ok(calls)
        })
        .unwrap();
        assert_eq!(value, 2);

        let err = retry_on_contention(&fast_policy(2), || -> Result<(), TestError> {
            Err(TestError::Sqlite(busy_error()))
        })
        .unwrap_err();
        assert!(matches!(err, TestError::Exhausted(2)));

        let err = retry_on_contention(&fast_policy(5), || -> Result<(), TestError> {
            Err(TestError::Abort)
        })
        .unwrap_err();
        assert!(matches!(err, TestError::Abort));
    }
}
