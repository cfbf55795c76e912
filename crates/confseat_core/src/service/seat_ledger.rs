//! Seat ledger: registration and unregistration against conference capacity.
//!
//! # Responsibility
//! - Move one seat between a conference and one profile's attendance list.
//! - Keep the seat count and the attendance list in a single commit.
//!
//! # Invariants
//! - `seats_available` changes only here, together with exactly one
//!   attendance list change.
//! - A profile never lists the same conference twice.
//! - `seats_available` never drops below zero or exceeds capacity.
//! - Both entity groups are re-read on every retry attempt.

use crate::db::transaction::{run_in_transaction, RetryPolicy};
use crate::model::conference::ConferenceId;
use crate::model::EntityRef;
use crate::repo::conference_repo::{ConferenceRepository, SqliteConferenceRepository};
use crate::repo::profile_repo::{ProfileRepository, SqliteProfileRepository};
use crate::service::error::{ConflictReason, CoreError, CoreResult};
use crate::tasks::{TaskDescriptor, TaskQueue};
use log::{info, warn};
use rusqlite::{Connection, TransactionBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SeatChange {
    Register,
    Unregister,
}

impl SeatChange {
    fn event(self) -> &'static str {
        match self {
            Self::Register => "seat_register",
            Self::Unregister => "seat_unregister",
        }
    }
}

/// Registration service bound to one worker connection.
pub struct SeatLedger<'conn, Q: TaskQueue> {
    conn: &'conn mut Connection,
    retry: RetryPolicy,
    queue: Q,
}

impl<'conn, Q: TaskQueue> SeatLedger<'conn, Q> {
    pub fn new(conn: &'conn mut Connection, retry: RetryPolicy, queue: Q) -> Self {
        Self { conn, retry, queue }
    }

    /// Takes one seat for `user_id`, creating the profile on first use.
    ///
    /// # Errors
    /// - `NotFound` when the conference does not exist.
    /// - `Conflict(AlreadyRegistered)` when the user already attends.
    /// - `Conflict(NoSeatsAvailable)` when the conference is full.
    /// - `TransientStore` when contention outlasts the retry budget.
    pub fn register(&mut self, conference_id: ConferenceId, user_id: &str) -> CoreResult<bool> {
        self.apply(conference_id, user_id, SeatChange::Register)
    }

    /// Gives the seat back. Returns `false` when the user was not registered.
    ///
    /// # Errors
    /// - `NotFound` when the conference does not exist.
    /// - `TransientStore` when contention outlasts the retry budget.
    pub fn unregister(&mut self, conference_id: ConferenceId, user_id: &str) -> CoreResult<bool> {
        self.apply(conference_id, user_id, SeatChange::Unregister)
    }

    fn apply(
        &mut self,
        conference_id: ConferenceId,
        user_id: &str,
        change: SeatChange,
    ) -> CoreResult<bool> {
        let result = run_in_transaction(
            self.conn,
            TransactionBehavior::Immediate,
            &self.retry,
            |tx| -> CoreResult<Option<i64>> {
                let profiles = SqliteProfileRepository::new(tx);
                let conferences = SqliteConferenceRepository::new(tx);

                let mut profile = profiles.get_or_create_profile(user_id)?;
                let mut conference = conferences
                    .get_conference(conference_id)?
                    .ok_or(CoreError::NotFound(EntityRef::Conference(conference_id)))?;

                match change {
                    SeatChange::Register => {
                        if profile.is_attending(&conference_id) {
                            return Err(CoreError::Conflict(ConflictReason::AlreadyRegistered));
                        }
                        if !conference.take_seat() {
                            return Err(CoreError::Conflict(ConflictReason::NoSeatsAvailable));
                        }
                        profile.attend(conference_id);
                    }
                    SeatChange::Unregister => {
                        if !profile.leave(&conference_id) {
                            return Ok(None);
                        }
                        conference.release_seat();
                    }
                }

                profiles.save_profile(&profile)?;
                conferences.update_conference(&conference)?;
                Ok(Some(conference.seats_available))
            },
        );

        match result {
            Ok(Some(seats_available)) => {
                info!(
                    "event={} module=seat_ledger status=ok conference_id={} seats_available={}",
                    change.event(),
                    conference_id,
                    seats_available
                );
                self.queue.enqueue(TaskDescriptor::RecomputeAnnouncement);
                Ok(true)
            }
            Ok(None) => {
                info!(
                    "event={} module=seat_ledger status=noop conference_id={}",
                    change.event(),
                    conference_id
                );
                Ok(false)
            }
            Err(err) => {
                warn!(
                    "event={} module=seat_ledger status=error conference_id={} error={}",
                    change.event(),
                    conference_id,
                    err
                );
                Err(err)
            }
        }
    }
}
