//! Wishlist manager: session bookmarks gated on conference attendance.
//!
//! # Invariants
//! - A session enters a wishlist only while its parent conference is in the
//!   same profile's attendance list.
//! - A wishlist never holds the same session twice.
//! - Only the profile entity group is written.

use crate::db::transaction::{run_in_transaction, RetryPolicy};
use crate::model::session::{Session, SessionId};
use crate::model::EntityRef;
use crate::repo::profile_repo::{ProfileRepository, SqliteProfileRepository};
use crate::repo::session_repo::{SessionRepository, SqliteSessionRepository};
use crate::service::error::{ConflictReason, CoreError, CoreResult};
use log::info;
use rusqlite::{Connection, TransactionBehavior};

pub struct WishlistManager<'conn> {
    conn: &'conn mut Connection,
    retry: RetryPolicy,
}

impl<'conn> WishlistManager<'conn> {
    pub fn new(conn: &'conn mut Connection, retry: RetryPolicy) -> Self {
        Self { conn, retry }
    }

    /// Adds a session to the user's wishlist.
    ///
    /// # Errors
    /// - `NotFound` when the session does not exist.
    /// - `Conflict(NotRegisteredForParent)` when the user does not attend the
    ///   session's conference.
    /// - `Conflict(AlreadyInWishlist)` on a duplicate.
    pub fn add_to_wishlist(&mut self, session_id: SessionId, user_id: &str) -> CoreResult<bool> {
        run_in_transaction(
            self.conn,
            TransactionBehavior::Immediate,
            &self.retry,
            |tx| -> CoreResult<bool> {
                let session = SqliteSessionRepository::new(tx)
                    .get_session(session_id)?
                    .ok_or(CoreError::NotFound(EntityRef::Session(session_id)))?;
                let profiles = SqliteProfileRepository::new(tx);
                let mut profile = profiles.get_or_create_profile(user_id)?;

                if !profile.is_attending(&session.conference_id) {
                    return Err(CoreError::Conflict(ConflictReason::NotRegisteredForParent));
                }
                if !profile.wishlist_add(session_id) {
                    return Err(CoreError::Conflict(ConflictReason::AlreadyInWishlist));
                }

                profiles.save_profile(&profile)?;
                Ok(true)
            },
        )?;

        info!(
            "event=wishlist_add module=wishlist status=ok session_id={}",
            session_id
        );
        Ok(true)
    }

    /// Removes a session from the user's wishlist. `false` when it was absent.
    ///
    /// # Errors
    /// - `NotFound` when the session does not exist.
    pub fn remove_from_wishlist(
        &mut self,
        session_id: SessionId,
        user_id: &str,
    ) -> CoreResult<bool> {
        let removed = run_in_transaction(
            self.conn,
            TransactionBehavior::Immediate,
            &self.retry,
            |tx| -> CoreResult<bool> {
                if SqliteSessionRepository::new(tx)
                    .get_session(session_id)?
                    .is_none()
                {
                    return Err(CoreError::NotFound(EntityRef::Session(session_id)));
                }
                let profiles = SqliteProfileRepository::new(tx);
                let mut profile = profiles.get_or_create_profile(user_id)?;
                if !profile.wishlist_remove(&session_id) {
                    return Ok(false);
                }
                profiles.save_profile(&profile)?;
                Ok(true)
            },
        )?;

        info!(
            "event=wishlist_remove module=wishlist status={} session_id={}",
            if removed { "ok" } else { "noop" },
            session_id
        );
        Ok(removed)
    }

    /// Wishlisted sessions in wishlist order. Vanished sessions are skipped.
    pub fn session_wishlist(&self, user_id: &str) -> CoreResult<Vec<Session>> {
        let conn: &Connection = &*self.conn;
        let profile = SqliteProfileRepository::new(conn).get_or_create_profile(user_id)?;
        let sessions = SqliteSessionRepository::new(conn).get_sessions(&profile.session_wishlist)?;
        Ok(sessions.into_iter().flatten().collect())
    }
}
