//! Profile repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist profiles together with their ordered attendance and wishlist lists.
//! - Provide lazy creation for first-time users.
//!
//! # Invariants
//! - `save_profile` writes the profile row and both lists as one entity group;
//!   callers run it inside a transaction.
//! - List order is preserved through an explicit `position` column.
//! - Lazy creation never overwrites rows written by a concurrent worker.

use crate::model::conference::ConferenceId;
use crate::model::profile::{Profile, TeeShirtSize, UserId};
use crate::model::session::SessionId;
use crate::repo::conference_repo::{RepoError, RepoResult};
use crate::repo::parse_uuid;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

/// Repository interface for profile persistence.
pub trait ProfileRepository {
    fn get_profile(&self, user_id: &str) -> RepoResult<Option<Profile>>;
    /// Multi-get aligned with `user_ids`; absent entries are `None`.
    fn get_profiles(&self, user_ids: &[UserId]) -> RepoResult<Vec<Option<Profile>>>;
    /// Loads the profile, inserting a default one first when absent.
    fn get_or_create_profile(&self, user_id: &str) -> RepoResult<Profile>;
    /// Upserts the profile row and replaces both membership lists.
    fn save_profile(&self, profile: &Profile) -> RepoResult<()>;
}

/// SQLite-backed profile repository.
pub struct SqliteProfileRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProfileRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ProfileRepository for SqliteProfileRepository<'_> {
    fn get_profile(&self, user_id: &str) -> RepoResult<Option<Profile>> {
        let row = self
            .conn
            .query_row(
                "SELECT user_id, display_name, main_email, tee_shirt_size
                 FROM profiles
                 WHERE user_id = ?1;",
                [user_id],
                |row| {
                    Ok((
                        row.get::<_, String>("user_id")?,
                        row.get::<_, String>("display_name")?,
                        row.get::<_, Option<String>>("main_email")?,
                        row.get::<_, String>("tee_shirt_size")?,
                    ))
                },
            )
            .optional()?;

        let Some((user_id, display_name, main_email, size_text)) = row else {
            return Ok(None);
        };

        let tee_shirt_size = TeeShirtSize::parse(&size_text).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid tee shirt size `{size_text}` in profiles.tee_shirt_size"
            ))
        })?;
        let conference_keys_to_attend = load_id_list(
            self.conn,
            "SELECT conference_id AS item_id
             FROM profile_attendance
             WHERE user_id = ?1
             ORDER BY position ASC;",
            &user_id,
            "profile_attendance.conference_id",
        )?;
        let session_wishlist = load_id_list(
            self.conn,
            "SELECT session_id AS item_id
             FROM profile_wishlist
             WHERE user_id = ?1
             ORDER BY position ASC;",
            &user_id,
            "profile_wishlist.session_id",
        )?;

        Ok(Some(Profile {
            user_id,
            display_name,
            main_email,
            tee_shirt_size,
            conference_keys_to_attend,
            session_wishlist,
        }))
    }

    fn get_profiles(&self, user_ids: &[UserId]) -> RepoResult<Vec<Option<Profile>>> {
        user_ids
            .iter()
            .map(|user_id| self.get_profile(user_id))
            .collect()
    }

    fn get_or_create_profile(&self, user_id: &str) -> RepoResult<Profile> {
        if let Some(profile) = self.get_profile(user_id)? {
            return Ok(profile);
        }

        let fresh = Profile::new(user_id);
        self.conn.execute(
            "INSERT OR IGNORE INTO profiles (user_id, display_name, main_email, tee_shirt_size)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                fresh.user_id.as_str(),
                fresh.display_name.as_str(),
                fresh.main_email.as_deref(),
                fresh.tee_shirt_size.as_db(),
            ],
        )?;

        self.get_profile(user_id)?.ok_or_else(|| {
            RepoError::InvalidData(format!("profile `{user_id}` missing after insert"))
        })
    }

    fn save_profile(&self, profile: &Profile) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO profiles (user_id, display_name, main_email, tee_shirt_size)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (user_id) DO UPDATE SET
                display_name = excluded.display_name,
                main_email = excluded.main_email,
                tee_shirt_size = excluded.tee_shirt_size;",
            params![
                profile.user_id.as_str(),
                profile.display_name.as_str(),
                profile.main_email.as_deref(),
                profile.tee_shirt_size.as_db(),
            ],
        )?;

        replace_attendance(self.conn, &profile.user_id, &profile.conference_keys_to_attend)?;
        replace_wishlist(self.conn, &profile.user_id, &profile.session_wishlist)?;
        Ok(())
    }
}

fn replace_attendance(
    conn: &Connection,
    user_id: &str,
    conference_ids: &[ConferenceId],
) -> RepoResult<()> {
    conn.execute(
        "DELETE FROM profile_attendance WHERE user_id = ?1;",
        [user_id],
    )?;
    for (position, conference_id) in conference_ids.iter().enumerate() {
        conn.execute(
            "INSERT INTO profile_attendance (user_id, conference_id, position)
             VALUES (?1, ?2, ?3);",
            params![user_id, conference_id.to_string(), position as i64],
        )?;
    }
    Ok(())
}

fn replace_wishlist(conn: &Connection, user_id: &str, session_ids: &[SessionId]) -> RepoResult<()> {
    conn.execute("DELETE FROM profile_wishlist WHERE user_id = ?1;", [user_id])?;
    for (position, session_id) in session_ids.iter().enumerate() {
        conn.execute(
            "INSERT INTO profile_wishlist (user_id, session_id, position)
             VALUES (?1, ?2, ?3);",
            params![user_id, session_id.to_string(), position as i64],
        )?;
    }
    Ok(())
}

fn load_id_list(conn: &Connection, sql: &str, user_id: &str, column: &str) -> RepoResult<Vec<Uuid>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([user_id])?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        let text: String = row.get("item_id")?;
        ids.push(parse_uuid(&text, column)?);
    }
    Ok(ids)
}
