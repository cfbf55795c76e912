//! Profile use-case service.
//!
//! Profiles are created lazily on first read; saving edits only the
//! user-editable fields and keeps both membership lists as stored.

use crate::db::transaction::{run_in_transaction, RetryPolicy};
use crate::model::normalize_name;
use crate::model::profile::{Profile, TeeShirtSize};
use crate::repo::profile_repo::{ProfileRepository, SqliteProfileRepository};
use crate::service::error::CoreResult;
use log::info;
use rusqlite::{Connection, TransactionBehavior};

/// Editable profile fields. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub tee_shirt_size: Option<TeeShirtSize>,
    pub main_email: Option<String>,
}

pub struct ProfileService<'conn> {
    conn: &'conn mut Connection,
    retry: RetryPolicy,
}

impl<'conn> ProfileService<'conn> {
    pub fn new(conn: &'conn mut Connection, retry: RetryPolicy) -> Self {
        Self { conn, retry }
    }

    pub fn get_profile(&self, user_id: &str) -> CoreResult<Profile> {
        Ok(SqliteProfileRepository::new(&*self.conn).get_or_create_profile(user_id)?)
    }

    pub fn save_profile(&mut self, user_id: &str, update: ProfileUpdate) -> CoreResult<Profile> {
        let profile = run_in_transaction(
            self.conn,
            TransactionBehavior::Immediate,
            &self.retry,
            |tx| -> CoreResult<Profile> {
                let profiles = SqliteProfileRepository::new(tx);
                let mut profile = profiles.get_or_create_profile(user_id)?;
                if let Some(display_name) = &update.display_name {
                    profile.display_name = normalize_name(display_name, "profile")?;
                }
                if let Some(size) = update.tee_shirt_size {
                    profile.tee_shirt_size = size;
                }
                if let Some(email) = &update.main_email {
                    let trimmed = email.trim();
                    profile.main_email = (!trimmed.is_empty()).then(|| trimmed.to_string());
                }
                profiles.save_profile(&profile)?;
                Ok(profile)
            },
        )?;

        info!("event=profile_save module=profile_service status=ok");
        Ok(profile)
    }
}
