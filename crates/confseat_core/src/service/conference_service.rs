//! Conference use-case service.
//!
//! # Responsibility
//! - Create and update conferences on behalf of their organizer.
//! - Run filter queries through the compiler and attach organizer names.
//! - List conferences a user created or attends.
//!
//! # Invariants
//! - Only the organizer may update a conference.
//! - Updates never touch `max_attendees` or `seats_available`.

use crate::db::transaction::{run_in_transaction, RetryPolicy};
use crate::model::conference::{Conference, ConferenceDraft, ConferenceId, ConferenceUpdate};
use crate::model::profile::{Profile, UserId};
use crate::model::EntityRef;
use crate::query::filter::{compile_filters, FilterSpec};
use crate::repo::conference_repo::{ConferenceRepository, SqliteConferenceRepository};
use crate::repo::profile_repo::{ProfileRepository, SqliteProfileRepository};
use crate::service::error::{CoreError, CoreResult};
use crate::tasks::{TaskDescriptor, TaskQueue};
use log::info;
use rusqlite::{Connection, TransactionBehavior};
use std::collections::HashMap;

/// Conference paired with its organizer's display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConferenceView {
    pub conference: Conference,
    pub organizer_display_name: String,
}

pub struct ConferenceService<'conn, Q: TaskQueue> {
    conn: &'conn mut Connection,
    retry: RetryPolicy,
    queue: Q,
}

impl<'conn, Q: TaskQueue> ConferenceService<'conn, Q> {
    pub fn new(conn: &'conn mut Connection, retry: RetryPolicy, queue: Q) -> Self {
        Self { conn, retry, queue }
    }

    /// Creates a conference owned by `user_id` with every seat open.
    pub fn create_conference(
        &mut self,
        user_id: &str,
        draft: ConferenceDraft,
    ) -> CoreResult<Conference> {
        let conference = Conference::from_draft(user_id, draft)?;

        let organizer = run_in_transaction(
            self.conn,
            TransactionBehavior::Immediate,
            &self.retry,
            |tx| -> CoreResult<Profile> {
                let organizer = SqliteProfileRepository::new(tx).get_or_create_profile(user_id)?;
                SqliteConferenceRepository::new(tx).create_conference(&conference)?;
                Ok(organizer)
            },
        )?;

        info!(
            "event=conference_create module=conference_service status=ok conference_id={} max_attendees={}",
            conference.id, conference.max_attendees
        );

        self.queue.enqueue(TaskDescriptor::RecomputeAnnouncement);
        if let Some(email) = organizer.main_email {
            self.queue.enqueue(TaskDescriptor::SendConfirmationEmail {
                email,
                subject: "You created a new Conference!".to_string(),
                body: format!("Hi, you have created the following conference: {}", conference.name),
            });
        }
        Ok(conference)
    }

    /// Applies a partial update. Capacity and seat counts stay untouched.
    ///
    /// # Errors
    /// - `NotFound` when the conference does not exist.
    /// - `Forbidden` when `user_id` is not the organizer.
    pub fn update_conference(
        &mut self,
        user_id: &str,
        conference_id: ConferenceId,
        update: ConferenceUpdate,
    ) -> CoreResult<Conference> {
        let updated = run_in_transaction(
            self.conn,
            TransactionBehavior::Immediate,
            &self.retry,
            |tx| -> CoreResult<Conference> {
                let conferences = SqliteConferenceRepository::new(tx);
                let mut conference = conferences
                    .get_conference(conference_id)?
                    .ok_or(CoreError::NotFound(EntityRef::Conference(conference_id)))?;
                if conference.organizer_user_id != user_id {
                    return Err(CoreError::Forbidden {
                        user_id: user_id.to_string(),
                        conference_id,
                    });
                }
                conference.apply_update(update.clone())?;
                conferences.update_conference(&conference)?;
                Ok(conference)
            },
        )?;

        info!(
            "event=conference_update module=conference_service status=ok conference_id={}",
            conference_id
        );
        self.queue.enqueue(TaskDescriptor::RecomputeAnnouncement);
        Ok(updated)
    }

    pub fn get_conference(&self, conference_id: ConferenceId) -> CoreResult<ConferenceView> {
        let conference = SqliteConferenceRepository::new(self.conn())
            .get_conference(conference_id)?
            .ok_or(CoreError::NotFound(EntityRef::Conference(conference_id)))?;
        self.with_organizer_names(vec![conference])?
            .into_iter()
            .next()
            .ok_or(CoreError::NotFound(EntityRef::Conference(conference_id)))
    }

    /// Runs a filtered query.
    ///
    /// # Errors
    /// - `InvalidFilter` for unknown fields, operators or malformed numbers.
    /// - `AmbiguousInequality` for inequality operators on two fields.
    pub fn query_conferences(&self, filters: &[FilterSpec]) -> CoreResult<Vec<ConferenceView>> {
        let plan = compile_filters(filters)?;
        let conferences = SqliteConferenceRepository::new(self.conn()).query_conferences(&plan)?;
        info!(
            "event=conference_query module=conference_service status=ok filters={} results={}",
            filters.len(),
            conferences.len()
        );
        self.with_organizer_names(conferences)
    }

    /// Conferences organized by `user_id`, by name.
    pub fn conferences_created(&self, user_id: &str) -> CoreResult<Vec<ConferenceView>> {
        let conferences = SqliteConferenceRepository::new(self.conn()).list_by_organizer(user_id)?;
        self.with_organizer_names(conferences)
    }

    /// Conferences in the user's attendance list, in registration order.
    pub fn conferences_to_attend(&self, user_id: &str) -> CoreResult<Vec<ConferenceView>> {
        let profile = SqliteProfileRepository::new(self.conn()).get_or_create_profile(user_id)?;
        let conferences = SqliteConferenceRepository::new(self.conn())
            .get_conferences(&profile.conference_keys_to_attend)?
            .into_iter()
            .flatten()
            .collect();
        self.with_organizer_names(conferences)
    }

    fn conn(&self) -> &Connection {
        &*self.conn
    }

    fn with_organizer_names(&self, conferences: Vec<Conference>) -> CoreResult<Vec<ConferenceView>> {
        let mut organizer_ids: Vec<UserId> = Vec::new();
        for conference in &conferences {
            if !organizer_ids.contains(&conference.organizer_user_id) {
                organizer_ids.push(conference.organizer_user_id.clone());
            }
        }

        let names: HashMap<UserId, String> = SqliteProfileRepository::new(self.conn())
            .get_profiles(&organizer_ids)?
            .into_iter()
            .flatten()
            .map(|profile| (profile.user_id, profile.display_name))
            .collect();

        Ok(conferences
            .into_iter()
            .map(|conference| {
                let organizer_display_name = names
                    .get(&conference.organizer_user_id)
                    .cloned()
                    .unwrap_or_else(|| conference.organizer_user_id.clone());
                ConferenceView {
                    conference,
                    organizer_display_name,
                }
            })
            .collect())
    }
}
