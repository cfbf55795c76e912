//! Speaker use-case service.

use crate::model::conference::ConferenceId;
use crate::model::speaker::{Speaker, SpeakerId};
use crate::model::EntityRef;
use crate::repo::conference_repo::{ConferenceRepository, SqliteConferenceRepository};
use crate::repo::profile_repo::{ProfileRepository, SqliteProfileRepository};
use crate::repo::speaker_repo::{SpeakerRepository, SqliteSpeakerRepository};
use crate::service::error::{CoreError, CoreResult};
use crate::tasks::{TaskDescriptor, TaskQueue};
use log::info;
use rusqlite::Connection;

/// Speaker input. `name` is required; the rest is free text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpeakerDraft {
    pub name: String,
    pub bio: Option<String>,
    pub affiliation: Option<String>,
}

pub struct SpeakerService<'conn, Q: TaskQueue> {
    conn: &'conn Connection,
    queue: Q,
}

impl<'conn, Q: TaskQueue> SpeakerService<'conn, Q> {
    pub fn new(conn: &'conn Connection, queue: Q) -> Self {
        Self { conn, queue }
    }

    /// Creates a speaker. The creating user gets a confirmation when they
    /// have an email on file.
    pub fn create_speaker(&self, user_id: &str, draft: SpeakerDraft) -> CoreResult<Speaker> {
        let speaker = Speaker::new(&draft.name, draft.bio, draft.affiliation)?;
        SqliteSpeakerRepository::new(self.conn).create_speaker(&speaker)?;
        info!(
            "event=speaker_create module=speaker_service status=ok speaker_id={}",
            speaker.id
        );

        let creator = SqliteProfileRepository::new(self.conn).get_profile(user_id)?;
        if let Some(email) = creator.and_then(|profile| profile.main_email) {
            self.queue.enqueue(TaskDescriptor::SendConfirmationEmail {
                email,
                subject: "You created a new speaker!".to_string(),
                body: format!("Hi, you have created the following speaker: {}", speaker.name),
            });
        }
        Ok(speaker)
    }

    pub fn get_speaker(&self, speaker_id: SpeakerId) -> CoreResult<Speaker> {
        SqliteSpeakerRepository::new(self.conn)
            .get_speaker(speaker_id)?
            .ok_or(CoreError::NotFound(EntityRef::Speaker(speaker_id)))
    }

    /// Distinct speakers across the conference's sessions, by name.
    pub fn speakers_by_conference(&self, conference_id: ConferenceId) -> CoreResult<Vec<Speaker>> {
        if SqliteConferenceRepository::new(self.conn)
            .get_conference(conference_id)?
            .is_none()
        {
            return Err(CoreError::NotFound(EntityRef::Conference(conference_id)));
        }
        Ok(SqliteSpeakerRepository::new(self.conn).list_by_conference(conference_id)?)
    }
}
