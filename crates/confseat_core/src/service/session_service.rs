//! Session use-case service.
//!
//! # Responsibility
//! - Create sessions under a conference on behalf of its organizer.
//! - Hand featured-speaker recomputation to the deferred queue.
//! - Serve the ancestor-scoped session listings.
//!
//! # Invariants
//! - A session is only created under an existing conference by its organizer.
//! - Every referenced speaker exists at creation time.
//! - Featured-speaker work is never run inline.

use crate::db::transaction::{run_in_transaction, RetryPolicy};
use crate::model::conference::{Conference, ConferenceId};
use crate::model::profile::Profile;
use crate::model::session::{Session, SessionDraft, SessionType};
use crate::model::speaker::SpeakerId;
use crate::model::EntityRef;
use crate::repo::conference_repo::{ConferenceRepository, SqliteConferenceRepository};
use crate::repo::profile_repo::{ProfileRepository, SqliteProfileRepository};
use crate::repo::session_repo::{SessionListQuery, SessionRepository, SqliteSessionRepository};
use crate::repo::speaker_repo::{SpeakerRepository, SqliteSpeakerRepository};
use crate::service::error::{CoreError, CoreResult};
use crate::tasks::{TaskDescriptor, TaskQueue};
use chrono::{NaiveDate, NaiveTime};
use log::info;
use rusqlite::{Connection, TransactionBehavior};

pub struct SessionService<'conn, Q: TaskQueue> {
    conn: &'conn mut Connection,
    retry: RetryPolicy,
    queue: Q,
}

impl<'conn, Q: TaskQueue> SessionService<'conn, Q> {
    pub fn new(conn: &'conn mut Connection, retry: RetryPolicy, queue: Q) -> Self {
        Self { conn, retry, queue }
    }

    /// Creates a session under `conference_id`.
    ///
    /// When speakers are attached, a featured-speaker recompute descriptor is
    /// enqueued after commit.
    ///
    /// # Errors
    /// - `NotFound` for a missing conference or speaker.
    /// - `Forbidden` when `user_id` is not the conference organizer.
    pub fn create_session(
        &mut self,
        user_id: &str,
        conference_id: ConferenceId,
        draft: SessionDraft,
    ) -> CoreResult<Session> {
        let (session, conference, organizer) = run_in_transaction(
            self.conn,
            TransactionBehavior::Immediate,
            &self.retry,
            |tx| -> CoreResult<(Session, Conference, Option<Profile>)> {
                let conference = SqliteConferenceRepository::new(tx)
                    .get_conference(conference_id)?
                    .ok_or(CoreError::NotFound(EntityRef::Conference(conference_id)))?;
                if conference.organizer_user_id != user_id {
                    return Err(CoreError::Forbidden {
                        user_id: user_id.to_string(),
                        conference_id,
                    });
                }

                let speakers = SqliteSpeakerRepository::new(tx);
                for speaker_id in &draft.speaker_ids {
                    if speakers.get_speaker(*speaker_id)?.is_none() {
                        return Err(CoreError::NotFound(EntityRef::Speaker(*speaker_id)));
                    }
                }

                let session = Session::from_draft(&conference, draft.clone())?;
                SqliteSessionRepository::new(tx).create_session(&session)?;
                let organizer = SqliteProfileRepository::new(tx).get_profile(user_id)?;
                Ok((session, conference, organizer))
            },
        )?;

        info!(
            "event=session_create module=session_service status=ok conference_id={} session_id={} speakers={}",
            conference_id,
            session.id,
            session.speaker_ids.len()
        );

        if !session.speaker_ids.is_empty() {
            self.queue.enqueue(TaskDescriptor::RecomputeFeaturedSpeaker {
                conference_id,
                speaker_ids: session.speaker_ids.clone(),
            });
        }
        if let Some(email) = organizer.and_then(|profile| profile.main_email) {
            self.queue.enqueue(TaskDescriptor::SendConfirmationEmail {
                email,
                subject: format!("You created a new session for {}!", conference.name),
                body: format!("Here are the details for your session: {}", session.name),
            });
        }
        Ok(session)
    }

    /// All sessions of one conference.
    pub fn sessions_by_conference(&self, conference_id: ConferenceId) -> CoreResult<Vec<Session>> {
        self.list_in_conference(
            conference_id,
            SessionListQuery {
                conference_id: Some(conference_id),
                ..SessionListQuery::default()
            },
        )
    }

    pub fn sessions_by_type(
        &self,
        conference_id: ConferenceId,
        type_of_session: SessionType,
    ) -> CoreResult<Vec<Session>> {
        self.list_in_conference(
            conference_id,
            SessionListQuery {
                conference_id: Some(conference_id),
                type_of_session: Some(type_of_session),
                ..SessionListQuery::default()
            },
        )
    }

    pub fn sessions_by_date(
        &self,
        conference_id: ConferenceId,
        date: NaiveDate,
    ) -> CoreResult<Vec<Session>> {
        self.list_in_conference(
            conference_id,
            SessionListQuery {
                conference_id: Some(conference_id),
                date: Some(date),
                ..SessionListQuery::default()
            },
        )
    }

    /// Sessions starting no later than `no_later_than`, excluding one type.
    ///
    /// Sessions without a start time never match.
    pub fn sessions_by_time_and_type(
        &self,
        conference_id: ConferenceId,
        no_later_than: NaiveTime,
        excluded_type: SessionType,
    ) -> CoreResult<Vec<Session>> {
        self.list_in_conference(
            conference_id,
            SessionListQuery {
                conference_id: Some(conference_id),
                excluded_type: Some(excluded_type),
                starts_no_later_than: Some(no_later_than),
                ..SessionListQuery::default()
            },
        )
    }

    /// Sessions across all conferences that list `speaker_id`.
    pub fn sessions_by_speaker(&self, speaker_id: SpeakerId) -> CoreResult<Vec<Session>> {
        let conn: &Connection = &*self.conn;
        if SqliteSpeakerRepository::new(conn)
            .get_speaker(speaker_id)?
            .is_none()
        {
            return Err(CoreError::NotFound(EntityRef::Speaker(speaker_id)));
        }
        Ok(SqliteSessionRepository::new(conn).list_sessions(&SessionListQuery {
            speaker_id: Some(speaker_id),
            ..SessionListQuery::default()
        })?)
    }

    fn list_in_conference(
        &self,
        conference_id: ConferenceId,
        query: SessionListQuery,
    ) -> CoreResult<Vec<Session>> {
        let conn: &Connection = &*self.conn;
        if SqliteConferenceRepository::new(conn)
            .get_conference(conference_id)?
            .is_none()
        {
            return Err(CoreError::NotFound(EntityRef::Conference(conference_id)));
        }
        Ok(SqliteSessionRepository::new(conn).list_sessions(&query)?)
    }
}
