//! Session domain model.
//!
//! # Invariants
//! - A session belongs to exactly one conference for its whole lifetime.
//! - `speaker_ids` is duplicate-free and keeps insertion order.
//! - `month` mirrors `date`, falling back to the parent conference month.

use crate::model::conference::{month_of, Conference, ConferenceId};
use crate::model::speaker::SpeakerId;
use crate::model::{normalize_name, ValidationError};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable session identifier.
pub type SessionId = Uuid;

/// Format of a conference session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    #[default]
    NotSpecified,
    Workshop,
    Lecture,
    Keynote,
    Demonstration,
    Panel,
}

impl SessionType {
    pub fn as_db(self) -> &'static str {
        match self {
            Self::NotSpecified => "not_specified",
            Self::Workshop => "workshop",
            Self::Lecture => "lecture",
            Self::Keynote => "keynote",
            Self::Demonstration => "demonstration",
            Self::Panel => "panel",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "not_specified" => Some(Self::NotSpecified),
            "workshop" => Some(Self::Workshop),
            "lecture" => Some(Self::Lecture),
            "keynote" => Some(Self::Keynote),
            "demonstration" => Some(Self::Demonstration),
            "panel" => Some(Self::Panel),
            _ => None,
        }
    }
}

/// Canonical session record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    /// Structural parent.
    pub conference_id: ConferenceId,
    pub name: String,
    pub highlights: Option<String>,
    pub speaker_ids: Vec<SpeakerId>,
    pub duration_minutes: i64,
    pub type_of_session: SessionType,
    pub date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub month: i64,
}

/// Creation input for a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionDraft {
    pub name: String,
    pub highlights: Option<String>,
    pub speaker_ids: Vec<SpeakerId>,
    pub duration_minutes: Option<i64>,
    pub type_of_session: Option<SessionType>,
    pub date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
}

impl Session {
    /// Builds a session under `conference`, applying defaults.
    pub fn from_draft(conference: &Conference, draft: SessionDraft) -> Result<Self, ValidationError> {
        let name = normalize_name(&draft.name, "session")?;
        let duration_minutes = draft.duration_minutes.unwrap_or(0);
        if duration_minutes < 0 {
            return Err(ValidationError::Negative("duration_minutes"));
        }

        let mut speaker_ids: Vec<SpeakerId> = Vec::with_capacity(draft.speaker_ids.len());
        for speaker_id in draft.speaker_ids {
            if !speaker_ids.contains(&speaker_id) {
                speaker_ids.push(speaker_id);
            }
        }

        let month = match draft.date {
            Some(_) => month_of(draft.date),
            None => conference.month,
        };

        Ok(Self {
            id: Uuid::new_v4(),
            conference_id: conference.id,
            name,
            highlights: draft.highlights,
            speaker_ids,
            duration_minutes,
            type_of_session: draft.type_of_session.unwrap_or_default(),
            date: draft.date,
            start_time: draft.start_time,
            month,
        })
    }
}
