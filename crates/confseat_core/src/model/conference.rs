//! Conference domain model.
//!
//! # Responsibility
//! - Define the capacity-bounded resource that attendees register for.
//! - Own seat counter arithmetic used by the seat ledger.
//!
//! # Invariants
//! - `0 <= seats_available <= max_attendees`.
//! - `max_attendees == 0` means attendance is not tracked; such a conference
//!   never has seats to hand out.
//! - `month` mirrors `start_date` (0 when no start date is set).

use crate::model::profile::UserId;
use crate::model::{normalize_name, ValidationError};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable conference identifier.
pub type ConferenceId = Uuid;

pub const DEFAULT_CITY: &str = "Default City";
pub const DEFAULT_TOPICS: [&str; 2] = ["Default", "Topic"];

/// Canonical conference record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conference {
    pub id: ConferenceId,
    /// Owning profile. Only this user may mutate the conference.
    pub organizer_user_id: UserId,
    pub name: String,
    pub description: Option<String>,
    pub city: String,
    /// Ordered, duplicate-free topic labels.
    pub topics: Vec<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Derived from `start_date`; 0 when unset.
    pub month: i64,
    /// Capacity. Fixed after creation.
    pub max_attendees: i64,
    /// Remaining seats. Only the seat ledger changes this.
    pub seats_available: i64,
}

/// Creation input for a conference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConferenceDraft {
    pub name: String,
    pub description: Option<String>,
    /// Falls back to [`DEFAULT_CITY`].
    pub city: Option<String>,
    /// Falls back to [`DEFAULT_TOPICS`] when empty.
    pub topics: Vec<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub max_attendees: i64,
}

/// Partial update input. `None` keeps the stored value.
///
/// Capacity is absent: seat counts move only with registrations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConferenceUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub city: Option<String>,
    pub topics: Option<Vec<String>>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl Conference {
    /// Builds a new conference owned by `organizer_user_id`.
    ///
    /// Applies defaults and opens every seat (`seats_available = max_attendees`).
    pub fn from_draft(
        organizer_user_id: impl Into<UserId>,
        draft: ConferenceDraft,
    ) -> Result<Self, ValidationError> {
        let name = normalize_name(&draft.name, "conference")?;
        if draft.max_attendees < 0 {
            return Err(ValidationError::Negative("max_attendees"));
        }

        let city = draft
            .city
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_CITY.to_string());
        let topics = if draft.topics.is_empty() {
            DEFAULT_TOPICS.iter().map(|topic| topic.to_string()).collect()
        } else {
            normalize_topics(draft.topics)
        };

        let conference = Self {
            id: Uuid::new_v4(),
            organizer_user_id: organizer_user_id.into(),
            name,
            description: draft.description,
            city,
            topics,
            start_date: draft.start_date,
            end_date: draft.end_date,
            month: month_of(draft.start_date),
            max_attendees: draft.max_attendees,
            seats_available: draft.max_attendees,
        };
        conference.validate()?;
        Ok(conference)
    }

    /// Applies a partial update, recomputing `month` on start date change.
    pub fn apply_update(&mut self, update: ConferenceUpdate) -> Result<(), ValidationError> {
        if let Some(name) = update.name {
            self.name = normalize_name(&name, "conference")?;
        }
        if let Some(description) = update.description {
            self.description = Some(description);
        }
        if let Some(city) = update.city {
            let trimmed = city.trim();
            if !trimmed.is_empty() {
                self.city = trimmed.to_string();
            }
        }
        if let Some(topics) = update.topics {
            if !topics.is_empty() {
                self.topics = normalize_topics(topics);
            }
        }
        if let Some(start_date) = update.start_date {
            self.start_date = Some(start_date);
            self.month = month_of(Some(start_date));
        }
        if let Some(end_date) = update.end_date {
            self.end_date = Some(end_date);
        }
        self.validate()
    }

    /// Checks field-level invariants.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::BlankName("conference"));
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                return Err(ValidationError::EndBeforeStart);
            }
        }
        if self.seats_available < 0 || self.seats_available > self.max_attendees {
            return Err(ValidationError::SeatsOutOfRange {
                seats_available: self.seats_available,
                max_attendees: self.max_attendees,
            });
        }
        Ok(())
    }

    /// Takes one seat. Returns `false` when none are left.
    pub fn take_seat(&mut self) -> bool {
        if self.seats_available <= 0 {
            return false;
        }
        self.seats_available -= 1;
        true
    }

    /// Gives one seat back, never exceeding capacity.
    pub fn release_seat(&mut self) {
        if self.seats_available < self.max_attendees {
            self.seats_available += 1;
        }
    }
}

/// Trims, drops blanks and de-duplicates topics while keeping first-seen order.
pub fn normalize_topics(topics: Vec<String>) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(topics.len());
    for topic in topics {
        let trimmed = topic.trim();
        if trimmed.is_empty() || normalized.iter().any(|seen| seen == trimmed) {
            continue;
        }
        normalized.push(trimmed.to_string());
    }
    normalized
}

pub(crate) fn month_of(date: Option<NaiveDate>) -> i64 {
    date.map_or(0, |value| i64::from(value.month()))
}
