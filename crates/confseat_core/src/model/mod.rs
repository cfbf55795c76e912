//! Domain model for conferences, sessions, speakers and profiles.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Own list-membership helpers so uniqueness rules live next to the data.
//!
//! # Invariants
//! - Every conference, session and speaker is identified by a stable UUID.
//! - Profiles are identified by the caller's stable subject id.
//! - Sessions are structurally owned by exactly one conference.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod conference;
pub mod profile;
pub mod session;
pub mod speaker;

use conference::ConferenceId;
use profile::UserId;
use session::SessionId;
use speaker::SpeakerId;

/// Typed reference to one stored entity, used in not-found reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityRef {
    Conference(ConferenceId),
    Session(SessionId),
    Speaker(SpeakerId),
    Profile(UserId),
}

impl Display for EntityRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Conference(id) => write!(f, "conference {id}"),
            Self::Session(id) => write!(f, "session {id}"),
            Self::Speaker(id) => write!(f, "speaker {id}"),
            Self::Profile(user_id) => write!(f, "profile {user_id}"),
        }
    }
}

/// Validation failures for entity input, raised before persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required name field is blank after trim.
    BlankName(&'static str),
    /// `end_date` precedes `start_date`.
    EndBeforeStart,
    /// `seats_available` is outside `[0, max_attendees]`.
    SeatsOutOfRange { seats_available: i64, max_attendees: i64 },
    /// A count or duration field is negative.
    Negative(&'static str),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName(entity) => write!(f, "{entity} name must not be blank"),
            Self::EndBeforeStart => write!(f, "end date must not be earlier than start date"),
            Self::SeatsOutOfRange {
                seats_available,
                max_attendees,
            } => write!(
                f,
                "seats available {seats_available} outside capacity range 0..={max_attendees}"
            ),
            Self::Negative(field) => write!(f, "{field} must not be negative"),
        }
    }
}

impl Error for ValidationError {}

/// Returns the trimmed name, or `BlankName` when nothing is left.
pub(crate) fn normalize_name(
    value: &str,
    entity: &'static str,
) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::BlankName(entity));
    }
    Ok(trimmed.to_string())
}
