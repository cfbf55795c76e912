//! Caller-visible error taxonomy for core operations.
//!
//! # Invariants
//! - Every failure is scoped to one operation; nothing here is fatal.
//! - Business-rule violations are `Conflict`, never a storage error.
//! - Exhausted transaction retries surface as `TransientStore`.

use crate::db::transaction::{Contention, RetriesExhausted};
use crate::model::conference::ConferenceId;
use crate::model::profile::UserId;
use crate::model::{EntityRef, ValidationError};
use crate::query::filter::{ConferenceField, FilterError};
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type CoreResult<T> = Result<T, CoreError>;

/// Business rule that rejected an otherwise well-formed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictReason {
    AlreadyRegistered,
    NoSeatsAvailable,
    NotRegisteredForParent,
    AlreadyInWishlist,
}

impl Display for ConflictReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let message = match self {
            Self::AlreadyRegistered => "already registered",
            Self::NoSeatsAvailable => "no seats available",
            Self::NotRegisteredForParent => "must register for parent resource first",
            Self::AlreadyInWishlist => "already in wishlist",
        };
        f.write_str(message)
    }
}

#[derive(Debug)]
pub enum CoreError {
    /// Referenced entity is absent.
    NotFound(EntityRef),
    Conflict(ConflictReason),
    /// Caller does not own the conference it tried to mutate.
    Forbidden {
        user_id: UserId,
        conference_id: ConferenceId,
    },
    Validation(ValidationError),
    /// Unknown field/operator or malformed value in a query filter.
    InvalidFilter(FilterError),
    /// Non-equality operators on two different fields.
    AmbiguousInequality {
        first: ConferenceField,
        second: ConferenceField,
    },
    /// Transaction could not commit within the retry budget; caller may retry.
    TransientStore { attempts: u32 },
    Repo(RepoError),
}

impl Display for CoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(entity) => write!(f, "{entity} not found"),
            Self::Conflict(reason) => write!(f, "conflict: {reason}"),
            Self::Forbidden {
                user_id,
                conference_id,
            } => write!(
                f,
                "user {user_id} is not the organizer of conference {conference_id}"
            ),
            Self::Validation(err) => write!(f, "{err}"),
            Self::InvalidFilter(err) => write!(f, "{err}"),
            Self::AmbiguousInequality { first, second } => write!(
                f,
                "inequality filter is allowed on only one field; got `{first}` and `{second}`"
            ),
            Self::TransientStore { attempts } => write!(
                f,
                "store contention: transaction gave up after {attempts} attempts"
            ),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::InvalidFilter(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl Contention for CoreError {
    fn is_contention(&self) -> bool {
        matches!(self, Self::Repo(err) if err.is_contention())
    }
}

impl From<RepoError> for CoreError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(entity) => Self::NotFound(entity),
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

impl From<FilterError> for CoreError {
    fn from(value: FilterError) -> Self {
        match value {
            FilterError::AmbiguousInequality { first, second } => {
                Self::AmbiguousInequality { first, second }
            }
            other => Self::InvalidFilter(other),
        }
    }
}

impl From<ValidationError> for CoreError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(RepoError::from(value))
    }
}

impl From<RetriesExhausted> for CoreError {
    fn from(value: RetriesExhausted) -> Self {
        Self::TransientStore {
            attempts: value.attempts,
        }
    }
}
