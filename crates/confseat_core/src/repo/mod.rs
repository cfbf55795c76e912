//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts per entity kind.
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Repository writes validate entities before persistence.
//! - Repositories never open transactions themselves; callers hand them a
//!   `Transaction` (it derefs to `Connection`) when atomicity matters.
//! - Multi-get results are aligned with the requested keys.

pub mod conference_repo;
pub mod profile_repo;
pub mod session_repo;
pub mod speaker_repo;

pub use conference_repo::{RepoError, RepoResult};

use uuid::Uuid;

pub(crate) fn parse_uuid(value: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}
