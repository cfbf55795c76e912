//! Speaker domain model.
//!
//! Speakers are independent of conferences; sessions reference them by id.

use crate::model::{normalize_name, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable speaker identifier.
pub type SpeakerId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Speaker {
    pub id: SpeakerId,
    pub name: String,
    pub bio: Option<String>,
    pub affiliation: Option<String>,
}

impl Speaker {
    pub fn new(
        name: &str,
        bio: Option<String>,
        affiliation: Option<String>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            id: Uuid::new_v4(),
            name: normalize_name(name, "speaker")?,
            bio,
            affiliation,
        })
    }
}
