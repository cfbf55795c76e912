//! Profile (attendee principal) domain model.
//!
//! # Responsibility
//! - Hold per-user attendance and session wishlist lists.
//! - Enforce list uniqueness through mutation helpers.
//!
//! # Invariants
//! - `conference_keys_to_attend` never contains the same conference twice.
//! - `session_wishlist` never contains the same session twice.
//! - Both lists keep insertion order.

use crate::model::conference::ConferenceId;
use crate::model::session::SessionId;
use serde::{Deserialize, Serialize};

/// Stable subject id supplied by the identity layer.
pub type UserId = String;

/// T-shirt size preference kept on the profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeeShirtSize {
    #[default]
    NotSpecified,
    Xs,
    S,
    M,
    L,
    Xl,
    Xxl,
    Xxxl,
}

impl TeeShirtSize {
    pub fn as_db(self) -> &'static str {
        match self {
            Self::NotSpecified => "not_specified",
            Self::Xs => "xs",
            Self::S => "s",
            Self::M => "m",
            Self::L => "l",
            Self::Xl => "xl",
            Self::Xxl => "xxl",
            Self::Xxxl => "xxxl",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "not_specified" => Some(Self::NotSpecified),
            "xs" => Some(Self::Xs),
            "s" => Some(Self::S),
            "m" => Some(Self::M),
            "l" => Some(Self::L),
            "xl" => Some(Self::Xl),
            "xxl" => Some(Self::Xxl),
            "xxxl" => Some(Self::Xxxl),
            _ => None,
        }
    }
}

/// Canonical profile record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: UserId,
    pub display_name: String,
    pub main_email: Option<String>,
    pub tee_shirt_size: TeeShirtSize,
    pub conference_keys_to_attend: Vec<ConferenceId>,
    pub session_wishlist: Vec<SessionId>,
}

impl Profile {
    /// Creates the lazily-initialized profile for a first-time user.
    pub fn new(user_id: impl Into<UserId>) -> Self {
        let user_id = user_id.into();
        Self {
            display_name: user_id.clone(),
            user_id,
            main_email: None,
            tee_shirt_size: TeeShirtSize::NotSpecified,
            conference_keys_to_attend: Vec::new(),
            session_wishlist: Vec::new(),
        }
    }

    pub fn is_attending(&self, conference_id: &ConferenceId) -> bool {
        self.conference_keys_to_attend.contains(conference_id)
    }

    /// Appends a conference. Returns `false` if it was already present.
    pub fn attend(&mut self, conference_id: ConferenceId) -> bool {
        if self.is_attending(&conference_id) {
            return false;
        }
        self.conference_keys_to_attend.push(conference_id);
        true
    }

    /// Removes a conference. Returns `false` if it was not present.
    pub fn leave(&mut self, conference_id: &ConferenceId) -> bool {
        remove_first(&mut self.conference_keys_to_attend, conference_id)
    }

    pub fn has_wishlisted(&self, session_id: &SessionId) -> bool {
        self.session_wishlist.contains(session_id)
    }

    /// Appends a session. Returns `false` if it was already present.
    pub fn wishlist_add(&mut self, session_id: SessionId) -> bool {
        if self.has_wishlisted(&session_id) {
            return false;
        }
        self.session_wishlist.push(session_id);
        true
    }

    /// Removes a session. Returns `false` if it was not present.
    pub fn wishlist_remove(&mut self, session_id: &SessionId) -> bool {
        remove_first(&mut self.session_wishlist, session_id)
    }
}

fn remove_first<T: PartialEq>(items: &mut Vec<T>, target: &T) -> bool {
    match items.iter().position(|item| item == target) {
        Some(index) => {
            items.remove(index);
            true
        }
        None => false,
    }
}
