//! Core domain logic for confseat.
//! This crate is the single source of truth for seat, wishlist and
//! derived-cache invariants.

pub mod cache;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;
pub mod service;
pub mod tasks;

pub use cache::{CacheStore, MemoryCacheStore};
pub use config::{ConfigError, CoreConfig};
pub use db::transaction::RetryPolicy;
pub use logging::{init_logging, init_logging_from_config, LogSettings, LoggingError};
pub use model::conference::{Conference, ConferenceDraft, ConferenceId, ConferenceUpdate};
pub use model::profile::{Profile, TeeShirtSize, UserId};
pub use model::session::{Session, SessionDraft, SessionId, SessionType};
pub use model::speaker::{Speaker, SpeakerId};
pub use query::filter::{compile_filters, FilterSpec, QueryPlan};
pub use repo::{RepoError, RepoResult};
pub use service::conference_service::{ConferenceService, ConferenceView};
pub use service::derived_cache::DerivedCacheEngine;
pub use service::error::{ConflictReason, CoreError, CoreResult};
pub use service::profile_service::{ProfileService, ProfileUpdate};
pub use service::seat_ledger::SeatLedger;
pub use service::session_service::SessionService;
pub use service::speaker_service::{SpeakerDraft, SpeakerService};
pub use service::wishlist::WishlistManager;
pub use tasks::{InMemoryTaskQueue, TaskDescriptor, TaskOutcome, TaskQueue, TaskRunner};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
