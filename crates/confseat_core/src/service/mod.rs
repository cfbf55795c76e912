//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Own transaction boundaries and deferred-work hand-off.
//! - Keep embedding hosts decoupled from storage details.

pub mod conference_service;
pub mod derived_cache;
pub mod error;
pub mod profile_service;
pub mod seat_ledger;
pub mod session_service;
pub mod speaker_service;
pub mod wishlist;
