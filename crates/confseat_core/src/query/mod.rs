//! Query planning for conference search.
//!
//! # Responsibility
//! - Turn caller-supplied filter triples into a validated query plan.
//! - Keep the field/operator vocabulary a closed enumeration.

pub mod filter;
