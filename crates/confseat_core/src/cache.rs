//! Key-value cache slots for derived values.
//!
//! # Responsibility
//! - Define the cache contract consumed by the derived-cache engine.
//! - Provide a process-local shared implementation.
//!
//! # Invariants
//! - Last writer wins; there is no ordering beyond "latest set is visible".
//! - Reads never block writers for longer than one map operation.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Cache key for the nearly-sold-out announcement.
pub const ANNOUNCEMENT_KEY: &str = "RECENT_ANNOUNCEMENTS";
/// Cache key for the featured-speaker message.
pub const FEATURED_SPEAKER_KEY: &str = "FEATURED_SPEAKER";

/// External cache contract.
pub trait CacheStore {
    fn set(&self, key: &str, value: String);
    fn get(&self, key: &str) -> Option<String>;
    fn delete(&self, key: &str);
}

/// Thread-safe in-process cache. Clones share the same slots.
#[derive(Debug, Clone, Default)]
pub struct MemoryCacheStore {
    slots: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryCacheStore {
    fn set(&self, key: &str, value: String) {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        slots.insert(key.to_string(), value);
    }

    fn get(&self, key: &str) -> Option<String> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        slots.get(key).cloned()
    }

    fn delete(&self, key: &str) {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        slots.remove(key);
    }
}

impl<C: CacheStore + ?Sized> CacheStore for &C {
    fn set(&self, key: &str, value: String) {
        (**self).set(key, value);
    }

    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn delete(&self, key: &str) {
        (**self).delete(key);
    }
}
