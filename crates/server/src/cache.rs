//! Process-local response cache with per-entry expiry.
//!
//! Entries are dropped lazily when read after their deadline. There is no
//! size bound.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use dashmap::DashMap;
use serde_json::Value;

use crate::config::MAX_CACHE_TTL_SECS;

#[derive(Clone, Debug, Default)]
pub struct TtlCache {
    entries: Arc<DashMap<String, (Instant, Value)>>,
}

impl TtlCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        {
            let entry = self.entries.get(key)?;
            let (deadline, value) = entry.value();
            if Instant::now() < *deadline {
                return Some(value.clone());
            }
        }
        self.entries
            .remove_if(key, |_, (deadline, _)| Instant::now() >= *deadline);
        None
    }

    /// Stores `value` until `ttl` elapses, capped at `MAX_CACHE_TTL_SECS`.
    pub fn insert(&self, key: impl Into<String>, value: Value, ttl: Duration) {
        let ttl = ttl.min(Duration::from_secs(MAX_CACHE_TTL_SECS));
        self.entries
            .insert(key.into(), (Instant::now() + ttl, value));
    }

    pub fn invalidate(&self, key: &str) {
        self.entries.remove(key);
    }

    pub fn invalidate_prefix(&self, prefix: &str) {
        self.entries.retain(|key, _| !key.starts_with(prefix));
    }
}
