//! Version-stamped, max-age local cache keyed by project.
//!
//! Entries written by an older cache format or older than the max age are
//! treated as absent. A value fetched from the project store always replaces
//! whatever the cache holds.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{DbId, Timestamp};

/// Format version of cached entries. Bump when the cached shape changes.
pub const CACHE_FORMAT_VERSION: u32 = 1;

/// Default max age of a cached entry, in hours.
pub const DEFAULT_CACHE_MAX_AGE_HOURS: i64 = 24;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub version: u32,
    pub stored_at: Timestamp,
    pub value: T,
}

#[derive(Debug, Clone)]
pub struct LocalCache<T> {
    entries: HashMap<DbId, CacheEntry<T>>,
    max_age: chrono::Duration,
}

impl<T> Default for LocalCache<T> {
    fn default() -> Self {
        Self::new(chrono::Duration::hours(DEFAULT_CACHE_MAX_AGE_HOURS))
    }
}

impl<T> LocalCache<T> {
    pub fn new(max_age: chrono::Duration) -> Self {
        Self {
            entries: HashMap::new(),
            max_age,
        }
    }

    pub fn put(&mut self, project_id: DbId, value: T, now: Timestamp) {
        self.entries.insert(
            project_id,
            CacheEntry {
                version: CACHE_FORMAT_VERSION,
                stored_at: now,
                value,
            },
        );
    }

    /// Restore a previously serialized entry. Entries of another format
    /// version are dropped.
    pub fn restore(&mut self, project_id: DbId, entry: CacheEntry<T>) -> bool {
        if entry.version != CACHE_FORMAT_VERSION {
            tracing::debug!(project_id, version = entry.version, "Dropping cache entry of another format");
            return false;
        }
        self.entries.insert(project_id, entry);
        true
    }

    /// Fresh value for `project_id`, or `None` when absent or expired.
    pub fn get(&self, project_id: DbId, now: Timestamp) -> Option<&T> {
        let entry = self.entries.get(&project_id)?;
        if now - entry.stored_at > self.max_age {
            return None;
        }
        Some(&entry.value)
    }

    /// Replace the cached value with one fetched from the project store.
    pub fn reconcile(&mut self, project_id: DbId, authoritative: T, now: Timestamp) -> &T {
        self.put(project_id, authoritative, now);
        &self.entries[&project_id].value
    }

    pub fn remove(&mut self, project_id: DbId) -> Option<T> {
        self.entries.remove(&project_id).map(|e| e.value)
    }

    /// Drop every expired entry.
    pub fn evict_expired(&mut self, now: Timestamp) {
        let max_age = self.max_age;
        self.entries.retain(|_, e| now - e.stored_at <= max_age);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
