//! Tag-indexed query cache.
//!
//! Query results are cached as JSON snapshots under string keys; each
//! entry carries a set of tags. Invalidating a tag drops every entry
//! carrying it, so a mutation that targets one batch (or one user's
//! list) makes exactly the dependent queries refetch.

use std::collections::{HashMap, HashSet};

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Invalidation key linking cached queries to the entities they depend
/// on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheTag {
    /// The named user's batch listing.
    UserBatches(String),
    /// The named user's translated-pages listing.
    UserTranslated(String),
    /// Status queries for one batch.
    BatchStatus(String),
    /// Result and translated-pages queries for one batch.
    BatchResult(String),
    /// Anything keyed to one batch, status and result alike.
    Batch(String),
}

struct Entry {
    value: serde_json::Value,
    tags: HashSet<CacheTag>,
}

/// In-memory tag-indexed cache of query snapshots.
#[derive(Default)]
pub struct TagCache {
    entries: HashMap<String, Entry>,
}

impl TagCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached value under `key`, re-typed. A snapshot that no
    /// longer deserializes (shape drift across versions) counts as a
    /// miss.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let entry = self.entries.get(key)?;
        serde_json::from_value(entry.value.clone()).ok()
    }

    /// Store a snapshot of `value` under `key`, tagged for later
    /// invalidation. Serialization failure is logged and the entry
    /// skipped; a cache must never fail the query it serves.
    pub fn put<T: Serialize>(&mut self, key: &str, value: &T, tags: impl IntoIterator<Item = CacheTag>) {
        match serde_json::to_value(value) {
            Ok(json) => {
                self.entries.insert(
                    key.to_string(),
                    Entry {
                        value: json,
                        tags: tags.into_iter().collect(),
                    },
                );
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to snapshot query result, not caching");
            }
        }
    }

    /// Drop every entry carrying `tag`. Returns how many were dropped.
    pub fn invalidate(&mut self, tag: &CacheTag) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.tags.contains(tag));
        before - self.entries.len()
    }

    /// Drop everything: the blunt response to an advisory "something
    /// changed" hint that carries no detail.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
