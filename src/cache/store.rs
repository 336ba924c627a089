//! Cache Store Module
//!
//! Main cache engine combining HashMap storage with TTL expiration. TTL is the
//! only eviction policy; the memory estimate is reported but never acted on.

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;

use crate::cache::{current_timestamp_ms, CacheEntry, CacheStats, ENTRY_OVERHEAD_BYTES};

// == Cache Store ==
/// Synchronous key-value storage with per-entry expiry.
///
/// Once destroyed, every operation is a no-op returning absent/false.
#[derive(Debug)]
pub struct CacheStore<V> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<V>>,
    /// Performance statistics
    stats: CacheStats,
    /// TTL for entries stored without an explicit one
    default_ttl: Duration,
    /// Set by `destroy`
    destroyed: bool,
}

impl<V: Clone + Serialize> CacheStore<V> {
    // == Constructor ==
    /// Creates a new empty CacheStore with the given default TTL.
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            stats: CacheStats::new(),
            default_ttl,
            destroyed: false,
        }
    }

    // == Set ==
    /// Stores a value, unconditionally overwriting any existing entry.
    ///
    /// Returns `false` only when the store has been destroyed.
    pub fn set(&mut self, key: impl Into<String>, value: V, ttl: Option<Duration>) -> bool {
        self.set_at(key, value, ttl, current_timestamp_ms())
    }

    /// Same as [`set`](Self::set) with an explicit storage timestamp.
    pub fn set_at(
        &mut self,
        key: impl Into<String>,
        value: V,
        ttl: Option<Duration>,
        now_ms: u64,
    ) -> bool {
        if self.destroyed {
            return false;
        }

        let ttl = ttl.unwrap_or(self.default_ttl);
        self.entries
            .insert(key.into(), CacheEntry::stored_at(value, ttl, now_ms));
        true
    }

    // == Get ==
    /// Retrieves a live value by key.
    ///
    /// Absent and expired entries count as misses; expired entries are
    /// removed on this path. Reads never extend the TTL.
    pub fn get(&mut self, key: &str) -> Option<V> {
        self.get_at(key, current_timestamp_ms())
    }

    /// Same as [`get`](Self::get) evaluated at `now_ms`.
    pub fn get_at(&mut self, key: &str, now_ms: u64) -> Option<V> {
        if self.destroyed {
            return None;
        }

        match self.entries.get(key) {
            Some(entry) if !entry.is_expired_at(now_ms) => {
                let value = entry.value.clone();
                self.stats.record_hit();
                Some(value)
            }
            Some(_) => {
                self.entries.remove(key);
                self.stats.record_expired(1);
                self.stats.record_miss();
                None
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    // == Contains ==
    /// Returns true if a live entry exists, without touching statistics.
    pub fn contains(&self, key: &str) -> bool {
        !self.destroyed
            && self
                .entries
                .get(key)
                .is_some_and(|entry| !entry.is_expired_at(current_timestamp_ms()))
    }

    // == Delete ==
    /// Removes an entry by key, returning whether one was present.
    pub fn delete(&mut self, key: &str) -> bool {
        if self.destroyed {
            return false;
        }
        self.entries.remove(key).is_some()
    }

    // == Remove Matching ==
    /// Removes every entry whose key contains `token`.
    ///
    /// Returns the number of entries removed.
    pub fn remove_matching(&mut self, token: &str) -> usize {
        if self.destroyed {
            return 0;
        }
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.contains(token));
        before - self.entries.len()
    }

    // == Purge All ==
    /// Drops every entry but keeps the statistics counters.
    ///
    /// Returns the number of entries removed.
    pub fn purge_all(&mut self) -> usize {
        if self.destroyed {
            return 0;
        }
        let removed = self.entries.len();
        self.entries.clear();
        removed
    }

    // == Clear ==
    /// Removes all entries and resets statistics.
    pub fn clear(&mut self) {
        if self.destroyed {
            return;
        }
        self.entries.clear();
        self.stats = CacheStats::new();
    }

    // == Sweep ==
    /// Removes all expired entries from the cache.
    ///
    /// Returns the number of entries removed.
    pub fn sweep(&mut self) -> usize {
        self.sweep_at(current_timestamp_ms())
    }

    /// Same as [`sweep`](Self::sweep) evaluated at `now_ms`.
    pub fn sweep_at(&mut self, now_ms: u64) -> usize {
        if self.destroyed {
            return 0;
        }

        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired_at(now_ms));
        let removed = before - self.entries.len();

        self.stats.record_expired(removed);
        self.stats.record_sweep(now_ms);
        removed
    }

    // == Stats ==
    /// Returns current cache statistics with a fresh memory estimate.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.item_count = self.entries.len();
        stats.memory_footprint = self
            .entries
            .iter()
            .map(|(key, entry)| estimate_entry_size(key, &entry.value))
            .sum();
        stats
    }

    // == Keys ==
    /// Returns the keys currently held, expired or not.
    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    // == Length ==
    /// Returns the current number of entries in the cache.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // == Destroy ==
    /// Drops all entries and turns every later operation into a no-op.
    pub fn destroy(&mut self) {
        self.entries.clear();
        self.destroyed = true;
    }

    /// Returns true once `destroy` has been called.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}

/// Advisory size of one entry: two bytes per key character, the serialized
/// value length and a fixed overhead.
fn estimate_entry_size<V: Serialize>(key: &str, value: &V) -> usize {
    let value_size = serde_json::to_vec(value).map(|bytes| bytes.len()).unwrap_or(0);
    key.chars().count() * 2 + value_size + ENTRY_OVERHEAD_BYTES
}
