//! Shared TTL Cache Handle
//!
//! Wraps a [`CacheStore`] for concurrent use and owns its background sweep task.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::{CacheConfig, CacheStats, CacheStore};
use crate::tasks::spawn_ticker;

// == TTL Cache ==
/// Thread-safe TTL cache with a periodic expired-entry sweep.
///
/// The sweep only reclaims memory; `get` never relies on it for correctness.
#[derive(Debug)]
pub struct TtlCache<V> {
    /// Namespace used in logs
    name: String,
    /// Shared storage, also held by the sweep task
    store: Arc<RwLock<CacheStore<V>>>,
    /// Sweep task, present once started
    sweeper: Mutex<Option<JoinHandle<()>>>,
    config: CacheConfig,
}

impl<V> TtlCache<V>
where
    V: Clone + Serialize + Send + Sync + 'static,
{
    /// Creates a cache named `name`; the sweep is not started.
    pub fn new(name: impl Into<String>, config: CacheConfig) -> Self {
        Self {
            name: name.into(),
            store: Arc::new(RwLock::new(CacheStore::new(config.default_ttl))),
            sweeper: Mutex::new(None),
            config,
        }
    }

    /// Returns the cache namespace.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Looks up a live value, recording a hit or miss.
    pub async fn get(&self, key: &str) -> Option<V> {
        self.store.write().await.get(key)
    }

    /// Stores a value with `ttl` or the configured default.
    pub async fn set(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) -> bool {
        self.store.write().await.set(key, value, ttl)
    }

    /// Removes a key, returning whether it was present.
    pub async fn delete(&self, key: &str) -> bool {
        self.store.write().await.delete(key)
    }

    /// Checks for a live entry without touching statistics.
    pub async fn contains(&self, key: &str) -> bool {
        self.store.read().await.contains(key)
    }

    /// Removes every entry whose key contains `token`.
    pub async fn remove_matching(&self, token: &str) -> usize {
        self.store.write().await.remove_matching(token)
    }

    /// Drops every entry, keeping statistics.
    pub async fn purge_all(&self) -> usize {
        self.store.write().await.purge_all()
    }

    /// Empties the cache and resets its statistics.
    pub async fn clear(&self) {
        self.store.write().await.clear();
    }

    /// Runs one reclamation pass immediately.
    pub async fn sweep(&self) -> usize {
        self.store.write().await.sweep()
    }

    /// Statistics with a fresh memory estimate.
    pub async fn stats(&self) -> CacheStats {
        self.store.read().await.stats()
    }

    /// Keys currently held, expired or not.
    pub async fn keys(&self) -> Vec<String> {
        self.store.read().await.keys()
    }

    /// Number of entries held, including expired ones not yet reclaimed.
    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    /// Returns true when no entries are held.
    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }

    // == Start Sweeper ==
    /// Spawns the periodic sweep. Calling it again, or after destroy, does nothing.
    pub async fn start_sweeper(&self) {
        let mut slot = self.sweeper.lock().await;
        if slot.is_some() || self.store.read().await.is_destroyed() {
            return;
        }

        let store = Arc::clone(&self.store);
        let name = self.name.clone();
        let handle = spawn_ticker(
            format!("cache-sweep:{}", self.name),
            self.config.sweep_interval,
            move || {
                let store = Arc::clone(&store);
                let name = name.clone();
                async move {
                    let removed = store.write().await.sweep();
                    if removed > 0 {
                        info!(cache = %name, removed, "TTL sweep: removed expired entries");
                    } else {
                        debug!(cache = %name, "TTL sweep: no expired entries found");
                    }
                }
            },
        );
        *slot = Some(handle);
    }

    // == Destroy ==
    /// Cancels the sweep and drops all entries. Idempotent.
    pub async fn destroy(&self) {
        // Held until the store is marked, so `start_sweeper` cannot spawn in between.
        let mut slot = self.sweeper.lock().await;
        {
            let mut store = self.store.write().await;
            if !store.is_destroyed() {
                store.destroy();
                debug!(cache = %self.name, "Cache destroyed");
            }
        }
        if let Some(handle) = slot.take() {
            handle.abort();
        }
    }

    /// Returns true once `destroy` has run.
    pub async fn is_destroyed(&self) -> bool {
        self.store.read().await.is_destroyed()
    }
}
