//! Backing Store Interfaces
//!
//! The platform-level cache and the local key-value storage are owned by the
//! host application and injected into the orchestrator. In-memory versions are
//! provided for the diagnostics binary and for tests.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{ResilienceError, Result};

// == Partition Store ==
/// Platform cache storage partitioned by name.
#[async_trait]
pub trait PartitionStore: Send + Sync {
    /// Lists the names of all partitions.
    async fn partition_names(&self) -> Result<Vec<String>>;

    /// Deletes a partition, returning whether it existed.
    async fn delete_partition(&self, name: &str) -> Result<bool>;

    /// Opaque lifecycle description (e.g. "unregistered", "installing", "active").
    fn lifecycle(&self) -> String;
}

// == Key Value Storage ==
/// Simple string key-value storage scanned by substring during invalidation.
#[async_trait]
pub trait KeyValueStorage: Send + Sync {
    /// Lists every stored key.
    async fn keys(&self) -> Result<Vec<String>>;

    /// Removes a key; removing an absent key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;
}

// == Memory Partition Store ==
/// In-process [`PartitionStore`] with switchable failure for tests.
#[derive(Debug)]
pub struct MemoryPartitionStore {
    partitions: RwLock<BTreeSet<String>>,
    lifecycle: String,
    failing: AtomicBool,
}

impl MemoryPartitionStore {
    /// Creates an empty, active store.
    pub fn new() -> Self {
        Self {
            partitions: RwLock::new(BTreeSet::new()),
            lifecycle: "active".to_string(),
            failing: AtomicBool::new(false),
        }
    }

    /// Creates a store pre-populated with the given partition names.
    pub fn with_partitions<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            partitions: RwLock::new(names.into_iter().map(Into::into).collect()),
            ..Self::new()
        }
    }

    /// Adds a partition.
    pub async fn insert(&self, name: impl Into<String>) {
        self.partitions.write().await.insert(name.into());
    }

    /// Returns the current partition names in order.
    pub async fn names(&self) -> Vec<String> {
        self.partitions.read().await.iter().cloned().collect()
    }

    /// Makes every subsequent call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(ResilienceError::BackingStore(
                "partition store unavailable".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

impl Default for MemoryPartitionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PartitionStore for MemoryPartitionStore {
    async fn partition_names(&self) -> Result<Vec<String>> {
        self.check()?;
        Ok(self.names().await)
    }

    async fn delete_partition(&self, name: &str) -> Result<bool> {
        self.check()?;
        Ok(self.partitions.write().await.remove(name))
    }

    fn lifecycle(&self) -> String {
        self.lifecycle.clone()
    }
}

// == Memory Storage ==
/// In-process [`KeyValueStorage`] with switchable failure for tests.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: RwLock<BTreeMap<String, String>>,
    failing: AtomicBool,
}

impl MemoryStorage {
    /// Creates an empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `key`, replacing any previous value.
    pub async fn set_item(&self, key: impl Into<String>, value: impl Into<String>) {
        self.items.write().await.insert(key.into(), value.into());
    }

    /// Returns the value stored under `key`.
    pub async fn get_item(&self, key: &str) -> Option<String> {
        self.items.read().await.get(key).cloned()
    }

    /// Number of stored keys.
    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    /// Returns true when nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }

    /// Makes every subsequent call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(ResilienceError::BackingStore(
                "local storage unavailable".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl KeyValueStorage for MemoryStorage {
    async fn keys(&self) -> Result<Vec<String>> {
        self.check()?;
        Ok(self.items.read().await.keys().cloned().collect())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.check()?;
        self.items.write().await.remove(key);
        Ok(())
    }
}
