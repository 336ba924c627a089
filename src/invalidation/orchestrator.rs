//! Invalidation Orchestrator
//!
//! Owns one TTL cache per namespace and purges them, together with the injected
//! platform partitions and local storage, when an entity type changes.
//!
//! Matching is by substring: a trigger token clears every namespace whose name
//! contains it and every key containing it in the remaining namespaces. This
//! over-invalidates rather than risk serving stale data.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use crate::cache::{current_timestamp_ms, CacheConfig, CacheStats, TtlCache};
use crate::invalidation::{
    ContentType, KeyValueStorage, MemoryPartitionStore, MemoryStorage, PartitionStore,
};

/// Capacity of the invalidation event channel
const EVENT_CHANNEL_CAPACITY: usize = 64;

// == Cache State ==
/// Orchestrator-wide freshness state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheState {
    Clean,
    Dirty,
    Updating,
    /// Only reported after teardown
    Unknown,
}

// == Cache Status ==
/// Snapshot of the orchestrator state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStatus {
    pub state: CacheState,
    /// Unix milliseconds of the last state change
    pub last_update: u64,
    /// Lifecycle reported by the platform partition store
    pub backing_store_status: String,
    /// Last version passed to `update_version`
    pub version: Option<String>,
}

// == Invalidation Summary ==
/// What a single invalidation pass removed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InvalidationSummary {
    /// `None` for a full clear
    pub content_type: Option<ContentType>,
    /// Local cache entries removed
    pub entries_purged: usize,
    /// Namespaces emptied because their name matched a trigger
    pub namespaces_cleared: Vec<String>,
    /// Platform partitions deleted
    pub partitions_deleted: usize,
    /// Local storage keys removed
    pub storage_keys_removed: usize,
}

// == Invalidation Event ==
/// Broadcast to subscribers so calling layers can mark their query caches stale.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InvalidationEvent {
    ContentType {
        content_type: ContentType,
        triggers: Vec<String>,
        related_queries: Vec<String>,
        at: u64,
    },
    All {
        version: Option<String>,
        at: u64,
    },
}

#[derive(Debug)]
struct StatusState {
    state: CacheState,
    last_update: u64,
    version: Option<String>,
    destroyed: bool,
}

// == Invalidation Orchestrator ==
/// Coordinates purging of every cache layer for a changed content type.
pub struct InvalidationOrchestrator {
    /// One cache per namespace; the set of namespaces is fixed at construction
    caches: BTreeMap<String, TtlCache<Value>>,
    partitions: Arc<dyn PartitionStore>,
    storage: Arc<dyn KeyValueStorage>,
    status: RwLock<StatusState>,
    events: broadcast::Sender<InvalidationEvent>,
}

impl InvalidationOrchestrator {
    // == Constructor ==
    /// Creates an orchestrator with one cache per namespace in the trigger table.
    pub fn new(
        config: CacheConfig,
        partitions: Arc<dyn PartitionStore>,
        storage: Arc<dyn KeyValueStorage>,
    ) -> Self {
        let caches = ContentType::all_namespaces()
            .into_iter()
            .map(|namespace| (namespace.to_string(), TtlCache::new(namespace, config)))
            .collect();
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            caches,
            partitions,
            storage,
            status: RwLock::new(StatusState {
                state: CacheState::Clean,
                last_update: current_timestamp_ms(),
                version: None,
                destroyed: false,
            }),
            events,
        }
    }

    /// Creates an orchestrator backed by in-memory platform stores.
    pub fn in_memory(config: CacheConfig) -> Self {
        Self::new(
            config,
            Arc::new(MemoryPartitionStore::new()),
            Arc::new(MemoryStorage::new()),
        )
    }

    /// Starts the sweep task of every managed cache.
    pub async fn start(&self) {
        for cache in self.caches.values() {
            cache.start_sweeper().await;
        }
    }

    /// Returns the cache for a namespace, if managed.
    pub fn cache(&self, namespace: &str) -> Option<&TtlCache<Value>> {
        self.caches.get(namespace)
    }

    /// Returns the managed namespaces in order.
    pub fn namespaces(&self) -> Vec<&str> {
        self.caches.keys().map(String::as_str).collect()
    }

    /// Subscribes to invalidation events.
    pub fn subscribe(&self) -> broadcast::Receiver<InvalidationEvent> {
        self.events.subscribe()
    }

    // == Invalidate ==
    /// Purges everything the content type's rule names and marks the state dirty.
    pub async fn invalidate(&self, content_type: ContentType) -> InvalidationSummary {
        let mut summary = InvalidationSummary {
            content_type: Some(content_type),
            ..InvalidationSummary::default()
        };
        if self.is_destroyed().await {
            debug!(%content_type, "Invalidation ignored: orchestrator destroyed");
            return summary;
        }

        let rule = content_type.rule();
        for &trigger in rule.triggers {
            for (namespace, cache) in &self.caches {
                if namespace.contains(trigger) {
                    summary.entries_purged += cache.purge_all().await;
                    if !summary.namespaces_cleared.contains(namespace) {
                        summary.namespaces_cleared.push(namespace.clone());
                    }
                } else {
                    summary.entries_purged += cache.remove_matching(trigger).await;
                }
            }
        }

        summary.partitions_deleted = self
            .purge_partitions(|name| rule.triggers.iter().any(|trigger| name.contains(trigger)))
            .await;
        summary.storage_keys_removed = self.purge_storage(rule.related_queries).await;

        self.transition(CacheState::Dirty).await;
        let _ = self.events.send(InvalidationEvent::ContentType {
            content_type,
            triggers: rule.triggers.iter().map(|t| t.to_string()).collect(),
            related_queries: rule.related_queries.iter().map(|q| q.to_string()).collect(),
            at: current_timestamp_ms(),
        });

        info!(
            %content_type,
            entries_purged = summary.entries_purged,
            namespaces_cleared = summary.namespaces_cleared.len(),
            partitions_deleted = summary.partitions_deleted,
            storage_keys_removed = summary.storage_keys_removed,
            "Cache invalidated"
        );
        summary
    }

    /// Parses `name` and invalidates it; unknown names are logged and ignored.
    pub async fn invalidate_by_name(&self, name: &str) -> Option<InvalidationSummary> {
        match name.parse::<ContentType>() {
            Ok(content_type) => Some(self.invalidate(content_type).await),
            Err(err) => {
                warn!(content_type = %name, error = %err, "Nothing invalidated");
                None
            }
        }
    }

    // == Force Refresh ==
    /// Invalidates, then marks the state `updating` until `complete_refresh`.
    pub async fn force_refresh(&self, content_type: ContentType) -> InvalidationSummary {
        let summary = self.invalidate(content_type).await;
        self.transition(CacheState::Updating).await;
        summary
    }

    /// Moves `updating` back to `clean`. Returns false from any other state.
    pub async fn complete_refresh(&self) -> bool {
        let updating = {
            let status = self.status.read().await;
            !status.destroyed && status.state == CacheState::Updating
        };
        if updating {
            self.transition(CacheState::Clean).await;
        }
        updating
    }

    // == Clear All ==
    /// Empties every namespace and every platform partition; state becomes `clean`.
    pub async fn clear_all(&self) -> InvalidationSummary {
        let mut summary = InvalidationSummary::default();
        if self.is_destroyed().await {
            return summary;
        }

        for (namespace, cache) in &self.caches {
            summary.entries_purged += cache.len().await;
            cache.clear().await;
            summary.namespaces_cleared.push(namespace.clone());
        }
        summary.partitions_deleted = self.purge_partitions(|_| true).await;

        self.transition(CacheState::Clean).await;
        let version = self.status.read().await.version.clone();
        let _ = self.events.send(InvalidationEvent::All {
            version,
            at: current_timestamp_ms(),
        });

        info!(
            entries_purged = summary.entries_purged,
            partitions_deleted = summary.partitions_deleted,
            "All caches cleared"
        );
        summary
    }

    // == Update Version ==
    /// Records the new version and clears everything; there is no partial reconciliation.
    ///
    /// Unlike [`clear_all`](Self::clear_all), local storage keys matching any
    /// related query of any content type are removed too.
    pub async fn update_version(&self, version: impl Into<String>) -> InvalidationSummary {
        let version = version.into();
        {
            let mut status = self.status.write().await;
            if status.destroyed {
                return InvalidationSummary::default();
            }
            info!(from = ?status.version, to = %version, "Cache version updated");
            status.version = Some(version);
        }

        let mut summary = self.clear_all().await;
        summary.storage_keys_removed = self
            .purge_storage(&ContentType::all_related_queries())
            .await;
        summary
    }

    // == Status ==
    pub async fn status(&self) -> CacheStatus {
        let status = self.status.read().await;
        CacheStatus {
            state: status.state,
            last_update: status.last_update,
            backing_store_status: self.partitions.lifecycle(),
            version: status.version.clone(),
        }
    }

    /// Statistics of every managed namespace.
    pub async fn stats(&self) -> BTreeMap<String, CacheStats> {
        let mut stats = BTreeMap::new();
        for (namespace, cache) in &self.caches {
            stats.insert(namespace.clone(), cache.stats().await);
        }
        stats
    }

    // == Destroy ==
    /// Destroys every cache; the state becomes `unknown` and later calls are no-ops.
    pub async fn destroy(&self) {
        {
            let mut status = self.status.write().await;
            if status.destroyed {
                return;
            }
            status.destroyed = true;
            status.state = CacheState::Unknown;
            status.last_update = current_timestamp_ms();
        }

        for cache in self.caches.values() {
            cache.destroy().await;
        }
        info!("Invalidation orchestrator destroyed");
    }

    pub async fn is_destroyed(&self) -> bool {
        self.status.read().await.destroyed
    }

    async fn transition(&self, next: CacheState) {
        let mut status = self.status.write().await;
        if status.destroyed {
            return;
        }
        if status.state != next {
            debug!(from = ?status.state, to = ?next, "Cache status transition");
        }
        status.state = next;
        status.last_update = current_timestamp_ms();
    }

    /// Deletes matching partitions; failures are logged and skipped.
    async fn purge_partitions(&self, matches: impl Fn(&str) -> bool) -> usize {
        let names = match self.partitions.partition_names().await {
            Ok(names) => names,
            Err(err) => {
                warn!(error = %err, "Could not list cache partitions, skipping");
                return 0;
            }
        };

        let mut deleted = 0;
        for name in names.iter().filter(|name| matches(name.as_str())) {
            match self.partitions.delete_partition(name).await {
                Ok(true) => deleted += 1,
                Ok(false) => {}
                Err(err) => {
                    warn!(partition = %name, error = %err, "Could not delete cache partition")
                }
            }
        }
        deleted
    }

    /// Removes storage keys containing any token; failures are logged and skipped.
    async fn purge_storage(&self, tokens: &[&str]) -> usize {
        let keys = match self.storage.keys().await {
            Ok(keys) => keys,
            Err(err) => {
                warn!(error = %err, "Could not list local storage keys, skipping");
                return 0;
            }
        };

        let mut removed = 0;
        for key in keys.iter().filter(|key| tokens.iter().any(|t| key.contains(t))) {
            match self.storage.remove(key).await {
                Ok(()) => removed += 1,
                Err(err) => warn!(key = %key, error = %err, "Could not remove local storage key"),
            }
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Fixture {
        orchestrator: InvalidationOrchestrator,
        partitions: Arc<MemoryPartitionStore>,
        storage: Arc<MemoryStorage>,
    }

    fn fixture() -> Fixture {
        let partitions = Arc::new(MemoryPartitionStore::with_partitions([
            "api-stories",
            "api-story-types",
            "api-users",
            "static-assets",
        ]));
        let storage = Arc::new(MemoryStorage::new());
        let orchestrator = InvalidationOrchestrator::new(
            CacheConfig::default(),
            partitions.clone(),
            storage.clone(),
        );
        Fixture {
            orchestrator,
            partitions,
            storage,
        }
    }

    async fn seed(orchestrator: &InvalidationOrchestrator, namespace: &str, key: &str) {
        orchestrator
            .cache(namespace)
            .unwrap()
            .set(key, json!({ "id": 1 }), None)
            .await;
    }

    #[tokio::test]
    async fn test_manages_every_trigger_namespace() {
        let f = fixture();
        assert_eq!(f.orchestrator.namespaces().len(), ContentType::all_namespaces().len());
        assert!(f.orchestrator.cache("story-types").is_some());
        assert!(f.orchestrator.cache("invoices").is_none());
    }

    #[tokio::test]
    async fn test_invalidate_stories_clears_only_related_caches() {
        let f = fixture();
        let o = &f.orchestrator;
        seed(o, "stories", "list").await;
        seed(o, "story-types", "all").await;
        seed(o, "projects", "list").await;
        seed(o, "users", "me").await;
        f.storage.set_item("query:stories:page1", "[]").await;
        f.storage.set_item("query:users:me", "{}").await;

        let summary = o.invalidate(ContentType::Stories).await;

        assert_eq!(summary.namespaces_cleared, vec!["stories", "story-types"]);
        assert_eq!(summary.entries_purged, 2);
        assert_eq!(summary.partitions_deleted, 2);
        assert_eq!(summary.storage_keys_removed, 1);

        assert!(o.cache("stories").unwrap().is_empty().await);
        assert!(o.cache("story-types").unwrap().is_empty().await);
        assert!(o.cache("projects").unwrap().contains("list").await);
        assert!(o.cache("users").unwrap().contains("me").await);

        assert_eq!(f.partitions.names().await, vec!["api-users", "static-assets"]);
        assert!(f.storage.get_item("query:users:me").await.is_some());
        assert_eq!(o.status().await.state, CacheState::Dirty);
    }

    #[tokio::test]
    async fn test_invalidate_removes_matching_keys_in_other_namespaces() {
        let f = fixture();
        let o = &f.orchestrator;
        seed(o, "projects", "projects:7:stories").await;
        seed(o, "projects", "projects:7:members").await;

        o.invalidate(ContentType::Stories).await;

        let projects = o.cache("projects").unwrap();
        assert!(!projects.contains("projects:7:stories").await);
        assert!(projects.contains("projects:7:members").await);
    }

    #[tokio::test]
    async fn test_invalidate_keeps_statistics() {
        let f = fixture();
        let o = &f.orchestrator;
        seed(o, "users", "me").await;
        o.cache("users").unwrap().get("me").await;

        o.invalidate(ContentType::Users).await;

        assert_eq!(o.stats().await["users"].hits, 1);
    }

    #[tokio::test]
    async fn test_unknown_name_is_noop() {
        let f = fixture();
        assert!(f.orchestrator.invalidate_by_name("invoices").await.is_none());
        assert_eq!(f.orchestrator.status().await.state, CacheState::Clean);

        let summary = f.orchestrator.invalidate_by_name("Projects").await.unwrap();
        assert_eq!(summary.content_type, Some(ContentType::Projects));
    }

    #[tokio::test]
    async fn test_backing_store_failures_are_best_effort() {
        let f = fixture();
        let o = &f.orchestrator;
        seed(o, "stories", "list").await;
        f.partitions.set_failing(true);
        f.storage.set_failing(true);

        let summary = o.invalidate(ContentType::Stories).await;

        assert_eq!(summary.entries_purged, 1);
        assert_eq!(summary.partitions_deleted, 0);
        assert_eq!(summary.storage_keys_removed, 0);
        assert_eq!(o.status().await.state, CacheState::Dirty);
    }

    #[tokio::test]
    async fn test_status_transitions() {
        let f = fixture();
        let o = &f.orchestrator;
        assert_eq!(o.status().await.state, CacheState::Clean);
        assert!(!o.complete_refresh().await);

        o.force_refresh(ContentType::Tasks).await;
        assert_eq!(o.status().await.state, CacheState::Updating);

        assert!(o.complete_refresh().await);
        assert_eq!(o.status().await.state, CacheState::Clean);

        o.invalidate(ContentType::Tasks).await;
        assert_eq!(o.status().await.state, CacheState::Dirty);

        o.clear_all().await;
        assert_eq!(o.status().await.state, CacheState::Clean);
        assert_eq!(o.status().await.backing_store_status, "active");
    }

    #[tokio::test]
    async fn test_clear_all_and_update_version() {
        let f = fixture();
        let o = &f.orchestrator;
        seed(o, "stories", "a").await;
        seed(o, "calendar", "b").await;

        let summary = o.update_version("2.0.0").await;

        assert_eq!(summary.entries_purged, 2);
        assert_eq!(summary.partitions_deleted, 4);
        assert!(f.partitions.names().await.is_empty());
        for namespace in o.namespaces() {
            assert!(o.cache(namespace).unwrap().is_empty().await);
        }

        let status = o.status().await;
        assert_eq!(status.state, CacheState::Clean);
        assert_eq!(status.version.as_deref(), Some("2.0.0"));
    }

    #[tokio::test]
    async fn test_version_change_purges_stored_queries() {
        let f = fixture();
        f.storage.set_item("users:page-1", "[]").await;
        f.storage.set_item("calendar-events:week-3", "[]").await;
        f.storage.set_item("theme", "dark").await;

        let summary = f.orchestrator.clear_all().await;
        assert_eq!(summary.storage_keys_removed, 0);
        assert_eq!(f.storage.len().await, 3);

        let summary = f.orchestrator.update_version("2.1.0").await;
        assert_eq!(summary.storage_keys_removed, 2);
        assert_eq!(f.storage.get_item("theme").await.as_deref(), Some("dark"));
        assert_eq!(f.storage.len().await, 1);
    }

    #[tokio::test]
    async fn test_events_are_published() {
        let f = fixture();
        let mut events = f.orchestrator.subscribe();

        f.orchestrator.invalidate(ContentType::Users).await;
        f.orchestrator.update_version("3").await;

        match events.recv().await.unwrap() {
            InvalidationEvent::ContentType {
                content_type,
                triggers,
                related_queries,
                ..
            } => {
                assert_eq!(content_type, ContentType::Users);
                assert_eq!(triggers, vec!["users", "user-profiles"]);
                assert_eq!(related_queries, vec!["users", "profiles"]);
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(matches!(
            events.recv().await.unwrap(),
            InvalidationEvent::All { version: Some(v), .. } if v == "3"
        ));
    }

    #[tokio::test]
    async fn test_destroy_makes_everything_noop() {
        let f = fixture();
        let o = &f.orchestrator;
        seed(o, "stories", "a").await;
        o.start().await;

        o.destroy().await;
        o.destroy().await;

        assert_eq!(o.status().await.state, CacheState::Unknown);
        let summary = o.invalidate(ContentType::Stories).await;
        assert_eq!(summary.entries_purged, 0);
        assert_eq!(o.clear_all().await, InvalidationSummary::default());
        assert_eq!(o.update_version("9").await, InvalidationSummary::default());
        assert!(!o.complete_refresh().await);
        assert_eq!(o.status().await.state, CacheState::Unknown);

        let stories = o.cache("stories").unwrap();
        assert_eq!(stories.get("a").await, None);
        assert!(!stories.set("a", json!(1), None).await);
        assert_eq!(f.partitions.names().await.len(), 4);
    }
}
