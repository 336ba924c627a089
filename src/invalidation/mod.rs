//! Invalidation Module
//!
//! Cascading cache invalidation: one TTL cache per namespace, a static trigger
//! table from content types to namespaces, and the injected platform stores
//! purged alongside them.

mod backing;
mod content;
mod orchestrator;

pub use backing::{KeyValueStorage, MemoryPartitionStore, MemoryStorage, PartitionStore};
pub use content::{ContentType, InvalidationRule};
pub use orchestrator::{
    CacheState, CacheStatus, InvalidationEvent, InvalidationOrchestrator, InvalidationSummary,
};
