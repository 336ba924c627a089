//! Cache Module
//!
//! Provides the generic in-memory TTL cache engine used by every layer that
//! needs memoization.

mod entry;
mod stats;
mod store;
mod ttl;

#[cfg(test)]
mod property_tests;

use std::time::Duration;

// Re-export public types
pub use entry::{current_timestamp_ms, duration_ms, CacheEntry};
pub use stats::CacheStats;
pub use store::CacheStore;
pub use ttl::TtlCache;

// == Public Constants ==
/// Fixed per-entry bookkeeping overhead added to the memory estimate, in bytes
pub const ENTRY_OVERHEAD_BYTES: usize = 64;

/// Default entry lifetime
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Default interval between expired-entry sweeps
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

// == Cache Config ==
/// Construction-time settings for a [`TtlCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// TTL applied when `set` is called without one
    pub default_ttl: Duration,
    /// Interval of the background reclamation sweep
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_TTL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}
