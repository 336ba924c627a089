//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses, and reclaimed entries.

use serde::Serialize;

// == Cache Stats ==
/// Tracks cache performance metrics.
///
/// Counters are monotonic and only reset by an explicit clear.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Number of successful cache retrievals
    pub hits: u64,
    /// Number of failed cache retrievals (key not found or expired)
    pub misses: u64,
    /// Number of entries reclaimed after expiry, lazily or by sweep
    pub expired_evictions: u64,
    /// Current number of entries in the cache
    pub item_count: usize,
    /// Advisory estimate of the bytes held by keys, values and bookkeeping
    pub memory_footprint: usize,
    /// Unix milliseconds of the last sweep, if one has run
    pub last_sweep: Option<u64>,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    // == Record Hit ==
    /// Increments the hit counter.
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    // == Record Miss ==
    /// Increments the miss counter.
    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    // == Record Expired ==
    /// Adds to the expired-entry reclamation counter.
    pub fn record_expired(&mut self, count: usize) {
        self.expired_evictions += count as u64;
    }

    // == Record Sweep ==
    /// Stamps the time of the latest sweep.
    pub fn record_sweep(&mut self, now_ms: u64) {
        self.last_sweep = Some(now_ms);
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = CacheStats::new();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.expired_evictions, 0);
        assert_eq!(stats.item_count, 0);
        assert!(stats.last_sweep.is_none());
    }

    #[test]
    fn test_hit_rate_no_requests() {
        let stats = CacheStats::new();
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let mut stats = CacheStats::new();
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();
        assert_eq!(stats.hit_rate(), 0.75);
    }

    #[test]
    fn test_record_expired_and_sweep() {
        let mut stats = CacheStats::new();
        stats.record_expired(3);
        stats.record_expired(2);
        stats.record_sweep(1_234);
        assert_eq!(stats.expired_evictions, 5);
        assert_eq!(stats.last_sweep, Some(1_234));
    }
}
