//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

// == Cache Entry ==
/// Represents a single cache entry with its value and expiry metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Storage timestamp (Unix milliseconds)
    pub stored_at: u64,
    /// Lifetime of the entry from `stored_at`
    pub ttl: Duration,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new cache entry stored now.
    pub fn new(value: V, ttl: Duration) -> Self {
        Self::stored_at(value, ttl, current_timestamp_ms())
    }

    /// Creates a new cache entry stored at the given timestamp.
    pub fn stored_at(value: V, ttl: Duration, now_ms: u64) -> Self {
        Self {
            value,
            stored_at: now_ms,
            ttl,
        }
    }

    // == Expires At ==
    /// Returns the Unix millisecond timestamp at which the entry stops being readable.
    pub fn expires_at(&self) -> u64 {
        self.stored_at.saturating_add(duration_ms(self.ttl))
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now_ms`.
    ///
    /// An entry is readable only while `now < stored_at + ttl`, so it is
    /// expired from the exact expiry instant onward.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at()
    }

    /// Checks if the entry has expired now.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    // == Time To Live ==
    /// Returns remaining lifetime in milliseconds, saturating at zero.
    pub fn ttl_remaining_ms(&self) -> u64 {
        self.expires_at().saturating_sub(current_timestamp_ms())
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(duration_ms)
        .unwrap_or_default()
}

/// Converts a duration to whole milliseconds, saturating at `u64::MAX`.
pub fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
