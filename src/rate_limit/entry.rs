//! Rate Limit Entry Module
//!
//! Per-identifier counting window and block state.

use serde::Serialize;

// == Rate Limit Entry ==
/// Counting state for one caller identifier.
///
/// `count` never exceeds the configured maximum while unblocked, and a blocked
/// entry is not incremented until its block expires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimitEntry {
    /// Requests admitted in the current window
    pub count: u32,
    /// Unix milliseconds at which the window ends
    pub window_reset_at: u64,
    pub blocked: bool,
    /// Unix milliseconds at which the block ends
    pub blocked_until: Option<u64>,
    /// Unix milliseconds of the latest request
    pub last_seen_at: u64,
}

impl RateLimitEntry {
    // == Constructor ==
    /// Opens a fresh window with the current request counted.
    pub fn fresh(now_ms: u64, window_ms: u64) -> Self {
        Self {
            count: 1,
            window_reset_at: now_ms.saturating_add(window_ms),
            blocked: false,
            blocked_until: None,
            last_seen_at: now_ms,
        }
    }

    /// Returns true while the block is still in force at `now_ms`.
    pub fn is_block_active(&self, now_ms: u64) -> bool {
        self.blocked && self.blocked_until.is_some_and(|until| now_ms < until)
    }

    /// Returns true once the window has passed.
    pub fn is_window_expired(&self, now_ms: u64) -> bool {
        now_ms > self.window_reset_at
    }

    /// Blocks the entry until `until_ms`.
    pub fn block(&mut self, until_ms: u64) {
        self.blocked = true;
        self.blocked_until = Some(until_ms);
    }
}
