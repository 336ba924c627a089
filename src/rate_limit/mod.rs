//! Rate Limit Module
//!
//! Fixed-window request counting per caller identifier with a block state
//! machine once the budget is exhausted.

mod entry;
mod limiter;

#[cfg(test)]
mod property_tests;

use std::time::Duration;

pub use entry::RateLimitEntry;
pub use limiter::{RateLimitStatus, RateLimiter};

// == Rate Limit Config ==
/// Construction-time settings for a [`RateLimiter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Length of one counting window
    pub window: Duration,
    /// Requests admitted per identifier per window; zero denies everything
    pub max_requests: u32,
    /// How long an identifier stays blocked after exceeding the budget
    pub block_duration: Duration,
    /// Interval of the background table sweep
    pub cleanup_interval: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(60),
            max_requests: 100,
            block_duration: Duration::from_secs(300),
            cleanup_interval: Duration::from_secs(60),
        }
    }
}
