//! Rate Limiter
//!
//! Fixed-window counter per identifier. A window that has passed is replaced
//! outright rather than averaged, so a burst straddling a window boundary can
//! admit up to twice the nominal rate across the two windows.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{current_timestamp_ms, duration_ms};
use crate::rate_limit::{RateLimitConfig, RateLimitEntry};
use crate::tasks::spawn_ticker;

// == Rate Limit Status ==
/// Budget view for one identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimitStatus {
    /// Requests still admitted in the current window
    pub remaining: u32,
    /// Unix milliseconds at which the window ends
    pub reset_at: u64,
    pub blocked: bool,
    /// Unix milliseconds at which the block ends
    pub blocked_until: Option<u64>,
}

#[derive(Debug, Default)]
struct LimiterTable {
    entries: HashMap<String, RateLimitEntry>,
    destroyed: bool,
}

impl LimiterTable {
    /// Applies one request to the identifier's entry and returns whether it is admitted.
    fn admit(&mut self, identifier: &str, now_ms: u64, config: &RateLimitConfig) -> bool {
        if self.destroyed || config.max_requests == 0 {
            return false;
        }
        let window_ms = duration_ms(config.window);

        let Some(entry) = self.entries.get_mut(identifier) else {
            self.entries
                .insert(identifier.to_string(), RateLimitEntry::fresh(now_ms, window_ms));
            return true;
        };

        if entry.blocked {
            if entry.is_block_active(now_ms) {
                entry.last_seen_at = now_ms;
                return false;
            }
            info!(identifier, "Rate limit block expired");
            *entry = RateLimitEntry::fresh(now_ms, window_ms);
            return true;
        }

        if entry.is_window_expired(now_ms) {
            *entry = RateLimitEntry::fresh(now_ms, window_ms);
            return true;
        }

        entry.last_seen_at = now_ms;
        if entry.count >= config.max_requests {
            let until = now_ms.saturating_add(duration_ms(config.block_duration));
            entry.block(until);
            warn!(
                identifier,
                count = entry.count,
                blocked_until = until,
                "Rate limit exceeded, blocking identifier"
            );
            return false;
        }

        entry.count += 1;
        true
    }

    fn status(&self, identifier: &str, now_ms: u64, config: &RateLimitConfig) -> RateLimitStatus {
        if self.destroyed {
            return RateLimitStatus {
                remaining: 0,
                reset_at: now_ms,
                blocked: true,
                blocked_until: None,
            };
        }

        let fresh_window = RateLimitStatus {
            remaining: config.max_requests,
            reset_at: now_ms.saturating_add(duration_ms(config.window)),
            blocked: false,
            blocked_until: None,
        };

        match self.entries.get(identifier) {
            None => fresh_window,
            Some(entry) if entry.is_block_active(now_ms) => RateLimitStatus {
                remaining: 0,
                reset_at: entry.window_reset_at,
                blocked: true,
                blocked_until: entry.blocked_until,
            },
            Some(entry) if entry.blocked || entry.is_window_expired(now_ms) => fresh_window,
            Some(entry) => RateLimitStatus {
                remaining: config.max_requests.saturating_sub(entry.count),
                reset_at: entry.window_reset_at,
                blocked: false,
                blocked_until: None,
            },
        }
    }

    /// Drops entries whose window has passed and which are not actively blocked.
    fn cleanup(&mut self, now_ms: u64) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| !entry.is_window_expired(now_ms) || entry.is_block_active(now_ms));
        before - self.entries.len()
    }
}

// == Rate Limiter ==
/// Per-identifier request throttle.
///
/// After `destroy`, every request is denied.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    table: Arc<RwLock<LimiterTable>>,
    cleaner: Mutex<Option<JoinHandle<()>>>,
}

impl RateLimiter {
    /// Creates a limiter with an empty table; the cleanup task is not started.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            table: Arc::new(RwLock::new(LimiterTable::default())),
            cleaner: Mutex::new(None),
        }
    }

    /// Returns the construction-time settings.
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    // == Is Allowed ==
    /// Counts a request from `identifier` and returns whether it may proceed.
    pub async fn is_allowed(&self, identifier: &str) -> bool {
        self.is_allowed_at(identifier, current_timestamp_ms()).await
    }

    /// Same as [`is_allowed`](Self::is_allowed) evaluated at `now_ms`.
    pub async fn is_allowed_at(&self, identifier: &str, now_ms: u64) -> bool {
        self.table
            .write()
            .await
            .admit(identifier, now_ms, &self.config)
    }

    // == Record Failure ==
    /// Charges a failed request against the identifier's budget.
    pub async fn record_failure(&self, identifier: &str) {
        self.record_failure_at(identifier, current_timestamp_ms()).await;
    }

    /// Same as [`record_failure`](Self::record_failure) evaluated at `now_ms`.
    pub async fn record_failure_at(&self, identifier: &str, now_ms: u64) {
        let admitted = self
            .table
            .write()
            .await
            .admit(identifier, now_ms, &self.config);
        debug!(identifier, admitted, "Recorded failed request");
    }

    // == Status ==
    /// Reports the identifier's budget without counting a request.
    pub async fn status(&self, identifier: &str) -> RateLimitStatus {
        self.status_at(identifier, current_timestamp_ms()).await
    }

    /// Same as [`status`](Self::status) evaluated at `now_ms`.
    pub async fn status_at(&self, identifier: &str, now_ms: u64) -> RateLimitStatus {
        self.table.read().await.status(identifier, now_ms, &self.config)
    }

    /// Forgets an identifier, lifting any block. Returns whether it was tracked.
    pub async fn reset(&self, identifier: &str) -> bool {
        let removed = self.table.write().await.entries.remove(identifier).is_some();
        if removed {
            info!(identifier, "Rate limit entry reset");
        }
        removed
    }

    /// Number of identifiers currently tracked.
    pub async fn tracked_identifiers(&self) -> usize {
        self.table.read().await.entries.len()
    }

    // == Cleanup ==
    /// Runs one table sweep immediately, returning the number of entries dropped.
    pub async fn cleanup(&self) -> usize {
        self.cleanup_at(current_timestamp_ms()).await
    }

    /// Same as [`cleanup`](Self::cleanup) evaluated at `now_ms`.
    pub async fn cleanup_at(&self, now_ms: u64) -> usize {
        self.table.write().await.cleanup(now_ms)
    }

    /// Spawns the periodic table sweep. Calling it again, or after destroy, does nothing.
    pub async fn start_cleanup(&self) {
        let mut slot = self.cleaner.lock().await;
        if slot.is_some() || self.table.read().await.destroyed {
            return;
        }

        let table = Arc::clone(&self.table);
        let handle = spawn_ticker("rate-limit-cleanup", self.config.cleanup_interval, move || {
            let table = Arc::clone(&table);
            async move {
                let removed = table.write().await.cleanup(current_timestamp_ms());
                if removed > 0 {
                    info!(removed, "Rate limit cleanup: dropped idle entries");
                } else {
                    debug!("Rate limit cleanup: no idle entries found");
                }
            }
        });
        *slot = Some(handle);
    }

    // == Destroy ==
    /// Stops the sweep and drops all entries; later requests are denied. Idempotent.
    pub async fn destroy(&self) {
        // Held until the table is marked, so `start_cleanup` cannot spawn in between.
        let mut slot = self.cleaner.lock().await;
        {
            let mut table = self.table.write().await;
            if !table.destroyed {
                table.entries.clear();
                table.destroyed = true;
                info!("Rate limiter destroyed");
            }
        }
        if let Some(handle) = slot.take() {
            handle.abort();
        }
    }

    /// Returns true once `destroy` has run.
    pub async fn is_destroyed(&self) -> bool {
        self.table.read().await.destroyed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn limiter(max_requests: u32) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            window: Duration::from_millis(1_000),
            max_requests,
            block_duration: Duration::from_millis(5_000),
            cleanup_interval: Duration::from_millis(50),
        })
    }

    #[tokio::test]
    async fn test_sixth_request_is_denied_and_blocks() {
        let limiter = limiter(5);

        for _ in 0..5 {
            assert!(limiter.is_allowed_at("10.0.0.1", 100).await);
        }
        assert!(!limiter.is_allowed_at("10.0.0.1", 100).await);

        let status = limiter.status_at("10.0.0.1", 100).await;
        assert!(status.blocked);
        assert_eq!(status.remaining, 0);
        assert_eq!(status.blocked_until, Some(5_100));
    }

    #[tokio::test]
    async fn test_huge_durations_saturate() {
        let limiter = RateLimiter::new(RateLimitConfig {
            window: Duration::MAX,
            max_requests: 1,
            block_duration: Duration::MAX,
            cleanup_interval: Duration::from_secs(60),
        });

        assert!(limiter.is_allowed_at("id", 1_000).await);
        assert!(!limiter.is_allowed_at("id", 2_000).await);

        let status = limiter.status_at("id", 3_000).await;
        assert!(status.blocked);
        assert_eq!(status.blocked_until, Some(u64::MAX));
        assert!(!limiter.is_allowed_at("id", 1_000_000_000).await);
    }

    #[tokio::test]
    async fn test_block_holds_across_windows_until_expiry() {
        let limiter = limiter(5);
        for _ in 0..6 {
            limiter.is_allowed_at("id", 0).await;
        }

        // Window rolled over but the block is still in force
        assert!(!limiter.is_allowed_at("id", 2_000).await);
        assert!(!limiter.is_allowed_at("id", 4_999).await);
    }

    #[tokio::test]
    async fn test_block_expiry_starts_fresh_window() {
        let limiter = limiter(5);
        for _ in 0..6 {
            limiter.is_allowed_at("id", 0).await;
        }

        assert!(limiter.is_allowed_at("id", 5_000).await);

        let status = limiter.status_at("id", 5_000).await;
        assert!(!status.blocked);
        assert_eq!(status.remaining, 4, "fresh window counted the admitting request");
        assert_eq!(status.reset_at, 6_000);
    }

    #[tokio::test]
    async fn test_window_rollover_is_hard_reset() {
        let limiter = limiter(5);

        assert!(limiter.is_allowed_at("id", 0).await);
        for _ in 0..4 {
            assert!(limiter.is_allowed_at("id", 1_000).await);
        }
        // Boundary instant still belongs to the first window
        assert_eq!(limiter.status_at("id", 1_000).await.remaining, 0);

        // One millisecond later a full new budget is available: nine requests
        // admitted within two milliseconds across the boundary.
        for _ in 0..5 {
            assert!(limiter.is_allowed_at("id", 1_001).await);
        }
        assert!(!limiter.is_allowed_at("id", 1_001).await);
    }

    #[tokio::test]
    async fn test_identifiers_are_independent() {
        let limiter = limiter(1);

        assert!(limiter.is_allowed_at("a", 0).await);
        assert!(!limiter.is_allowed_at("a", 0).await);
        assert!(limiter.is_allowed_at("b", 0).await);
    }

    #[tokio::test]
    async fn test_record_failure_consumes_budget() {
        let limiter = limiter(3);

        limiter.record_failure_at("id", 0).await;
        limiter.record_failure_at("id", 0).await;
        assert_eq!(limiter.status_at("id", 0).await.remaining, 1);

        assert!(limiter.is_allowed_at("id", 0).await);
        assert!(!limiter.is_allowed_at("id", 0).await);
    }

    #[tokio::test]
    async fn test_status_of_unknown_identifier() {
        let limiter = limiter(5);
        let status = limiter.status_at("nobody", 10).await;

        assert_eq!(status.remaining, 5);
        assert_eq!(status.reset_at, 1_010);
        assert!(!status.blocked);
        assert_eq!(limiter.tracked_identifiers().await, 0);
    }

    #[tokio::test]
    async fn test_zero_budget_denies_everything() {
        let limiter = limiter(0);
        assert!(!limiter.is_allowed_at("id", 0).await);
    }

    #[tokio::test]
    async fn test_reset_lifts_block() {
        let limiter = limiter(1);
        limiter.is_allowed_at("id", 0).await;
        limiter.is_allowed_at("id", 0).await;

        assert!(limiter.reset("id").await);
        assert!(limiter.is_allowed_at("id", 1).await);
    }

    #[tokio::test]
    async fn test_cleanup_keeps_active_and_blocked_entries() {
        let limiter = limiter(1);
        limiter.is_allowed_at("idle", 0).await;
        limiter.is_allowed_at("blocked", 0).await;
        limiter.is_allowed_at("blocked", 0).await;
        limiter.is_allowed_at("active", 1_500).await;

        assert_eq!(limiter.cleanup_at(2_000).await, 1);
        assert_eq!(limiter.tracked_identifiers().await, 2);

        // Block over and window long gone
        assert_eq!(limiter.cleanup_at(6_000).await, 2);
        assert_eq!(limiter.tracked_identifiers().await, 0);
    }

    #[tokio::test]
    async fn test_background_cleanup_runs() {
        let limiter = RateLimiter::new(RateLimitConfig {
            window: Duration::from_millis(10),
            max_requests: 5,
            block_duration: Duration::from_millis(10),
            cleanup_interval: Duration::from_millis(30),
        });
        limiter.is_allowed("caller").await;
        limiter.start_cleanup().await;

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(limiter.tracked_identifiers().await, 0);

        limiter.destroy().await;
    }

    #[tokio::test]
    async fn test_destroyed_limiter_denies() {
        let limiter = limiter(5);
        limiter.start_cleanup().await;
        limiter.destroy().await;
        limiter.destroy().await;

        assert!(!limiter.is_allowed("id").await);
        limiter.record_failure("id").await;
        let status = limiter.status("id").await;
        assert!(status.blocked);
        assert_eq!(status.remaining, 0);
        assert_eq!(limiter.tracked_identifiers().await, 0);
    }

    #[tokio::test]
    async fn test_start_racing_destroy_leaves_no_cleaner() {
        for _ in 0..50 {
            let limiter = limiter(5);

            tokio::join!(limiter.destroy(), limiter.start_cleanup());

            assert!(limiter.is_destroyed().await);
            assert!(limiter.cleaner.lock().await.is_none());
        }
    }
}
