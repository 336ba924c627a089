//! Property-Based Tests for Rate Limit Module
//!
//! Checks admission counts and the block lifecycle for arbitrary budgets.

use proptest::prelude::*;
use std::time::Duration;

use crate::rate_limit::{RateLimitConfig, RateLimiter};

fn limiter(max_requests: u32, window_ms: u64, block_ms: u64) -> RateLimiter {
    RateLimiter::new(RateLimitConfig {
        window: Duration::from_millis(window_ms),
        max_requests,
        block_duration: Duration::from_millis(block_ms),
        cleanup_interval: Duration::from_secs(60),
    })
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime")
        .block_on(future)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Within one window exactly `max_requests` calls are admitted and every
    // later call is denied.
    #[test]
    fn prop_admits_exactly_budget_within_window(
        max_requests in 1u32..20,
        attempts in 1usize..60,
        offsets in prop::collection::vec(0u64..1_000, 60),
    ) {
        let limiter = limiter(max_requests, 1_000, 10_000);
        let admitted = block_on(async {
            let mut admitted = 0usize;
            for offset in offsets.iter().take(attempts) {
                if limiter.is_allowed_at("caller", 5_000 + offset).await {
                    admitted += 1;
                }
            }
            admitted
        });

        prop_assert_eq!(admitted, attempts.min(max_requests as usize));
    }

    // Exceeding the budget blocks for exactly the block duration, after which
    // the caller starts over with a count of one.
    #[test]
    fn prop_block_lasts_block_duration(
        max_requests in 1u32..10,
        block_ms in 1u64..50_000,
        elapsed in 0u64..100_000,
    ) {
        let limiter = limiter(max_requests, 1_000, block_ms);
        let (allowed, remaining) = block_on(async {
            for _ in 0..=max_requests {
                limiter.is_allowed_at("caller", 0).await;
            }
            let allowed = limiter.is_allowed_at("caller", elapsed).await;
            let remaining = limiter.status_at("caller", elapsed).await.remaining;
            (allowed, remaining)
        });

        if elapsed < block_ms {
            prop_assert!(!allowed);
            prop_assert_eq!(remaining, 0);
        } else {
            prop_assert!(allowed);
            prop_assert_eq!(remaining, max_requests - 1);
        }
    }
}
