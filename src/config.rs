//! Configuration Module
//!
//! Handles loading the resilience layer configuration from environment variables
//! and deriving the per-component settings from it.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::cache::CacheConfig;
use crate::monitor::MonitorConfig;
use crate::rate_limit::RateLimitConfig;
use crate::watchdog::WatchdogConfig;

/// Resilience layer configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// HTTP port for the diagnostics server
    pub server_port: u16,
    /// Default TTL in seconds for cache entries without explicit TTL
    pub cache_default_ttl: u64,
    /// Interval in seconds between expired-entry sweeps
    pub cache_sweep_interval: u64,
    /// Rate limit window length in seconds
    pub rate_limit_window: u64,
    /// Requests allowed per identifier per window
    pub rate_limit_max_requests: u32,
    /// Block duration in seconds once the budget is exhausted
    pub rate_limit_block: u64,
    /// Interval in seconds between rate limit table sweeps
    pub rate_limit_cleanup_interval: u64,
    /// Duration in milliseconds above which a query is slow
    pub slow_query_threshold_ms: u64,
    /// Relative heap growth per second considered a leak (0.1 = 10%)
    pub leak_threshold: f64,
    /// Interval in seconds between memory samples
    pub memory_monitor_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - Diagnostics HTTP port (default: 3000)
    /// - `CACHE_DEFAULT_TTL_SECS` - Default cache TTL (default: 300)
    /// - `CACHE_SWEEP_INTERVAL_SECS` - Cache sweep frequency (default: 60)
    /// - `RATE_LIMIT_WINDOW_SECS` - Rate limit window (default: 60)
    /// - `RATE_LIMIT_MAX_REQUESTS` - Requests per window (default: 100)
    /// - `RATE_LIMIT_BLOCK_SECS` - Block duration (default: 300)
    /// - `RATE_LIMIT_CLEANUP_INTERVAL_SECS` - Table sweep frequency (default: 60)
    /// - `SLOW_QUERY_THRESHOLD_MS` - Slow query threshold (default: 1000)
    /// - `LEAK_THRESHOLD` - Leak growth threshold (default: 0.1)
    /// - `MEMORY_MONITOR_INTERVAL_SECS` - Memory sampling frequency (default: 30)
    ///
    /// Interval variables must be positive; zero falls back to the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: env_or("SERVER_PORT", defaults.server_port),
            cache_default_ttl: env_or("CACHE_DEFAULT_TTL_SECS", defaults.cache_default_ttl),
            cache_sweep_interval: interval_or(
                "CACHE_SWEEP_INTERVAL_SECS",
                defaults.cache_sweep_interval,
            ),
            rate_limit_window: env_or("RATE_LIMIT_WINDOW_SECS", defaults.rate_limit_window),
            rate_limit_max_requests: env_or(
                "RATE_LIMIT_MAX_REQUESTS",
                defaults.rate_limit_max_requests,
            ),
            rate_limit_block: env_or("RATE_LIMIT_BLOCK_SECS", defaults.rate_limit_block),
            rate_limit_cleanup_interval: interval_or(
                "RATE_LIMIT_CLEANUP_INTERVAL_SECS",
                defaults.rate_limit_cleanup_interval,
            ),
            slow_query_threshold_ms: env_or(
                "SLOW_QUERY_THRESHOLD_MS",
                defaults.slow_query_threshold_ms,
            ),
            leak_threshold: env_or("LEAK_THRESHOLD", defaults.leak_threshold),
            memory_monitor_interval: interval_or(
                "MEMORY_MONITOR_INTERVAL_SECS",
                defaults.memory_monitor_interval,
            ),
        }
    }

    /// Settings for every TTL cache owned by the invalidation orchestrator.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            default_ttl: Duration::from_secs(self.cache_default_ttl),
            sweep_interval: Duration::from_secs(self.cache_sweep_interval),
        }
    }

    /// Settings for the request rate limiter.
    pub fn rate_limit_config(&self) -> RateLimitConfig {
        RateLimitConfig {
            window: Duration::from_secs(self.rate_limit_window),
            max_requests: self.rate_limit_max_requests,
            block_duration: Duration::from_secs(self.rate_limit_block),
            cleanup_interval: Duration::from_secs(self.rate_limit_cleanup_interval),
        }
    }

    /// Settings for the query performance monitor.
    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            slow_query_threshold_ms: self.slow_query_threshold_ms,
            ..MonitorConfig::default()
        }
    }

    /// Settings for the resource watchdog.
    pub fn watchdog_config(&self) -> WatchdogConfig {
        WatchdogConfig {
            leak_threshold: self.leak_threshold,
            sample_interval: Duration::from_secs(self.memory_monitor_interval),
            ..WatchdogConfig::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            cache_default_ttl: 300,
            cache_sweep_interval: 60,
            rate_limit_window: 60,
            rate_limit_max_requests: 100,
            rate_limit_block: 300,
            rate_limit_cleanup_interval: 60,
            slow_query_threshold_ms: 1000,
            leak_threshold: 0.1,
            memory_monitor_interval: 30,
        }
    }
}

/// Reads and parses an environment variable, falling back on absence or parse failure.
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Like [`env_or`] for task intervals in seconds; zero falls back to the default.
fn interval_or(name: &str, default: u64) -> u64 {
    match env_or(name, default) {
        0 => {
            warn!(variable = name, default, "Zero interval rejected, using default");
            default
        }
        secs => secs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.cache_default_ttl, 300);
        assert_eq!(config.cache_sweep_interval, 60);
        assert_eq!(config.rate_limit_max_requests, 100);
        assert_eq!(config.slow_query_threshold_ms, 1000);
        assert_eq!(config.leak_threshold, 0.1);
        assert_eq!(config.memory_monitor_interval, 30);
    }

    #[test]
    fn test_env_or_parses_and_falls_back() {
        env::set_var("RESILIENCE_TEST_PARSEABLE", "42");
        env::set_var("RESILIENCE_TEST_GARBAGE", "forty-two");

        assert_eq!(env_or("RESILIENCE_TEST_PARSEABLE", 7u64), 42);
        assert_eq!(env_or("RESILIENCE_TEST_GARBAGE", 7u64), 7);
        assert_eq!(env_or("RESILIENCE_TEST_MISSING", 7u64), 7);

        env::remove_var("RESILIENCE_TEST_PARSEABLE");
        env::remove_var("RESILIENCE_TEST_GARBAGE");
    }

    #[test]
    fn test_zero_interval_falls_back_to_default() {
        env::set_var("RESILIENCE_TEST_ZERO_INTERVAL", "0");
        env::set_var("RESILIENCE_TEST_INTERVAL", "15");

        assert_eq!(interval_or("RESILIENCE_TEST_ZERO_INTERVAL", 60), 60);
        assert_eq!(interval_or("RESILIENCE_TEST_INTERVAL", 60), 15);
        assert_eq!(interval_or("RESILIENCE_TEST_MISSING_INTERVAL", 60), 60);

        env::remove_var("RESILIENCE_TEST_ZERO_INTERVAL");
        env::remove_var("RESILIENCE_TEST_INTERVAL");
    }

    #[test]
    fn test_component_configs_follow_config() {
        let config = Config {
            rate_limit_window: 10,
            rate_limit_max_requests: 5,
            rate_limit_block: 20,
            ..Config::default()
        };

        let rate = config.rate_limit_config();
        assert_eq!(rate.window, Duration::from_secs(10));
        assert_eq!(rate.max_requests, 5);
        assert_eq!(rate.block_duration, Duration::from_secs(20));

        let cache = config.cache_config();
        assert_eq!(cache.default_ttl, Duration::from_secs(300));
        assert_eq!(cache.sweep_interval, Duration::from_secs(60));

        assert_eq!(config.monitor_config().slow_query_threshold_ms, 1000);
        assert_eq!(config.watchdog_config().sample_interval, Duration::from_secs(30));
    }
}
