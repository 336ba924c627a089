//! Resilience Layer - caching, invalidation and protection for data-heavy services
//!
//! Provides a TTL cache engine, a content-type driven invalidation
//! orchestrator, a per-identifier rate limiter, a query performance monitor
//! and a memory watchdog.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod invalidation;
pub mod models;
pub mod monitor;
pub mod rate_limit;
pub mod tasks;
pub mod watchdog;

pub use api::AppState;
pub use cache::TtlCache;
pub use config::Config;
pub use error::{ResilienceError, Result};
pub use invalidation::{ContentType, InvalidationOrchestrator};
pub use monitor::QueryMonitor;
pub use rate_limit::RateLimiter;
pub use watchdog::ResourceWatchdog;
