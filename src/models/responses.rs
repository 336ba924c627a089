//! Response DTOs for the diagnostics API

use std::collections::BTreeMap;

use serde::Serialize;

use crate::cache::CacheStats;
use crate::invalidation::CacheStatus;
use crate::rate_limit::RateLimitStatus;
use crate::watchdog::{LeakAssessment, MemorySample, RegistryCounts};

/// Response body for GET /health
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// "healthy", or "degraded" once the layer has been torn down
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self::with_status("healthy")
    }

    pub fn degraded() -> Self {
        Self::with_status("degraded")
    }

    fn with_status(status: &str) -> Self {
        Self {
            status: status.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Statistics of one cache namespace with its derived hit rate.
#[derive(Debug, Clone, Serialize)]
pub struct NamespaceStats {
    #[serde(flatten)]
    pub stats: CacheStats,
    pub hit_rate: f64,
}

impl From<CacheStats> for NamespaceStats {
    fn from(stats: CacheStats) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            stats,
        }
    }
}

/// Response body for GET /stats
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub status: CacheStatus,
    pub namespaces: BTreeMap<String, NamespaceStats>,
    /// Sum of every namespace's item count
    pub total_items: usize,
    /// Sum of every namespace's memory estimate, in bytes
    pub total_memory_footprint: usize,
}

impl StatsResponse {
    pub fn new(status: CacheStatus, stats: BTreeMap<String, CacheStats>) -> Self {
        let total_items = stats.values().map(|s| s.item_count).sum();
        let total_memory_footprint = stats.values().map(|s| s.memory_footprint).sum();
        Self {
            status,
            namespaces: stats
                .into_iter()
                .map(|(namespace, stats)| (namespace, stats.into()))
                .collect(),
            total_items,
            total_memory_footprint,
        }
    }
}

/// Response body for GET /rate-limit/:identifier
#[derive(Debug, Clone, Serialize)]
pub struct RateLimitResponse {
    pub identifier: String,
    #[serde(flatten)]
    pub status: RateLimitStatus,
}

/// Response body for GET /memory
#[derive(Debug, Clone, Serialize)]
pub struct MemoryResponse {
    pub monitoring: bool,
    pub assessment: LeakAssessment,
    pub resources: RegistryCounts,
    pub latest_sample: Option<MemorySample>,
    pub samples: usize,
}
