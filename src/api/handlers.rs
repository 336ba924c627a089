//! API Handlers
//!
//! HTTP request handlers for each diagnostics endpoint.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::json;
use tracing::info;

use crate::config::Config;
use crate::error::{ResilienceError, Result};
use crate::invalidation::{CacheStatus, ContentType, InvalidationOrchestrator, InvalidationSummary};
use crate::models::{
    HealthResponse, MemoryResponse, RateLimitResponse, StatsResponse, VersionRequest,
};
use crate::monitor::{PerformanceReport, QueryMonitor};
use crate::rate_limit::RateLimiter;
use crate::watchdog::ResourceWatchdog;

/// Application state shared across all handlers.
///
/// Each component owns its own locking, so the handles are plain `Arc`s.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<InvalidationOrchestrator>,
    pub rate_limiter: Arc<RateLimiter>,
    pub monitor: Arc<QueryMonitor>,
    pub watchdog: Arc<ResourceWatchdog>,
}

impl AppState {
    pub fn new(
        orchestrator: InvalidationOrchestrator,
        rate_limiter: RateLimiter,
        monitor: QueryMonitor,
        watchdog: ResourceWatchdog,
    ) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            rate_limiter: Arc::new(rate_limiter),
            monitor: Arc::new(monitor),
            watchdog: Arc::new(watchdog),
        }
    }

    /// Builds every component from configuration, with in-memory platform stores.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            InvalidationOrchestrator::in_memory(config.cache_config()),
            RateLimiter::new(config.rate_limit_config()),
            QueryMonitor::new(config.monitor_config()),
            ResourceWatchdog::new(config.watchdog_config()),
        )
    }

    /// Starts every background task: cache sweeps, limiter cleanup and memory sampling.
    pub async fn start(&self) {
        self.orchestrator.start().await;
        self.rate_limiter.start_cleanup().await;
        self.monitor.start_monitoring().await;
        self.watchdog.start_monitoring().await;
    }

    /// Tears down every component. Safe to call more than once.
    pub async fn destroy(&self) {
        let report = self.monitor.stop_monitoring().await;
        info!(
            total_queries = report.total_queries,
            error_rate = report.error_rate,
            "Final query performance report"
        );
        self.watchdog.destroy().await;
        self.rate_limiter.destroy().await;
        self.orchestrator.destroy().await;
    }
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    if state.orchestrator.is_destroyed().await {
        Json(HealthResponse::degraded())
    } else {
        Json(HealthResponse::healthy())
    }
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let status = state.orchestrator.status().await;
    let stats = state.orchestrator.stats().await;
    Json(StatsResponse::new(status, stats))
}

/// Handler for GET /status
pub async fn status_handler(State(state): State<AppState>) -> Json<CacheStatus> {
    Json(state.orchestrator.status().await)
}

/// Handler for POST /invalidate/:content_type
///
/// Unknown content types are rejected with 404.
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Path(content_type): Path<String>,
) -> Result<Json<InvalidationSummary>> {
    let content_type: ContentType = content_type.parse()?;
    let metadata = HashMap::from([("content_type".to_string(), json!(content_type))]);

    let summary = state
        .monitor
        .monitor("invalidate", Some(metadata), async {
            Ok::<_, ResilienceError>(state.orchestrator.invalidate(content_type).await)
        })
        .await?;

    Ok(Json(summary))
}

/// Handler for POST /clear
pub async fn clear_handler(State(state): State<AppState>) -> Result<Json<InvalidationSummary>> {
    let summary = state
        .monitor
        .monitor("clear_all", None, async {
            Ok::<_, ResilienceError>(state.orchestrator.clear_all().await)
        })
        .await?;

    Ok(Json(summary))
}

/// Handler for PUT /version
pub async fn version_handler(
    State(state): State<AppState>,
    Json(req): Json<VersionRequest>,
) -> Result<Json<CacheStatus>> {
    if let Some(error_msg) = req.validate() {
        return Err(ResilienceError::InvalidRequest(error_msg));
    }

    state
        .monitor
        .monitor("update_version", None, async {
            Ok::<_, ResilienceError>(state.orchestrator.update_version(req.version.trim()).await)
        })
        .await?;

    Ok(Json(state.orchestrator.status().await))
}

/// Handler for GET /rate-limit/:identifier
pub async fn rate_limit_handler(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
) -> Json<RateLimitResponse> {
    let status = state.rate_limiter.status(&identifier).await;
    Json(RateLimitResponse { identifier, status })
}

/// Handler for GET /performance
pub async fn performance_handler(State(state): State<AppState>) -> Json<PerformanceReport> {
    Json(state.monitor.report().await)
}

/// Handler for GET /memory
pub async fn memory_handler(State(state): State<AppState>) -> Json<MemoryResponse> {
    let history = state.watchdog.history().await;
    Json(MemoryResponse {
        monitoring: state.watchdog.is_monitoring().await,
        assessment: state.watchdog.detect_leaks().await,
        resources: state.watchdog.registry_counts().await,
        latest_sample: history.last().copied(),
        samples: history.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invalidation::CacheState;

    fn test_state() -> AppState {
        AppState::from_config(&Config::default())
    }

    #[tokio::test]
    async fn test_health_handler() {
        let state = test_state();
        assert_eq!(health_handler(State(state.clone())).await.status, "healthy");

        state.destroy().await;
        assert_eq!(health_handler(State(state)).await.status, "degraded");
    }

    #[tokio::test]
    async fn test_invalidate_handler_records_metric() {
        let state = test_state();
        let cache = state.orchestrator.cache("users").unwrap();
        cache.set("u1", json!({"id": 1}), None).await;

        let summary = invalidate_handler(State(state.clone()), Path("users".to_string()))
            .await
            .unwrap();

        assert_eq!(summary.entries_purged, 1);
        assert_eq!(state.orchestrator.status().await.state, CacheState::Dirty);

        let metrics = state.monitor.current_metrics().await;
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].name, "invalidate");
        assert!(metrics[0].success);
    }

    #[tokio::test]
    async fn test_invalidate_unknown_content_type() {
        let state = test_state();

        let result = invalidate_handler(State(state), Path("widgets".to_string())).await;

        assert_eq!(
            result.err(),
            Some(ResilienceError::UnknownContentType("widgets".to_string()))
        );
    }

    #[tokio::test]
    async fn test_version_handler() {
        let state = test_state();

        let status = version_handler(
            State(state.clone()),
            Json(VersionRequest {
                version: " 2.1.0 ".to_string(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(status.version.as_deref(), Some("2.1.0"));
        assert_eq!(status.state, CacheState::Clean);

        let result = version_handler(
            State(state),
            Json(VersionRequest {
                version: String::new(),
            }),
        )
        .await;
        assert!(matches!(result, Err(ResilienceError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_rate_limit_handler() {
        let state = test_state();
        state.rate_limiter.is_allowed("client-9").await;

        let response = rate_limit_handler(State(state), Path("client-9".to_string())).await;

        assert_eq!(response.identifier, "client-9");
        assert_eq!(response.status.remaining, 99);
        assert!(!response.status.blocked);
    }

    #[tokio::test]
    async fn test_memory_handler_without_samples() {
        let state = test_state();

        let response = memory_handler(State(state)).await;

        assert!(!response.monitoring);
        assert!(!response.assessment.is_leaking);
        assert_eq!(response.samples, 0);
        assert!(response.latest_sample.is_none());
    }
}
