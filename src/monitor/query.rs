//! Query Monitor
//!
//! Wraps operations to measure them. The monitor never alters an outcome: a
//! failed operation is recorded and its original error handed back untouched.
//! There is no timeout and no cancellation; the wrapped future runs to
//! completion.

use std::collections::{HashMap, VecDeque};
use std::fmt::Display;
use std::future::Future;
use std::time::Instant;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::cache::current_timestamp_ms;
use crate::monitor::{MonitorConfig, PerformanceReport, QueryMetric};

#[derive(Debug)]
struct MonitorState {
    metrics: VecDeque<QueryMetric>,
    capacity: usize,
    slow_query_threshold_ms: u64,
    active: bool,
}

// == Query Monitor ==
/// Records durations of wrapped operations into a bounded ring buffer.
#[derive(Debug)]
pub struct QueryMonitor {
    state: RwLock<MonitorState>,
}

impl QueryMonitor {
    /// Creates an idle monitor with an empty buffer.
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            state: RwLock::new(MonitorState {
                metrics: VecDeque::with_capacity(config.max_metrics.min(1024)),
                capacity: config.max_metrics,
                slow_query_threshold_ms: config.slow_query_threshold_ms,
                active: false,
            }),
        }
    }

    // == Monitoring Session ==
    /// Discards retained metrics and opens a new session.
    pub async fn start_monitoring(&self) {
        let mut state = self.state.write().await;
        state.metrics.clear();
        state.active = true;
        info!(
            threshold_ms = state.slow_query_threshold_ms,
            "Query performance monitoring started"
        );
    }

    /// Closes the session and reports on everything retained.
    pub async fn stop_monitoring(&self) -> PerformanceReport {
        let mut state = self.state.write().await;
        state.active = false;
        let report =
            PerformanceReport::from_metrics(state.metrics.iter(), state.slow_query_threshold_ms);
        info!(
            total_queries = report.total_queries,
            slow_queries = report.slow_queries.len(),
            error_rate = report.error_rate,
            "Query performance monitoring stopped"
        );
        report
    }

    /// Returns true while a session is open.
    pub async fn is_monitoring(&self) -> bool {
        self.state.read().await.active
    }

    // == Monitor ==
    /// Runs `operation`, records its duration and outcome, and returns its result unchanged.
    pub async fn monitor<T, E, Fut>(
        &self,
        name: &str,
        metadata: Option<HashMap<String, Value>>,
        operation: Fut,
    ) -> Result<T, E>
    where
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let timestamp = current_timestamp_ms();
        let started = Instant::now();
        let result = operation.await;
        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;

        self.record(QueryMetric {
            name: name.to_string(),
            duration_ms,
            timestamp,
            success: result.is_ok(),
            error: result.as_ref().err().map(ToString::to_string),
            metadata,
        })
        .await;

        result
    }

    // == Record ==
    /// Appends a metric, dropping the oldest past capacity. Slow and failed
    /// executions are logged here rather than at report time.
    pub async fn record(&self, metric: QueryMetric) {
        let mut state = self.state.write().await;

        if metric.is_slow(state.slow_query_threshold_ms) {
            warn!(
                query = %metric.name,
                duration_ms = metric.duration_ms,
                threshold_ms = state.slow_query_threshold_ms,
                "Slow query detected"
            );
        }
        if let Some(error) = &metric.error {
            warn!(query = %metric.name, error = %error, "Monitored operation failed");
        }

        state.metrics.push_back(metric);
        while state.metrics.len() > state.capacity {
            state.metrics.pop_front();
        }
    }

    // == Threshold ==
    /// Changes the threshold used for new slow-query warnings and reports.
    pub async fn set_slow_query_threshold(&self, threshold_ms: u64) {
        let mut state = self.state.write().await;
        info!(
            from = state.slow_query_threshold_ms,
            to = threshold_ms,
            "Slow query threshold changed"
        );
        state.slow_query_threshold_ms = threshold_ms;
    }

    /// Current slow query threshold in milliseconds.
    pub async fn slow_query_threshold(&self) -> u64 {
        self.state.read().await.slow_query_threshold_ms
    }

    /// Snapshot of the retained metrics, oldest first.
    pub async fn current_metrics(&self) -> Vec<QueryMetric> {
        self.state.read().await.metrics.iter().cloned().collect()
    }

    /// Report on the retained metrics without ending the session.
    pub async fn report(&self) -> PerformanceReport {
        let state = self.state.read().await;
        PerformanceReport::from_metrics(state.metrics.iter(), state.slow_query_threshold_ms)
    }
}

impl Default for QueryMonitor {
    fn default() -> Self {
        Self::new(MonitorConfig::default())
    }
}
