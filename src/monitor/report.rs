//! Performance Report Module
//!
//! Aggregates retained query metrics.

use std::collections::HashMap;

use serde::Serialize;

use crate::monitor::{QueryMetric, TOP_QUERY_COUNT};

// == Top Query ==
/// Frequency and mean duration of one operation name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopQuery {
    pub name: String,
    pub count: usize,
    /// Mean duration in milliseconds over every execution of this name
    pub average_time: f64,
}

// == Performance Report ==
/// Aggregate view over the retained metrics.
///
/// With no metrics every figure is zero and every list is empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceReport {
    pub total_queries: usize,
    /// Mean duration in milliseconds of successful executions only
    pub average_execution_time: f64,
    /// Executions whose duration exceeded the threshold
    pub slow_queries: Vec<QueryMetric>,
    /// Percentage of failed executions
    pub error_rate: f64,
    /// Most frequent names, most frequent first, ties by name
    pub top_queries: Vec<TopQuery>,
    pub slow_query_threshold_ms: u64,
}

impl PerformanceReport {
    /// Builds a report from metrics in retention order.
    pub fn from_metrics<'a, I>(metrics: I, slow_query_threshold_ms: u64) -> Self
    where
        I: IntoIterator<Item = &'a QueryMetric>,
    {
        let mut total_queries = 0usize;
        let mut failures = 0usize;
        let mut successful_time = 0.0;
        let mut successful = 0usize;
        let mut slow_queries = Vec::new();
        let mut by_name: HashMap<&str, (usize, f64)> = HashMap::new();

        for metric in metrics {
            total_queries += 1;
            if metric.success {
                successful += 1;
                successful_time += metric.duration_ms;
            } else {
                failures += 1;
            }
            if metric.is_slow(slow_query_threshold_ms) {
                slow_queries.push(metric.clone());
            }

            let (count, total) = by_name.entry(metric.name.as_str()).or_insert((0, 0.0));
            *count += 1;
            *total += metric.duration_ms;
        }

        let mut top_queries: Vec<TopQuery> = by_name
            .into_iter()
            .map(|(name, (count, total))| TopQuery {
                name: name.to_string(),
                count,
                average_time: total / count as f64,
            })
            .collect();
        top_queries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
        top_queries.truncate(TOP_QUERY_COUNT);

        Self {
            total_queries,
            average_execution_time: ratio(successful_time, successful),
            slow_queries,
            error_rate: ratio(failures as f64 * 100.0, total_queries),
            top_queries,
            slow_query_threshold_ms,
        }
    }
}

fn ratio(numerator: f64, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator / denominator as f64
    }
}
