//! Query Performance Monitor Module
//!
//! Times wrapped operations, flags slow ones and aggregates the retained
//! measurements into reports.

mod metric;
mod query;
mod report;

pub use metric::QueryMetric;
pub use query::QueryMonitor;
pub use report::{PerformanceReport, TopQuery};

// == Public Constants ==
/// Default slow query threshold in milliseconds
pub const DEFAULT_SLOW_QUERY_THRESHOLD_MS: u64 = 1000;

/// Hard cap on retained metrics; older entries are dropped
pub const MAX_RETAINED_METRICS: usize = 1000;

/// Number of operation names listed in a report
pub const TOP_QUERY_COUNT: usize = 10;

// == Monitor Config ==
/// Construction-time settings for a [`QueryMonitor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    pub slow_query_threshold_ms: u64,
    /// Ring buffer capacity
    pub max_metrics: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            slow_query_threshold_ms: DEFAULT_SLOW_QUERY_THRESHOLD_MS,
            max_metrics: MAX_RETAINED_METRICS,
        }
    }
}
