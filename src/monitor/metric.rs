//! Query Metric Module

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// == Query Metric ==
/// One timed execution of a monitored operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryMetric {
    /// Operation name given by the caller
    pub name: String,
    /// Wall-clock duration in milliseconds
    pub duration_ms: f64,
    /// Unix milliseconds at which the operation started
    pub timestamp: u64,
    pub success: bool,
    /// Error message of a failed operation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, Value>>,
}

impl QueryMetric {
    /// Returns true when the duration strictly exceeds `threshold_ms`.
    pub fn is_slow(&self, threshold_ms: u64) -> bool {
        self.duration_ms > threshold_ms as f64
    }
}
