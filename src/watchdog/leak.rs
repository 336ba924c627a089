//! Leak Detection
//!
//! Linear growth heuristic over recent memory samples. The confidence score is
//! `min(0.95, |growth| * 10)`, an advisory figure rather than a statistical test.

use serde::Serialize;

use crate::watchdog::{MemorySample, LEAK_WINDOW, MIN_SAMPLES_FOR_DETECTION};

/// Upper bound of the confidence score
const MAX_CONFIDENCE: f64 = 0.95;

// == Trend ==
/// Direction of heap usage over the assessed window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Stable,
    Growing,
    Declining,
}

// == Leak Assessment ==
/// Derived view of the memory history; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LeakAssessment {
    pub is_leaking: bool,
    /// Heuristic score in 0..=0.95
    pub confidence: f64,
    /// Relative heap growth per second
    pub growth_rate_per_second: f64,
    pub trend: Trend,
}

impl LeakAssessment {
    /// Reported when there is not enough data to compute a trend.
    pub fn insufficient_data() -> Self {
        Self {
            is_leaking: false,
            confidence: 0.0,
            growth_rate_per_second: 0.0,
            trend: Trend::Stable,
        }
    }
}

/// Assesses the last [`LEAK_WINDOW`] samples of `samples` (oldest first).
///
/// Fewer than three samples, a zero starting heap, or no elapsed time yield
/// [`LeakAssessment::insufficient_data`].
pub fn assess(samples: &[MemorySample], leak_threshold: f64) -> LeakAssessment {
    if samples.len() < MIN_SAMPLES_FOR_DETECTION {
        return LeakAssessment::insufficient_data();
    }

    let window = &samples[samples.len().saturating_sub(LEAK_WINDOW)..];
    let (earliest, latest) = match (window.first(), window.last()) {
        (Some(earliest), Some(latest)) => (earliest, latest),
        _ => return LeakAssessment::insufficient_data(),
    };

    let elapsed_secs = latest.timestamp.saturating_sub(earliest.timestamp) as f64 / 1000.0;
    if earliest.heap_used == 0 || elapsed_secs <= 0.0 {
        return LeakAssessment::insufficient_data();
    }

    let growth = (latest.heap_used as f64 - earliest.heap_used as f64)
        / earliest.heap_used as f64
        / elapsed_secs;

    let trend = if growth.abs() < 0.1 * leak_threshold {
        Trend::Stable
    } else if growth > 0.0 {
        Trend::Growing
    } else {
        Trend::Declining
    };

    LeakAssessment {
        is_leaking: growth > leak_threshold && trend == Trend::Growing,
        confidence: (growth.abs() * 10.0).min(MAX_CONFIDENCE),
        growth_rate_per_second: growth,
        trend,
    }
}
