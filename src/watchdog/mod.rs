//! Resource Watchdog Module
//!
//! Samples process memory, estimates a growth trend, and keeps a registry of
//! long-lived handles that can be released in bulk when a leak is suspected.

mod leak;
mod registry;
mod resource;
mod sample;

use std::time::Duration;

pub use leak::{assess, LeakAssessment, Trend};
pub use registry::{ListenerRegistration, Observer, RegistryCounts, ResourceRegistry};
pub use resource::ResourceWatchdog;
pub use sample::{MemoryProbe, MemorySample, ProcessMemoryProbe};

// == Public Constants ==
/// Memory samples retained; older samples are dropped
pub const MAX_MEMORY_SAMPLES: usize = 100;

/// Most recent samples considered by leak detection
pub const LEAK_WINDOW: usize = 10;

/// Samples required before a trend is reported
pub const MIN_SAMPLES_FOR_DETECTION: usize = 3;

// == Watchdog Config ==
/// Construction-time settings for a [`ResourceWatchdog`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatchdogConfig {
    /// Interval between memory samples
    pub sample_interval: Duration,
    /// Relative heap growth per second above which memory is leaking (0.1 = 10%)
    pub leak_threshold: f64,
    /// Confidence above which a detected leak triggers resource cleanup
    pub auto_cleanup_confidence: f64,
    /// History capacity
    pub max_samples: usize,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            sample_interval: Duration::from_secs(30),
            leak_threshold: 0.1,
            auto_cleanup_confidence: 0.8,
            max_samples: MAX_MEMORY_SAMPLES,
        }
    }
}
