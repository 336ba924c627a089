//! Resource Watchdog
//!
//! Periodically samples memory, runs leak detection over the history, and
//! releases every tracked resource on its own when a leak is likely. After
//! `destroy`, sampling stops and every operation is a no-op.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::tasks::spawn_ticker;
use crate::watchdog::{
    assess, LeakAssessment, MemoryProbe, MemorySample, Observer, ProcessMemoryProbe,
    RegistryCounts, ResourceRegistry, WatchdogConfig,
};

struct WatchdogInner {
    config: WatchdogConfig,
    probe: Mutex<Box<dyn MemoryProbe>>,
    history: RwLock<VecDeque<MemorySample>>,
    registry: Mutex<ResourceRegistry>,
    destroyed: AtomicBool,
}

impl WatchdogInner {
    fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    async fn record_sample(&self, sample: MemorySample) {
        if self.is_destroyed() {
            return;
        }
        let mut history = self.history.write().await;
        history.push_back(sample);
        while history.len() > self.config.max_samples {
            history.pop_front();
        }
    }

    async fn detect_leaks(&self) -> LeakAssessment {
        let history = self.history.read().await;
        let samples: Vec<MemorySample> = history.iter().copied().collect();
        assess(&samples, self.config.leak_threshold)
    }

    async fn cleanup_resources(&self) -> RegistryCounts {
        let released = self.registry.lock().await.release_all();
        if released.total() > 0 {
            info!(
                timers = released.timers,
                intervals = released.intervals,
                listeners = released.listeners,
                pending = released.pending,
                observers = released.observers,
                "Tracked resources released"
            );
        }
        released
    }

    async fn sample_once(&self) -> Option<LeakAssessment> {
        if self.is_destroyed() {
            return None;
        }

        let sample = self.probe.lock().await.sample();
        match sample {
            Some(sample) => self.record_sample(sample).await,
            None => debug!("Memory probe returned no reading"),
        }

        let assessment = self.detect_leaks().await;
        if assessment.is_leaking {
            warn!(
                growth_rate_per_second = assessment.growth_rate_per_second,
                confidence = assessment.confidence,
                "Potential memory leak detected"
            );
            if assessment.confidence > self.config.auto_cleanup_confidence {
                info!("Leak confidence above threshold, releasing tracked resources");
                self.cleanup_resources().await;
            }
        }
        Some(assessment)
    }
}

// == Resource Watchdog ==
/// Memory sampler and tracked-resource registry.
pub struct ResourceWatchdog {
    inner: Arc<WatchdogInner>,
    sampler: Mutex<Option<JoinHandle<()>>>,
}

impl ResourceWatchdog {
    /// Creates a watchdog reading this process's memory.
    pub fn new(config: WatchdogConfig) -> Self {
        Self::with_probe(config, Box::new(ProcessMemoryProbe::new()))
    }

    /// Creates a watchdog reading from a custom probe.
    pub fn with_probe(config: WatchdogConfig, probe: Box<dyn MemoryProbe>) -> Self {
        Self {
            inner: Arc::new(WatchdogInner {
                config,
                probe: Mutex::new(probe),
                history: RwLock::new(VecDeque::new()),
                registry: Mutex::new(ResourceRegistry::new()),
                destroyed: AtomicBool::new(false),
            }),
            sampler: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &WatchdogConfig {
        &self.inner.config
    }

    // == Monitoring ==
    /// Spawns the sampling loop. Calling it again, or after destroy, does nothing.
    pub async fn start_monitoring(&self) {
        let mut slot = self.sampler.lock().await;
        if slot.is_some() || self.inner.is_destroyed() {
            return;
        }

        let inner = Arc::clone(&self.inner);
        let handle = spawn_ticker(
            "memory-watchdog",
            self.inner.config.sample_interval,
            move || {
                let inner = Arc::clone(&inner);
                async move {
                    inner.sample_once().await;
                }
            },
        );
        *slot = Some(handle);
        info!("Memory monitoring started");
    }

    /// Stops the sampling loop, keeping history and tracked resources.
    pub async fn stop_monitoring(&self) {
        if let Some(handle) = self.sampler.lock().await.take() {
            handle.abort();
            info!("Memory monitoring stopped");
        }
    }

    pub async fn is_monitoring(&self) -> bool {
        self.sampler.lock().await.is_some()
    }

    /// Runs one sampling iteration: sample, detect, and clean up if warranted.
    pub async fn sample_once(&self) -> Option<LeakAssessment> {
        self.inner.sample_once().await
    }

    // == Samples ==
    /// Appends a sample to the history, dropping the oldest past capacity.
    pub async fn record_sample(&self, sample: MemorySample) {
        self.inner.record_sample(sample).await;
    }

    /// Reads the probe and records the sample.
    pub async fn take_sample(&self) -> Option<MemorySample> {
        if self.inner.is_destroyed() {
            return None;
        }
        let sample = self.inner.probe.lock().await.sample()?;
        self.inner.record_sample(sample).await;
        Some(sample)
    }

    /// Snapshot of the history, oldest first.
    pub async fn history(&self) -> Vec<MemorySample> {
        self.inner.history.read().await.iter().copied().collect()
    }

    pub async fn detect_leaks(&self) -> LeakAssessment {
        self.inner.detect_leaks().await
    }

    // == Resource Tracking ==
    /// Tracks a one-shot delayed task, aborted on cleanup.
    pub async fn track_timer(&self, handle: JoinHandle<()>) {
        self.track(|registry| registry.track_timer(handle)).await;
    }

    /// Tracks a repeating task, aborted on cleanup.
    pub async fn track_interval(&self, handle: JoinHandle<()>) {
        self.track(|registry| registry.track_interval(handle)).await;
    }

    /// Tracks a listener registration, forgotten on cleanup.
    pub async fn track_listener(&self, target: impl Into<String>, event: impl Into<String>) {
        self.track(|registry| registry.track_listener(target, event)).await;
    }

    /// Tracks an in-flight operation, detached on cleanup.
    pub async fn track_pending(&self, handle: JoinHandle<()>) {
        self.track(|registry| registry.track_pending(handle)).await;
    }

    /// Tracks an observer, disconnected on cleanup.
    pub async fn track_observer(&self, observer: Box<dyn Observer>) {
        self.track(|registry| registry.track_observer(observer)).await;
    }

    /// Applies `register` unless destroyed. The flag is read under the
    /// registry lock so nothing lands after `destroy` has released it.
    async fn track(&self, register: impl FnOnce(&mut ResourceRegistry)) {
        let mut registry = self.inner.registry.lock().await;
        if !self.inner.is_destroyed() {
            register(&mut *registry);
        }
    }

    /// Number of tracked resources per kind.
    pub async fn registry_counts(&self) -> RegistryCounts {
        self.inner.registry.lock().await.counts()
    }

    /// Releases every tracked resource, returning what was released.
    pub async fn cleanup_resources(&self) -> RegistryCounts {
        self.inner.cleanup_resources().await
    }

    // == Destroy ==
    /// Stops sampling, releases tracked resources and clears history. Idempotent.
    pub async fn destroy(&self) {
        if self.inner.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.stop_monitoring().await;
        self.inner.cleanup_resources().await;
        self.inner.history.write().await.clear();
        info!("Resource watchdog destroyed");
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.is_destroyed()
    }
}
