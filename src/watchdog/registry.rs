//! Resource Registry
//!
//! Bookkeeping for long-lived handles. Each collection only grows until a bulk
//! release empties all of them at once.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use tokio::task::JoinHandle;

// == Observer ==
/// A structural observer that can be disconnected on release.
pub trait Observer: Send + Sync {
    /// Stops observing; called once when the registry is released.
    fn disconnect(&self);
}

// == Listener Registration ==
/// An event listener attached to a logical target.
///
/// Releasing only forgets the registration; detaching it from the real target
/// is the owner's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerRegistration {
    pub target: String,
    pub event: String,
}

// == Registry Counts ==
/// Number of tracked resources per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegistryCounts {
    pub timers: usize,
    pub intervals: usize,
    pub listeners: usize,
    pub pending: usize,
    pub observers: usize,
}

impl RegistryCounts {
    /// Sum over every kind.
    pub fn total(&self) -> usize {
        self.timers + self.intervals + self.listeners + self.pending + self.observers
    }
}

// == Resource Registry ==
#[derive(Default)]
pub struct ResourceRegistry {
    timers: Vec<JoinHandle<()>>,
    intervals: Vec<JoinHandle<()>>,
    /// Registrations grouped by target name
    listeners: HashMap<String, Vec<ListenerRegistration>>,
    pending: Vec<JoinHandle<()>>,
    observers: Vec<Box<dyn Observer>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracks a one-shot delayed task.
    pub fn track_timer(&mut self, handle: JoinHandle<()>) {
        self.timers.push(handle);
    }

    /// Tracks a repeating task.
    pub fn track_interval(&mut self, handle: JoinHandle<()>) {
        self.intervals.push(handle);
    }

    pub fn track_listener(&mut self, target: impl Into<String>, event: impl Into<String>) {
        let target = target.into();
        self.listeners
            .entry(target.clone())
            .or_default()
            .push(ListenerRegistration {
                target,
                event: event.into(),
            });
    }

    /// Tracks an in-flight operation. Releasing it stops tracking without cancelling.
    pub fn track_pending(&mut self, handle: JoinHandle<()>) {
        self.pending.push(handle);
    }

    pub fn track_observer(&mut self, observer: Box<dyn Observer>) {
        self.observers.push(observer);
    }

    /// Registrations tracked for `target`.
    pub fn listeners_for(&self, target: &str) -> &[ListenerRegistration] {
        self.listeners.get(target).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn counts(&self) -> RegistryCounts {
        RegistryCounts {
            timers: self.timers.len(),
            intervals: self.intervals.len(),
            listeners: self.listeners.values().map(Vec::len).sum(),
            pending: self.pending.len(),
            observers: self.observers.len(),
        }
    }

    // == Release All ==
    /// Aborts timers and intervals, disconnects observers, forgets pending
    /// operations and listeners. Returns what was released.
    pub fn release_all(&mut self) -> RegistryCounts {
        let released = self.counts();

        for handle in self.timers.drain(..).chain(self.intervals.drain(..)) {
            handle.abort();
        }
        for observer in self.observers.drain(..) {
            observer.disconnect();
        }
        // Dropping a JoinHandle detaches the task; it keeps running.
        self.pending.clear();
        self.listeners.clear();

        released
    }
}

impl fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("counts", &self.counts())
            .finish()
    }
}
