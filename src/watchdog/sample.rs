//! Memory Sampling
//!
//! Memory figures are a heuristic view of the process, not a byte-accurate
//! accounting.

use serde::Serialize;
use sysinfo::{Pid, ProcessExt, System, SystemExt};
use tracing::warn;

use crate::cache::current_timestamp_ms;

// == Memory Sample ==
/// One point-in-time memory reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemorySample {
    /// Bytes in use (resident set for a native process)
    pub heap_used: u64,
    /// Bytes reserved (virtual size for a native process)
    pub heap_total: u64,
    /// Bytes held outside the measured heap, zero when unknown
    pub external_memory: u64,
    /// Unix milliseconds of the reading
    pub timestamp: u64,
}

impl MemorySample {
    pub fn new(heap_used: u64, heap_total: u64, timestamp: u64) -> Self {
        Self {
            heap_used,
            heap_total,
            external_memory: 0,
            timestamp,
        }
    }
}

// == Memory Probe ==
/// Source of memory readings.
pub trait MemoryProbe: Send {
    /// Takes a reading, or `None` when memory cannot be observed.
    fn sample(&mut self) -> Option<MemorySample>;
}

// == Process Memory Probe ==
/// Reads the current process's memory through `sysinfo`.
pub struct ProcessMemoryProbe {
    system: System,
    pid: Option<Pid>,
}

impl ProcessMemoryProbe {
    pub fn new() -> Self {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(err) => {
                warn!(error = err, "Cannot resolve current pid, memory sampling disabled");
                None
            }
        };
        Self {
            system: System::new(),
            pid,
        }
    }
}

impl Default for ProcessMemoryProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProbe for ProcessMemoryProbe {
    fn sample(&mut self) -> Option<MemorySample> {
        let pid = self.pid?;
        if !self.system.refresh_process(pid) {
            return None;
        }
        let process = self.system.process(pid)?;
        Some(MemorySample::new(
            process.memory(),
            process.virtual_memory(),
            current_timestamp_ms(),
        ))
    }
}
