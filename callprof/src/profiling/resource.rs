//! Process resource readings
//!
//! The sampler reads CPU utilization and resident memory through the
//! [`ResourceProbe`] trait so tests can script the readings.

use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// One instantaneous resource reading.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResourceReading {
    /// Process CPU utilization in percent (may exceed 100 on multi-core hosts).
    pub cpu_percent: f64,
    /// Resident set size in megabytes.
    pub memory_mb: f64,
}

/// Source of resource readings for the sampler thread.
pub trait ResourceProbe: Send {
    fn read(&mut self) -> ResourceReading;
}

/// Reads the current process through `sysinfo`.
///
/// CPU utilization is computed between consecutive refreshes, so the first
/// reading reports 0%.
pub struct ProcessProbe {
    system: System,
    pid: Pid,
}

impl ProcessProbe {
    pub fn current() -> Self {
        let mut probe = Self { system: System::new(), pid: Pid::from_u32(std::process::id()) };
        probe.refresh();
        probe
    }

    fn refresh(&mut self) {
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[self.pid]),
            true,
            ProcessRefreshKind::nothing().with_cpu().with_memory(),
        );
    }
}

impl ResourceProbe for ProcessProbe {
    // Byte counts lose precision above 2^53, far beyond any real RSS
    #[allow(clippy::cast_precision_loss)]
    fn read(&mut self) -> ResourceReading {
        self.refresh();
        match self.system.process(self.pid) {
            Some(process) => ResourceReading {
                cpu_percent: f64::from(process.cpu_usage()),
                memory_mb: process.memory() as f64 / BYTES_PER_MB,
            },
            None => ResourceReading::default(),
        }
    }
}
