//! Process memory sampling and host description.
//!
//! A [`ResourceMonitor`] takes a resident-set baseline when a run starts,
//! is sampled after each iteration to track the peak, and produces
//! [`ResourceMetrics`] when the run ends.

use agent_perf_core::MachineInfo;
use serde::{Deserialize, Serialize};
use sysinfo::{Pid, System};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;
const BYTES_PER_GB: f64 = BYTES_PER_MB * 1024.0;

/// Memory figures for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceMetrics {
    /// Resident memory when the run started.
    pub start_memory_mb: f64,
    /// Resident memory when the run ended.
    pub end_memory_mb: f64,
    /// `end - start`; negative when memory was released.
    pub memory_delta_mb: f64,
    /// Highest resident memory observed.
    pub peak_memory_mb: f64,
    /// Garbage collector runs. Always `None` for a native process.
    pub gc_collections: Option<u64>,
}

/// Samples the resident memory of the current process.
pub struct ResourceMonitor {
    system: System,
    pid: Option<Pid>,
    start_bytes: u64,
    peak_bytes: u64,
}

impl ResourceMonitor {
    /// Capture the baseline.
    pub fn start() -> Self {
        let mut monitor = Self {
            system: System::new(),
            pid: sysinfo::get_current_pid().ok(),
            start_bytes: 0,
            peak_bytes: 0,
        };
        let baseline = monitor.current_bytes();
        monitor.start_bytes = baseline;
        monitor.peak_bytes = baseline;
        monitor
    }

    /// Refresh the reading and update the peak. Returns resident bytes.
    pub fn sample(&mut self) -> u64 {
        let bytes = self.current_bytes();
        self.peak_bytes = self.peak_bytes.max(bytes);
        bytes
    }

    /// Take a final reading and summarise.
    pub fn finish(mut self) -> ResourceMetrics {
        let end_bytes = self.sample();
        ResourceMetrics {
            start_memory_mb: self.start_bytes as f64 / BYTES_PER_MB,
            end_memory_mb: end_bytes as f64 / BYTES_PER_MB,
            memory_delta_mb: (end_bytes as f64 - self.start_bytes as f64) / BYTES_PER_MB,
            peak_memory_mb: self.peak_bytes as f64 / BYTES_PER_MB,
            gc_collections: None,
        }
    }

    fn current_bytes(&mut self) -> u64 {
        let Some(pid) = self.pid else {
            return 0;
        };
        self.system.refresh_process(pid);
        self.system.process(pid).map(|p| p.memory()).unwrap_or(0)
    }
}

/// Describe the host the benchmark runs on.
pub fn machine_info() -> MachineInfo {
    let mut system = System::new();
    system.refresh_memory();

    let total_memory_gb = (system.total_memory() as f64 / BYTES_PER_GB * 100.0).round() / 100.0;

    MachineInfo {
        os: std::env::consts::OS.to_string(),
        os_version: System::long_os_version(),
        host_name: System::host_name(),
        processor_count: std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1),
        architecture: std::env::consts::ARCH.to_string(),
        total_memory_gb,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monitor_tracks_peak() {
        let mut monitor = ResourceMonitor::start();
        let ballast = vec![1u8; 8 * 1024 * 1024];
        monitor.sample();
        drop(ballast);

        let metrics = monitor.finish();
        assert!(metrics.peak_memory_mb >= metrics.start_memory_mb);
        assert!(metrics.peak_memory_mb >= metrics.end_memory_mb);
        assert!(metrics.gc_collections.is_none());
    }

    #[test]
    fn test_machine_info_describes_host() {
        let info = machine_info();
        assert_eq!(info.os, std::env::consts::OS);
        assert_eq!(info.architecture, std::env::consts::ARCH);
        assert!(info.processor_count >= 1);
        assert!(info.total_memory_gb >= 0.0);
    }
}
