//! Metrics exporter for agent benchmark sessions.
//!
//! Turns a finished [`agent_perf_core::SessionSnapshot`] into a
//! [`MetricsReport`] and writes it to disk.
//!
//! # Quick Start
//!
//! ```no_run
//! use agent_perf_benchmarks::{export_session, ResourceMonitor};
//! use agent_perf_core::{SessionSnapshot, TestConfiguration};
//!
//! let monitor = ResourceMonitor::start();
//! let mut snapshot = SessionSnapshot::start(TestConfiguration::default());
//! // ... run iterations ...
//! snapshot.complete();
//!
//! let (report, path) = export_session(&snapshot, monitor.finish(), "benchmarks/output")?;
//! println!("{} -> {}", report.test_info.session_id, path.display());
//! # Ok::<(), std::io::Error>(())
//! ```
//!
//! # Modules
//!
//! - [`result`] - The [`MetricsReport`] document
//! - [`stats`] - Latency distributions and percentiles
//! - [`resources`] - Memory sampling and machine description
//! - [`io`] - Reading and writing reports
//! - [`markdown`] - Markdown summaries

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod io;
pub mod markdown;
pub mod resources;
pub mod result;
pub mod stats;

pub use resources::{machine_info, ResourceMetrics, ResourceMonitor};
pub use result::MetricsReport;
pub use stats::LatencyDistribution;

use agent_perf_core::SessionSnapshot;
use std::path::{Path, PathBuf};

/// Build the report for a finished session and write it into `dir`.
///
/// # Errors
///
/// Returns an `io::Error` if the directory cannot be created or the file
/// cannot be written.
pub fn export_session(
    snapshot: &SessionSnapshot,
    resources: ResourceMetrics,
    dir: impl AsRef<Path>,
) -> std::io::Result<(MetricsReport, PathBuf)> {
    let report = MetricsReport::from_snapshot(snapshot, resources, machine_info());
    let path = io::write_report(&report, dir)?;
    Ok((report, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_perf_core::TestConfiguration;
    use std::time::Duration;

    #[test]
    fn test_export_session_writes_report() {
        let dir = tempfile::tempdir().unwrap();
        let mut snapshot = SessionSnapshot::start(TestConfiguration::default());
        snapshot.record_iteration(5.0, true, Duration::from_millis(5));
        snapshot.complete();

        let (report, path) =
            export_session(&snapshot, ResourceMetrics::default(), dir.path()).unwrap();
        assert!(path.exists());
        assert_eq!(report.metrics.completed_iterations, 1);
        assert!(report.machine_info.processor_count >= 1);
    }
}
