//! I/O operations for metrics reports.
//!
//! This module writes reports to, and reads them back from, an output
//! directory on the filesystem.

use crate::markdown;
use crate::result::MetricsReport;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Default output directory path.
pub const OUTPUT_DIR: &str = "benchmarks/output";

/// Summary file name inside the output directory.
pub const SUMMARY_FILE: &str = "summary.md";

/// Prefix shared by report file names.
pub const REPORT_PREFIX: &str = "metrics_";

/// Ensure the output directory exists.
pub fn ensure_output_dir(dir: impl AsRef<Path>) -> io::Result<()> {
    fs::create_dir_all(dir)
}

/// Write a report into `dir` and return its path.
pub fn write_report(report: &MetricsReport, dir: impl AsRef<Path>) -> io::Result<PathBuf> {
    let dir = dir.as_ref();
    ensure_output_dir(dir)?;
    let path = dir.join(report.file_name());
    let json = serde_json::to_string_pretty(report)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    fs::write(&path, json)?;
    Ok(path)
}

/// Read one report.
pub fn read_report(path: impl AsRef<Path>) -> io::Result<MetricsReport> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Read every report in `dir`, oldest first.
///
/// Files that look like reports but fail to parse are skipped with a
/// warning, so one corrupt file does not hide the rest.
pub fn read_reports(dir: impl AsRef<Path>) -> io::Result<Vec<MetricsReport>> {
    let mut reports = Vec::new();

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_report = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with(REPORT_PREFIX) && n.ends_with(".json"))
            .unwrap_or(false);
        if !is_report {
            continue;
        }

        match read_report(&path) {
            Ok(report) => reports.push(report),
            Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable report"),
        }
    }

    reports.sort_by_key(|r| r.test_info.timestamp);
    Ok(reports)
}

/// Write the markdown summary of `reports` into `dir`.
pub fn write_summary(reports: &[MetricsReport], dir: impl AsRef<Path>) -> io::Result<PathBuf> {
    let dir = dir.as_ref();
    ensure_output_dir(dir)?;
    let path = dir.join(SUMMARY_FILE);
    fs::write(&path, markdown::generate_summary(reports))?;
    Ok(path)
}
