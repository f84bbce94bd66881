// Copyright 2025 Agent Perf Contributors
// SPDX-License-Identifier: Apache-2.0

//! Benchmark session state.
//!
//! A [`SessionSnapshot`] is the complete, self-consistent state of one
//! benchmark session at a point in time. The run that owns the session
//! mutates a private copy and publishes whole snapshots, so a reader always
//! sees either the state before an iteration or the state after it.
//!
//! # Invariants
//!
//! - `current_iteration` never decreases while the session is Running.
//! - `iteration_times_ms.len() == success_count + failure_count == current_iteration`.
//! - Once [`SessionStatus::is_terminal`] holds, the recording methods are
//!   no-ops and return `false`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use uuid::Uuid;

use crate::config::TestConfiguration;

/// Opaque session identifier (UUID v4 string).
pub type SessionId = String;

/// Lifecycle status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SessionStatus {
    /// No run has been requested.
    #[default]
    Idle,
    /// The run is executing.
    Running,
    /// The run was cancelled before finishing.
    Stopped,
    /// Every iteration ran.
    Completed,
    /// An error escaped the run loop.
    Failed,
}

impl SessionStatus {
    /// Whether no further iteration data may be recorded.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionStatus::Stopped | SessionStatus::Completed | SessionStatus::Failed
        )
    }

    /// Stable name, also used as a metrics label.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Idle => "Idle",
            SessionStatus::Running => "Running",
            SessionStatus::Stopped => "Stopped",
            SessionStatus::Completed => "Completed",
            SessionStatus::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Statistics recomputed after every iteration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollingStats {
    /// Mean latency of the recorded iterations.
    pub average_ms: f64,
    /// Fastest recorded iteration.
    pub min_ms: f64,
    /// Slowest recorded iteration.
    pub max_ms: f64,
    /// Completed iterations per second of measured wall time.
    pub iterations_per_second: f64,
    /// Remaining iterations times the current average.
    pub estimated_time_remaining_ms: f64,
}

impl RollingStats {
    /// Smallest elapsed time used for the throughput division.
    pub const MIN_ELAPSED: Duration = Duration::from_millis(1);

    /// Compute stats over `latencies_ms`, with `total` iterations planned
    /// and `elapsed` wall time spent in the measured loop.
    pub fn compute(latencies_ms: &[f64], total: u32, elapsed: Duration) -> Self {
        if latencies_ms.is_empty() {
            return Self::default();
        }

        let completed = latencies_ms.len();
        let sum: f64 = latencies_ms.iter().sum();
        let average_ms = sum / completed as f64;
        let min_ms = latencies_ms.iter().copied().fold(f64::INFINITY, f64::min);
        let max_ms = latencies_ms
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);

        let elapsed_secs = elapsed.max(Self::MIN_ELAPSED).as_secs_f64();
        let remaining = (total as usize).saturating_sub(completed);

        Self {
            average_ms,
            min_ms,
            max_ms,
            iterations_per_second: completed as f64 / elapsed_secs,
            estimated_time_remaining_ms: remaining as f64 * average_ms,
        }
    }
}

/// Host description captured when a run finishes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineInfo {
    /// Operating system family (`linux`, `macos`, `windows`).
    pub os: String,
    /// Long OS description, when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os_version: Option<String>,
    /// Host name, when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_name: Option<String>,
    /// Logical CPU count.
    pub processor_count: usize,
    /// CPU architecture.
    pub architecture: String,
    /// Installed memory in GB.
    pub total_memory_gb: f64,
}

/// Point-in-time view of a benchmark session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// Session identifier.
    pub session_id: SessionId,
    /// Configuration the run was started with.
    pub configuration: TestConfiguration,
    /// Lifecycle status.
    pub status: SessionStatus,
    /// When the session was created.
    pub start_time: DateTime<Utc>,
    /// When the session reached a terminal status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Iterations recorded so far.
    pub current_iteration: u32,
    /// Iterations planned.
    pub total_iterations: u32,
    /// Wall time of the measured loop in milliseconds.
    pub elapsed_time_ms: u64,
    /// Per-iteration latencies, in recording order.
    pub iteration_times_ms: Vec<f64>,
    /// Latency of the most recent iteration.
    pub last_iteration_time_ms: f64,
    /// Rolling statistics over `iteration_times_ms`.
    pub stats: RollingStats,
    /// Iterations whose call succeeded.
    pub success_count: u32,
    /// Iterations whose call failed.
    pub failure_count: u32,
    /// Whether the warm-up call succeeded.
    pub warmup_successful: bool,
    /// Warm-up call duration.
    pub warmup_time_ms: f64,
    /// Time to first token per streaming iteration.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub time_to_first_token_ms: Vec<f64>,
    /// Latencies grouped by scenario name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub scenario_results: BTreeMap<String, Vec<f64>>,
    /// Resident memory growth over the run.
    #[serde(rename = "memoryUsedMB")]
    pub memory_used_mb: f64,
    /// Host description, set when the run finishes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub machine_info: Option<MachineInfo>,
    /// Where the metrics report was written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_path: Option<String>,
    /// Error that ended the run (Failed only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl SessionSnapshot {
    /// Create a Running session with a fresh UUID and zeroed counters.
    pub fn start(configuration: TestConfiguration) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), configuration)
    }

    /// Create a Running session with the given id.
    pub fn with_id(session_id: impl Into<SessionId>, configuration: TestConfiguration) -> Self {
        Self {
            session_id: session_id.into(),
            total_iterations: configuration.iterations,
            configuration,
            status: SessionStatus::Running,
            start_time: Utc::now(),
            end_time: None,
            current_iteration: 0,
            elapsed_time_ms: 0,
            iteration_times_ms: Vec::new(),
            last_iteration_time_ms: 0.0,
            stats: RollingStats::default(),
            success_count: 0,
            failure_count: 0,
            warmup_successful: false,
            warmup_time_ms: 0.0,
            time_to_first_token_ms: Vec::new(),
            scenario_results: BTreeMap::new(),
            memory_used_mb: 0.0,
            machine_info: None,
            report_path: None,
            error_message: None,
        }
    }

    /// Clear every per-run counter. Only valid while Running.
    pub fn reset(&mut self) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.current_iteration = 0;
        self.elapsed_time_ms = 0;
        self.iteration_times_ms.clear();
        self.last_iteration_time_ms = 0.0;
        self.stats = RollingStats::default();
        self.success_count = 0;
        self.failure_count = 0;
        self.warmup_successful = false;
        self.warmup_time_ms = 0.0;
        self.time_to_first_token_ms.clear();
        self.scenario_results.clear();
        true
    }

    /// Record the warm-up outcome. Not part of the iteration statistics.
    pub fn record_warmup(&mut self, success: bool, time_ms: f64) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.warmup_successful = success;
        self.warmup_time_ms = time_ms;
        true
    }

    /// Append one iteration and recompute the rolling statistics.
    ///
    /// `elapsed` is the wall time of the measured loop so far.
    pub fn record_iteration(&mut self, latency_ms: f64, success: bool, elapsed: Duration) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.iteration_times_ms.push(latency_ms);
        self.current_iteration += 1;
        self.last_iteration_time_ms = latency_ms;
        self.elapsed_time_ms = elapsed.as_millis() as u64;
        if success {
            self.success_count += 1;
        } else {
            self.failure_count += 1;
        }
        self.stats = RollingStats::compute(&self.iteration_times_ms, self.total_iterations, elapsed);
        true
    }

    /// Record a time-to-first-token sample.
    pub fn record_first_token(&mut self, ttft_ms: f64) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.time_to_first_token_ms.push(ttft_ms);
        true
    }

    /// Record a latency under a scenario name.
    pub fn record_scenario(&mut self, scenario: &str, latency_ms: f64) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.scenario_results
            .entry(scenario.to_string())
            .or_default()
            .push(latency_ms);
        true
    }

    /// Mark the session Stopped (cancelled).
    pub fn stop(&mut self) -> bool {
        self.finish(SessionStatus::Stopped)
    }

    /// Mark the session Completed.
    pub fn complete(&mut self) -> bool {
        self.finish(SessionStatus::Completed)
    }

    /// Mark the session Failed with an error message.
    pub fn fail(&mut self, error: impl Into<String>) -> bool {
        if self.finish(SessionStatus::Failed) {
            self.error_message = Some(error.into());
            true
        } else {
            false
        }
    }

    fn finish(&mut self, status: SessionStatus) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = status;
        self.end_time = Some(Utc::now());
        true
    }

    /// Share of planned iterations recorded, 0-100.
    pub fn progress_percentage(&self) -> f64 {
        if self.total_iterations == 0 {
            return 0.0;
        }
        self.current_iteration as f64 / self.total_iterations as f64 * 100.0
    }

    /// Whether the session can no longer change.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(iterations: u32) -> SessionSnapshot {
        let config = TestConfiguration {
            iterations,
            ..TestConfiguration::default()
        };
        SessionSnapshot::start(config)
    }

    #[test]
    fn test_start_generates_uuid_and_runs() {
        let s = session(5);
        assert!(Uuid::parse_str(&s.session_id).is_ok());
        assert_eq!(s.status, SessionStatus::Running);
        assert_eq!(s.total_iterations, 5);
        assert_eq!(s.current_iteration, 0);
        assert!(s.end_time.is_none());
    }

    #[test]
    fn test_rolling_average_matches_mean() {
        let mut s = session(4);
        let samples = [12.5, 7.25, 30.0, 10.0];
        for (k, latency) in samples.iter().enumerate() {
            s.record_iteration(*latency, true, Duration::from_millis(100 * (k as u64 + 1)));
            let expected = samples[..=k].iter().sum::<f64>() / (k + 1) as f64;
            assert!((s.stats.average_ms - expected).abs() < 1e-6);
        }
        assert_eq!(s.stats.min_ms, 7.25);
        assert_eq!(s.stats.max_ms, 30.0);
    }

    #[test]
    fn test_eta_trends_to_zero() {
        let mut s = session(3);
        let mut last = f64::INFINITY;
        for _ in 0..3 {
            s.record_iteration(10.0, true, Duration::from_millis(10));
            assert!(s.stats.estimated_time_remaining_ms >= 0.0);
            assert!(s.stats.estimated_time_remaining_ms < last);
            last = s.stats.estimated_time_remaining_ms;
        }
        assert_eq!(s.stats.estimated_time_remaining_ms, 0.0);
    }

    #[test]
    fn test_throughput_clamps_zero_elapsed() {
        let stats = RollingStats::compute(&[5.0], 10, Duration::ZERO);
        assert!((stats.iterations_per_second - 1000.0).abs() < 1e-9);

        let stats = RollingStats::compute(&[5.0, 5.0], 10, Duration::from_secs(1));
        assert!((stats.iterations_per_second - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_counters_track_outcomes() {
        let mut s = session(3);
        s.record_iteration(1.0, true, Duration::from_millis(1));
        s.record_iteration(2.0, false, Duration::from_millis(3));
        assert_eq!(s.success_count, 1);
        assert_eq!(s.failure_count, 1);
        assert_eq!(s.current_iteration, 2);
        assert_eq!(s.last_iteration_time_ms, 2.0);
        assert_eq!(s.elapsed_time_ms, 3);
        assert!((s.progress_percentage() - 66.666_666).abs() < 1e-3);
    }

    #[test]
    fn test_terminal_session_is_frozen() {
        let mut s = session(3);
        s.record_iteration(1.0, true, Duration::from_millis(1));
        assert!(s.stop());
        assert!(s.end_time.is_some());

        assert!(!s.record_iteration(2.0, true, Duration::from_millis(2)));
        assert!(!s.record_first_token(1.0));
        assert!(!s.record_scenario("simple", 1.0));
        assert!(!s.complete());
        assert!(!s.fail("late"));
        assert_eq!(s.status, SessionStatus::Stopped);
        assert_eq!(s.iteration_times_ms.len(), 1);
        assert!(s.error_message.is_none());
    }

    #[test]
    fn test_fail_sets_message() {
        let mut s = session(1);
        assert!(s.fail("connection refused"));
        assert_eq!(s.status, SessionStatus::Failed);
        assert_eq!(s.error_message.as_deref(), Some("connection refused"));
    }

    #[test]
    fn test_reset_clears_counters() {
        let mut s = session(2);
        s.record_warmup(true, 40.0);
        s.record_iteration(1.0, true, Duration::from_millis(1));
        s.record_scenario("simple", 1.0);
        assert!(s.reset());
        assert_eq!(s.current_iteration, 0);
        assert!(s.iteration_times_ms.is_empty());
        assert!(s.scenario_results.is_empty());
        assert!(!s.warmup_successful);
        assert_eq!(s.stats, RollingStats::default());
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let s = session(2);
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["status"], "Running");
        assert!(json.get("sessionId").is_some());
        assert!(json.get("currentIteration").is_some());
        assert!(json["stats"].get("estimatedTimeRemainingMs").is_some());
        assert!(json.get("errorMessage").is_none());
        assert!(json.get("timeToFirstTokenMs").is_none());
    }
}
