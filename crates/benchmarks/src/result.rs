//! Metrics report types.
//!
//! This module provides the [`MetricsReport`] document written at the end
//! of every benchmark session. The layout mirrors the reports produced by
//! the other language harnesses so results can be compared side by side.

use agent_perf_core::{MachineInfo, SessionSnapshot, SessionStatus, TestMode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::resources::ResourceMetrics;
use crate::stats::LatencyDistribution;

/// Language tag written into every report.
pub const LANGUAGE: &str = "Rust";

/// Runtime tag written into every report.
pub const FRAMEWORK: &str = "Tokio";

/// What was benchmarked and how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestInfo {
    /// Implementation language of the harness.
    pub language: String,
    /// Async runtime.
    pub framework: String,
    /// Agent backend.
    pub provider: String,
    /// Model or deployment.
    pub model: String,
    /// Backend endpoint.
    pub endpoint: String,
    /// Load shape.
    pub test_mode: TestMode,
    /// Session that produced the report.
    pub session_id: String,
    /// Terminal status of the session.
    pub status: SessionStatus,
    /// When the report was generated.
    pub timestamp: DateTime<Utc>,
    /// Whether the warm-up call succeeded.
    pub warmup_successful: bool,
    /// Warm-up call duration.
    pub warmup_time_ms: f64,
    /// Batch size setting.
    pub batch_size: u32,
    /// Concurrency setting.
    pub concurrent_requests: u32,
}

/// Iteration counters and latency distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationMetrics {
    /// Iterations planned.
    pub total_iterations: u32,
    /// Iterations recorded.
    pub completed_iterations: u32,
    /// Successful calls.
    pub success_count: u32,
    /// Failed calls.
    pub failure_count: u32,
    /// Wall time of the measured loop.
    pub total_execution_time_ms: u64,
    /// Throughput over the measured loop.
    pub iterations_per_second: f64,
    /// Distribution of per-iteration latencies.
    #[serde(flatten)]
    pub latency: LatencyDistribution,
}

/// Report produced for a finished session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsReport {
    /// Test description.
    pub test_info: TestInfo,
    /// Host description.
    pub machine_info: MachineInfo,
    /// Iteration statistics.
    pub metrics: IterationMetrics,
    /// Memory figures.
    pub resources: ResourceMetrics,
    /// Time-to-first-token distribution (streaming mode).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_to_first_token: Option<LatencyDistribution>,
    /// Per-scenario distributions (scenarios mode).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub scenarios: BTreeMap<String, LatencyDistribution>,
}

impl MetricsReport {
    /// Build a report from a session snapshot and the run's resource figures.
    pub fn from_snapshot(
        snapshot: &SessionSnapshot,
        resources: ResourceMetrics,
        machine_info: MachineInfo,
    ) -> Self {
        let config = &snapshot.configuration;

        let time_to_first_token = if snapshot.time_to_first_token_ms.is_empty() {
            None
        } else {
            Some(LatencyDistribution::from_samples(
                &snapshot.time_to_first_token_ms,
            ))
        };

        let scenarios = snapshot
            .scenario_results
            .iter()
            .map(|(name, samples)| (name.clone(), LatencyDistribution::from_samples(samples)))
            .collect();

        Self {
            test_info: TestInfo {
                language: LANGUAGE.to_string(),
                framework: FRAMEWORK.to_string(),
                provider: config.provider.to_string(),
                model: config.model.clone(),
                endpoint: config.endpoint.clone(),
                test_mode: config.test_mode,
                session_id: snapshot.session_id.clone(),
                status: snapshot.status,
                timestamp: Utc::now(),
                warmup_successful: snapshot.warmup_successful,
                warmup_time_ms: snapshot.warmup_time_ms,
                batch_size: config.batch_size,
                concurrent_requests: config.concurrent_requests,
            },
            machine_info,
            metrics: IterationMetrics {
                total_iterations: snapshot.total_iterations,
                completed_iterations: snapshot.current_iteration,
                success_count: snapshot.success_count,
                failure_count: snapshot.failure_count,
                total_execution_time_ms: snapshot.elapsed_time_ms,
                iterations_per_second: snapshot.stats.iterations_per_second,
                latency: LatencyDistribution::from_samples(&snapshot.iteration_times_ms),
            },
            resources,
            time_to_first_token,
            scenarios,
        }
    }

    /// File name the report is written under.
    pub fn file_name(&self) -> String {
        let short_id: String = self.test_info.session_id.chars().take(8).collect();
        format!(
            "metrics_rust_{}_{}_{}.json",
            self.test_info.provider,
            self.test_info.timestamp.format("%Y%m%d_%H%M%S"),
            short_id
        )
    }
}
