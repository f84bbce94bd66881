//! Markdown output generation for metrics reports.

use crate::result::MetricsReport;
use std::fmt::Write;

/// Generate a markdown summary table from metrics reports.
pub fn generate_summary(reports: &[MetricsReport]) -> String {
    let mut output = String::new();

    writeln!(output, "# Benchmark Summary").unwrap();
    writeln!(output).unwrap();
    writeln!(output, "Generated: {}", chrono::Utc::now().to_rfc3339()).unwrap();
    writeln!(output).unwrap();
    writeln!(output, "## Results").unwrap();
    writeln!(output).unwrap();
    writeln!(
        output,
        "| Timestamp | Provider | Model | Mode | Status | Iterations | Failures | Avg (ms) | P95 (ms) | Iter/s | Memory Δ (MB) |"
    )
    .unwrap();
    writeln!(
        output,
        "|-----------|----------|-------|------|--------|------------|----------|----------|----------|--------|---------------|"
    )
    .unwrap();

    for report in reports {
        let info = &report.test_info;
        let metrics = &report.metrics;
        writeln!(
            output,
            "| {} | {} | {} | {} | {} | {}/{} | {} | {:.3} | {:.3} | {:.2} | {:.2} |",
            info.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            info.provider,
            info.model,
            info.test_mode,
            info.status,
            metrics.completed_iterations,
            metrics.total_iterations,
            metrics.failure_count,
            metrics.latency.average_ms,
            metrics.latency.p95_ms,
            metrics.iterations_per_second,
            report.resources.memory_delta_mb,
        )
        .unwrap();
    }

    writeln!(output).unwrap();
    writeln!(output, "---").unwrap();
    writeln!(output, "Total reports: {}", reports.len()).unwrap();

    output
}

/// Generate a detailed markdown report for one session.
pub fn generate_detailed_report(report: &MetricsReport) -> String {
    let mut output = String::new();
    let info = &report.test_info;
    let latency = &report.metrics.latency;

    writeln!(output, "# Session {}", info.session_id).unwrap();
    writeln!(output).unwrap();
    writeln!(output, "**Timestamp:** {}", info.timestamp.to_rfc3339()).unwrap();
    writeln!(output, "**Provider:** {} ({})", info.provider, info.endpoint).unwrap();
    writeln!(output, "**Model:** {}", info.model).unwrap();
    writeln!(output, "**Mode:** {}", info.test_mode).unwrap();
    writeln!(output, "**Status:** {}", info.status).unwrap();
    writeln!(
        output,
        "**Warm-up:** {} ({:.3} ms)",
        if info.warmup_successful { "ok" } else { "failed" },
        info.warmup_time_ms
    )
    .unwrap();
    writeln!(output).unwrap();

    writeln!(output, "## Latency").unwrap();
    writeln!(output).unwrap();
    writeln!(output, "| Stat | Value (ms) |").unwrap();
    writeln!(output, "|------|------------|").unwrap();
    for (name, value) in [
        ("average", latency.average_ms),
        ("median", latency.median_ms),
        ("min", latency.min_ms),
        ("max", latency.max_ms),
        ("p90", latency.p90_ms),
        ("p95", latency.p95_ms),
        ("p99", latency.p99_ms),
        ("std dev", latency.std_dev_ms),
    ] {
        writeln!(output, "| {} | {:.3} |", name, value).unwrap();
    }
    writeln!(output).unwrap();

    if let Some(ttft) = &report.time_to_first_token {
        writeln!(output, "## Time to first token").unwrap();
        writeln!(output).unwrap();
        writeln!(
            output,
            "average {:.3} ms, p95 {:.3} ms over {} samples",
            ttft.average_ms, ttft.p95_ms, ttft.count
        )
        .unwrap();
        writeln!(output).unwrap();
    }

    if !report.scenarios.is_empty() {
        writeln!(output, "## Scenarios").unwrap();
        writeln!(output).unwrap();
        writeln!(output, "| Scenario | Count | Avg (ms) | P95 (ms) |").unwrap();
        writeln!(output, "|----------|-------|----------|----------|").unwrap();
        for (name, dist) in &report.scenarios {
            writeln!(
                output,
                "| {} | {} | {:.3} | {:.3} |",
                name, dist.count, dist.average_ms, dist.p95_ms
            )
            .unwrap();
        }
        writeln!(output).unwrap();
    }

    writeln!(output, "## Machine").unwrap();
    writeln!(output).unwrap();
    writeln!(output, "```json").unwrap();
    writeln!(
        output,
        "{}",
        serde_json::to_string_pretty(&report.machine_info).unwrap_or_default()
    )
    .unwrap();
    writeln!(output, "```").unwrap();

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::ResourceMetrics;
    use agent_perf_core::{MachineInfo, SessionSnapshot, TestConfiguration, TestMode};
    use std::time::Duration;

    fn streaming_report() -> MetricsReport {
        let config = TestConfiguration::builder()
            .iterations(2)
            .test_mode(TestMode::Streaming)
            .build()
            .unwrap();
        let mut snapshot = SessionSnapshot::start(config);
        snapshot.record_iteration(40.0, true, Duration::from_millis(40));
        snapshot.record_first_token(8.0);
        snapshot.record_iteration(60.0, true, Duration::from_millis(100));
        snapshot.record_first_token(12.0);
        snapshot.complete();
        MetricsReport::from_snapshot(&snapshot, ResourceMetrics::default(), MachineInfo::default())
    }

    #[test]
    fn test_summary_has_row_per_report() {
        let reports = vec![streaming_report(), streaming_report()];
        let summary = generate_summary(&reports);
        assert_eq!(summary.matches("| streaming | Completed | 2/2 |").count(), 2);
        assert!(summary.contains("Total reports: 2"));
    }

    #[test]
    fn test_detailed_report_sections() {
        let detail = generate_detailed_report(&streaming_report());
        assert!(detail.contains("## Latency"));
        assert!(detail.contains("| average | 50.000 |"));
        assert!(detail.contains("## Time to first token"));
        assert!(!detail.contains("## Scenarios"));
    }
}
