//! Latency distribution statistics.
//!
//! Summarises a set of millisecond samples into mean, spread and
//! percentiles for the metrics report.

use serde::{Deserialize, Serialize};

/// Summary of a latency sample set, in milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatencyDistribution {
    /// Number of samples.
    pub count: usize,
    /// Sum of all samples.
    pub total_ms: f64,
    /// Arithmetic mean.
    pub average_ms: f64,
    /// Median (50th percentile).
    pub median_ms: f64,
    /// Minimum.
    pub min_ms: f64,
    /// Maximum.
    pub max_ms: f64,
    /// 90th percentile.
    pub p90_ms: f64,
    /// 95th percentile.
    pub p95_ms: f64,
    /// 99th percentile.
    pub p99_ms: f64,
    /// Sample standard deviation (zero below two samples).
    pub std_dev_ms: f64,
}

impl LatencyDistribution {
    /// Build a distribution from unordered samples.
    pub fn from_samples(samples: &[f64]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }

        let mut sorted = samples.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let n = sorted.len();
        let total_ms: f64 = sorted.iter().sum();
        let average_ms = total_ms / n as f64;

        let std_dev_ms = if n > 1 {
            let variance = sorted
                .iter()
                .map(|v| {
                    let diff = v - average_ms;
                    diff * diff
                })
                .sum::<f64>()
                / (n - 1) as f64;
            variance.sqrt()
        } else {
            0.0
        };

        Self {
            count: n,
            total_ms,
            average_ms,
            median_ms: percentile(&sorted, 0.50),
            min_ms: sorted[0],
            max_ms: sorted[n - 1],
            p90_ms: percentile(&sorted, 0.90),
            p95_ms: percentile(&sorted, 0.95),
            p99_ms: percentile(&sorted, 0.99),
            std_dev_ms,
        }
    }
}

/// Linear-interpolated percentile over ascending `sorted` values.
pub fn percentile(sorted: &[f64], fraction: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = fraction.clamp(0.0, 1.0) * (n - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = (lower + 1).min(n - 1);
            let weight = rank - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * weight
        }
    }
}
