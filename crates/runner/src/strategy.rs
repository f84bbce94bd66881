// Copyright 2025 Agent Perf Contributors
// SPDX-License-Identifier: Apache-2.0

//! Per-mode iteration strategies.
//!
//! Every strategy issues `total` agent calls and hands one [`Sample`] per
//! call to a [`SampleSink`]. Cancellation is checked before each iteration
//! (or group of iterations); calls already in flight run to completion.

use agent_perf_adapters::{AgentClient, AgentError, AgentReply};
use agent_perf_core::{TestConfiguration, TestMode};
use futures::future::join_all;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Named prompts used by the scenarios mode, in rotation order.
pub const SCENARIOS: [(&str, &str); 5] = [
    ("simple", "Say hello"),
    ("medium", "Explain what an AI agent is in one sentence"),
    (
        "long_output",
        "Write a detailed paragraph about the benefits of cloud computing",
    ),
    (
        "reasoning",
        "If you have 3 apples and buy 2 more, then give away 1, how many do you have? Explain your reasoning",
    ),
    (
        "conceptual",
        "What is the difference between machine learning and deep learning?",
    ),
];

/// Prompt for iteration `n` (1-based).
pub fn hello_prompt(n: u32) -> String {
    format!("Say hello {}", n)
}

/// Duration as fractional milliseconds.
pub fn millis(duration: Duration) -> f64 {
    duration.as_nanos() as f64 / 1_000_000.0
}

/// One recorded iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Iteration latency.
    pub latency_ms: f64,
    /// Whether the call succeeded.
    pub success: bool,
    /// Time to first token, streaming only.
    pub first_token_ms: Option<f64>,
    /// Scenario name, scenarios mode only.
    pub scenario: Option<&'static str>,
}

impl Sample {
    fn new(latency: Duration, success: bool) -> Self {
        Self {
            latency_ms: millis(latency),
            success,
            first_token_ms: None,
            scenario: None,
        }
    }
}

/// Receives samples as iterations finish.
pub trait SampleSink {
    /// Record one iteration.
    fn record(&mut self, sample: Sample);
}

impl SampleSink for Vec<Sample> {
    fn record(&mut self, sample: Sample) {
        self.push(sample);
    }
}

/// How the iteration loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every planned iteration ran.
    Finished,
    /// Cancellation was observed before the last iteration.
    Cancelled,
}

/// Iteration strategy for a test mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Sequential calls.
    Standard,
    /// Sequential streaming calls, recording time to first token.
    Streaming,
    /// Groups of `size` calls issued together, timed as a group.
    Batch {
        /// Calls per group.
        size: u32,
    },
    /// Groups of `width` calls issued together, each timed on its own.
    Concurrent {
        /// Calls per group.
        width: u32,
    },
    /// Named prompts in rotation.
    Scenarios,
}

impl Strategy {
    /// Strategy for a configuration.
    pub fn for_config(config: &TestConfiguration) -> Self {
        match config.test_mode {
            TestMode::Standard => Strategy::Standard,
            TestMode::Streaming => Strategy::Streaming,
            TestMode::Batch => Strategy::Batch {
                size: config.batch_size.max(1),
            },
            TestMode::Concurrent => Strategy::Concurrent {
                width: config.concurrent_requests.max(1),
            },
            TestMode::Scenarios => Strategy::Scenarios,
        }
    }

    /// Run `total` iterations against `agent`.
    pub async fn run<S: SampleSink>(
        &self,
        agent: &dyn AgentClient,
        total: u32,
        token: &CancellationToken,
        sink: &mut S,
    ) -> Outcome {
        match *self {
            Strategy::Standard => run_sequential(agent, total, token, sink, false).await,
            Strategy::Streaming => run_sequential(agent, total, token, sink, true).await,
            Strategy::Batch { size } => run_batches(agent, total, size, token, sink).await,
            Strategy::Concurrent { width } => run_concurrent(agent, total, width, token, sink).await,
            Strategy::Scenarios => run_scenarios(agent, total, token, sink).await,
        }
    }
}

fn succeeded(iteration: u32, result: &Result<AgentReply, AgentError>) -> bool {
    match result {
        Ok(_) => true,
        Err(e) => {
            warn!(iteration, error = %e, "Agent call failed");
            false
        }
    }
}

async fn run_sequential<S: SampleSink>(
    agent: &dyn AgentClient,
    total: u32,
    token: &CancellationToken,
    sink: &mut S,
    streaming: bool,
) -> Outcome {
    for n in 1..=total {
        if token.is_cancelled() {
            return Outcome::Cancelled;
        }
        let prompt = hello_prompt(n);
        let started = Instant::now();
        let result = if streaming {
            agent.invoke_streaming(&prompt).await
        } else {
            agent.invoke(&prompt).await
        };
        let mut sample = Sample::new(started.elapsed(), succeeded(n, &result));
        if let Ok(reply) = &result {
            sample.first_token_ms = reply.time_to_first_token.map(millis);
        }
        sink.record(sample);
    }
    Outcome::Finished
}

async fn run_batches<S: SampleSink>(
    agent: &dyn AgentClient,
    total: u32,
    size: u32,
    token: &CancellationToken,
    sink: &mut S,
) -> Outcome {
    let mut done = 0;
    while done < total {
        if token.is_cancelled() {
            return Outcome::Cancelled;
        }
        let count = size.min(total - done);
        let prompts: Vec<String> = (done + 1..=done + count).map(hello_prompt).collect();

        let started = Instant::now();
        let results = join_all(prompts.iter().map(|p| agent.invoke(p))).await;
        let per_item = started.elapsed() / count;

        for (offset, result) in results.iter().enumerate() {
            let n = done + offset as u32 + 1;
            sink.record(Sample::new(per_item, succeeded(n, result)));
        }
        done += count;
    }
    Outcome::Finished
}

async fn run_concurrent<S: SampleSink>(
    agent: &dyn AgentClient,
    total: u32,
    width: u32,
    token: &CancellationToken,
    sink: &mut S,
) -> Outcome {
    let mut done = 0;
    while done < total {
        if token.is_cancelled() {
            return Outcome::Cancelled;
        }
        let count = width.min(total - done);
        let prompts: Vec<String> = (done + 1..=done + count).map(hello_prompt).collect();

        let timed = prompts.iter().map(|prompt| async move {
            let started = Instant::now();
            let result = agent.invoke(prompt).await;
            (started.elapsed(), result)
        });
        let results = join_all(timed).await;

        for (offset, (latency, result)) in results.iter().enumerate() {
            let n = done + offset as u32 + 1;
            sink.record(Sample::new(*latency, succeeded(n, result)));
        }
        done += count;
    }
    Outcome::Finished
}

async fn run_scenarios<S: SampleSink>(
    agent: &dyn AgentClient,
    total: u32,
    token: &CancellationToken,
    sink: &mut S,
) -> Outcome {
    for n in 1..=total {
        if token.is_cancelled() {
            return Outcome::Cancelled;
        }
        let (name, prompt) = SCENARIOS[(n as usize - 1) % SCENARIOS.len()];
        let started = Instant::now();
        let result = agent.invoke(prompt).await;
        let mut sample = Sample::new(started.elapsed(), succeeded(n, &result));
        sample.scenario = Some(name);
        sink.record(sample);
    }
    Outcome::Finished
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_perf_adapters::SimulatedAgent;

    fn config(mode: TestMode) -> TestConfiguration {
        TestConfiguration {
            iterations: 7,
            test_mode: mode,
            batch_size: 3,
            concurrent_requests: 4,
            ..TestConfiguration::default()
        }
    }

    #[test]
    fn test_strategy_for_config() {
        assert_eq!(
            Strategy::for_config(&config(TestMode::Batch)),
            Strategy::Batch { size: 3 }
        );
        assert_eq!(
            Strategy::for_config(&config(TestMode::Concurrent)),
            Strategy::Concurrent { width: 4 }
        );
        assert_eq!(
            Strategy::for_config(&config(TestMode::Scenarios)),
            Strategy::Scenarios
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_mode_records_all_iterations() {
        for mode in TestMode::ALL {
            let agent = SimulatedAgent::new(Duration::from_millis(8));
            let mut samples = Vec::new();
            let outcome = Strategy::for_config(&config(mode))
                .run(&agent, 7, &CancellationToken::new(), &mut samples)
                .await;
            assert_eq!(outcome, Outcome::Finished, "{}", mode);
            assert_eq!(samples.len(), 7, "{}", mode);
            assert_eq!(agent.calls(), 7, "{}", mode);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_divides_group_time() {
        let agent = SimulatedAgent::new(Duration::from_millis(12));
        let mut samples = Vec::new();
        Strategy::Batch { size: 3 }
            .run(&agent, 3, &CancellationToken::new(), &mut samples)
            .await;
        for sample in &samples {
            assert!((sample.latency_ms - 4.0).abs() < 1e-6);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_times_each_call() {
        let agent = SimulatedAgent::new(Duration::from_millis(12));
        let mut samples = Vec::new();
        Strategy::Concurrent { width: 3 }
            .run(&agent, 3, &CancellationToken::new(), &mut samples)
            .await;
        for sample in &samples {
            assert!((sample.latency_ms - 12.0).abs() < 1e-6);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_streaming_records_first_token() {
        let agent = SimulatedAgent::new(Duration::from_millis(20));
        let mut samples = Vec::new();
        Strategy::Streaming
            .run(&agent, 2, &CancellationToken::new(), &mut samples)
            .await;
        assert!(samples.iter().all(|s| s.first_token_ms == Some(5.0)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scenarios_rotate() {
        let agent = SimulatedAgent::new(Duration::from_millis(1));
        let mut samples = Vec::new();
        Strategy::Scenarios
            .run(&agent, 7, &CancellationToken::new(), &mut samples)
            .await;
        let names: Vec<_> = samples.iter().filter_map(|s| s.scenario).collect();
        assert_eq!(
            names,
            vec![
                "simple",
                "medium",
                "long_output",
                "reasoning",
                "conceptual",
                "simple",
                "medium"
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_are_recorded_not_fatal() {
        let agent = SimulatedAgent::new(Duration::from_millis(1)).failing_every(2);
        let mut samples = Vec::new();
        let outcome = Strategy::Standard
            .run(&agent, 4, &CancellationToken::new(), &mut samples)
            .await;
        assert_eq!(outcome, Outcome::Finished);
        let failures = samples.iter().filter(|s| !s.success).count();
        assert_eq!(failures, 2);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let agent = SimulatedAgent::new(Duration::ZERO);
        let token = CancellationToken::new();
        token.cancel();
        let mut samples = Vec::new();
        let outcome = Strategy::Concurrent { width: 2 }
            .run(&agent, 4, &token, &mut samples)
            .await;
        assert_eq!(outcome, Outcome::Cancelled);
        assert!(samples.is_empty());
    }
}
