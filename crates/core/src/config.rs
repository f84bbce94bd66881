// Copyright 2025 Agent Perf Contributors
// SPDX-License-Identifier: Apache-2.0

//! Benchmark run configuration.
//!
//! A [`TestConfiguration`] describes one benchmark session: how many
//! iterations to run, which agent backend to call and which load shape
//! ([`TestMode`]) to apply. The session manager copies the configuration
//! into the session when a run starts, so it never changes mid-run.
//!
//! JSON field names are camelCase to match the dashboard payloads; the
//! snake_case spellings used by the Python backend are accepted as aliases.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Default iteration count.
pub const DEFAULT_ITERATIONS: u32 = 10;
/// Default model identifier.
pub const DEFAULT_MODEL: &str = "ministral-3";
/// Default agent endpoint (local Ollama).
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";
/// Default batch size for [`TestMode::Batch`].
pub const DEFAULT_BATCH_SIZE: u32 = 10;
/// Default fan-out for [`TestMode::Concurrent`].
pub const DEFAULT_CONCURRENT_REQUESTS: u32 = 5;
/// Default per-call latency of the simulated provider.
pub const DEFAULT_SIMULATED_LATENCY_MS: u64 = 10;
/// Largest accepted iteration count.
pub const MAX_ITERATIONS: u32 = 1_000_000;
/// Largest accepted batch size. A whole batch is in flight at once.
pub const MAX_BATCH_SIZE: u32 = 1_000;
/// Largest accepted fan-out. A whole group is in flight at once.
pub const MAX_CONCURRENT_REQUESTS: u32 = 1_000;

/// Load shape applied during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestMode {
    /// One call per iteration, sequentially.
    #[default]
    Standard,
    /// Calls issued in groups of `batch_size`.
    Batch,
    /// Groups of `concurrent_requests` calls fanned out concurrently.
    Concurrent,
    /// Sequential streaming calls with time-to-first-token capture.
    Streaming,
    /// Round-robin over the named prompt scenarios.
    Scenarios,
}

impl TestMode {
    /// All modes, in display order.
    pub const ALL: [TestMode; 5] = [
        TestMode::Standard,
        TestMode::Batch,
        TestMode::Concurrent,
        TestMode::Streaming,
        TestMode::Scenarios,
    ];

    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            TestMode::Standard => "standard",
            TestMode::Batch => "batch",
            TestMode::Concurrent => "concurrent",
            TestMode::Streaming => "streaming",
            TestMode::Scenarios => "scenarios",
        }
    }
}

impl fmt::Display for TestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        TestMode::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::invalid_input(format!("unknown test mode: {}", s)))
    }
}

/// Agent backend a session talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    /// Ollama chat API.
    #[default]
    Ollama,
    /// Azure OpenAI chat completions.
    #[serde(alias = "azure", alias = "azureopenai")]
    AzureOpenai,
    /// In-process stand-in with a fixed latency.
    Simulated,
}

impl Provider {
    /// Stable lowercase name, also used in report file names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Ollama => "ollama",
            Provider::AzureOpenai => "azure_openai",
            Provider::Simulated => "simulated",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(Provider::Ollama),
            "azure" | "azure_openai" | "azure-openai" | "azureopenai" => Ok(Provider::AzureOpenai),
            "simulated" | "demo" => Ok(Provider::Simulated),
            _ => Err(Error::invalid_input(format!("unknown provider: {}", s))),
        }
    }
}

/// Configuration for one benchmark session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestConfiguration {
    /// Number of measured iterations.
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    /// Model or deployment identifier.
    #[serde(default = "default_model")]
    pub model: String,
    /// Base URL of the agent backend.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Load shape.
    #[serde(default, alias = "test_mode")]
    pub test_mode: TestMode,
    /// Group size for [`TestMode::Batch`].
    #[serde(default = "default_batch_size", alias = "batch_size")]
    pub batch_size: u32,
    /// Fan-out for [`TestMode::Concurrent`].
    #[serde(
        default = "default_concurrent_requests",
        alias = "concurrent_requests",
        alias = "concurrencyLevel"
    )]
    pub concurrent_requests: u32,
    /// Agent backend.
    #[serde(default)]
    pub provider: Provider,
    /// Per-call latency of the simulated provider.
    #[serde(default = "default_simulated_latency_ms", alias = "simulated_latency_ms")]
    pub simulated_latency_ms: u64,
}

fn default_iterations() -> u32 {
    DEFAULT_ITERATIONS
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_batch_size() -> u32 {
    DEFAULT_BATCH_SIZE
}

fn default_concurrent_requests() -> u32 {
    DEFAULT_CONCURRENT_REQUESTS
}

fn default_simulated_latency_ms() -> u64 {
    DEFAULT_SIMULATED_LATENCY_MS
}

impl Default for TestConfiguration {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            model: default_model(),
            endpoint: default_endpoint(),
            test_mode: TestMode::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            concurrent_requests: DEFAULT_CONCURRENT_REQUESTS,
            provider: Provider::default(),
            simulated_latency_ms: DEFAULT_SIMULATED_LATENCY_MS,
        }
    }
}

impl TestConfiguration {
    /// Create a new builder.
    pub fn builder() -> TestConfigurationBuilder {
        TestConfigurationBuilder::default()
    }

    /// Check the structural constraints a run relies on.
    ///
    /// Provider-specific checks (URL syntax, credentials) happen when the
    /// agent client is built and surface as a failed session instead.
    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            return Err(Error::invalid_input("iterations must be greater than 0"));
        }
        if self.iterations > MAX_ITERATIONS {
            return Err(Error::invalid_input(format!(
                "iterations must be at most {}",
                MAX_ITERATIONS
            )));
        }
        if self.batch_size == 0 {
            return Err(Error::invalid_input("batchSize must be greater than 0"));
        }
        if self.batch_size > MAX_BATCH_SIZE {
            return Err(Error::invalid_input(format!(
                "batchSize must be at most {}",
                MAX_BATCH_SIZE
            )));
        }
        if self.concurrent_requests == 0 {
            return Err(Error::invalid_input(
                "concurrentRequests must be greater than 0",
            ));
        }
        if self.concurrent_requests > MAX_CONCURRENT_REQUESTS {
            return Err(Error::invalid_input(format!(
                "concurrentRequests must be at most {}",
                MAX_CONCURRENT_REQUESTS
            )));
        }
        if self.model.trim().is_empty() {
            return Err(Error::invalid_input("model is required"));
        }
        if self.provider != Provider::Simulated {
            let endpoint = self.endpoint.trim();
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err(Error::invalid_input(format!(
                    "endpoint must be an http(s) URL, got '{}'",
                    self.endpoint
                )));
            }
        }
        Ok(())
    }
}

/// Builder for [`TestConfiguration`]. Unset fields keep their defaults.
#[derive(Debug, Default)]
pub struct TestConfigurationBuilder {
    iterations: Option<u32>,
    model: Option<String>,
    endpoint: Option<String>,
    test_mode: Option<TestMode>,
    batch_size: Option<u32>,
    concurrent_requests: Option<u32>,
    provider: Option<Provider>,
    simulated_latency_ms: Option<u64>,
}

impl TestConfigurationBuilder {
    /// Set the iteration count.
    pub fn iterations(mut self, iterations: u32) -> Self {
        self.iterations = Some(iterations);
        self
    }

    /// Set the model identifier.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the backend endpoint.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the load shape.
    pub fn test_mode(mut self, mode: TestMode) -> Self {
        self.test_mode = Some(mode);
        self
    }

    /// Set the batch size.
    pub fn batch_size(mut self, size: u32) -> Self {
        self.batch_size = Some(size);
        self
    }

    /// Set the concurrency level.
    pub fn concurrent_requests(mut self, n: u32) -> Self {
        self.concurrent_requests = Some(n);
        self
    }

    /// Set the provider.
    pub fn provider(mut self, provider: Provider) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the simulated per-call latency.
    pub fn simulated_latency_ms(mut self, ms: u64) -> Self {
        self.simulated_latency_ms = Some(ms);
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<TestConfiguration> {
        let defaults = TestConfiguration::default();
        let config = TestConfiguration {
            iterations: self.iterations.unwrap_or(defaults.iterations),
            model: self.model.unwrap_or(defaults.model),
            endpoint: self.endpoint.unwrap_or(defaults.endpoint),
            test_mode: self.test_mode.unwrap_or(defaults.test_mode),
            batch_size: self.batch_size.unwrap_or(defaults.batch_size),
            concurrent_requests: self
                .concurrent_requests
                .unwrap_or(defaults.concurrent_requests),
            provider: self.provider.unwrap_or(defaults.provider),
            simulated_latency_ms: self
                .simulated_latency_ms
                .unwrap_or(defaults.simulated_latency_ms),
        };
        config.validate()?;
        Ok(config)
    }
}
