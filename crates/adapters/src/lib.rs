// Copyright 2025 Agent Perf Contributors
// SPDX-License-Identifier: Apache-2.0

//! Agent backend adapters.
//!
//! This crate provides the [`AgentClient`] seam the benchmark loop calls
//! through, and its implementations:
//!
//! - **Ollama**: `/api/chat`, plain and NDJSON streaming
//! - **Azure OpenAI**: chat completions, plain and SSE streaming
//! - **Simulated**: fixed-latency stand-in for demos and tests
//!
//! [`RetryingAgent`] adds bounded retry for incomplete streams, and
//! [`DefaultAgentFactory`] picks the right client for a configuration.
//!
//! # Example
//!
//! ```no_run
//! use agent_perf_adapters::{AgentFactory, DefaultAgentFactory};
//! use agent_perf_core::TestConfiguration;
//!
//! # async fn demo() -> Result<(), agent_perf_adapters::AgentError> {
//! let agent = DefaultAgentFactory::default().create(&TestConfiguration::default())?;
//! let reply = agent.invoke("Say hello").await?;
//! println!("{}", reply.text);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod agent;
pub mod azure;
pub mod factory;
pub mod ollama;
pub mod retry;
pub mod simulated;
pub mod stream;

pub use agent::{
    AgentClient, AgentError, AgentReply, AGENT_NAME, DEFAULT_INSTRUCTIONS, WARMUP_PROMPT,
};
pub use azure::AzureOpenAiAgent;
pub use factory::{AgentFactory, AgentSettings, DefaultAgentFactory};
pub use ollama::OllamaAgent;
pub use retry::{RetryPolicy, RetryingAgent};
pub use simulated::SimulatedAgent;
