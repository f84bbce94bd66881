// Copyright 2025 Agent Perf Contributors
// SPDX-License-Identifier: Apache-2.0

//! The agent call seam.
//!
//! [`AgentClient`] is what the benchmark loop calls once per iteration. A
//! failed call is returned as an error and never affects the next call.

use agent_perf_core::Provider;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// System prompt given to every benchmarked agent.
pub const DEFAULT_INSTRUCTIONS: &str =
    "You are a helpful assistant. Provide brief, concise responses.";

/// Name the agent is registered under.
pub const AGENT_NAME: &str = "PerformanceTestAgent";

/// Prompt used for the warm-up call.
pub const WARMUP_PROMPT: &str = "Hello, this is a warmup call.";

/// Errors that can occur while calling an agent backend.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Transport failure.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("Agent returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },

    /// A streaming response ended before its terminal frame.
    #[error("Incomplete stream: {0}")]
    IncompleteStream(String),

    /// The response could not be understood.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The client could not be built from the configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Deliberate failure injected by the simulated backend.
    #[error("Simulated failure on call {0}")]
    Simulated(u64),
}

impl AgentError {
    /// Whether the call is worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AgentError::IncompleteStream(_))
    }
}

/// Result type for agent calls.
pub type Result<T> = std::result::Result<T, AgentError>;

/// A completed agent call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentReply {
    /// Response text.
    pub text: String,
    /// Time until the first content arrived (streaming calls only).
    pub time_to_first_token: Option<Duration>,
}

impl AgentReply {
    /// A reply without streaming timing.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            time_to_first_token: None,
        }
    }
}

/// A callable agent backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AgentClient: Send + Sync {
    /// Backend kind, for logging.
    fn provider(&self) -> Provider;

    /// Send `prompt` and wait for the full response.
    async fn invoke(&self, prompt: &str) -> Result<AgentReply>;

    /// Send `prompt` as a streaming request and consume the stream.
    async fn invoke_streaming(&self, prompt: &str) -> Result<AgentReply>;
}

/// Keep at most `limit` characters of an error body.
pub(crate) fn truncate_body(body: String, limit: usize) -> String {
    if body.chars().count() <= limit {
        body
    } else {
        let mut short: String = body.chars().take(limit).collect();
        short.push_str("...");
        short
    }
}

/// Turn a non-success response into [`AgentError::Status`].
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(AgentError::Status {
        status: status.as_u16(),
        body: truncate_body(body, 512),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_incomplete_stream_is_retryable() {
        assert!(AgentError::IncompleteStream("eof".into()).is_retryable());
        assert!(!AgentError::InvalidResponse("bad".into()).is_retryable());
        assert!(!AgentError::Simulated(3).is_retryable());
        assert!(!AgentError::Status {
            status: 503,
            body: String::new()
        }
        .is_retryable());
    }

    #[test]
    fn test_truncate_body() {
        assert_eq!(truncate_body("short".into(), 10), "short");
        assert_eq!(truncate_body("abcdefghij".into(), 4), "abcd...");
    }
}
