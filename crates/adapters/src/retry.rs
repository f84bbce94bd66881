// Copyright 2025 Agent Perf Contributors
// SPDX-License-Identifier: Apache-2.0

//! Bounded retry for incomplete streams.
//!
//! Streaming backends occasionally cut a response short. [`RetryingAgent`]
//! re-issues such calls a bounded number of times with exponential backoff
//! and then gives up, leaving the caller to count the iteration as failed.
//! Other errors are returned immediately.

use agent_perf_core::Provider;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::agent::{AgentClient, AgentReply, Result};

/// Retry limits and backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubles for each further retry.
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (0-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        self.initial_backoff.saturating_mul(2u32.saturating_pow(retry))
    }
}

/// Wraps an agent and retries retryable failures.
pub struct RetryingAgent {
    inner: Arc<dyn AgentClient>,
    policy: RetryPolicy,
}

impl RetryingAgent {
    /// Wrap `inner` with `policy`.
    pub fn new(inner: Arc<dyn AgentClient>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    async fn with_retry<F, Fut>(&self, mut call: F) -> Result<AgentReply>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<AgentReply>> + Send,
    {
        let mut retry = 0;
        loop {
            match call().await {
                Err(e) if e.is_retryable() && retry < self.policy.max_retries => {
                    let delay = self.policy.backoff(retry);
                    warn!(
                        provider = %self.inner.provider(),
                        attempt = retry + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying agent call"
                    );
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                outcome => return outcome,
            }
        }
    }
}

#[async_trait]
impl AgentClient for RetryingAgent {
    fn provider(&self) -> Provider {
        self.inner.provider()
    }

    async fn invoke(&self, prompt: &str) -> Result<AgentReply> {
        self.with_retry(|| self.inner.invoke(prompt)).await
    }

    async fn invoke_streaming(&self, prompt: &str) -> Result<AgentReply> {
        self.with_retry(|| self.inner.invoke_streaming(prompt)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentError, MockAgentClient};
    use tokio::time::Instant;

    fn mock_with_failures(failures: usize) -> MockAgentClient {
        let mut mock = MockAgentClient::new();
        mock.expect_provider().return_const(Provider::Ollama);
        let mut seq = mockall::Sequence::new();
        mock.expect_invoke_streaming()
            .times(failures)
            .in_sequence(&mut seq)
            .returning(|_| Err(AgentError::IncompleteStream("eof".into())));
        mock.expect_invoke_streaming()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(AgentReply::text("ok")));
        mock
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(0), Duration::from_millis(100));
        assert_eq!(policy.backoff(1), Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_two_incomplete_streams() {
        let agent = RetryingAgent::new(Arc::new(mock_with_failures(2)), RetryPolicy::default());
        let started = Instant::now();
        let reply = agent.invoke_streaming("hi").await.unwrap();
        assert_eq!(reply.text, "ok");
        assert_eq!(started.elapsed(), Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_retries() {
        let mut mock = MockAgentClient::new();
        mock.expect_provider().return_const(Provider::Ollama);
        mock.expect_invoke_streaming()
            .times(3)
            .returning(|_| Err(AgentError::IncompleteStream("eof".into())));

        let agent = RetryingAgent::new(Arc::new(mock), RetryPolicy::default());
        let err = agent.invoke_streaming("hi").await.unwrap_err();
        assert!(matches!(err, AgentError::IncompleteStream(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_errors_are_not_retried() {
        let mut mock = MockAgentClient::new();
        mock.expect_invoke()
            .times(1)
            .returning(|_| Err(AgentError::InvalidResponse("bad".into())));

        let agent = RetryingAgent::new(Arc::new(mock), RetryPolicy::default());
        assert!(agent.invoke("hi").await.is_err());
    }
}
