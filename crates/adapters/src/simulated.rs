//! In-process agent with a fixed latency.
//!
//! Stands in for a real backend when no endpoint is available and in
//! tests. Every call sleeps for the configured latency; optionally every
//! k-th call fails.

use agent_perf_core::Provider;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::{sleep, Instant};

use crate::agent::{AgentClient, AgentError, AgentReply, Result};

/// Simulated agent backend.
#[derive(Debug)]
pub struct SimulatedAgent {
    latency: Duration,
    fail_every: Option<u64>,
    calls: AtomicU64,
}

impl SimulatedAgent {
    /// Agent whose calls all succeed after `latency`.
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            fail_every: None,
            calls: AtomicU64::new(0),
        }
    }

    /// Make every `k`-th call fail (1-based). `k = 0` disables failures.
    pub fn failing_every(mut self, k: u64) -> Self {
        self.fail_every = (k > 0).then_some(k);
        self
    }

    /// Calls made so far.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_call(&self) -> Result<u64> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        match self.fail_every {
            Some(k) if n % k == 0 => Err(AgentError::Simulated(n)),
            _ => Ok(n),
        }
    }
}

#[async_trait]
impl AgentClient for SimulatedAgent {
    fn provider(&self) -> Provider {
        Provider::Simulated
    }

    async fn invoke(&self, prompt: &str) -> Result<AgentReply> {
        let outcome = self.next_call();
        sleep(self.latency).await;
        outcome?;
        Ok(AgentReply::text(format!("Demo response to: {}", prompt)))
    }

    async fn invoke_streaming(&self, prompt: &str) -> Result<AgentReply> {
        let started = Instant::now();
        let outcome = self.next_call();
        let first = self.latency / 4;
        sleep(first).await;
        let time_to_first_token = started.elapsed();
        sleep(self.latency - first).await;
        outcome?;
        Ok(AgentReply {
            text: format!("Demo response to: {}", prompt),
            time_to_first_token: Some(time_to_first_token),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_invoke_takes_configured_latency() {
        let agent = SimulatedAgent::new(Duration::from_millis(10));
        let started = Instant::now();
        let reply = agent.invoke("Say hello 1").await.unwrap();
        assert_eq!(started.elapsed(), Duration::from_millis(10));
        assert_eq!(reply.text, "Demo response to: Say hello 1");
        assert_eq!(agent.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_streaming_reports_first_token() {
        let agent = SimulatedAgent::new(Duration::from_millis(40));
        let reply = agent.invoke_streaming("hi").await.unwrap();
        assert_eq!(reply.time_to_first_token, Some(Duration::from_millis(10)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_every_third_call() {
        let agent = SimulatedAgent::new(Duration::from_millis(1)).failing_every(3);
        let mut failures = Vec::new();
        for n in 1..=6 {
            if agent.invoke("x").await.is_err() {
                failures.push(n);
            }
        }
        assert_eq!(failures, vec![3, 6]);
    }
}
