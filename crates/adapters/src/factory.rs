//! Builds the agent client for a session.

use agent_perf_core::{Provider, TestConfiguration, TestMode};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::agent::{AgentClient, Result, AGENT_NAME, DEFAULT_INSTRUCTIONS};
use crate::azure::{AzureOpenAiAgent, DEFAULT_API_VERSION};
use crate::ollama::OllamaAgent;
use crate::retry::{RetryPolicy, RetryingAgent};
use crate::simulated::SimulatedAgent;

/// Creates one agent client per benchmark session.
pub trait AgentFactory: Send + Sync {
    /// Build a client for `config`. Errors here fail the session.
    fn create(&self, config: &TestConfiguration) -> Result<Arc<dyn AgentClient>>;
}

impl<F> AgentFactory for F
where
    F: Fn(&TestConfiguration) -> Result<Arc<dyn AgentClient>> + Send + Sync,
{
    fn create(&self, config: &TestConfiguration) -> Result<Arc<dyn AgentClient>> {
        self(config)
    }
}

/// Settings shared by every client the default factory builds.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    /// System prompt.
    pub instructions: String,
    /// Azure OpenAI key.
    pub azure_api_key: Option<String>,
    /// Azure OpenAI API version.
    pub azure_api_version: String,
    /// Per-request timeout.
    pub request_timeout: Option<Duration>,
    /// Retry policy for streaming sessions.
    pub retry: RetryPolicy,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            azure_api_key: None,
            azure_api_version: DEFAULT_API_VERSION.to_string(),
            request_timeout: Some(Duration::from_secs(120)),
            retry: RetryPolicy::default(),
        }
    }
}

/// Factory that picks the client from [`TestConfiguration::provider`].
///
/// Streaming sessions get a [`RetryingAgent`] around the client.
#[derive(Debug, Clone, Default)]
pub struct DefaultAgentFactory {
    settings: AgentSettings,
}

impl DefaultAgentFactory {
    /// Create a factory.
    pub fn new(settings: AgentSettings) -> Self {
        Self { settings }
    }

    /// Settings in use.
    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }
}

impl AgentFactory for DefaultAgentFactory {
    fn create(&self, config: &TestConfiguration) -> Result<Arc<dyn AgentClient>> {
        let settings = &self.settings;
        let client: Arc<dyn AgentClient> = match config.provider {
            Provider::Ollama => Arc::new(OllamaAgent::new(
                &config.endpoint,
                config.model.clone(),
                settings.instructions.clone(),
                settings.request_timeout,
            )?),
            Provider::AzureOpenai => Arc::new(AzureOpenAiAgent::new(
                &config.endpoint,
                config.model.clone(),
                settings.azure_api_key.as_deref(),
                &settings.azure_api_version,
                settings.instructions.clone(),
                settings.request_timeout,
            )?),
            Provider::Simulated => Arc::new(SimulatedAgent::new(Duration::from_millis(
                config.simulated_latency_ms,
            ))),
        };

        debug!(
            agent = AGENT_NAME,
            provider = %config.provider,
            model = %config.model,
            "Agent client created"
        );

        if config.test_mode == TestMode::Streaming {
            Ok(Arc::new(RetryingAgent::new(client, settings.retry)))
        } else {
            Ok(client)
        }
    }
}
