// Copyright 2025 Agent Perf Contributors
// SPDX-License-Identifier: Apache-2.0

//! Azure OpenAI chat completions client.
//!
//! Requests go to
//! `POST {endpoint}/openai/deployments/{deployment}/chat/completions?api-version=...`
//! with an `api-key` header. Streaming uses server-sent events terminated by
//! `data: [DONE]`.

use agent_perf_core::Provider;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::agent::{check_status, AgentClient, AgentError, AgentReply, Result};
use crate::stream::LineBuffer;

/// API version used when none is configured.
pub const DEFAULT_API_VERSION: &str = "2024-10-21";

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<Content>,
    #[serde(default)]
    delta: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Completion {
    #[serde(default)]
    choices: Vec<Choice>,
}

/// Folds server-sent completion events into a reply.
#[derive(Debug, Default)]
pub struct SseStream {
    lines: LineBuffer,
    text: String,
    done: bool,
    saw_content: bool,
}

impl SseStream {
    /// Feed a body chunk. Returns `true` when this chunk carried the first
    /// piece of content.
    pub fn push(&mut self, chunk: &[u8]) -> Result<bool> {
        let before = self.saw_content;
        for line in self.lines.push(chunk) {
            self.apply(&line)?;
        }
        Ok(!before && self.saw_content)
    }

    /// Finish the stream and return the accumulated text.
    pub fn finish(mut self) -> Result<String> {
        if let Some(line) = self.lines.finish() {
            self.apply(&line)?;
        }
        if !self.done {
            return Err(AgentError::IncompleteStream(
                "stream ended before [DONE]".to_string(),
            ));
        }
        Ok(self.text)
    }

    fn apply(&mut self, line: &str) -> Result<()> {
        // Comments and non-data fields carry nothing we need.
        let Some(data) = line.strip_prefix("data:") else {
            return Ok(());
        };
        let data = data.trim();
        if data == "[DONE]" {
            self.done = true;
            return Ok(());
        }

        let event: Completion = serde_json::from_str(data)
            .map_err(|e| AgentError::IncompleteStream(format!("malformed event: {}", e)))?;
        for choice in event.choices {
            if let Some(piece) = choice.delta.and_then(|d| d.content) {
                if !piece.is_empty() {
                    self.saw_content = true;
                    self.text.push_str(&piece);
                }
            }
        }
        Ok(())
    }
}

/// Client for one Azure OpenAI deployment.
pub struct AzureOpenAiAgent {
    http: reqwest::Client,
    url: String,
    api_key: String,
    deployment: String,
    instructions: String,
}

impl AzureOpenAiAgent {
    /// Create a client. `api_key` is required.
    pub fn new(
        endpoint: &str,
        deployment: impl Into<String>,
        api_key: Option<&str>,
        api_version: &str,
        instructions: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        reqwest::Url::parse(endpoint).map_err(|e| {
            AgentError::Configuration(format!("invalid Azure OpenAI endpoint '{}': {}", endpoint, e))
        })?;
        let api_key = api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                AgentError::Configuration("Azure OpenAI requires an API key".to_string())
            })?
            .to_string();

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| AgentError::Configuration(e.to_string()))?;

        let deployment = deployment.into();
        let url = format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            endpoint.trim_end_matches('/'),
            deployment,
            api_version
        );

        Ok(Self {
            http,
            url,
            api_key,
            deployment,
            instructions: instructions.into(),
        })
    }

    /// URL completions are posted to.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// JSON body for a completion request.
    pub fn request_body(&self, prompt: &str, stream: bool) -> serde_json::Value {
        json!({
            "messages": [
                { "role": "system", "content": self.instructions },
                { "role": "user", "content": prompt },
            ],
            "stream": stream,
        })
    }

    async fn send(&self, prompt: &str, stream: bool) -> Result<reqwest::Response> {
        let response = self
            .http
            .post(&self.url)
            .header("api-key", &self.api_key)
            .json(&self.request_body(prompt, stream))
            .send()
            .await?;
        check_status(response).await
    }
}

#[async_trait]
impl AgentClient for AzureOpenAiAgent {
    fn provider(&self) -> Provider {
        Provider::AzureOpenai
    }

    async fn invoke(&self, prompt: &str) -> Result<AgentReply> {
        let completion: Completion = self
            .send(prompt, false)
            .await?
            .json()
            .await
            .map_err(|e| AgentError::InvalidResponse(e.to_string()))?;

        let text = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .ok_or_else(|| AgentError::InvalidResponse("completion has no choices".to_string()))?;

        Ok(AgentReply::text(text))
    }

    async fn invoke_streaming(&self, prompt: &str) -> Result<AgentReply> {
        let started = Instant::now();
        let mut response = self.send(prompt, true).await?;

        let mut stream = SseStream::default();
        let mut time_to_first_token = None;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| AgentError::IncompleteStream(e.to_string()))?
        {
            if stream.push(&chunk)? && time_to_first_token.is_none() {
                time_to_first_token = Some(started.elapsed());
            }
        }

        let text = stream.finish()?;
        debug!(deployment = %self.deployment, chars = text.len(), "Azure OpenAI stream finished");

        Ok(AgentReply {
            text,
            time_to_first_token,
        })
    }
}
