// Copyright 2025 Agent Perf Contributors
// SPDX-License-Identifier: Apache-2.0

//! Ollama chat client.
//!
//! Talks to `POST {endpoint}/api/chat`. Streaming responses are
//! newline-delimited JSON frames; the last frame carries `"done": true`.
//! A stream that ends without it is reported as
//! [`AgentError::IncompleteStream`].

use agent_perf_core::Provider;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::agent::{check_status, AgentClient, AgentError, AgentReply, Result};
use crate::stream::LineBuffer;

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatFrame {
    #[serde(default)]
    message: Option<ChatMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Folds streamed NDJSON frames into a reply.
#[derive(Debug, Default)]
pub struct OllamaStream {
    lines: LineBuffer,
    text: String,
    done: bool,
    saw_content: bool,
}

impl OllamaStream {
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
                "stream ended before the done frame".to_string(),
            ));
        }
        Ok(self.text)
    }

    fn apply(&mut self, line: &str) -> Result<()> {
        let frame: ChatFrame = serde_json::from_str(line)
            .map_err(|e| AgentError::IncompleteStream(format!("malformed frame: {}", e)))?;
        if let Some(error) = frame.error {
            return Err(AgentError::InvalidResponse(error));
        }
        if let Some(message) = frame.message {
            if !message.content.is_empty() {
                self.saw_content = true;
                self.text.push_str(&message.content);
            }
        }
        self.done |= frame.done;
        Ok(())
    }
}

/// Client for an Ollama server.
pub struct OllamaAgent {
    http: reqwest::Client,
    chat_url: String,
    model: String,
    instructions: String,
}

impl OllamaAgent {
    /// Create a client for `endpoint` using `model`.
    pub fn new(
        endpoint: &str,
        model: impl Into<String>,
        instructions: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        reqwest::Url::parse(endpoint).map_err(|e| {
            AgentError::Configuration(format!("invalid Ollama endpoint '{}': {}", endpoint, e))
        })?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| AgentError::Configuration(e.to_string()))?;

        Ok(Self {
            http,
            chat_url: format!("{}/api/chat", endpoint.trim_end_matches('/')),
            model: model.into(),
            instructions: instructions.into(),
        })
    }

    /// URL chat requests are sent to.
    pub fn chat_url(&self) -> &str {
        &self.chat_url
    }

    /// JSON body for a chat request.
    pub fn request_body(&self, prompt: &str, stream: bool) -> serde_json::Value {
        json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": self.instructions },
                { "role": "user", "content": prompt },
            ],
            "stream": stream,
        })
    }
}

#[async_trait]
impl AgentClient for OllamaAgent {
    fn provider(&self) -> Provider {
        Provider::Ollama
    }

    async fn invoke(&self, prompt: &str) -> Result<AgentReply> {
        let response = self
            .http
            .post(&self.chat_url)
            .json(&self.request_body(prompt, false))
            .send()
            .await?;
        let response = check_status(response).await?;

        let frame: ChatFrame = response
            .json()
            .await
            .map_err(|e| AgentError::InvalidResponse(e.to_string()))?;
        if let Some(error) = frame.error {
            return Err(AgentError::InvalidResponse(error));
        }
        let text = frame
            .message
            .map(|m| m.content)
            .ok_or_else(|| AgentError::InvalidResponse("response has no message".to_string()))?;

        Ok(AgentReply::text(text))
    }

    async fn invoke_streaming(&self, prompt: &str) -> Result<AgentReply> {
        let started = Instant::now();
        let response = self
            .http
            .post(&self.chat_url)
            .json(&self.request_body(prompt, true))
            .send()
            .await?;
        let mut response = check_status(response).await?;

        let mut stream = OllamaStream::default();
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
        debug!(model = %self.model, chars = text.len(), "Ollama stream finished");

        Ok(AgentReply {
            text,
            time_to_first_token,
        })
    }
}
