// Copyright 2025 Agent Perf Contributors
// SPDX-License-Identifier: Apache-2.0

//! Shared application state.

use agent_perf_adapters::{AgentSettings, DefaultAgentFactory};
use agent_perf_runner::{RunnerOptions, SessionManager};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

use crate::config::Settings;

/// State handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Benchmark sessions.
    pub manager: Arc<SessionManager>,
    /// Prometheus renderer, when a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// State around an existing manager.
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self {
            manager,
            metrics: None,
        }
    }

    /// State built from service settings.
    pub fn from_settings(settings: &Settings) -> Self {
        let agents = AgentSettings {
            azure_api_key: settings.azure.api_key.clone(),
            azure_api_version: settings.azure.api_version.clone(),
            ..AgentSettings::default()
        };
        let options = RunnerOptions {
            output_dir: settings.output.directory.clone(),
            warmup_prompt: settings.warmup_prompt.clone(),
            max_sessions: settings.max_sessions,
        };
        Self::new(Arc::new(SessionManager::new(
            Arc::new(DefaultAgentFactory::new(agents)),
            options,
        )))
    }

    /// Attach a Prometheus handle for `GET /metrics`.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
