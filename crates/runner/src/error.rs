// Copyright 2025 Agent Perf Contributors
// SPDX-License-Identifier: Apache-2.0

//! Errors that end or degrade a benchmark run.

use agent_perf_adapters::AgentError;
use thiserror::Error;

/// Error escaping the run loop.
#[derive(Debug, Error)]
pub enum RunError {
    /// The agent client could not be built.
    #[error("Failed to create agent: {0}")]
    Agent(#[from] AgentError),

    /// The metrics report could not be written.
    #[error("Failed to write metrics report: {0}")]
    Report(#[from] std::io::Error),

    /// The run task panicked.
    #[error("Run task panicked: {0}")]
    Panicked(String),
}
