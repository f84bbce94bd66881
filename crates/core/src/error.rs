// Copyright 2025 Agent Perf Contributors
// SPDX-License-Identifier: Apache-2.0

//! Error type shared across the harness crates.

use thiserror::Error;

/// Errors raised by core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A caller supplied a value that fails validation.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// JSON encoding or decoding failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build an [`Error::InvalidInput`].
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }
}

/// Result alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
