// Copyright 2025 Agent Perf Contributors
// SPDX-License-Identifier: Apache-2.0

//! Background benchmark sessions.
//!
//! [`SessionManager`] starts a benchmark run as a Tokio task, lets callers
//! stop it, and serves consistent snapshots of its progress while it runs.
//!
//! # Quick Start
//!
//! ```no_run
//! use agent_perf_core::{Provider, TestConfiguration, TestMode};
//! use agent_perf_runner::SessionManager;
//!
//! # async fn demo() -> agent_perf_core::Result<()> {
//! let manager = SessionManager::default();
//! let config = TestConfiguration::builder()
//!     .provider(Provider::Simulated)
//!     .test_mode(TestMode::Concurrent)
//!     .iterations(20)
//!     .build()?;
//!
//! let id = manager.start(config)?;
//! if let Some(snapshot) = manager.status(Some(&id)) {
//!     println!("{:.0}%", snapshot.progress_percentage());
//! }
//! manager.stop();
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`manager`] - Session registry with start, stop and status
//! - [`strategy`] - How each test mode issues its calls
//! - [`error`] - Errors that fail a run

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod error;
pub mod manager;
mod run;
pub mod strategy;

pub use error::RunError;
pub use manager::{RunnerOptions, SessionManager, DEFAULT_MAX_SESSIONS};
pub use strategy::{Outcome, Strategy, SCENARIOS};
