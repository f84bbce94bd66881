// Copyright 2025 Agent Perf Contributors
// SPDX-License-Identifier: Apache-2.0

//! Core types for the agent performance benchmark harness.
//!
//! This crate holds the data model shared by the session manager, the
//! metrics exporter, the HTTP service and the CLI:
//!
//! - [`config`] - [`TestConfiguration`] and its enums
//! - [`session`] - [`SessionSnapshot`], [`SessionStatus`] and [`RollingStats`]
//! - [`error`] - the crate [`Error`] type

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod session;

pub use config::{Provider, TestConfiguration, TestConfigurationBuilder, TestMode};
pub use error::{Error, Result};
pub use session::{MachineInfo, RollingStats, SessionId, SessionSnapshot, SessionStatus};
