// Copyright 2025 Agent Perf Contributors
// SPDX-License-Identifier: Apache-2.0

//! HTTP service for agent benchmark sessions.
//!
//! Routes:
//!
//! - `POST /api/performance/start` - start a session (body: test configuration)
//! - `POST /api/performance/stop` - stop the running session
//! - `GET /api/performance/status[?sessionId=]` - session snapshot
//! - `GET /api/performance/sessions` - every session, newest first
//! - `GET /api/performance/health` - liveness
//! - `GET /metrics` - Prometheus exposition

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod logging;
pub mod routes;
pub mod state;

pub use config::Settings;
pub use error::ApiError;
pub use routes::configure;
pub use state::AppState;
