// Copyright 2025 Agent Perf Contributors
// SPDX-License-Identifier: Apache-2.0

//! `/api/performance` routes.

use agent_perf_core::{SessionSnapshot, TestConfiguration};
use axum::{
    body::Bytes,
    extract::{Query, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;

/// Response to `POST start`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
    /// Id of the new session.
    pub session_id: String,
    /// Confirmation.
    pub message: &'static str,
}

/// Response to `POST stop`.
#[derive(Debug, Serialize)]
pub struct StopResponse {
    /// Whether a running session was stopped.
    pub stopped: bool,
    /// Confirmation.
    pub message: &'static str,
}

/// Query for `GET status`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusQuery {
    /// Session to report; latest when absent.
    pub session_id: Option<String>,
}

/// Response to `GET status` when a session exists.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    /// Session snapshot fields.
    #[serde(flatten)]
    pub snapshot: SessionSnapshot,
    /// Share of iterations done, 0-100.
    pub progress_percentage: f64,
    /// Rolling average latency.
    pub average_time_per_iteration_ms: f64,
    /// Fastest iteration.
    pub min_iteration_time_ms: f64,
    /// Slowest iteration.
    pub max_iteration_time_ms: f64,
}

impl From<SessionSnapshot> for StatusResponse {
    fn from(snapshot: SessionSnapshot) -> Self {
        Self {
            progress_percentage: snapshot.progress_percentage(),
            average_time_per_iteration_ms: snapshot.stats.average_ms,
            min_iteration_time_ms: snapshot.stats.min_ms,
            max_iteration_time_ms: snapshot.stats.max_ms,
            snapshot,
        }
    }
}

/// Routes for session control.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/performance/start", post(start_test))
        .route("/api/performance/stop", post(stop_test))
        .route("/api/performance/status", get(get_status))
        .route("/api/performance/sessions", get(list_sessions))
        .route("/api/performance/health", get(health))
}

async fn start_test(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<StartResponse>, ApiError> {
    // An empty body means "all defaults".
    let config: TestConfiguration = if body.iter().all(u8::is_ascii_whitespace) {
        TestConfiguration::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::bad_request("INVALID_JSON", e.to_string()))?
    };

    info!(
        iterations = config.iterations,
        mode = %config.test_mode,
        provider = %config.provider,
        "Starting test"
    );
    let session_id = state.manager.start(config)?;

    Ok(Json(StartResponse {
        session_id,
        message: "Test started successfully",
    }))
}

async fn stop_test(State(state): State<AppState>) -> Json<StopResponse> {
    info!("Stopping test");
    let stopped = state.manager.stop();
    Json(StopResponse {
        stopped,
        message: if stopped {
            "Test stopped successfully"
        } else {
            "No test running"
        },
    })
}

async fn get_status(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Response {
    match state.manager.status(query.session_id.as_deref()) {
        Some(snapshot) => Json(StatusResponse::from(snapshot)).into_response(),
        None => Json(json!({ "status": "Idle", "message": "No test running" })).into_response(),
    }
}

async fn list_sessions(State(state): State<AppState>) -> Json<Vec<SessionSnapshot>> {
    Json(state.manager.sessions())
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy", "service": "rust-backend" }))
}
