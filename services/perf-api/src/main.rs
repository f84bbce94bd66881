// Copyright 2025 Agent Perf Contributors
// SPDX-License-Identifier: Apache-2.0

use agent_perf_runner::SessionManager;
use metrics_exporter_prometheus::PrometheusBuilder;
use perf_api::{logging, routes, AppState, Settings};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    logging::init(&settings.logging);

    let metrics = PrometheusBuilder::new().install_recorder()?;
    let state = AppState::from_settings(&settings).with_metrics(metrics);
    let manager = Arc::clone(&state.manager);

    let app = routes::configure(state);

    let listener = tokio::net::TcpListener::bind(settings.server.socket_addr()?).await?;
    info!(
        addr = %listener.local_addr()?,
        reports = ?settings.output.directory,
        "perf-api listening"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(manager))
        .await?;
    Ok(())
}

async fn shutdown_signal(manager: Arc<SessionManager>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Could not listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    if manager.stop() {
        info!("Stopped running session on shutdown");
    }
}
