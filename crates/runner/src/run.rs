// Copyright 2025 Agent Perf Contributors
// SPDX-License-Identifier: Apache-2.0

//! The background run of one benchmark session.
//!
//! The run owns the write side of the session's watch channel. Each step
//! publishes a complete snapshot; once the session is terminal only
//! finalisation metadata (memory, machine info, report path) is attached.

use agent_perf_adapters::{AgentClient, AgentFactory};
use agent_perf_benchmarks::{io, machine_info, MetricsReport, ResourceMetrics, ResourceMonitor};
use agent_perf_core::{MachineInfo, SessionSnapshot, TestMode};
use futures::FutureExt;
use metrics::{counter, histogram};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::error::RunError;
use crate::manager::RunnerOptions;
use crate::strategy::{millis, Outcome, Sample, SampleSink, Strategy};

/// Everything a run needs, moved into its task.
pub(crate) struct RunContext {
    pub session: Arc<watch::Sender<SessionSnapshot>>,
    pub token: CancellationToken,
    pub finished: CancellationToken,
    pub factory: Arc<dyn AgentFactory>,
    pub options: Arc<RunnerOptions>,
}

/// Task body: run the session and turn escaping errors into Failed.
pub(crate) async fn execute(ctx: RunContext) {
    let session_id = ctx.session.borrow().session_id.clone();

    let result = AssertUnwindSafe(run(&ctx, &session_id))
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| Err(RunError::Panicked(panic_message(panic))));

    if let Err(e) = result {
        error!(session_id = %session_id, error = %e, "Benchmark run failed");
        ctx.session.send_if_modified(|s| s.fail(e.to_string()));
    }

    let status = ctx.session.borrow().status;
    counter!("agent_perf_sessions_finished_total", "status" => status.as_str()).increment(1);
    ctx.finished.cancel();
}

#[instrument(name = "benchmark_run", skip(ctx))]
async fn run(ctx: &RunContext, session_id: &str) -> Result<(), RunError> {
    let config = ctx.session.borrow().configuration.clone();
    ctx.session.send_if_modified(|s| s.reset());
    let monitor = ResourceMonitor::start();

    let agent = ctx.factory.create(&config)?;
    warm_up(agent.as_ref(), &ctx.options.warmup_prompt, &ctx.session).await;

    let mut recorder = Recorder::new(Arc::clone(&ctx.session), config.test_mode, monitor);
    let outcome = Strategy::for_config(&config)
        .run(agent.as_ref(), config.iterations, &ctx.token, &mut recorder)
        .await;

    finalize(ctx, outcome, recorder.monitor);
    Ok(())
}

async fn warm_up(agent: &dyn AgentClient, prompt: &str, session: &watch::Sender<SessionSnapshot>) {
    let started = Instant::now();
    let result = agent.invoke(prompt).await;
    let elapsed_ms = millis(started.elapsed());

    match &result {
        Ok(_) => info!(warmup_ms = elapsed_ms, "Warm-up call succeeded"),
        Err(e) => warn!(error = %e, "Warm-up call failed, continuing"),
    }
    session.send_if_modified(|s| s.record_warmup(result.is_ok(), elapsed_ms));
}

fn finalize(ctx: &RunContext, outcome: Outcome, monitor: ResourceMonitor) {
    ctx.session.send_if_modified(|s| match outcome {
        Outcome::Finished if !ctx.token.is_cancelled() => s.complete(),
        _ => s.stop(),
    });

    let resources = monitor.finish();
    let machine = machine_info();
    ctx.session.send_modify(|s| {
        s.memory_used_mb = resources.memory_delta_mb;
        s.machine_info = Some(machine.clone());
    });

    if let Some(dir) = &ctx.options.output_dir {
        let snapshot = ctx.session.borrow().clone();
        match persist_report(&snapshot, resources, machine, dir) {
            Ok(path) => {
                info!(path = %path.display(), "Metrics report written");
                ctx.session
                    .send_modify(|s| s.report_path = Some(path.display().to_string()));
            }
            Err(e) => error!(error = %e, "Metrics report not written"),
        }
    }

    let snapshot = ctx.session.borrow();
    info!(
        status = %snapshot.status,
        iterations = snapshot.current_iteration,
        failures = snapshot.failure_count,
        average_ms = snapshot.stats.average_ms,
        "Benchmark session finished"
    );
}

fn persist_report(
    snapshot: &SessionSnapshot,
    resources: ResourceMetrics,
    machine: MachineInfo,
    dir: &Path,
) -> Result<PathBuf, RunError> {
    let report = MetricsReport::from_snapshot(snapshot, resources, machine);
    Ok(io::write_report(&report, dir)?)
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Publishes each iteration into the session and the metrics registry.
struct Recorder {
    session: Arc<watch::Sender<SessionSnapshot>>,
    mode: &'static str,
    started: Instant,
    monitor: ResourceMonitor,
}

impl Recorder {
    fn new(
        session: Arc<watch::Sender<SessionSnapshot>>,
        mode: TestMode,
        monitor: ResourceMonitor,
    ) -> Self {
        Self {
            session,
            mode: mode.as_str(),
            started: Instant::now(),
            monitor,
        }
    }
}

impl SampleSink for Recorder {
    fn record(&mut self, sample: Sample) {
        self.monitor.sample();
        let elapsed = self.started.elapsed();

        // A stopped session is frozen; late results are dropped.
        let recorded = self.session.send_if_modified(|s| {
            if !s.record_iteration(sample.latency_ms, sample.success, elapsed) {
                return false;
            }
            if let Some(ttft) = sample.first_token_ms {
                s.record_first_token(ttft);
            }
            if let Some(name) = sample.scenario {
                s.record_scenario(name, sample.latency_ms);
            }
            true
        });
        if !recorded {
            return;
        }

        let outcome = if sample.success { "success" } else { "failure" };
        counter!("agent_perf_iterations_total", "mode" => self.mode, "outcome" => outcome)
            .increment(1);
        histogram!("agent_perf_iteration_latency_ms", "mode" => self.mode)
            .record(sample.latency_ms);
    }
}
