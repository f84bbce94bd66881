//! CLI for Agent Perf.
//!
//! This crate provides the `agent-perf` command: run a benchmark session
//! against a local or hosted agent backend, summarise the reports it wrote,
//! and show where output goes.

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

use agent_perf_adapters::{AgentSettings, DefaultAgentFactory};
use agent_perf_benchmarks::io::{read_reports, write_summary, OUTPUT_DIR, SUMMARY_FILE};
use agent_perf_core::config::{
    DEFAULT_BATCH_SIZE, DEFAULT_CONCURRENT_REQUESTS, DEFAULT_ENDPOINT, DEFAULT_ITERATIONS,
    DEFAULT_MODEL, DEFAULT_SIMULATED_LATENCY_MS,
};
use agent_perf_core::{Provider, SessionSnapshot, SessionStatus, TestConfiguration, TestMode};
use agent_perf_runner::{RunnerOptions, SessionManager};
use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

/// Agent Perf CLI.
#[derive(Parser, Debug)]
#[command(name = "agent-perf")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbose logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one benchmark session and write its metrics report.
    ///
    /// Press Ctrl-C to stop early; the iterations recorded so far are
    /// still reported.
    Run(RunArgs),

    /// Write summary.md from every report in the output directory.
    Summarize {
        /// Directory holding metrics reports.
        #[arg(short, long, default_value = OUTPUT_DIR)]
        dir: PathBuf,
    },

    /// Show version and output locations.
    Status {
        /// Show detailed status information.
        #[arg(short, long)]
        detailed: bool,
    },
}

/// Options for `agent-perf run`.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Agent backend: ollama, azure_openai or simulated.
    #[arg(short, long, env = "PROVIDER", default_value = "ollama")]
    pub provider: Provider,

    /// Test mode: standard, batch, concurrent, streaming or scenarios.
    #[arg(short, long, env = "TEST_MODE", default_value = "standard")]
    pub mode: TestMode,

    /// Measured iterations.
    #[arg(short = 'n', long, env = "ITERATIONS", default_value_t = DEFAULT_ITERATIONS)]
    pub iterations: u32,

    /// Calls per batch in batch mode.
    #[arg(long, env = "BATCH_SIZE", default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: u32,

    /// Calls in flight in concurrent mode.
    #[arg(long, env = "CONCURRENT_REQUESTS", default_value_t = DEFAULT_CONCURRENT_REQUESTS)]
    pub concurrent_requests: u32,

    /// Ollama base URL.
    #[arg(long, env = "OLLAMA_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub ollama_endpoint: String,

    /// Ollama model.
    #[arg(long, env = "OLLAMA_MODEL_ID", default_value = DEFAULT_MODEL)]
    pub ollama_model: String,

    /// Azure OpenAI resource URL.
    #[arg(long, env = "AZURE_OPENAI_ENDPOINT")]
    pub azure_endpoint: Option<String>,

    /// Azure OpenAI deployment.
    #[arg(long, env = "AZURE_OPENAI_DEPLOYMENT_NAME")]
    pub azure_deployment: Option<String>,

    /// Azure OpenAI API key.
    #[arg(long, env = "AZURE_OPENAI_API_KEY", hide_env_values = true)]
    pub azure_api_key: Option<String>,

    /// Per-call latency of the simulated backend.
    #[arg(long, default_value_t = DEFAULT_SIMULATED_LATENCY_MS)]
    pub simulated_latency_ms: u64,

    /// Report directory.
    #[arg(short, long, default_value = OUTPUT_DIR)]
    pub output: PathBuf,

    /// Skip writing the metrics report.
    #[arg(long)]
    pub no_report: bool,
}

impl RunArgs {
    /// Session configuration and agent settings for these arguments.
    pub fn to_configuration(&self) -> anyhow::Result<(TestConfiguration, AgentSettings)> {
        let builder = TestConfiguration::builder()
            .provider(self.provider)
            .test_mode(self.mode)
            .iterations(self.iterations)
            .batch_size(self.batch_size)
            .concurrent_requests(self.concurrent_requests)
            .simulated_latency_ms(self.simulated_latency_ms);

        let builder = match self.provider {
            Provider::AzureOpenai => {
                let endpoint = self
                    .azure_endpoint
                    .clone()
                    .context("AZURE_OPENAI_ENDPOINT is required for azure_openai")?;
                let deployment = self
                    .azure_deployment
                    .clone()
                    .context("AZURE_OPENAI_DEPLOYMENT_NAME is required for azure_openai")?;
                builder.endpoint(endpoint).model(deployment)
            }
            Provider::Ollama | Provider::Simulated => builder
                .endpoint(self.ollama_endpoint.clone())
                .model(self.ollama_model.clone()),
        };

        let settings = AgentSettings {
            azure_api_key: self.azure_api_key.clone(),
            ..AgentSettings::default()
        };
        Ok((builder.build()?, settings))
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Run the CLI with the process arguments.
///
/// # Returns
///
/// Returns `Ok(())` on success, or an error if the command fails.
pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run(args) => run_benchmark(args).await,
        Commands::Summarize { dir } => {
            let reports = read_reports(&dir)
                .with_context(|| format!("reading reports from {}", dir.display()))?;
            if reports.is_empty() {
                println!("{} no reports in {}", "!".yellow(), dir.display());
                return Ok(());
            }
            let path = write_summary(&reports, &dir)?;
            println!(
                "{} summarised {} reports into {}",
                "✓".green(),
                reports.len(),
                path.display()
            );
            Ok(())
        }
        Commands::Status { detailed } => {
            println!("Agent Perf Benchmark System");
            println!("Version: {}", env!("CARGO_PKG_VERSION"));

            if detailed {
                println!("\nOutput directory:");
                println!("  - {}/", OUTPUT_DIR);
                println!("\nOutput files:");
                println!("  - {}/metrics_rust_<provider>_<timestamp>_<id>.json", OUTPUT_DIR);
                println!("  - {}/{}", OUTPUT_DIR, SUMMARY_FILE);
                println!("\nTest modes:");
                for mode in TestMode::ALL {
                    println!("  - {}", mode);
                }
            }

            Ok(())
        }
    }
}

async fn run_benchmark(args: RunArgs) -> anyhow::Result<()> {
    let (config, settings) = args.to_configuration()?;
    let options = RunnerOptions {
        output_dir: (!args.no_report).then(|| args.output.clone()),
        ..RunnerOptions::default()
    };
    let manager = SessionManager::new(Arc::new(DefaultAgentFactory::new(settings)), options);

    println!(
        "{} {} x{} against {} ({})",
        "▶".cyan(),
        config.test_mode.to_string().bold(),
        config.iterations,
        config.model,
        config.provider
    );

    let total = config.iterations;
    let id = manager.start(config)?;
    let mut rx = manager
        .subscribe(&id)
        .context("session vanished after start")?;

    let bar = ProgressBar::new(u64::from(total));
    bar.set_style(ProgressStyle::with_template(
        "{spinner} [{bar:40}] {pos}/{len} {msg}",
    )?);

    follow_progress(&manager, &mut rx, &bar).await;

    let snapshot = manager
        .wait(&id)
        .await
        .context("session vanished before finishing")?;
    bar.finish_and_clear();
    print_summary(&snapshot);

    if snapshot.status == SessionStatus::Failed {
        bail!(
            "{}",
            snapshot
                .error_message
                .unwrap_or_else(|| "benchmark failed".to_string())
        );
    }
    Ok(())
}

/// Mirror snapshots onto `bar` until the session is terminal. Ctrl-C stops
/// the session; the loop then waits for the final snapshot.
async fn follow_progress(
    manager: &SessionManager,
    rx: &mut watch::Receiver<SessionSnapshot>,
    bar: &ProgressBar,
) {
    loop {
        {
            // The final snapshot may predate the subscription.
            let snapshot = rx.borrow_and_update();
            bar.set_position(u64::from(snapshot.current_iteration));
            bar.set_message(format!("avg {:.1} ms", snapshot.stats.average_ms));
            if snapshot.is_terminal() {
                return;
            }
        }
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    return;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                if manager.stop() {
                    bar.set_message("stopping after the current call");
                }
            }
        }
    }
}

fn print_summary(snapshot: &SessionSnapshot) {
    let status = match snapshot.status {
        SessionStatus::Completed => snapshot.status.to_string().green(),
        SessionStatus::Stopped => snapshot.status.to_string().yellow(),
        _ => snapshot.status.to_string().red(),
    };
    println!("\n{} {}", "Session".bold(), snapshot.session_id);
    println!("  Status:      {}", status);
    println!(
        "  Iterations:  {}/{} ({} ok, {} failed)",
        snapshot.current_iteration,
        snapshot.total_iterations,
        snapshot.success_count.to_string().green(),
        snapshot.failure_count.to_string().red()
    );
    println!(
        "  Warm-up:     {:.2} ms ({})",
        snapshot.warmup_time_ms,
        if snapshot.warmup_successful { "ok" } else { "failed" }
    );
    println!(
        "  Latency:     avg {:.2} ms, min {:.2} ms, max {:.2} ms",
        snapshot.stats.average_ms, snapshot.stats.min_ms, snapshot.stats.max_ms
    );
    println!(
        "  Throughput:  {:.2} it/s over {} ms",
        snapshot.stats.iterations_per_second, snapshot.elapsed_time_ms
    );
    if !snapshot.time_to_first_token_ms.is_empty() {
        let ttft = &snapshot.time_to_first_token_ms;
        let avg = ttft.iter().sum::<f64>() / ttft.len() as f64;
        println!("  First token: avg {:.2} ms", avg);
    }
    println!("  Memory:      {:+.2} MB", snapshot.memory_used_mb);
    if let Some(path) = &snapshot.report_path {
        println!("  Report:      {}", path.cyan());
    }
    if let Some(error) = &snapshot.error_message {
        println!("  Error:       {}", error.red());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> RunArgs {
        let mut argv = vec!["agent-perf", "run"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Run(args) => args,
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_run_arguments_build_configuration() {
        let args = parse(&[
            "--provider",
            "simulated",
            "--mode",
            "batch",
            "-n",
            "4",
            "--batch-size",
            "2",
        ]);
        let (config, _) = args.to_configuration().unwrap();
        assert_eq!(config.provider, Provider::Simulated);
        assert_eq!(config.test_mode, TestMode::Batch);
        assert_eq!(config.iterations, 4);
        assert_eq!(config.batch_size, 2);
    }

    #[test]
    fn test_azure_requires_endpoint() {
        let mut args = parse(&["--provider", "azure_openai"]);
        args.azure_endpoint = None;
        assert!(args.to_configuration().is_err());
    }

    #[test]
    fn test_unknown_mode_rejected() {
        assert!(Cli::try_parse_from(["agent-perf", "run", "--mode", "turbo"]).is_err());
    }

    #[tokio::test]
    async fn test_progress_returns_for_already_finished_session() {
        let manager = SessionManager::default();
        let config = TestConfiguration::builder()
            .provider(Provider::Simulated)
            .iterations(2)
            .simulated_latency_ms(1)
            .build()
            .unwrap();
        let id = manager.start(config).unwrap();
        manager.wait(&id).await.unwrap();

        let mut rx = manager.subscribe(&id).unwrap();
        let bar = ProgressBar::hidden();
        bar.set_length(2);
        tokio::time::timeout(
            std::time::Duration::from_secs(5),
            follow_progress(&manager, &mut rx, &bar),
        )
        .await
        .unwrap();
        assert_eq!(bar.position(), 2);
    }

    #[test]
    fn test_status_command() {
        let cli = Cli::try_parse_from(["agent-perf", "status", "--detailed"]).unwrap();
        assert!(matches!(cli.command, Commands::Status { detailed: true }));
    }
}
