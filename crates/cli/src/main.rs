//! Agent Perf CLI entry point.

use colored::Colorize;

#[tokio::main]
async fn main() {
    if let Err(e) = agent_perf_cli::run().await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}
