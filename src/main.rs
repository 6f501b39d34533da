mod cli;
mod cluster;
mod commands;
mod config;
mod logs;
mod namespace;
mod output;
mod quantity;
mod resources;
mod scanner;
mod selector;
mod table;
#[cfg(test)]
mod tests;
mod utils;

use clap::Parser;
use tracing::debug;

use cli::{Cli, Command};
use config::RunConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let run = RunConfig::from_cli(&cli);

    // Diagnostics go to stderr; stdout carries only command output.
    let filter = if run.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    debug!("Run configuration: {:?}", run);

    let Command::Monitor { command } = cli.command;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    commands::run(&run, command, &mut out).await
}
