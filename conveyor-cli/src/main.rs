//! Conveyor CLI
//!
//! Command-line interface for inspecting the pipe catalog and launching pipes.

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::CliConfig;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "conveyor")]
#[command(about = "Conveyor pipe launcher CLI", long_about = None)]
struct Cli {
    /// Cluster configuration file
    #[arg(long, env = "CONVEYOR_CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Local pipes directory
    #[arg(long, env = "CONVEYOR_PIPES_DIR")]
    pipes_dir: Option<PathBuf>,

    /// Root directory for repository working copies
    #[arg(long, env = "CONVEYOR_REPOSITORIES_DIR")]
    repositories_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "conveyor=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = CliConfig {
        config_file: cli.config,
        pipes_dir: cli.pipes_dir,
        repositories_dir: cli.repositories_dir,
    };

    handle_command(cli.command, &config).await
}
