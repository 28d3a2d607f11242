//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod discovery;
mod pipes;
mod repos;

pub use discovery::DiscoveryCommands;
pub use pipes::PipeCommands;
pub use repos::RepoCommands;

use anyhow::Result;
use clap::Subcommand;

use crate::config::CliConfig;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Pipe catalog and launching
    Pipes {
        #[command(subcommand)]
        command: PipeCommands,
    },
    /// Pipe repositories
    Repos {
        #[command(subcommand)]
        command: RepoCommands,
    },
    /// Service discovery lookups
    Discovery {
        #[command(subcommand)]
        command: DiscoveryCommands,
    },
}

/// Routes the command to the appropriate handler module
pub async fn handle_command(command: Commands, config: &CliConfig) -> Result<()> {
    match command {
        Commands::Pipes { command } => pipes::handle_pipe_command(command, config).await,
        Commands::Repos { command } => repos::handle_repo_command(command, config).await,
        Commands::Discovery { command } => {
            discovery::handle_discovery_command(command, config).await
        }
    }
}
