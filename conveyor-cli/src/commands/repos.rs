//! Repository command handlers

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use conveyor_launcher::PipeRepository;

use crate::config::CliConfig;

/// Repository subcommands
#[derive(Subcommand)]
pub enum RepoCommands {
    /// List configured pipe repositories
    List,
}

pub async fn handle_repo_command(command: RepoCommands, config: &CliConfig) -> Result<()> {
    match command {
        RepoCommands::List => list_repositories(config).await,
    }
}

async fn list_repositories(config: &CliConfig) -> Result<()> {
    let cluster = config.cluster().await?;
    let repositories = cluster.repositories();

    if repositories.is_empty() {
        println!("{}", "No pipe repositories configured.".yellow());
        return Ok(());
    }

    println!(
        "{}",
        format!("Found {} repository(ies):", repositories.len()).bold()
    );
    println!();
    for repository in repositories {
        println!("  {} {}", "▸".cyan(), repository.label().bold());
        println!("    URI:    {}", repository.uri().dimmed());
        println!("    Branch: {}", repository.branch().dimmed());
        println!(
            "    Path:   {}",
            repository.local_path().display().to_string().dimmed()
        );
        println!(
            "    Pipes:  {}",
            repository.definition_files().len().to_string().dimmed()
        );
        println!();
    }

    Ok(())
}
