//! Pipe command handlers
//!
//! Lists and shows catalogued pipes and launches them with optional data.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;
use conveyor_core::{Payload, Pipe};
use conveyor_launcher::PipeLauncher;
use serde_json::Value as JsonValue;
use std::path::PathBuf;

use crate::config::CliConfig;

/// Pipe subcommands
#[derive(Subcommand)]
pub enum PipeCommands {
    /// List all catalogued pipes
    List,
    /// Show a pipe definition
    Show {
        /// Pipe name
        name: String,
    },
    /// Launch a pipe
    Run {
        /// Pipe name
        name: String,

        /// Text data for the entry segment
        #[arg(short, long, conflicts_with = "file")]
        data: Option<String>,

        /// File sent base64-encoded to the entry segment
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// MIME type of the data
        #[arg(short, long)]
        mime_type: Option<String>,

        /// Additional data info as a JSON document
        #[arg(short, long, value_parser = parse_json)]
        info: Option<JsonValue>,

        /// Print the document that would be sent instead of sending it
        #[arg(long)]
        dry_run: bool,
    },
}

fn parse_json(s: &str) -> Result<JsonValue> {
    serde_json::from_str(s).with_context(|| format!("invalid JSON: `{}`", s))
}

/// Handle pipe commands
pub async fn handle_pipe_command(command: PipeCommands, config: &CliConfig) -> Result<()> {
    let cluster = config.cluster().await?;
    let launcher = cluster.launcher().await?;

    match command {
        PipeCommands::List => list_pipes(&launcher),
        PipeCommands::Show { name } => show_pipe(&launcher, &name),
        PipeCommands::Run {
            name,
            data,
            file,
            mime_type,
            info,
            dry_run,
        } => {
            let payload = build_payload(data, file, mime_type, info)?;
            if dry_run {
                preview_pipe(&launcher, &name, payload)
            } else {
                run_pipe(&launcher, &name, payload).await
            }
        }
    }
}

fn build_payload(
    data: Option<String>,
    file: Option<PathBuf>,
    mime_type: Option<String>,
    info: Option<JsonValue>,
) -> Result<Option<Payload>> {
    if let Some(path) = file {
        let bytes = std::fs::read(&path)
            .with_context(|| format!("Failed to read data file: {}", path.display()))?;
        return Ok(Some(Payload::binary(&bytes, mime_type, info)));
    }

    Ok(data.map(|text| Payload::text(text, mime_type, info)))
}

/// List all pipes
fn list_pipes(launcher: &PipeLauncher) -> Result<()> {
    let pipes = launcher.available_pipes();

    if pipes.is_empty() {
        println!("{}", "No pipes found.".yellow());
    } else {
        println!("{}", format!("Found {} pipe(s):", pipes.len()).bold());
        println!();
        for pipe in &pipes {
            print_pipe_summary(pipe);
        }
    }

    Ok(())
}

fn show_pipe(launcher: &PipeLauncher, name: &str) -> Result<()> {
    let pipe = launcher
        .get_pipe(name)
        .with_context(|| format!("No such pipe: {}", name))?;

    println!("{}", serde_json::to_string_pretty(&pipe)?);
    Ok(())
}

fn preview_pipe(launcher: &PipeLauncher, name: &str, payload: Option<Payload>) -> Result<()> {
    let pipe = launcher
        .get_pipe(name)
        .with_context(|| format!("No such pipe: {}", name))?;
    let (prepared, endpoint) = launcher.prepare(&pipe, payload)?;

    println!(
        "{} {} {}",
        "Would send to".bold(),
        endpoint.method_or_default().cyan(),
        endpoint.address.cyan()
    );
    println!("{}", serde_json::to_string_pretty(&prepared)?);
    Ok(())
}

async fn run_pipe(launcher: &PipeLauncher, name: &str, payload: Option<Payload>) -> Result<()> {
    let pipe = launcher
        .get_pipe(name)
        .with_context(|| format!("No such pipe: {}", name))?;

    launcher
        .dispatch(&pipe, payload)
        .await
        .with_context(|| format!("Failed to launch pipe '{}'", name))?;

    println!("{}", "✓ Pipe launched successfully!".green().bold());
    println!("  Name:     {}", pipe.name().bold());
    if let Some(entry) = pipe.entry_segment() {
        println!("  Entry:    {}", entry.name().cyan());
    }
    Ok(())
}

fn print_pipe_summary(pipe: &Pipe) {
    println!("  {} {}", "▸".cyan(), pipe.name().bold());

    let mut segments: Vec<_> = pipe.segments().iter().collect();
    segments.sort_by_key(|s| s.number());
    println!(
        "    Segments: {}",
        segments
            .iter()
            .map(|s| format!("{}:{}", s.number(), s.name()))
            .collect::<Vec<_>>()
            .join(" → ")
            .dimmed()
    );
    println!();
}
