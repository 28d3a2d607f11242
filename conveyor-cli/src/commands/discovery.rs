//! Service discovery command handlers

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use conveyor_launcher::ServiceDiscovery;

use crate::config::CliConfig;

/// Discovery subcommands
#[derive(Subcommand)]
pub enum DiscoveryCommands {
    /// Resolve the endpoint of a segment
    Resolve {
        /// Segment name
        segment: String,

        /// Protocol to resolve; all protocols when omitted
        #[arg(short, long)]
        protocol: Option<String>,
    },
}

pub async fn handle_discovery_command(
    command: DiscoveryCommands,
    config: &CliConfig,
) -> Result<()> {
    let launcher_config = config.launcher_config()?;
    let discovery = ServiceDiscovery::new(launcher_config.cluster.service_discovery);

    match command {
        DiscoveryCommands::Resolve { segment, protocol } => {
            resolve(&discovery, &segment, protocol.as_deref())
        }
    }
}

fn resolve(discovery: &ServiceDiscovery, segment: &str, protocol: Option<&str>) -> Result<()> {
    let mut endpoints: Vec<_> = match protocol {
        Some(protocol) => discovery
            .resolve(segment, protocol)
            .map(|endpoint| (protocol.to_string(), endpoint))
            .into_iter()
            .collect(),
        None => discovery.resolve_all(segment).into_iter().collect(),
    };
    endpoints.sort_by(|a, b| a.0.cmp(&b.0));

    if endpoints.is_empty() {
        println!(
            "{}",
            format!("No endpoint available for segment '{}'.", segment).yellow()
        );
        return Ok(());
    }

    println!("{}", segment.bold());
    for (protocol, endpoint) in endpoints {
        println!(
            "  {:<10} {} {}",
            protocol.cyan(),
            endpoint.method_or_default().dimmed(),
            endpoint.address
        );
    }

    Ok(())
}
