//! Conveyor Launcher daemon
//!
//! Loads the cluster configuration, clones the pipe repositories, loads the
//! catalog and keeps it synchronized until interrupted.

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use conveyor_launcher::{Cluster, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "conveyor_launcher=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Conveyor Launcher");

    let config = Config::from_env().context("Failed to load configuration")?;
    info!(
        "Loaded configuration: pipes_dir={}, repositories_dir={}, update_interval={:?}",
        config.pipes_dir.display(),
        config.repositories_dir.display(),
        config.update_interval
    );

    let update_interval = config.update_interval;
    let cluster = Cluster::init(config).await?;
    let launcher = cluster.launcher().await?;

    info!(
        "Launcher ready with {} pipe(s)",
        launcher.available_pipes().len()
    );

    let reconciler = launcher.spawn_reconciler(update_interval);

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    warn!("Shutdown signal received, stopping reconciliation");
    reconciler.abort();

    Ok(())
}
