//! Cluster bootstrap
//!
//! Wires the configuration into live components: the service discovery
//! table, one git repository per configured label and, on request, a
//! launcher over a freshly loaded catalog.

use anyhow::{Context, Result};
use conveyor_client::SegmentClient;
use conveyor_core::PipeSchema;
use std::sync::Arc;
use tracing::{info, warn};

use crate::catalog::PipeCatalog;
use crate::config::Config;
use crate::discovery::ServiceDiscovery;
use crate::repository::{GitRepository, PipeRepository};
use crate::service::PipeLauncher;

/// Configured repositories and discovery table
pub struct Cluster {
    config: Config,
    discovery: Arc<ServiceDiscovery>,
    repositories: Vec<Arc<GitRepository>>,
}

impl Cluster {
    /// Builds the cluster, cloning repositories that have no working copy yet
    pub async fn init(config: Config) -> Result<Self> {
        config.validate()?;

        let discovery = Arc::new(ServiceDiscovery::new(
            config.cluster.service_discovery.clone(),
        ));

        if config.cluster.pipe_repositories.is_empty() {
            warn!("No pipe repositories configured!");
        }

        let repositories_dir = config.repositories_dir.clone();
        let entries = config.cluster.pipe_repositories.clone();
        let repositories = tokio::task::spawn_blocking(move || {
            entries
                .iter()
                .map(|(label, repository)| {
                    Arc::new(GitRepository::open(label.as_str(), repository, &repositories_dir))
                })
                .collect::<Vec<_>>()
        })
        .await
        .context("Repository initialization panicked")?;

        info!(
            "Cluster initialized: {} repository(ies), {} discoverable segment(s)",
            repositories.len(),
            discovery.segments().len()
        );

        Ok(Self {
            config,
            discovery,
            repositories,
        })
    }

    /// Repository labels, in configuration order
    pub fn available_repositories(&self) -> Vec<String> {
        self.repositories
            .iter()
            .map(|r| r.label().to_string())
            .collect()
    }

    pub fn repositories(&self) -> &[Arc<GitRepository>] {
        &self.repositories
    }

    pub fn service_discovery(&self) -> &Arc<ServiceDiscovery> {
        &self.discovery
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Creates a launcher over a catalog loaded from every source
    pub async fn launcher(&self) -> Result<PipeLauncher> {
        let repositories: Vec<Arc<dyn PipeRepository>> = self
            .repositories
            .iter()
            .map(|r| Arc::clone(r) as Arc<dyn PipeRepository>)
            .collect();

        let catalog = Arc::new(PipeCatalog::new(
            self.config.pipes_dir.clone(),
            repositories,
            Arc::new(PipeSchema),
        ));

        let client = SegmentClient::with_timeout(self.config.request_timeout)
            .context("Failed to create segment client")?;

        let launcher = PipeLauncher::new(catalog, Arc::clone(&self.discovery), client);
        launcher
            .reload()
            .await
            .context("Initial catalog load panicked")?;

        Ok(launcher)
    }
}
