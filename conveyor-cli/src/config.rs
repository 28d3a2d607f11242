//! Configuration module
//!
//! Command-line overrides layered on top of the launcher's environment
//! configuration.

use anyhow::Result;
use conveyor_launcher::{Cluster, ClusterConfig, Config};
use std::path::PathBuf;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Cluster document path, taking precedence over the environment
    pub config_file: Option<PathBuf>,
    pub pipes_dir: Option<PathBuf>,
    pub repositories_dir: Option<PathBuf>,
}

impl CliConfig {
    /// Launcher configuration with the command-line overrides applied
    pub fn launcher_config(&self) -> Result<Config> {
        let mut config = Config::from_env()?;

        if let Some(path) = &self.config_file {
            config.cluster = ClusterConfig::from_file(path)?;
        }
        if let Some(dir) = &self.pipes_dir {
            config.pipes_dir = dir.clone();
        }
        if let Some(dir) = &self.repositories_dir {
            config.repositories_dir = dir.clone();
        }

        config.validate()?;
        Ok(config)
    }

    pub async fn cluster(&self) -> Result<Cluster> {
        Cluster::init(self.launcher_config()?).await
    }
}
