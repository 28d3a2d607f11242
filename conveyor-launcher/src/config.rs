//! Launcher configuration
//!
//! Two layers: the cluster document (`pipeRepositories`, `serviceDiscovery`),
//! supplied as JSON either inline or as a file, and process settings read from
//! environment variables with fallback to defaults.

use anyhow::{Context, Result};
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use crate::discovery::{ServiceEntry, lenient_services};

/// Inline JSON cluster document
pub const CLUSTER_CONFIG_VAR: &str = "CONVEYOR_CLUSTER_CONFIG";
/// Path to a JSON cluster document
pub const CONFIG_FILE_VAR: &str = "CONVEYOR_CONFIG_FILE";

/// Cluster document: pipe repositories and service discovery table
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterConfig {
    /// Repositories by label, in document order
    #[serde(default, deserialize_with = "ordered_repositories")]
    pub pipe_repositories: Vec<(String, RepositoryConfig)>,

    #[serde(default, deserialize_with = "lenient_services")]
    pub service_discovery: HashMap<String, ServiceEntry>,
}

/// One git repository holding pipe definitions
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RepositoryConfig {
    pub uri: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

fn default_branch() -> String {
    "master".to_string()
}

impl ClusterConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Invalid cluster configuration")
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Failed to load config file: {}", path.display()))
    }
}

/// Launcher configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub cluster: ClusterConfig,

    /// How often pipe repositories are pulled
    pub update_interval: Duration,

    /// Local directory scanned for pipe definitions
    pub pipes_dir: PathBuf,

    /// Root directory for repository working copies
    pub repositories_dir: PathBuf,

    /// Upper bound for a single dispatch request
    pub request_timeout: Duration,
}

impl Config {
    /// Creates a configuration with default process settings
    pub fn new(cluster: ClusterConfig) -> Self {
        Self {
            cluster,
            update_interval: Duration::from_millis(60_000),
            pipes_dir: PathBuf::from("pipes"),
            repositories_dir: PathBuf::from("repositories"),
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - CONVEYOR_CLUSTER_CONFIG (optional, inline JSON cluster document)
    /// - CONVEYOR_CONFIG_FILE (optional, used when CONVEYOR_CLUSTER_CONFIG is unset)
    /// - CONVEYOR_UPDATE_INTERVAL_MS (optional, default: 60000)
    /// - CONVEYOR_PIPES_DIR (optional, default: pipes)
    /// - CONVEYOR_REPOSITORIES_DIR (optional, default: repositories)
    /// - CONVEYOR_REQUEST_TIMEOUT_SECS (optional, default: 30)
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let cluster = if let Some(json) = var(CLUSTER_CONFIG_VAR) {
            ClusterConfig::from_json(&json)
                .with_context(|| format!("Failed to parse {}", CLUSTER_CONFIG_VAR))?
        } else if let Some(path) = var(CONFIG_FILE_VAR) {
            ClusterConfig::from_file(path)?
        } else {
            warn!("No cluster configuration found, starting without repositories or discovery");
            ClusterConfig::default()
        };

        let mut config = Self::new(cluster);

        if let Some(interval) = var("CONVEYOR_UPDATE_INTERVAL_MS").and_then(|s| s.parse().ok()) {
            config.update_interval = Duration::from_millis(interval);
        }

        if let Some(dir) = var("CONVEYOR_PIPES_DIR") {
            config.pipes_dir = PathBuf::from(dir);
        }

        if let Some(dir) = var("CONVEYOR_REPOSITORIES_DIR") {
            config.repositories_dir = PathBuf::from(dir);
        }

        if let Some(timeout) = var("CONVEYOR_REQUEST_TIMEOUT_SECS").and_then(|s| s.parse().ok()) {
            config.request_timeout = Duration::from_secs(timeout);
        }

        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.update_interval.is_zero() {
            anyhow::bail!("update_interval must be greater than 0");
        }

        if self.request_timeout.is_zero() {
            anyhow::bail!("request_timeout must be greater than 0");
        }

        for (label, repository) in &self.cluster.pipe_repositories {
            if repository.uri.trim().is_empty() {
                anyhow::bail!("pipe repository '{}' has an empty uri", label);
            }
            if repository.branch.trim().is_empty() {
                anyhow::bail!("pipe repository '{}' has an empty branch", label);
            }
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(ClusterConfig::default())
    }
}

/// Keeps repositories in document order, which decides catalog precedence.
/// Entries that are not objects are skipped.
fn ordered_repositories<'de, D>(deserializer: D) -> Result<Vec<(String, RepositoryConfig)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct RepositoriesVisitor;

    impl<'de> Visitor<'de> for RepositoriesVisitor {
        type Value = Vec<(String, RepositoryConfig)>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a map of repository labels to repository settings")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut repositories: Vec<(String, RepositoryConfig)> = Vec::new();

            while let Some((label, value)) = map.next_entry::<String, JsonValue>()? {
                if !value.is_object() {
                    warn!("Ignoring pipe repository '{}': not an object", label);
                    continue;
                }

                let repository = RepositoryConfig::deserialize(value).map_err(de::Error::custom)?;

                match repositories.iter_mut().find(|(existing, _)| *existing == label) {
                    Some(entry) => entry.1 = repository,
                    None => repositories.push((label, repository)),
                }
            }

            Ok(repositories)
        }
    }

    deserializer.deserialize_map(RepositoriesVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLUSTER: &str = r#"{
        "pipeRepositories": {
            "system": {
                "uri": "https://example.com/pipes.git",
                "username": "username",
                "token": "token",
                "branch": "develop"
            },
            "additional": {
                "uri": "https://example.com/more-pipes.git"
            },
            "broken": "not a repository"
        },
        "serviceDiscovery": {
            "test-segment": {
                "endpoints": {
                    "http": { "address": "http://localhost:8098/pipe" }
                }
            }
        }
    }"#;

    #[test]
    fn test_cluster_document() {
        let cluster = ClusterConfig::from_json(CLUSTER).unwrap();

        let labels: Vec<&str> = cluster
            .pipe_repositories
            .iter()
            .map(|(label, _)| label.as_str())
            .collect();
        assert_eq!(labels, vec!["system", "additional"]);

        let (_, system) = &cluster.pipe_repositories[0];
        assert_eq!(system.branch, "develop");
        assert_eq!(system.username.as_deref(), Some("username"));

        let (_, additional) = &cluster.pipe_repositories[1];
        assert_eq!(additional.branch, "master");
        assert!(additional.token.is_none());

        assert!(cluster.service_discovery.contains_key("test-segment"));
    }

    #[test]
    fn test_bad_discovery_endpoint_does_not_fail_the_document() {
        let cluster = ClusterConfig::from_json(
            r#"{
                "serviceDiscovery": {
                    "importer": { "endpoints": { "http": { "address": "http://importer/pipe" } } },
                    "exporter": { "endpoints": { "http": { "method": "PUT" } } }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(cluster.service_discovery.len(), 2);
        assert!(cluster.service_discovery["exporter"].endpoints.is_empty());
        assert_eq!(
            cluster.service_discovery["importer"].endpoints["http"].address,
            "http://importer/pipe"
        );
    }

    #[test]
    fn test_empty_document() {
        let cluster = ClusterConfig::from_json("{}").unwrap();
        assert!(cluster.pipe_repositories.is_empty());
        assert!(cluster.service_discovery.is_empty());
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.update_interval, Duration::from_secs(60));
        assert_eq!(config.pipes_dir, PathBuf::from("pipes"));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_vars() {
        let vars: HashMap<&str, String> = HashMap::from([
            (CLUSTER_CONFIG_VAR, CLUSTER.to_string()),
            ("CONVEYOR_UPDATE_INTERVAL_MS", "1500".to_string()),
            ("CONVEYOR_PIPES_DIR", "/srv/pipes".to_string()),
            ("CONVEYOR_REQUEST_TIMEOUT_SECS", "not-a-number".to_string()),
        ]);

        let config = Config::from_vars(|key| vars.get(key).cloned()).unwrap();

        assert_eq!(config.cluster.pipe_repositories.len(), 2);
        assert_eq!(config.update_interval, Duration::from_millis(1500));
        assert_eq!(config.pipes_dir, PathBuf::from("/srv/pipes"));
        assert_eq!(config.repositories_dir, PathBuf::from("repositories"));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_from_config_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("cluster.json");
        std::fs::write(&path, CLUSTER).unwrap();
        let path = path.to_string_lossy().to_string();

        let config = Config::from_vars(|key| (key == CONFIG_FILE_VAR).then(|| path.clone())).unwrap();
        assert_eq!(config.cluster.pipe_repositories[0].0, "system");
    }

    #[test]
    fn test_invalid_inline_config() {
        let result = Config::from_vars(|key| (key == CLUSTER_CONFIG_VAR).then(|| "{".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.update_interval = Duration::ZERO;
        assert!(config.validate().is_err());
        config.update_interval = Duration::from_secs(1);

        config.cluster.pipe_repositories.push((
            "empty".to_string(),
            RepositoryConfig {
                uri: " ".to_string(),
                branch: "master".to_string(),
                username: None,
                token: None,
            },
        ));
        assert!(config.validate().is_err());
    }
}
