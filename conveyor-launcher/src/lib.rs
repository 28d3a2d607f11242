//! Conveyor Launcher
//!
//! Starts pipes (ordered chains of processing segments) by sending the pipe
//! document to its entry segment.
//!
//! Architecture:
//! - Configuration: cluster document plus process settings from the environment
//! - Repositories: git working copies holding pipe definitions
//! - Catalog: validated pipe definitions, rebuilt and swapped atomically
//! - Discovery: segment name to endpoint lookup
//! - Service: the dispatch engine
//! - Scheduler: periodic repository synchronization and catalog rebuilds

pub mod catalog;
pub mod cluster;
pub mod config;
pub mod discovery;
pub mod error;
pub mod repository;
pub mod scheduler;
pub mod service;

pub use catalog::{CatalogSnapshot, PipeCatalog, RebuildReport};
pub use cluster::Cluster;
pub use config::{ClusterConfig, Config, RepositoryConfig};
pub use discovery::{ServiceDiscovery, ServiceEntry};
pub use error::{DefinitionError, LaunchError, RepositoryError};
pub use repository::{GitRepository, PipeRepository, SyncStatus};
pub use scheduler::Reconciler;
pub use service::PipeLauncher;
