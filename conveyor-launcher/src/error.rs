//! Error types for the launcher
//!
//! `LaunchError` is what callers of the dispatch path see. `DefinitionError`
//! and `RepositoryError` stay inside catalog rebuilds and repository
//! synchronization, where they are logged and contained.

use conveyor_client::ClientError;
use conveyor_core::ValidationError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for dispatch operations
pub type Result<T> = std::result::Result<T, LaunchError>;

/// Why a pipe could not be launched
#[derive(Debug, Error)]
pub enum LaunchError {
    /// No pipe with this name in the catalog
    #[error("No such pipe!")]
    UnknownPipe(String),

    /// The pipe object carries no segments to dispatch to
    #[error("Pipe '{0}' has no segments")]
    NoSegments(String),

    /// The entry segment has neither an embedded nor a discovered endpoint
    #[error("No endpoint available")]
    EndpointUnresolved {
        /// Name of the entry segment
        segment: String,
    },

    /// The entry endpoint answered with a non-success status
    #[error("{status} - {reason}")]
    Rejected { status: u16, reason: String },

    /// The entry endpoint could not be reached
    #[error("Dispatch failed: {0}")]
    Unreachable(#[source] ClientError),

    /// The pipe could not be serialized
    #[error("Failed to serialize pipe: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl From<ClientError> for LaunchError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Rejected { status, message } => LaunchError::Rejected {
                status,
                reason: message,
            },
            other => LaunchError::Unreachable(other),
        }
    }
}

/// A single definition file that could not be loaded
#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid pipe definition {path}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: ValidationError,
    },
}

/// Failure while cloning or pulling a pipe repository
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No working copy at {0}")]
    MissingWorkingCopy(PathBuf),

    #[error("Cannot fast-forward branch '{branch}' to the remote head, manual merge required")]
    CannotFastForward { branch: String },
}
