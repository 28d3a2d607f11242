//! Repository layer
//!
//! Pipe definitions live in version-controlled repositories. Each repository
//! keeps a local working copy that is refreshed on demand and exposes the
//! definition files it currently holds.
//!
//! All operations here are blocking I/O and must run on the blocking pool.

pub mod git;

pub use git::{GitRepository, build_authenticated_uri};

use std::path::PathBuf;

/// Outcome of a synchronization attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// Already at the remote head
    Unchanged,
    /// The local head moved
    Updated,
    /// Transport or merge error; the previous working copy is untouched
    Failed,
}

impl SyncStatus {
    pub fn is_updated(self) -> bool {
        matches!(self, SyncStatus::Updated)
    }
}

/// A refreshable source of pipe-definition files
pub trait PipeRepository: Send + Sync {
    /// Configuration label of this repository
    fn label(&self) -> &str;

    /// Absolute paths of all definition files in the working copy
    fn definition_files(&self) -> Vec<PathBuf>;

    /// Brings the working copy up to date with the remote branch
    ///
    /// Never fails: errors are logged and reported as `SyncStatus::Failed`.
    fn synchronize(&self) -> SyncStatus;
}
