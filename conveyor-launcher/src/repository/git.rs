//! Git-backed pipe repository
//!
//! Clones the configured branch into `<repositories>/<sanitized uri>/<branch>`
//! on first use and fast-forwards it on every synchronization.

use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{Cred, FetchOptions, RemoteCallbacks, Repository};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use url::Url;

use super::{PipeRepository, SyncStatus};
use crate::config::RepositoryConfig;
use crate::error::RepositoryError;

/// Extension of pipe-definition files
pub const DEFINITION_EXTENSION: &str = "json";

/// Embeds credentials into an http(s) repository URI
///
/// Returns the URI unchanged when either credential is missing or empty, or
/// when the URI is not an http(s) URL (local paths, ssh remotes). The token is
/// percent-encoded.
pub fn build_authenticated_uri(uri: &str, username: Option<&str>, token: Option<&str>) -> String {
    let username = username.filter(|u| !u.is_empty());
    let token = token.filter(|t| !t.is_empty());
    let (Some(username), Some(token)) = (username, token) else {
        return uri.to_string();
    };

    let Ok(mut url) = Url::parse(uri) else {
        return uri.to_string();
    };

    if !matches!(url.scheme(), "http" | "https") {
        return uri.to_string();
    }

    if url.set_username(username).is_err() || url.set_password(Some(token)).is_err() {
        return uri.to_string();
    }

    url.to_string()
}

/// Location of the working copy for a repository URI and branch
pub fn working_copy_path(base: &Path, uri: &str, branch: &str) -> PathBuf {
    let sanitized: String = uri
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();
    base.join(sanitized).join(branch)
}

/// Points `origin` at `uri`, dropping any credentials embedded at clone time
fn reset_origin_url(repo: &Repository, uri: &str) -> Result<(), git2::Error> {
    repo.remote_set_url("origin", uri)
}

/// Pipe repository backed by a git working copy
#[derive(Debug)]
pub struct GitRepository {
    label: String,
    uri: String,
    branch: String,
    username: Option<String>,
    token: Option<String>,
    local_path: PathBuf,
}

impl GitRepository {
    /// Opens the working copy, cloning it first if it does not exist yet
    ///
    /// A failed clone is logged; the repository then has no definition files
    /// and every synchronization reports `Failed`. Clones are not retried.
    pub fn open(label: impl Into<String>, config: &RepositoryConfig, base_dir: &Path) -> Self {
        let local_path = working_copy_path(base_dir, &config.uri, &config.branch);
        let local_path = std::path::absolute(&local_path).unwrap_or(local_path);

        let repository = Self {
            label: label.into(),
            uri: config.uri.clone(),
            branch: config.branch.clone(),
            username: config.username.clone(),
            token: config.token.clone(),
            local_path,
        };

        if repository.local_path.exists() {
            debug!(
                repository = %repository.label,
                path = %repository.local_path.display(),
                "Using existing working copy"
            );
        } else if let Err(e) = repository.clone_working_copy() {
            error!(
                repository = %repository.label,
                uri = %repository.uri,
                error = %e,
                "Calling clone command failed"
            );
            // Leave nothing behind that would later pass for a working copy
            if repository.local_path.exists() {
                let _ = fs::remove_dir_all(&repository.local_path);
            }
        }

        repository
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    fn clone_working_copy(&self) -> Result<(), RepositoryError> {
        let uri = build_authenticated_uri(
            &self.uri,
            self.username.as_deref(),
            self.token.as_deref(),
        );

        if let Some(parent) = self.local_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut builder = RepoBuilder::new();
        builder
            .branch(&self.branch)
            .fetch_options(self.fetch_options());
        let repo = builder.clone(&uri, &self.local_path)?;
        if uri != self.uri {
            // Later fetches authenticate through the credentials callback
            reset_origin_url(&repo, &self.uri)?;
        }

        info!(
            repository = %self.label,
            branch = %self.branch,
            "Git clone successful"
        );
        Ok(())
    }

    /// Fetch options carrying the configured credentials
    fn fetch_options(&self) -> FetchOptions<'static> {
        let mut callbacks = RemoteCallbacks::new();

        if let (Some(username), Some(token)) = (self.username.clone(), self.token.clone()) {
            let mut attempted = false;
            callbacks.credentials(move |_url, _username_from_url, _allowed| {
                // libgit2 keeps asking as long as we keep answering
                if attempted {
                    return Err(git2::Error::from_str("authentication rejected"));
                }
                attempted = true;
                Cred::userpass_plaintext(&username, &token)
            });
        }

        let mut options = FetchOptions::new();
        options.remote_callbacks(callbacks);
        options
    }

    /// Fetch followed by a fast-forward of the configured branch
    fn pull(&self) -> Result<SyncStatus, RepositoryError> {
        let repo = Repository::open(&self.local_path)
            .map_err(|_| RepositoryError::MissingWorkingCopy(self.local_path.clone()))?;

        let before = repo.head().ok().and_then(|head| head.target());

        let mut remote = repo.find_remote("origin")?;
        remote.fetch(&[self.branch.as_str()], Some(&mut self.fetch_options()), None)?;

        let fetch_head = repo.find_reference("FETCH_HEAD")?;
        let fetch_commit = repo.reference_to_annotated_commit(&fetch_head)?;
        let (analysis, _) = repo.merge_analysis(&[&fetch_commit])?;

        if analysis.is_up_to_date() {
            return Ok(SyncStatus::Unchanged);
        }

        if !(analysis.is_fast_forward() || analysis.is_unborn()) {
            warn!(
                repository = %self.label,
                branch = %self.branch,
                "Could not merge repository"
            );
            return Err(RepositoryError::CannotFastForward {
                branch: self.branch.clone(),
            });
        }

        let refname = format!("refs/heads/{}", self.branch);
        let message = format!("pull: fast-forward to {}", fetch_commit.id());
        match repo.find_reference(&refname) {
            Ok(mut reference) => {
                reference.set_target(fetch_commit.id(), &message)?;
            }
            Err(_) => {
                repo.reference(&refname, fetch_commit.id(), true, &message)?;
            }
        }
        repo.set_head(&refname)?;
        repo.checkout_head(Some(CheckoutBuilder::default().force()))?;

        let after = repo.head()?.target();
        if before == after {
            Ok(SyncStatus::Unchanged)
        } else {
            Ok(SyncStatus::Updated)
        }
    }
}

impl PipeRepository for GitRepository {
    fn label(&self) -> &str {
        &self.label
    }

    fn definition_files(&self) -> Vec<PathBuf> {
        let Ok(entries) = fs::read_dir(&self.local_path) else {
            return Vec::new();
        };

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .is_some_and(|ext| ext == DEFINITION_EXTENSION)
            })
            .collect();
        files.sort();
        files
    }

    fn synchronize(&self) -> SyncStatus {
        match self.pull() {
            Ok(status) => {
                if status.is_updated() {
                    info!(repository = %self.label, "Repository updated");
                } else {
                    debug!(repository = %self.label, "Repository already up to date");
                }
                status
            }
            Err(e) => {
                error!(
                    repository = %self.label,
                    error = %e,
                    "Calling pull command failed"
                );
                SyncStatus::Failed
            }
        }
    }
}
