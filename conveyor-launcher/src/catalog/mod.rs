//! Pipe catalog
//!
//! In-memory map from pipe name to validated definition. The map is never
//! edited: a rebuild reads every source into a fresh snapshot and swaps it in
//! as a whole, so readers always see the complete result of one rebuild.
//! Readers load the current snapshot without locking; only rebuilds are
//! serialized against each other.
//!
//! Sources, in precedence order (later wins on duplicate names):
//! 1. the local pipes directory
//! 2. each pipe repository, in configuration order

pub mod loader;

use arc_swap::ArcSwap;
use conveyor_core::{Pipe, SchemaValidator};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

use crate::repository::PipeRepository;

/// One immutable generation of the catalog
#[derive(Debug, Default)]
pub struct CatalogSnapshot {
    pipes: HashMap<String, Pipe>,
}

impl CatalogSnapshot {
    pub fn get(&self, name: &str) -> Option<&Pipe> {
        self.pipes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.pipes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.pipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipes.is_empty()
    }

    /// All pipes, sorted by name
    pub fn pipes(&self) -> Vec<&Pipe> {
        let mut pipes: Vec<&Pipe> = self.pipes.values().collect();
        pipes.sort_by(|a, b| a.name().cmp(b.name()));
        pipes
    }
}

/// Summary of one rebuild
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebuildReport {
    /// Definition files considered
    pub files: usize,
    /// Distinct pipes in the new snapshot
    pub loaded: usize,
    /// Files skipped because they could not be read, parsed or validated
    pub skipped: usize,
}

/// Queryable catalog of pipe definitions
pub struct PipeCatalog {
    pipes_dir: PathBuf,
    repositories: Vec<Arc<dyn PipeRepository>>,
    validator: Arc<dyn SchemaValidator>,
    snapshot: ArcSwap<CatalogSnapshot>,
    rebuild_lock: Mutex<()>,
}

impl PipeCatalog {
    /// Creates an empty catalog; call `rebuild` to load it
    pub fn new(
        pipes_dir: impl Into<PathBuf>,
        repositories: Vec<Arc<dyn PipeRepository>>,
        validator: Arc<dyn SchemaValidator>,
    ) -> Self {
        Self {
            pipes_dir: pipes_dir.into(),
            repositories,
            validator,
            snapshot: ArcSwap::from_pointee(CatalogSnapshot::default()),
            rebuild_lock: Mutex::new(()),
        }
    }

    pub fn pipes_dir(&self) -> &Path {
        &self.pipes_dir
    }

    pub fn repositories(&self) -> &[Arc<dyn PipeRepository>] {
        &self.repositories
    }

    /// The current generation
    ///
    /// Holding the returned `Arc` keeps that generation alive and unchanged
    /// regardless of later rebuilds.
    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        self.snapshot.load_full()
    }

    pub fn lookup(&self, name: &str) -> Option<Pipe> {
        self.snapshot().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.snapshot().contains(name)
    }

    /// All pipes of the current generation, sorted by name
    pub fn list(&self) -> Vec<Pipe> {
        self.snapshot().pipes().into_iter().cloned().collect()
    }

    /// Reloads every source into a new generation and publishes it
    ///
    /// Blocking. Concurrent calls are serialized. A file that fails to load is
    /// logged and skipped; it never aborts the rebuild.
    pub fn rebuild(&self) -> RebuildReport {
        let sources = self.lock_sources();
        self.rebuild_locked(&sources)
    }

    /// Excludes rebuilds while held
    ///
    /// Hold it while changing the files a rebuild reads (e.g. pulling a
    /// repository), then call `rebuild_locked` under the same guard.
    pub fn lock_sources(&self) -> MutexGuard<'_, ()> {
        self.rebuild_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Rebuilds under a guard obtained from `lock_sources`
    pub fn rebuild_locked(&self, _sources: &MutexGuard<'_, ()>) -> RebuildReport {
        let mut files = loader::local_definition_files(&self.pipes_dir);
        for repository in &self.repositories {
            files.extend(repository.definition_files());
        }

        let mut report = RebuildReport {
            files: files.len(),
            ..Default::default()
        };
        let mut pipes = HashMap::new();

        for file in &files {
            match loader::load_definition(file, self.validator.as_ref()) {
                Ok(pipe) => {
                    let name = pipe.name().to_string();
                    if pipes.insert(name.clone(), pipe).is_some() {
                        debug!(
                            "Pipe '{}' redefined by {}, keeping the later definition",
                            name,
                            file.display()
                        );
                    }
                }
                Err(e) => {
                    warn!("Skipping pipe definition: {}", e);
                    report.skipped += 1;
                }
            }
        }

        report.loaded = pipes.len();

        self.snapshot.store(Arc::new(CatalogSnapshot { pipes }));

        info!(
            "Catalog rebuilt: {} pipe(s) from {} file(s), {} skipped",
            report.loaded, report.files, report.skipped
        );

        report
    }
}
