//! Reconciliation loop
//!
//! Each tick synchronizes every repository on the blocking pool. A tick that
//! sees at least one update triggers a full catalog rebuild; failed
//! repositories count as unchanged and are retried on the next tick.
//! The whole tick runs under the catalog's source lock, so an on-demand reload
//! never observes a repository mid-pull.

use std::sync::Arc;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{self, Duration, Instant, MissedTickBehavior};
use tracing::{debug, error, info, trace};

use crate::catalog::{PipeCatalog, RebuildReport};
use crate::repository::SyncStatus;

/// Keeps the catalog in step with its repositories
pub struct Reconciler {
    catalog: Arc<PipeCatalog>,
    interval: Duration,
}

impl Reconciler {
    pub fn new(catalog: Arc<PipeCatalog>, interval: Duration) -> Self {
        Self { catalog, interval }
    }

    /// Starts the reconciliation loop
    ///
    /// The first tick fires one interval from now; the initial load is the
    /// caller's job. Never returns.
    pub async fn run(&self) {
        info!(
            "Starting pipe reconciliation (interval: {:?}, repositories: {})",
            self.interval,
            self.catalog.repositories().len()
        );

        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            trace!("Launcher periodic update trigger");

            match self.reconcile_once().await {
                Ok(Some(report)) => {
                    debug!("Catalog now holds {} pipe(s)", report.loaded);
                }
                Ok(None) => {}
                Err(e) => {
                    error!("Reconciliation tick failed: {}", e);
                }
            }
        }
    }

    /// Performs a single reconciliation tick
    ///
    /// Returns the rebuild report when a rebuild happened.
    pub async fn reconcile_once(&self) -> Result<Option<RebuildReport>, JoinError> {
        let catalog = Arc::clone(&self.catalog);

        tokio::task::spawn_blocking(move || {
            // A rebuild must not read a working copy halfway through a pull
            let sources = catalog.lock_sources();

            let mut updated = 0;
            for repository in catalog.repositories() {
                match repository.synchronize() {
                    SyncStatus::Updated => updated += 1,
                    SyncStatus::Unchanged => {}
                    SyncStatus::Failed => {
                        debug!(
                            "Repository '{}' failed to synchronize, keeping its last working copy",
                            repository.label()
                        );
                    }
                }
            }

            if updated == 0 {
                return None;
            }

            debug!(
                "{} repository(ies) updated, rereading all pipes",
                updated
            );
            Some(catalog.rebuild_locked(&sources))
        })
        .await
    }

    /// Runs the loop on its own task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::PipeRepository;
    use conveyor_core::PipeSchema;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Repository double replaying scripted synchronization results
    struct ScriptedRepository {
        label: String,
        script: Mutex<Vec<SyncStatus>>,
        files: Vec<PathBuf>,
        calls: AtomicUsize,
    }

    impl ScriptedRepository {
        fn new(label: &str, script: Vec<SyncStatus>, files: Vec<PathBuf>) -> Arc<Self> {
            Arc::new(Self {
                label: label.to_string(),
                script: Mutex::new(script),
                files,
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl PipeRepository for ScriptedRepository {
        fn label(&self) -> &str {
            &self.label
        }

        fn definition_files(&self) -> Vec<PathBuf> {
            self.files.clone()
        }

        fn synchronize(&self) -> SyncStatus {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().unwrap();
            if script.is_empty() {
                SyncStatus::Unchanged
            } else {
                script.remove(0)
            }
        }
    }

    /// Repository whose pull lands its files in two steps
    struct TwoStepRepository {
        files: Mutex<Vec<PathBuf>>,
        next: Vec<PathBuf>,
        pulling: AtomicBool,
    }

    impl PipeRepository for TwoStepRepository {
        fn label(&self) -> &str {
            "two-step"
        }

        fn definition_files(&self) -> Vec<PathBuf> {
            self.files.lock().unwrap().clone()
        }

        fn synchronize(&self) -> SyncStatus {
            *self.files.lock().unwrap() = self.next[..1].to_vec();
            self.pulling.store(true, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(200));
            *self.files.lock().unwrap() = self.next.clone();
            SyncStatus::Updated
        }
    }

    fn write_pipe(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(format!("{}.json", name));
        let document = serde_json::json!({
            "header": { "name": name },
            "body": {
                "segments": [
                    { "header": { "segmentNumber": 0, "name": "importer" }, "body": {} }
                ]
            }
        });
        std::fs::write(&path, document.to_string()).unwrap();
        path
    }

    fn catalog_over(repositories: &[Arc<ScriptedRepository>]) -> Arc<PipeCatalog> {
        let repositories: Vec<Arc<dyn PipeRepository>> = repositories
            .iter()
            .map(|r| Arc::clone(r) as Arc<dyn PipeRepository>)
            .collect();
        Arc::new(PipeCatalog::new(
            "does-not-exist",
            repositories,
            Arc::new(PipeSchema),
        ))
    }

    #[tokio::test]
    async fn test_no_update_means_no_rebuild() {
        let dir = TempDir::new().unwrap();
        let repository = ScriptedRepository::new(
            "system",
            vec![SyncStatus::Unchanged],
            vec![write_pipe(dir.path(), "test1")],
        );
        let catalog = catalog_over(&[Arc::clone(&repository)]);
        let reconciler = Reconciler::new(Arc::clone(&catalog), Duration::from_secs(60));

        let outcome = reconciler.reconcile_once().await.unwrap();

        assert!(outcome.is_none());
        assert!(catalog.list().is_empty());
        assert_eq!(repository.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_any_update_rebuilds_and_every_repository_is_synced() {
        let dir = TempDir::new().unwrap();
        let failing = ScriptedRepository::new("failing", vec![SyncStatus::Failed], Vec::new());
        let updated = ScriptedRepository::new(
            "updated",
            vec![SyncStatus::Updated],
            vec![write_pipe(dir.path(), "test1")],
        );
        let quiet = ScriptedRepository::new("quiet", vec![SyncStatus::Unchanged], Vec::new());
        let catalog = catalog_over(&[
            Arc::clone(&failing),
            Arc::clone(&updated),
            Arc::clone(&quiet),
        ]);
        let reconciler = Reconciler::new(Arc::clone(&catalog), Duration::from_secs(60));

        let report = reconciler.reconcile_once().await.unwrap().unwrap();

        assert_eq!(report.loaded, 1);
        assert!(catalog.contains("test1"));
        for repository in [&failing, &updated, &quiet] {
            assert_eq!(repository.calls.load(Ordering::SeqCst), 1);
        }
    }

    #[tokio::test]
    async fn test_failure_alone_does_not_rebuild() {
        let repository = ScriptedRepository::new("failing", vec![SyncStatus::Failed], Vec::new());
        let catalog = catalog_over(&[repository]);
        let reconciler = Reconciler::new(catalog, Duration::from_secs(60));

        assert!(reconciler.reconcile_once().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reload_waits_for_pull_in_progress() {
        let dir = TempDir::new().unwrap();
        let repository = Arc::new(TwoStepRepository {
            files: Mutex::new(Vec::new()),
            next: vec![write_pipe(dir.path(), "test1"), write_pipe(dir.path(), "test2")],
            pulling: AtomicBool::new(false),
        });
        let catalog = Arc::new(PipeCatalog::new(
            "does-not-exist",
            vec![Arc::clone(&repository) as Arc<dyn PipeRepository>],
            Arc::new(PipeSchema),
        ));

        let reconciler = Reconciler::new(Arc::clone(&catalog), Duration::from_secs(60));
        let tick = tokio::spawn(async move { reconciler.reconcile_once().await });

        while !repository.pulling.load(Ordering::SeqCst) {
            time::sleep(Duration::from_millis(5)).await;
        }
        let reload = {
            let catalog = Arc::clone(&catalog);
            tokio::task::spawn_blocking(move || catalog.rebuild())
                .await
                .unwrap()
        };

        assert_eq!(reload.loaded, 2);
        assert_eq!(tick.await.unwrap().unwrap().unwrap().loaded, 2);
    }

    #[tokio::test]
    async fn test_loop_keeps_ticking() {
        let dir = TempDir::new().unwrap();
        let repository = ScriptedRepository::new(
            "system",
            vec![SyncStatus::Failed, SyncStatus::Updated],
            vec![write_pipe(dir.path(), "test1")],
        );
        let catalog = catalog_over(&[Arc::clone(&repository)]);

        let handle = Reconciler::new(Arc::clone(&catalog), Duration::from_millis(20)).spawn();
        time::sleep(Duration::from_millis(300)).await;
        handle.abort();

        assert!(repository.calls.load(Ordering::SeqCst) >= 2);
        assert!(catalog.contains("test1"));
    }
}
