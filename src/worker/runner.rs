//! Task runner - drives one task from `Pending` to a terminal state

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::archive::{ArchiveBuilder, ArchiveReport};
use crate::config::{ArchiveConfig, SchedulerConfig};
use crate::gate::ReadinessGate;
use crate::ledger::{Task, TaskStatus, TaskStore};
use crate::observability::Metrics;
use crate::storage::ArchiveStorage;

/// Removes the gate entry when the run ends, whichever way it ends
struct GateGuard<'a> {
    gate: &'a ReadinessGate,
    task_id: &'a str,
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        self.gate.remove(self.task_id);
    }
}

/// Processes single tasks; shared by every processing unit
pub struct TaskProcessor {
    store: Arc<dyn TaskStore>,
    gate: Arc<ReadinessGate>,
    builder: ArchiveBuilder,
    storage: ArchiveStorage,
    metrics: Arc<Metrics>,
    archive: ArchiveConfig,
    await_gate: bool,
    gate_timeout: Duration,
}

impl TaskProcessor {
    pub fn new(
        store: Arc<dyn TaskStore>,
        gate: Arc<ReadinessGate>,
        builder: ArchiveBuilder,
        storage: ArchiveStorage,
        metrics: Arc<Metrics>,
        archive: ArchiveConfig,
        scheduler: &SchedulerConfig,
    ) -> Self {
        Self {
            store,
            gate,
            builder,
            storage,
            metrics,
            archive,
            await_gate: scheduler.await_gate,
            gate_timeout: Duration::from_secs(scheduler.gate_timeout_secs),
        }
    }

    pub fn gate(&self) -> &Arc<ReadinessGate> {
        &self.gate
    }

    pub fn store(&self) -> &Arc<dyn TaskStore> {
        &self.store
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Run one task to completion
    ///
    /// Returns the terminal status, or `None` when there was nothing to do
    /// (task missing or no longer pending). The gate entry for `task_id` is
    /// removed on every path.
    pub async fn process(&self, task_id: &str) -> Option<TaskStatus> {
        let _guard = GateGuard {
            gate: &self.gate,
            task_id,
        };

        let mut task = match self.store.claim(task_id).await {
            Ok(Some(task)) => task,
            Ok(None) => {
                debug!(task_id, "Task disappeared before processing");
                return None;
            }
            Err(e) => {
                warn!(task_id, error = %e, "Task could not be claimed");
                return None;
            }
        };

        info!(task_id, files = task.file_urls.len(), "Processing task");

        if self.await_gate {
            let outcome = self.gate.await_release(task_id, self.gate_timeout).await;
            debug!(task_id, ?outcome, "Gate passed");
        }

        match self.build_archive(&task).await {
            Ok(report) => {
                self.metrics.files_archived(report.entries.len());
                self.metrics.files_failed(report.failures.len());

                if report.is_clean() {
                    task.complete(self.archive.download_url(task_id));
                } else {
                    task.fail(report.failures, None);
                }
            }
            Err(reason) => {
                error!(task_id, reason = %reason, "Archive setup failed");
                task.fail(Vec::new(), Some(reason));
            }
        }

        let status = task.status;
        match status {
            TaskStatus::Completed => self.metrics.task_completed(),
            _ => self.metrics.task_failed(),
        }

        let errors = task.errors.len();
        if let Err(e) = self.store.update(task).await {
            error!(task_id, error = %e, "Failed to persist final task state");
        }

        info!(task_id, %status, errors, "Task processing finished");
        Some(status)
    }

    async fn build_archive(&self, task: &Task) -> Result<ArchiveReport, String> {
        let sink = self
            .storage
            .create(&task.id)
            .await
            .map_err(|e| format!("failed to create archive: {e}"))?;

        self.builder
            .build(&task.file_urls, sink)
            .await
            .map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FetchConfig;
    use crate::ledger::MemoryLedger;
    use crate::worker::http::HttpFetcher;
    use tempfile::TempDir;

    struct Harness {
        processor: TaskProcessor,
        store: Arc<MemoryLedger>,
        gate: Arc<ReadinessGate>,
        storage: ArchiveStorage,
        _temp_dir: TempDir,
    }

    fn harness(scheduler: SchedulerConfig) -> Harness {
        let temp_dir = TempDir::new().unwrap();
        let storage = ArchiveStorage::open(temp_dir.path()).unwrap();
        let store = Arc::new(MemoryLedger::new());
        let gate = Arc::new(ReadinessGate::new());

        let fetch = FetchConfig {
            pacing_delay_ms: 0,
            connect_timeout_secs: 1,
            request_timeout_secs: 5,
            ..FetchConfig::default()
        };
        let builder = ArchiveBuilder::new(HttpFetcher::new(&fetch).unwrap(), &fetch);

        let processor = TaskProcessor::new(
            store.clone(),
            gate.clone(),
            builder,
            storage.clone(),
            Arc::new(Metrics::new()),
            ArchiveConfig::default(),
            &scheduler,
        );

        Harness {
            processor,
            store,
            gate,
            storage,
            _temp_dir: temp_dir,
        }
    }

    #[tokio::test]
    async fn test_missing_task_only_cleans_gate() {
        let h = harness(SchedulerConfig::default());
        h.gate.register("ghost");

        assert_eq!(h.processor.process("ghost").await, None);
        assert!(!h.gate.is_registered("ghost"));
        assert!(h.store.is_empty().await);
    }

    #[tokio::test]
    async fn test_empty_task_completes_with_empty_archive() {
        let h = harness(SchedulerConfig::default());
        h.store.create(Task::new("t1", vec![])).await.unwrap();
        h.gate.register("t1");

        assert_eq!(h.processor.process("t1").await, Some(TaskStatus::Completed));

        let task = h.store.get("t1").await.unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.archive_url.as_deref(), Some("/download/t1"));
        assert!(task.errors.is_empty());
        assert!(h.storage.path_for("t1").unwrap().is_file());
        assert!(!h.gate.is_registered("t1"));

        let file = std::fs::File::open(h.storage.path_for("t1").unwrap()).unwrap();
        assert_eq!(zip::ZipArchive::new(file).unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_source_fails_task() {
        let h = harness(SchedulerConfig::default());
        let url = "http://127.0.0.1:1/missing.txt".to_string();
        h.store.create(Task::new("t1", vec![url.clone()])).await.unwrap();

        assert_eq!(h.processor.process("t1").await, Some(TaskStatus::Failed));

        let task = h.store.get("t1").await.unwrap().unwrap();
        assert_eq!(task.errors.len(), 1);
        assert_eq!(task.errors[0].url, url);
        assert!(task.errors[0].error.starts_with("download failed: "));
        assert!(task.archive_url.is_none());
        assert!(task.failure_reason.is_none());
    }

    #[tokio::test]
    async fn test_non_pending_task_is_left_alone() {
        let h = harness(SchedulerConfig::default());
        let mut task = Task::new("t1", vec![]);
        task.complete("/download/t1".to_string());
        h.store.create(task).await.unwrap();
        h.gate.register("t1");

        assert_eq!(h.processor.process("t1").await, None);
        assert_eq!(
            h.store.get("t1").await.unwrap().unwrap().status,
            TaskStatus::Completed
        );
        assert!(!h.gate.is_registered("t1"));
    }

    #[tokio::test]
    async fn test_gate_timeout_lets_processing_proceed() {
        let h = harness(SchedulerConfig {
            await_gate: true,
            gate_timeout_secs: 1,
            ..SchedulerConfig::default()
        });
        h.store.create(Task::new("t1", vec![])).await.unwrap();
        h.gate.register("t1");

        let status = tokio::time::timeout(Duration::from_secs(5), h.processor.process("t1"))
            .await
            .expect("gate wait must be bounded");
        assert_eq!(status, Some(TaskStatus::Completed));
    }

    #[tokio::test]
    async fn test_gate_wait_holds_task_in_process() {
        let h = harness(SchedulerConfig {
            await_gate: true,
            gate_timeout_secs: 60,
            ..SchedulerConfig::default()
        });
        h.store.create(Task::new("t1", vec![])).await.unwrap();
        h.gate.register("t1");

        let processor = Arc::new(h.processor);
        let run = {
            let processor = processor.clone();
            tokio::spawn(async move { processor.process("t1").await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        let task = h.store.get("t1").await.unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::InProcess);
        assert!(h.gate.is_held("t1"));

        assert!(h.gate.release("t1"));
        let status = tokio::time::timeout(Duration::from_secs(5), run)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(status, Some(TaskStatus::Completed));
    }

    #[tokio::test]
    async fn test_archive_creation_failure_is_task_failure() {
        let h = harness(SchedulerConfig::default());
        h.store.create(Task::new("t1", vec![])).await.unwrap();

        // A directory squatting on the archive path makes File::create fail
        std::fs::create_dir(h.storage.path_for("t1").unwrap()).unwrap();

        assert_eq!(h.processor.process("t1").await, Some(TaskStatus::Failed));

        let task = h.store.get("t1").await.unwrap().unwrap();
        assert!(task.errors.is_empty());
        assert!(task.archive_url.is_none());
        assert!(
            task.failure_reason
                .as_deref()
                .is_some_and(|r| r.starts_with("failed to create archive"))
        );
    }
}
