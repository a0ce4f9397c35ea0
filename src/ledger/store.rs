use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use super::error::{LedgerError, Result};
use super::models::{Task, TaskStatus};

/// Task storage consumed by the API, scheduler and processor
///
/// Implementations must be safe for concurrent use and must replace whole
/// records, so readers never observe a partially written task.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Insert a new task; fails if the id is already taken
    async fn create(&self, task: Task) -> Result<()>;

    /// Get a task by id
    async fn get(&self, id: &str) -> Result<Option<Task>>;

    /// Replace an existing task by id
    async fn update(&self, task: Task) -> Result<()>;

    /// Snapshot of all tasks, order unspecified
    async fn list(&self) -> Result<Vec<Task>>;

    /// Append a source URL while the task is still pending
    ///
    /// Fails with `FileLimit` instead of growing the list past `max_files`.
    async fn append_file(&self, id: &str, url: String, max_files: usize) -> Result<Task>;

    /// Atomically move a pending task to `InProcess` and return it
    ///
    /// Returns `Ok(None)` when the task no longer exists.
    async fn claim(&self, id: &str) -> Result<Option<Task>>;
}

/// In-memory ledger, lives as long as the process
#[derive(Debug, Default)]
pub struct MemoryLedger {
    tasks: RwLock<HashMap<String, Task>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }
}

#[async_trait]
impl TaskStore for MemoryLedger {
    async fn create(&self, task: Task) -> Result<()> {
        let mut tasks = self.tasks.write().await;
        if tasks.contains_key(&task.id) {
            return Err(LedgerError::AlreadyExists(task.id));
        }
        debug!(task_id = %task.id, files = task.file_urls.len(), "Task created");
        tasks.insert(task.id.clone(), task);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Task>> {
        Ok(self.tasks.read().await.get(id).cloned())
    }

    async fn update(&self, mut task: Task) -> Result<()> {
        let mut tasks = self.tasks.write().await;
        let slot = tasks
            .get_mut(&task.id)
            .ok_or_else(|| LedgerError::TaskNotFound(task.id.clone()))?;
        task.updated_at = Utc::now();
        debug!(task_id = %task.id, status = %task.status, "Task updated");
        *slot = task;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Task>> {
        Ok(self.tasks.read().await.values().cloned().collect())
    }

    async fn append_file(&self, id: &str, url: String, max_files: usize) -> Result<Task> {
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .get_mut(id)
            .ok_or_else(|| LedgerError::TaskNotFound(id.to_string()))?;

        if task.status != TaskStatus::Pending {
            return Err(LedgerError::NotPending {
                id: id.to_string(),
                status: task.status,
            });
        }

        if task.file_urls.len() >= max_files {
            return Err(LedgerError::FileLimit {
                id: id.to_string(),
                limit: max_files,
            });
        }

        task.file_urls.push(url);
        task.updated_at = Utc::now();
        debug!(task_id = id, files = task.file_urls.len(), "File appended");
        Ok(task.clone())
    }

    async fn claim(&self, id: &str) -> Result<Option<Task>> {
        let mut tasks = self.tasks.write().await;
        let Some(task) = tasks.get_mut(id) else {
            return Ok(None);
        };

        if task.status != TaskStatus::Pending {
            return Err(LedgerError::NotPending {
                id: id.to_string(),
                status: task.status,
            });
        }

        task.status = TaskStatus::InProcess;
        task.updated_at = Utc::now();
        debug!(task_id = id, "Task claimed");
        Ok(Some(task.clone()))
    }
}
