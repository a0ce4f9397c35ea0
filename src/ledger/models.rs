use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Task lifecycle: `Pending -> InProcess -> Completed | Failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProcess,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProcess => "in_process",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }

    /// `Completed` and `Failed` never transition again
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A source that could not be downloaded or archived
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileError {
    pub url: String,
    pub error: String,
}

impl FileError {
    pub fn new(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            error: error.into(),
        }
    }
}

/// One request to bundle a set of remote files into one archive
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub status: TaskStatus,
    pub file_urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FileError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_url: Option<String>,
    /// Cause of a failure that happened before or after the per-file loop
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(id: impl Into<String>, file_urls: Vec<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            status: TaskStatus::Pending,
            file_urls,
            errors: Vec::new(),
            archive_url: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Terminal success: archive reachable, no errors
    pub fn complete(&mut self, archive_url: String) {
        self.status = TaskStatus::Completed;
        self.archive_url = Some(archive_url);
        self.errors.clear();
        self.failure_reason = None;
    }

    /// Terminal failure with per-file errors and/or a task-level reason
    pub fn fail(&mut self, errors: Vec<FileError>, reason: Option<String>) {
        self.status = TaskStatus::Failed;
        self.archive_url = None;
        self.errors = errors;
        self.failure_reason = reason;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_task_is_pending() {
        let task = Task::new("t1", vec!["https://example.com/a.txt".to_string()]);
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.errors.is_empty());
        assert!(task.archive_url.is_none());
        assert_eq!(task.created_at, task.updated_at);
    }

    #[test]
    fn test_complete_and_fail_keep_invariants() {
        let mut task = Task::new("t1", vec![]);
        task.complete("/download/t1".to_string());
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.archive_url.as_deref(), Some("/download/t1"));

        let mut task = Task::new("t2", vec![]);
        task.fail(vec![FileError::new("https://x/b", "download failed: boom")], None);
        assert_eq!(task.status, TaskStatus::Failed);
        assert!(task.archive_url.is_none());
        assert_eq!(task.errors.len(), 1);
    }

    #[test]
    fn test_task_json_shape() {
        let task = Task::new("t1", vec!["https://example.com/a.txt".to_string()]);
        let json = serde_json::to_value(&task).unwrap();

        assert_eq!(json["status"], "pending");
        assert_eq!(json["file_urls"][0], "https://example.com/a.txt");
        assert!(json.get("errors").is_none());
        assert!(json.get("archive_url").is_none());
        assert!(json.get("failure_reason").is_none());
    }

    #[test]
    fn test_terminal_states() {
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::InProcess.is_terminal());
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert_eq!(TaskStatus::InProcess.to_string(), "in_process");
    }
}
