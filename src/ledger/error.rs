use thiserror::Error;

use super::models::TaskStatus;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Task already exists: {0}")]
    AlreadyExists(String),

    #[error("Task {id} is {status}, expected pending")]
    NotPending { id: String, status: TaskStatus },

    #[error("Task {id} already holds the maximum of {limit} files")]
    FileLimit { id: String, limit: usize },
}

pub type Result<T> = std::result::Result<T, LedgerError>;
