//! Request and response bodies of the HTTP API
//!
//! Task records themselves are served as [`crate::ledger::Task`].
//!
//! ```json
//! POST /tasks
//! { "file_urls": ["https://cdn.example.com/report.pdf"] }
//!
//! 201 Created
//! { "task_id": "0190b3c4-..." }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::observability::MetricsSnapshot;

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct CreateTaskRequest {
    #[serde(default)]
    pub file_urls: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CreateTaskResponse {
    pub task_id: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AddFileRequest {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AddFileResponse {
    pub status: String,
    pub file_count: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ReleaseResponse {
    pub task_id: String,
    pub released: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StartResponse {
    pub message: String,
    pub started: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub components: HashMap<String, String>,
    pub version: String,
    pub scheduler_running: bool,
    pub metrics: MetricsSnapshot,
}
