use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

use super::{
    models::{
        AddFileRequest, AddFileResponse, CreateTaskRequest, CreateTaskResponse, HealthResponse,
        ReleaseResponse, StartResponse,
    },
    state::AppState,
    validation::{validate_url, validate_urls},
};
use crate::api::error::ApiError;
use crate::ledger::{Task, TaskStatus};

/// Create a task (POST /tasks)
///
/// The task starts `Pending` with the given source list, which may be empty
/// and can be extended through `POST /tasks/{id}/files` until processing
/// begins. Returns 201 with a time-sortable UUIDv7 id.
pub async fn create_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> Result<impl IntoResponse, ApiError> {
    let request: CreateTaskRequest = read_json(&state, &headers, body).await?;

    validate_urls(&request.file_urls, state.config.server.max_files_per_task)
        .map_err(|e| ApiError::InvalidPayload(e.to_string()))?;

    let task_id = Uuid::now_v7().to_string();
    let files = request.file_urls.len();
    state
        .store
        .create(Task::new(task_id.clone(), request.file_urls))
        .await?;

    state.metrics.task_created();
    info!(task_id = %task_id, files, "Task created");

    Ok((StatusCode::CREATED, Json(CreateTaskResponse { task_id })))
}

/// Task status endpoint (GET /tasks/{task_id})
pub async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let task = state
        .store
        .get(&task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("task {task_id}")))?;

    Ok(Json(task))
}

/// All tasks, oldest first (GET /tasks)
pub async fn list_tasks(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let mut tasks = state.store.list().await?;
    tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    Ok(Json(tasks))
}

/// Append a source to a pending task (POST /tasks/{task_id}/files)
///
/// Answers 409 once the task has left `Pending`; its source list is frozen
/// from then on. The file limit is checked by the ledger under the same lock
/// as the append.
pub async fn add_file(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    headers: HeaderMap,
    body: Body,
) -> Result<impl IntoResponse, ApiError> {
    let request: AddFileRequest = read_json(&state, &headers, body).await?;
    validate_url(&request.url).map_err(|e| ApiError::InvalidPayload(e.to_string()))?;

    let max_files = state.config.server.max_files_per_task;
    let task = state
        .store
        .append_file(&task_id, request.url, max_files)
        .await?;

    Ok(Json(AddFileResponse {
        status: "file added".to_string(),
        file_count: task.file_urls.len(),
    }))
}

/// Release a task's readiness gate (POST /tasks/{task_id}/start)
///
/// Only meaningful while the task is dispatched and held; otherwise reports
/// `released: false`.
pub async fn release_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if state.store.get(&task_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("task {task_id}")));
    }

    let released = state.gate.release(&task_id);
    Ok(Json(ReleaseResponse { task_id, released }))
}

/// Activation switch for the scheduler (POST /tasks/start-all)
pub async fn start_all(State(state): State<AppState>) -> impl IntoResponse {
    let started = state.scheduler.start();
    let message = if started {
        "scheduler started"
    } else {
        "scheduler already running"
    };

    Json(StartResponse {
        message: message.to_string(),
        started,
    })
}

/// Stream a completed task's archive (GET /download/{task_id})
pub async fn download_archive(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Response, ApiError> {
    let task = state
        .store
        .get(&task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("task {task_id}")))?;

    if task.status != TaskStatus::Completed {
        return Err(ApiError::Conflict(format!(
            "archive not ready, task is {}",
            task.status
        )));
    }

    let archive = state.storage.get(&task_id).await?;
    let size = archive.meta.size;
    let body = Body::from_stream(archive.into_stream());

    let headers = [
        (header::CONTENT_TYPE, "application/zip".to_string()),
        (header::CONTENT_LENGTH, size.to_string()),
        (header::CONTENT_DISPOSITION, super::utils::attachment_header(&task_id)),
    ];

    Ok((headers, body).into_response())
}

/// Health check endpoint (GET /health)
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let scheduler_running = state.scheduler.is_running();

    let mut components = HashMap::new();
    components.insert("api".to_string(), "healthy".to_string());
    components.insert("ledger".to_string(), "healthy".to_string());
    components.insert(
        "scheduler".to_string(),
        if scheduler_running { "running" } else { "idle" }.to_string(),
    );
    components.insert(
        "storage".to_string(),
        if state.storage.root().is_dir() { "healthy" } else { "unhealthy" }.to_string(),
    );

    let all_healthy = components.values().all(|status| status != "unhealthy");
    let status_code = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = HealthResponse {
        status: if all_healthy { "healthy" } else { "unhealthy" }.to_string(),
        components,
        version: env!("CARGO_PKG_VERSION").to_string(),
        scheduler_running,
        metrics: state.metrics.snapshot(),
    };

    (status_code, Json(response))
}

/// Validate Content-Type, enforce the size limit and decode a JSON body
///
/// Decompression is already handled by `RequestDecompressionLayer`.
async fn read_json<T: DeserializeOwned>(
    state: &AppState,
    headers: &HeaderMap,
    body: Body,
) -> Result<T, ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::InvalidPayload("missing Content-Type header".into()))?;
    super::utils::parse_content_type(content_type)?;

    let data = body
        .collect()
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?
        .to_bytes();

    let max_size =
        usize::try_from(state.config.server.max_payload_bytes.as_u64()).unwrap_or(usize::MAX);
    super::utils::validate_body_size(&data, max_size)?;

    Ok(serde_json::from_slice(&data)?)
}
