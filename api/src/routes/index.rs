//! `POST /repositories/{repo_id}/index` — enqueues a knowledge-base
//! indexing job for a repository (§4.1, §4.4).

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use services::domain::{TaskKind, TaskRecord, TaskStatus};

use crate::core::app_state::{AppState, TaskPayload};
use crate::error_handler::{AppError, AppResult};

#[derive(Deserialize)]
pub struct IndexRequest {
    pub git_url: String,
    pub access_token: String,
    pub branch: Option<String>,
    pub index_depth: Option<u32>,
}

#[derive(Serialize)]
struct IndexAccepted {
    task_id: String,
    status: &'static str,
    repo_id: String,
}

pub async fn handle(
    State(state): State<AppState>,
    Path(repo_id): Path<String>,
    Json(request): Json<IndexRequest>,
) -> AppResult<impl IntoResponse> {
    if repo_id.trim().is_empty() || request.git_url.trim().is_empty() {
        return Err(AppError::Http {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            code: "VALIDATION_ERROR",
            message: "repo_id and git_url must not be empty".into(),
        });
    }

    let trace_id = services::uuid::new_trace_id().to_string();
    let task_id = state
        .broker
        .enqueue(
            "indexing",
            TaskPayload::Indexing {
                repo_id: repo_id.clone(),
                git_url: request.git_url,
                access_token: request.access_token,
                branch: request.branch,
                index_depth: request.index_depth,
            },
            trace_id.clone(),
        )
        .await;

    state
        .task_results
        .put(
            task_id.clone(),
            TaskRecord {
                task_id: task_id.clone(),
                trace_id,
                kind: TaskKind::Indexing,
                status: TaskStatus::Queued,
                queued_at: Utc::now(),
                started_at: None,
                completed_at: None,
                result: None,
                error: None,
                retry_count: 0,
            },
        )
        .await;

    Ok((
        StatusCode::ACCEPTED,
        Json(IndexAccepted {
            task_id,
            status: "queued",
            repo_id,
        }),
    ))
}
