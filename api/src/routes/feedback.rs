//! `POST /feedback` — accepts a `FeedbackRequest`, resolves the repo/
//! violation context from the originating review, and dispatches to the
//! `feedback` queue (§4.1, §4.6).

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use serde::Serialize;
use services::domain::{FeedbackRequest, TaskKind, TaskRecord, TaskStatus};

use crate::core::app_state::{AppState, TaskPayload};
use crate::error_handler::{AppError, AppResult};

#[derive(Serialize)]
struct FeedbackAccepted {
    task_id: String,
    trace_id: String,
}

pub async fn handle(
    State(state): State<AppState>,
    Json(request): Json<FeedbackRequest>,
) -> AppResult<impl IntoResponse> {
    let index_entry = state
        .review_index
        .get(&request.review_id)
        .await
        .ok_or_else(|| AppError::BadRequest(format!("unknown review_id: {}", request.review_id)))?;

    let violation_reason = index_entry
        .violation_reasons
        .get(&request.comment_id)
        .cloned()
        .unwrap_or_default();

    let trace_id = request.trace_id.clone();
    let task_id = state
        .broker
        .enqueue(
            "feedback",
            TaskPayload::Feedback {
                request,
                repo_id: index_entry.repo_id,
                violation_reason,
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
                trace_id: trace_id.clone(),
                kind: TaskKind::Feedback,
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

    Ok((StatusCode::ACCEPTED, Json(FeedbackAccepted { task_id, trace_id })))
}
