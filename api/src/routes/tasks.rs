//! `GET /tasks/{task_id}` — O(1) lookup against the result backend; a task
//! can be a `code_review` (`ReviewTask`) or an `indexing`/`feedback` task
//! (`TaskRecord`) (§4.1).

use axum::Json;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use serde::Serialize;

use crate::core::app_state::AppState;
use crate::error_handler::{AppError, AppResult};

#[derive(Serialize)]
#[serde(untagged)]
enum TaskView {
    Review(services::domain::ReviewTask),
    Other(services::domain::TaskRecord),
}

pub async fn handle(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    if let Some(task) = state.review_results.get(&task_id).await {
        return Ok(Json(TaskView::Review(task)));
    }
    if let Some(task) = state.task_results.get(&task_id).await {
        return Ok(Json(TaskView::Other(task)));
    }
    Err(AppError::NotFound)
}
