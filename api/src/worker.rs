//! Workers: one background loop per named queue, draining `Broker<TaskPayload>`
//! via `Worker::tick` and dispatching into the orchestrator, indexer
//! pipeline, or feedback processor (§4.1, §4.3, §4.4, §4.6).

use std::time::Duration;

use chrono::Utc;
use mr_reviewer::errors::Error as ReviewerError;
use mr_reviewer::git_providers::ProviderError;
use rag_base::feedback_processor::{FeedbackContext, FeedbackProcessor};
use services::domain::{TaskKind, TaskStatus};
use task_queue::{TaskEnvelope, TaskError, Worker};
use tracing::{info, warn};

use crate::core::app_state::{AppState, TaskPayload};

/// Spawns one background task per named queue. Each loop runs until the
/// process exits; an empty queue backs off briefly rather than busy-polling.
pub fn spawn_all(state: AppState) {
    for queue in ["code_review", "indexing", "feedback"] {
        let state = state.clone();
        tokio::spawn(run_queue(state, queue));
    }
}

async fn run_queue(state: AppState, queue: &'static str) {
    let mut worker = Worker::new(state.broker.clone(), queue, state.config.task_queue.clone());
    loop {
        let tick_state = state.clone();
        match worker.tick(move |envelope| dispatch(tick_state, envelope)).await {
            Some(true) => {
                info!(queue, "worker hit restart_after, resetting");
                worker = Worker::new(state.broker.clone(), queue, state.config.task_queue.clone());
            }
            Some(false) => {}
            None => tokio::time::sleep(Duration::from_millis(250)).await,
        }
    }
}

async fn dispatch(state: AppState, envelope: TaskEnvelope<TaskPayload>) -> Result<(), TaskError> {
    match envelope.payload {
        TaskPayload::CodeReview { metadata, config } => {
            run_code_review(&state, &envelope.task_id, metadata, config).await
        }
        TaskPayload::Indexing {
            repo_id,
            git_url,
            access_token,
            branch,
            index_depth: _,
        } => run_indexing(&state, &envelope.task_id, &envelope.trace_id, repo_id, git_url, access_token, branch).await,
        TaskPayload::Feedback {
            request,
            repo_id,
            violation_reason,
        } => run_feedback(&state, &envelope.task_id, &envelope.trace_id, request, repo_id, violation_reason).await,
    }
}

async fn run_code_review(
    state: &AppState,
    task_id: &str,
    metadata: services::domain::PrMetadata,
    config: services::domain::ReviewConfig,
) -> Result<(), TaskError> {
    if let Some(mut task) = state.review_results.get(task_id).await {
        task.status = TaskStatus::Processing;
        task.started_at = Some(Utc::now());
        state.review_results.put(task_id.to_string(), task).await;
    }

    match state.orchestrator.run_review_task(&metadata, &config).await {
        Ok(response) => {
            let mut violation_reasons = std::collections::HashMap::new();
            for comment in &response.comments {
                violation_reasons.insert(comment.id.clone(), comment.message.clone());
            }
            state
                .review_index
                .put(
                    response.review_id.clone(),
                    crate::core::app_state::ReviewIndexEntry {
                        repo_id: metadata.repo_id.clone(),
                        violation_reasons,
                    },
                )
                .await;

            if let Some(mut task) = state.review_results.get(task_id).await {
                task.status = TaskStatus::Completed;
                task.completed_at = Some(Utc::now());
                task.result = Some(response);
                state.review_results.put(task_id.to_string(), task).await;
            }
            Ok(())
        }
        Err(e) => {
            let task_error = classify_git_context_error(&e);
            if !task_error.is_retryable() {
                if let Some(mut task) = state.review_results.get(task_id).await {
                    task.status = TaskStatus::Failed;
                    task.completed_at = Some(Utc::now());
                    task.error = Some(e.to_string());
                    state.review_results.put(task_id.to_string(), task).await;
                }
            }
            Err(task_error)
        }
    }
}

fn classify_git_context_error(e: &git_context_engine::GitContextEngineError) -> TaskError {
    use git_context_engine::GitContextEngineError as E;
    match e {
        E::Validation(msg) => TaskError::Validation(msg.clone()),
        E::Reviewer(re) => classify_reviewer_error(re),
        E::Constraints(_) => TaskError::Transient(e.to_string()),
        E::Internal(_) => TaskError::Permanent(e.to_string()),
    }
}

fn classify_reviewer_error(e: &ReviewerError) -> TaskError {
    match e {
        ReviewerError::Validation(msg) => TaskError::Validation(msg.clone()),
        ReviewerError::Provider(pe) => match pe {
            ProviderError::Unauthorized | ProviderError::Forbidden => {
                TaskError::Authentication(pe.to_string())
            }
            ProviderError::RateLimited { .. } | ProviderError::Server(_) | ProviderError::Timeout
            | ProviderError::Network(_) => TaskError::Transient(pe.to_string()),
            ProviderError::NotFound
            | ProviderError::HttpStatus(_)
            | ProviderError::Serde(_)
            | ProviderError::InvalidResponse(_)
            | ProviderError::Unsupported => TaskError::Permanent(pe.to_string()),
        },
        ReviewerError::Cache(_) | ReviewerError::Parse(_) | ReviewerError::Config(_) | ReviewerError::Other(_) => {
            TaskError::Permanent(e.to_string())
        }
    }
}

async fn run_indexing(
    state: &AppState,
    task_id: &str,
    trace_id: &str,
    repo_id: String,
    git_url: String,
    access_token: String,
    branch: Option<String>,
) -> Result<(), TaskError> {
    let Some(store) = &state.knowledge_store else {
        return Err(TaskError::Capacity("knowledge store not configured".into()));
    };
    let Some(rag_config) = &state.config.rag else {
        return Err(TaskError::Capacity("knowledge store not configured".into()));
    };
    if let Err(e) = store.ensure_ready(rag_config.distance).await {
        return Err(TaskError::Transient(e.to_string()));
    }

    mark_task_processing(state, task_id).await;

    let params = code_indexer::IndexParams {
        repo_id: repo_id.clone(),
        git_url,
        access_token,
        branch,
    };

    let result = code_indexer::run(params, state.embedder.as_ref(), store.as_ref(), |stage, pct| {
        info!(task_id, trace_id, ?stage, pct, "indexing progress");
    })
    .await;

    match result {
        Ok(summary) => {
            complete_task(state, task_id, TaskKind::Indexing, serde_json::to_value(summary).ok(), None).await;
            Ok(())
        }
        Err(e) => {
            warn!(task_id, error = %e, "indexing task failed");
            fail_task(state, task_id, TaskKind::Indexing, e.to_string()).await;
            Err(TaskError::Transient(e.to_string()))
        }
    }
}

async fn run_feedback(
    state: &AppState,
    task_id: &str,
    _trace_id: &str,
    request: services::domain::FeedbackRequest,
    repo_id: String,
    violation_reason: String,
) -> Result<(), TaskError> {
    let (Some(constraints), Some(log)) = (&state.constraints, &state.feedback_log) else {
        return Err(TaskError::Capacity("feedback processing not configured".into()));
    };

    mark_task_processing(state, task_id).await;

    let processor = FeedbackProcessor::new(constraints.as_ref(), log.as_ref(), state.embedder.as_ref());
    let ctx = FeedbackContext {
        repo_id: &repo_id,
        violation_reason: &violation_reason,
    };

    match processor.process(request, ctx).await {
        Ok(record) => {
            complete_task(state, task_id, TaskKind::Feedback, serde_json::to_value(record).ok(), None).await;
            Ok(())
        }
        Err(e) => {
            warn!(task_id, error = %e, "feedback task failed");
            fail_task(state, task_id, TaskKind::Feedback, e.to_string()).await;
            Err(TaskError::Validation(e.to_string()))
        }
    }
}

async fn mark_task_processing(state: &AppState, task_id: &str) {
    if let Some(mut task) = state.task_results.get(task_id).await {
        task.status = TaskStatus::Processing;
        task.started_at = Some(Utc::now());
        state.task_results.put(task_id.to_string(), task).await;
    }
}

async fn complete_task(
    state: &AppState,
    task_id: &str,
    _kind: TaskKind,
    result: Option<serde_json::Value>,
    error: Option<String>,
) {
    if let Some(mut task) = state.task_results.get(task_id).await {
        task.status = if error.is_some() { TaskStatus::Failed } else { TaskStatus::Completed };
        task.completed_at = Some(Utc::now());
        task.result = result;
        task.error = error;
        state.task_results.put(task_id.to_string(), task).await;
    }
}

async fn fail_task(state: &AppState, task_id: &str, kind: TaskKind, error: String) {
    complete_task(state, task_id, kind, None, Some(error)).await;
}
