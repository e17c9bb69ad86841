//! `POST /webhook/{platform}` — verify, normalize, dispatch (§4.1).
//!
//! The only synchronous work on this path is signature verification and
//! payload normalization; everything else happens in a worker.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use mr_reviewer::errors::Error as ReviewerError;
use mr_reviewer::git_providers::ProviderConfig;
use mr_reviewer::git_providers::signature::verify_hmac_sha256;
use mr_reviewer::git_providers::types::WebhookEvent;
use mr_reviewer::git_providers::webhook::parse_webhook;
use chrono::Utc;
use serde::Serialize;
use services::domain::{Platform, ReviewConfig, ReviewTask, TaskStatus};
use tracing::{info, warn};

use crate::core::app_state::{AppState, TaskPayload};
use crate::error_handler::{AppError, AppResult};

#[derive(Serialize)]
struct WebhookAccepted {
    task_id: String,
    trace_id: String,
    status: &'static str,
    message: String,
}

#[derive(Serialize)]
struct WebhookIgnored {
    status: &'static str,
    event_name: String,
}

fn platform_from_path(raw: &str) -> Option<Platform> {
    match raw {
        "github" => Some(Platform::Github),
        "gitea" => Some(Platform::Gitea),
        _ => None,
    }
}

fn signature_header(platform: Platform) -> &'static str {
    match platform {
        Platform::Github => "x-hub-signature-256",
        Platform::Gitea => "x-gitea-signature",
    }
}

fn event_header(platform: Platform) -> &'static str {
    match platform {
        Platform::Github => "x-github-event",
        Platform::Gitea => "x-gitea-event",
    }
}

fn verify(cfg: &ProviderConfig, headers: &HeaderMap, body: &[u8]) -> AppResult<()> {
    if !cfg.verify_signatures {
        return Ok(());
    }
    let Some(secret) = &cfg.webhook_secret else {
        warn!(platform = %cfg.platform, "signature verification enabled but no secret configured, accepting");
        return Ok(());
    };
    let header_value = headers
        .get(signature_header(cfg.platform))
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Http {
            status: StatusCode::UNAUTHORIZED,
            code: "UNAUTHORIZED",
            message: "missing signature header".into(),
        })?;
    if verify_hmac_sha256(secret, body, header_value) {
        Ok(())
    } else {
        Err(AppError::Http {
            status: StatusCode::UNAUTHORIZED,
            code: "UNAUTHORIZED",
            message: "signature verification failed".into(),
        })
    }
}

pub async fn handle(
    State(state): State<AppState>,
    Path(platform_raw): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    let platform = platform_from_path(&platform_raw)
        .ok_or_else(|| AppError::BadRequest(format!("unknown platform: {platform_raw}")))?;

    let provider_cfg = match platform {
        Platform::Github => state.config.github.as_ref(),
        Platform::Gitea => state.config.gitea.as_ref(),
    }
    .ok_or_else(|| AppError::BadRequest(format!("no adapter configured for platform {platform}")))?;

    verify(provider_cfg, &headers, &body)?;

    let event_name = headers
        .get(event_header(platform))
        .and_then(|h| h.to_str().ok())
        .unwrap_or("unknown");

    metrics::counter!("reviewbot_webhook_received_total", "platform" => platform.to_string()).increment(1);

    let event = parse_webhook(platform, event_name, &body).map_err(|e| match e {
        ReviewerError::Validation(msg) => AppError::BadRequest(msg),
        other => AppError::Reviewer(other),
    })?;

    let metadata = match event {
        WebhookEvent::PullRequest(meta) | WebhookEvent::Push(meta) => meta,
        WebhookEvent::Other { event_name } => {
            return Ok((
                StatusCode::ACCEPTED,
                Json(WebhookIgnored {
                    status: "ignored",
                    event_name,
                }),
            )
                .into_response());
        }
    };

    let trace_id = services::uuid::new_trace_id().to_string();
    let config = ReviewConfig::default();
    let task_id = state
        .broker
        .enqueue(
            "code_review",
            TaskPayload::CodeReview {
                metadata: metadata.clone(),
                config: config.clone(),
            },
            trace_id.clone(),
        )
        .await;

    state
        .review_results
        .put(
            task_id.clone(),
            ReviewTask {
                task_id: task_id.clone(),
                trace_id: trace_id.clone(),
                status: TaskStatus::Queued,
                queued_at: Utc::now(),
                started_at: None,
                completed_at: None,
                metadata,
                config,
                result: None,
                error: None,
                retry_count: 0,
            },
        )
        .await;

    info!(task_id, trace_id, platform = %platform, "webhook dispatched");

    Ok((
        StatusCode::ACCEPTED,
        Json(WebhookAccepted {
            task_id,
            trace_id,
            status: "pending",
            message: "review task enqueued".into(),
        }),
    )
        .into_response())
}
