//! Entry point for the review bot HTTP service: loads configuration, builds
//! shared state, wires routes, and spawns the background workers/scheduler
//! before serving.

pub mod core;
pub mod degradation;
pub mod error_handler;
pub mod middleware_layer;
pub mod routes;
pub mod scheduler;
pub mod worker;

use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::EnvFilter;

use crate::core::app_state::AppState;
use crate::core::config::AppConfig;
use crate::error_handler::AppError;
use crate::middleware_layer::json_extractor::json_error_mapper;

/// Boots the service: builds config and state, spawns the worker pool,
/// scheduler, and degradation poll loop, then serves until the process is
/// killed.
pub async fn start() -> Result<(), AppError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env()?;
    let bind_addr = config.bind_addr.clone();

    // The recorder has to be installed globally exactly once per process,
    // before any request can hit `GET /metrics` or any handler records a
    // metric, so this happens ahead of `AppState::build`.
    let metrics_handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| AppError::BadRequest(format!("failed to install metrics recorder: {e}")))?;

    let state = AppState::build(config, metrics_handle)?;

    worker::spawn_all(state.clone());
    scheduler::spawn_all(state.clone());
    state.degradation.clone().spawn_poll_loop(state.config.degradation_poll_interval_secs);

    let app = Router::new()
        .route("/webhook/{platform}", post(routes::webhook::handle))
        .route("/feedback", post(routes::feedback::handle))
        .route("/repositories/{repo_id}/index", post(routes::index::handle))
        .route("/tasks/{task_id}", get(routes::tasks::handle))
        .route("/mcp/manifest", get(routes::mcp::handle))
        .route("/metrics", get(routes::metrics::handle))
        .layer(middleware::from_fn(json_error_mapper))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(AppError::Bind)?;

    tracing::info!(bind_addr, "review bot listening");
    axum::serve(listener, app).await.map_err(AppError::Server)?;

    Ok(())
}
