//! `GET /metrics` — Prometheus exposition format (§6). The recorder itself
//! is installed once at process startup in [`crate::start`]; this handler
//! only renders the accumulated snapshot.

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;

use crate::core::app_state::AppState;

pub async fn handle(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics_handle.render(),
    )
}
