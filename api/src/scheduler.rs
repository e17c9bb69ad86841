//! Background maintenance loops that aren't triggered by a request: expired
//! result/constraint sweeps and false-positive-reduction aggregation
//! (§4.8's "periodic housekeeping" alongside the degradation poll loop in
//! [`crate::degradation`]).

use std::collections::HashSet;
use std::time::Duration;

use tracing::{info, warn};

use crate::core::app_state::AppState;

/// Spawns one task per maintenance loop. Each loop runs until the process
/// exits; intervals come from [`crate::core::config::AppConfig`].
pub fn spawn_all(state: AppState) {
    tokio::spawn(sweep_results_loop(state.clone()));
    tokio::spawn(sweep_constraints_loop(state.clone()));
    tokio::spawn(aggregate_metrics_loop(state));
}

/// Drops expired entries from every in-memory result backend, since nothing
/// else ever removes them between TTL checks on `get`.
async fn sweep_results_loop(state: AppState) {
    let mut ticker = tokio::time::interval(Duration::from_secs(
        state.config.constraint_sweep_interval_secs.max(1),
    ));
    loop {
        ticker.tick().await;
        let review = state.review_results.sweep_expired().await;
        let task = state.task_results.sweep_expired().await;
        let index = state.review_index.sweep_expired().await;
        info!(review, task, index, "result backends swept");
    }
}

/// Removes learned constraints past `expires_at` so suppression lookups
/// never see stale entries between `reinforce_or_create` calls.
async fn sweep_constraints_loop(state: AppState) {
    let Some(constraints) = state.constraints.clone() else {
        return;
    };
    let mut ticker = tokio::time::interval(Duration::from_secs(
        state.config.constraint_sweep_interval_secs.max(1),
    ));
    loop {
        ticker.tick().await;
        match constraints.delete_expired(chrono::Utc::now()).await {
            Ok(deleted) => info!(deleted, "expired constraints swept"),
            Err(e) => warn!(error = %e, "constraint sweep failed"),
        }
    }
}

/// Recomputes `reviewbot_false_positive_reduction_ratio` for every repo this
/// process has seen a completed review for. `FeedbackLog` has no repo
/// registry of its own, so the set of repos is read back from the live
/// `review_index` entries rather than tracked separately.
async fn aggregate_metrics_loop(state: AppState) {
    let Some(log) = state.feedback_log.clone() else {
        return;
    };
    let mut ticker = tokio::time::interval(Duration::from_secs(
        state.config.metrics_aggregation_interval_secs.max(1),
    ));
    loop {
        ticker.tick().await;
        let repo_ids: HashSet<String> = state
            .review_index
            .values()
            .await
            .into_iter()
            .map(|entry| entry.repo_id)
            .collect();
        for repo_id in repo_ids {
            match log.false_positive_reduction(&repo_id, 30).await {
                Ok(ratio) => info!(repo_id, ratio, "false positive reduction aggregated"),
                Err(e) => warn!(repo_id, error = %e, "false positive aggregation failed"),
            }
        }
    }
}
