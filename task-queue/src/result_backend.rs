use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

/// In-memory result backend with per-entry TTL (default 24h, matching the
/// failed/completed task retention window). `GET /tasks/{id}` reads
/// through this; a durable swap-in would keep the same `get`/`put` surface.
///
/// Generic over the stored record so every queue (`code_review`, `indexing`,
/// `feedback`) can share one backend keyed by `task_id` without this crate
/// knowing the shape of any particular task's result.
#[derive(Clone)]
pub struct ResultBackend<T> {
    inner: Arc<RwLock<HashMap<String, (T, DateTime<Utc>)>>>,
    ttl_secs: i64,
}

impl<T: Clone + Send + Sync + 'static> ResultBackend<T> {
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            ttl_secs,
        }
    }

    pub async fn put(&self, task_id: impl Into<String>, value: T) {
        let expires_at = Utc::now() + chrono::Duration::seconds(self.ttl_secs);
        self.inner.write().await.insert(task_id.into(), (value, expires_at));
    }

    pub async fn get(&self, task_id: &str) -> Option<T> {
        let now = Utc::now();
        self.inner
            .read()
            .await
            .get(task_id)
            .filter(|(_, expires_at)| *expires_at >= now)
            .map(|(value, _)| value.clone())
    }

    /// Drops entries past their TTL. Called by the periodic sweep job.
    pub async fn sweep_expired(&self) -> usize {
        let now = Utc::now();
        let mut guard = self.inner.write().await;
        let before = guard.len();
        guard.retain(|_, (_, expires_at)| *expires_at >= now);
        before - guard.len()
    }

    /// Snapshot of every non-expired value currently held. Used by the
    /// periodic aggregation job, which has no other way to discover what's
    /// live in this backend.
    pub async fn values(&self) -> Vec<T> {
        let now = Utc::now();
        self.inner
            .read()
            .await
            .values()
            .filter(|(_, expires_at)| *expires_at >= now)
            .map(|(value, _)| value.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use services::domain::{Platform, PrMetadata, ReviewConfig, ReviewTask, TaskSource, TaskStatus};

    fn sample_task(id: &str) -> ReviewTask {
        ReviewTask {
            task_id: id.to_string(),
            trace_id: "trace".into(),
            status: TaskStatus::Completed,
            queued_at: Utc::now(),
            started_at: None,
            completed_at: None,
            metadata: PrMetadata {
                repo_id: "o/r".into(),
                pr_number: 1,
                base_sha: "a".repeat(40),
                head_sha: "b".repeat(40),
                author: None,
                title: None,
                platform: Platform::Github,
                source: TaskSource::Webhook,
                callback_url: None,
            },
            config: ReviewConfig::default(),
            result: None,
            error: None,
            retry_count: 0,
        }
    }

    #[tokio::test]
    async fn expired_entries_are_not_returned() {
        let backend: ResultBackend<ReviewTask> = ResultBackend::new(-1);
        let task = sample_task("t1");
        backend.put(task.task_id.clone(), task).await;
        assert!(backend.get("t1").await.is_none());
    }

    #[tokio::test]
    async fn fresh_entries_round_trip() {
        let backend: ResultBackend<ReviewTask> = ResultBackend::new(3600);
        let task = sample_task("t1");
        backend.put(task.task_id.clone(), task).await;
        assert_eq!(backend.get("t1").await.unwrap().task_id, "t1");
    }
}
