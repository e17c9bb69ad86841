use std::collections::{HashMap, VecDeque};

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::TaskQueueConfig;
use crate::errors::TaskError;
use crate::task::{JobId, TaskEnvelope};

struct QueueState<P> {
    ready: VecDeque<TaskEnvelope<P>>,
    delayed: Vec<TaskEnvelope<P>>,
}

impl<P> Default for QueueState<P> {
    fn default() -> Self {
        Self {
            ready: VecDeque::new(),
            delayed: Vec::new(),
        }
    }
}

/// In-process named-queue broker. Each named queue gets its own ready/delayed
/// split so retry backoff on one queue never blocks another.
pub struct Broker<P> {
    cfg: TaskQueueConfig,
    queues: Mutex<HashMap<String, QueueState<P>>>,
}

impl<P: Clone + Send + 'static> Broker<P> {
    pub fn new(cfg: TaskQueueConfig) -> Self {
        Self {
            cfg,
            queues: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &TaskQueueConfig {
        &self.cfg
    }

    /// Enqueues `payload` on `queue` and returns the minted `task_id`.
    pub async fn enqueue(&self, queue: &str, payload: P, trace_id: String) -> JobId {
        let task_id = services::uuid::new_trace_id().to_string();
        let envelope = TaskEnvelope {
            task_id: task_id.clone(),
            trace_id,
            queue: queue.to_string(),
            payload,
            retry_count: 0,
            not_before: Utc::now(),
        };
        let mut queues = self.queues.lock().await;
        queues.entry(queue.to_string()).or_default().ready.push_back(envelope);
        debug!(queue, task_id = %task_id, "task enqueued");
        task_id
    }

    /// Prefetch=1 acquire: promotes any delayed tasks whose backoff has
    /// elapsed, then pops the oldest ready task, if any.
    pub async fn acquire(&self, queue: &str) -> Option<TaskEnvelope<P>> {
        let mut queues = self.queues.lock().await;
        let state = queues.get_mut(queue)?;
        let now = Utc::now();

        let mut i = 0;
        while i < state.delayed.len() {
            if state.delayed[i].not_before <= now {
                let t = state.delayed.remove(i);
                state.ready.push_back(t);
            } else {
                i += 1;
            }
        }

        state.ready.pop_front()
    }

    /// Late-ack success path.
    pub async fn ack(&self, envelope: &TaskEnvelope<P>) {
        debug!(queue = %envelope.queue, task_id = %envelope.task_id, "task acked");
    }

    /// Late-ack failure path: schedules a backoff retry, or dead-letters the
    /// task if its retry budget is exhausted or `err` isn't retryable.
    /// Returns `true` if the task was requeued.
    pub async fn nack(&self, mut envelope: TaskEnvelope<P>, err: &TaskError) -> bool {
        if !err.is_retryable() || envelope.retry_count >= self.cfg.max_retries {
            warn!(
                queue = %envelope.queue,
                task_id = %envelope.task_id,
                retry_count = envelope.retry_count,
                error = %err,
                "task dead-lettered"
            );
            return false;
        }

        envelope.retry_count += 1;
        let backoff = self.cfg.backoff_for(envelope.retry_count);
        envelope.not_before =
            Utc::now() + chrono::Duration::from_std(backoff).unwrap_or(chrono::Duration::seconds(60));

        info!(
            queue = %envelope.queue,
            task_id = %envelope.task_id,
            retry_count = envelope.retry_count,
            backoff_secs = backoff.as_secs(),
            "task retry scheduled"
        );

        let mut queues = self.queues.lock().await;
        queues.entry(envelope.queue.clone()).or_default().delayed.push(envelope);
        true
    }

    /// Ready + delayed task count for `queue`, for metrics/health reporting.
    pub async fn depth(&self, queue: &str) -> usize {
        let queues = self.queues.lock().await;
        queues.get(queue).map(|s| s.ready.len() + s.delayed.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn enqueue_then_acquire_round_trips() {
        let broker: Broker<String> = Broker::new(TaskQueueConfig::default());
        let id = broker.enqueue("code_review", "payload".into(), "trace-1".into()).await;
        let env = broker.acquire("code_review").await.unwrap();
        assert_eq!(env.task_id, id);
        assert_eq!(env.retry_count, 0);
        assert!(broker.acquire("code_review").await.is_none());
    }

    #[tokio::test]
    async fn nack_schedules_retry_until_budget_exhausted() {
        let mut cfg = TaskQueueConfig::default();
        cfg.max_retries = 1;
        cfg.initial_backoff_secs = 0;
        let broker: Broker<String> = Broker::new(cfg);
        broker.enqueue("q", "p".into(), "t".into()).await;
        let env = broker.acquire("q").await.unwrap();

        let requeued = broker.nack(env, &TaskError::Transient("boom".into())).await;
        assert!(requeued);
        assert_eq!(broker.depth("q").await, 1);

        let env = broker.acquire("q").await.unwrap();
        assert_eq!(env.retry_count, 1);
        let requeued = broker.nack(env, &TaskError::Transient("boom again".into())).await;
        assert!(!requeued);
        assert_eq!(broker.depth("q").await, 0);
    }

    #[tokio::test]
    async fn permanent_error_never_retries() {
        let broker: Broker<String> = Broker::new(TaskQueueConfig::default());
        broker.enqueue("q", "p".into(), "t".into()).await;
        let env = broker.acquire("q").await.unwrap();
        let requeued = broker.nack(env, &TaskError::Permanent("bad payload".into())).await;
        assert!(!requeued);
    }
}
