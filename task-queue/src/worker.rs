use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::warn;

use crate::config::TaskQueueConfig;
use crate::errors::TaskError;
use crate::queue::Broker;
use crate::task::TaskEnvelope;

/// Drives a single worker's prefetch=1 loop against one named queue: pop,
/// run with a hard timeout, ack/nack, and signal when the worker should
/// restart itself to bound memory growth.
pub struct Worker<P> {
    broker: Arc<Broker<P>>,
    queue: String,
    cfg: TaskQueueConfig,
    processed: u32,
}

impl<P: Clone + Send + 'static> Worker<P> {
    pub fn new(broker: Arc<Broker<P>>, queue: impl Into<String>, cfg: TaskQueueConfig) -> Self {
        Self {
            broker,
            queue: queue.into(),
            cfg,
            processed: 0,
        }
    }

    /// Acquires and runs the next task against `handler`, if the queue has
    /// one ready. Returns `None` if the queue was empty this tick,
    /// `Some(true)` if the worker just hit `restart_after` and should be
    /// replaced by a fresh process, `Some(false)` otherwise.
    pub async fn tick<F, Fut>(&mut self, handler: F) -> Option<bool>
    where
        F: FnOnce(TaskEnvelope<P>) -> Fut,
        Fut: Future<Output = Result<(), TaskError>>,
    {
        let envelope = self.broker.acquire(&self.queue).await?;
        let hard_limit = Duration::from_secs(self.cfg.hard_limit_secs);
        let soft_limit = self.cfg.soft_limit();
        let task_id = envelope.task_id.clone();
        let started = Instant::now();

        match tokio::time::timeout(hard_limit, handler(envelope.clone())).await {
            Ok(Ok(())) => {
                self.broker.ack(&envelope).await;
            }
            Ok(Err(e)) => {
                self.broker.nack(envelope, &e).await;
            }
            Err(_) => {
                warn!(task_id = %task_id, "task exceeded hard limit, dead-lettering");
                self.broker
                    .nack(envelope, &TaskError::Transient("hard timeout exceeded".into()))
                    .await;
            }
        }

        if started.elapsed() >= soft_limit {
            warn!(
                task_id = %task_id,
                elapsed_ms = started.elapsed().as_millis(),
                "task exceeded soft limit"
            );
        }

        self.processed += 1;
        Some(self.processed >= self.cfg.restart_after)
    }
}
