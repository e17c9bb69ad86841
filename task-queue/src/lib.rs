//! Named-queue task broker (C7): enqueue, late-ack acquire, retry with
//! exponential backoff and jitter, hard/soft timeouts, prefetch=1, and a
//! dead-letter path for exhausted retries.
//!
//! The default backend is in-process (`tokio::sync::Mutex`-guarded per
//! queue), matching the "implementers may back it with any durable broker"
//! escape hatch — callers that need a real broker swap `Broker` for their
//! own type behind the same enqueue/acquire/ack/nack surface.

pub mod config;
pub mod errors;
pub mod queue;
pub mod result_backend;
pub mod task;
pub mod worker;

pub use config::TaskQueueConfig;
pub use errors::{TaskError, TaskResult};
pub use queue::Broker;
pub use result_backend::ResultBackend;
pub use task::{JobId, TaskEnvelope};
pub use worker::Worker;
