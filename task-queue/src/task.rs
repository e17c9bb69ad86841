use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque task identifier, a UUIDv4 string minted at enqueue time.
pub type JobId = String;

/// One unit of work sitting in a named queue. Generic over the payload so
/// callers (e.g. `api`) can enqueue their own task kinds without this crate
/// knowing about `PRMetadata`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskEnvelope<P> {
    pub task_id: JobId,
    pub trace_id: String,
    pub queue: String,
    pub payload: P,
    pub retry_count: u32,
    /// Not eligible for redelivery before this instant; used for backoff.
    pub not_before: DateTime<Utc>,
}
