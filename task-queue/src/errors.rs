use thiserror::Error;

/// Failure classes a task handler can raise. Only `Transient` is retried by
/// the broker; everything else is either a caller mistake (`Validation`) or
/// a terminal condition the broker dead-letters immediately.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("authentication error: {0}")]
    Authentication(String),

    #[error("transient error: {0}")]
    Transient(String),

    #[error("capacity error: {0}")]
    Capacity(String),

    #[error("data governance error: {0}")]
    DataGovernance(String),

    #[error("permanent error: {0}")]
    Permanent(String),
}

impl TaskError {
    /// Only `Transient` failures are worth retrying; everything else either
    /// needs human intervention or will fail identically on redelivery.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TaskError::Transient(_))
    }
}

pub type TaskResult<T> = Result<T, TaskError>;
