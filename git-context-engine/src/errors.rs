//! Crate-wide error hierarchy for git-context-engine.
//!
//! The orchestrator wraps every downstream crate's own error type rather
//! than re-deriving provider/cache/diff variants that `mr-reviewer` already
//! owns.

use thiserror::Error;

/// Convenient alias for crate-wide results.
pub type GitContextEngineResult<T> = Result<T, GitContextEngineError>;

/// Root error type for the git-context-engine crate.
#[derive(Debug, Error)]
pub enum GitContextEngineError {
    /// Failure from the platform adapter / review pipeline.
    #[error("reviewer error: {0}")]
    Reviewer(#[from] mr_reviewer::errors::Error),

    /// Failure from the constraint store (suppression lookups).
    #[error("constraint store error: {0}")]
    Constraints(#[from] rag_base::RagBaseError),

    /// Input validation errors (bad IDs, unsupported flavors, etc.).
    #[error("validation error: {0}")]
    Validation(String),

    /// Generic catch-all error when nothing else fits.
    #[error("internal error: {0}")]
    Internal(String),
}
