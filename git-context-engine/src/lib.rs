//! Review orchestrator: wires the platform adapter (`mr-reviewer`), the
//! learned-constraint store (`rag-base`), and publishing into one call per
//! change request.

pub mod errors;
pub mod orchestrator;

pub use errors::{GitContextEngineError, GitContextEngineResult};
pub use orchestrator::Orchestrator;
