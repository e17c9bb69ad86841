//! Learning plane: the learned-constraint store (C4), the append-only
//! feedback log (C5), and the feedback processor that ties them together
//! (C10). Built on top of `rag-store`'s Qdrant facade rather than
//! maintaining a second vector-database client.

pub mod config;
pub mod constraints;
pub mod errors;
pub mod feedback;
pub mod feedback_processor;

pub use config::ConstraintConfig;
pub use constraints::{ConfidenceLevel, ConstraintStore, LearnedConstraint};
pub use errors::{RagBaseError, Result};
pub use feedback::FeedbackLog;
pub use feedback_processor::{FeedbackContext, FeedbackProcessor};
