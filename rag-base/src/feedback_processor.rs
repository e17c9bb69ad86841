//! Feedback processor: validates incoming feedback, appends it to
//! the log, and on rejection reinforces or creates a learned constraint.
//! Grounded on `examples/original_source/repositories/constraints.py`'s
//! `create_constraint` call site inside the feedback handler.

use crate::constraints::ConstraintStore;
use crate::errors::{RagBaseError, Result};
use crate::feedback::FeedbackLog;
use chrono::Utc;
use rag_store::embed::EmbeddingsProvider;
use services::domain::{FeedbackAction, FeedbackRecord, FeedbackRequest};
use tracing::info;

pub struct FeedbackProcessor<'a> {
    constraints: &'a ConstraintStore,
    log: &'a FeedbackLog,
    embedder: &'a dyn EmbeddingsProvider,
}

/// Extra context the processor needs that isn't on `FeedbackRequest` itself:
/// the repo and the violation this comment was flagging, both resolved by
/// the caller from the originating `ReviewTask`/`ReviewComment`.
pub struct FeedbackContext<'a> {
    pub repo_id: &'a str,
    pub violation_reason: &'a str,
}

impl<'a> FeedbackProcessor<'a> {
    pub fn new(
        constraints: &'a ConstraintStore,
        log: &'a FeedbackLog,
        embedder: &'a dyn EmbeddingsProvider,
    ) -> Self {
        Self {
            constraints,
            log,
            embedder,
        }
    }

    /// Runs the full workflow: validate, append, count, and — on a
    /// rejection — reinforce or create a learned constraint.
    pub async fn process(
        &self,
        request: FeedbackRequest,
        ctx: FeedbackContext<'_>,
    ) -> Result<FeedbackRecord> {
        self.validate(&request)?;

        let record = FeedbackRecord {
            id: services::uuid::new_trace_id().to_string(),
            review_id: request.review_id,
            comment_id: request.comment_id,
            user_id: request.user_id,
            action: request.action,
            reason: request.reason,
            developer_comment: request.developer_comment,
            final_code_snapshot: request.final_code_snapshot.clone(),
            trace_id: request.trace_id,
            created_at: Utc::now(),
        };

        self.log.append(ctx.repo_id, &record).await?;

        if record.action == FeedbackAction::Rejected {
            if let Some(snapshot) = &record.final_code_snapshot {
                let embedding = self
                    .embedder
                    .embed(snapshot)
                    .await
                    .map_err(|e| RagBaseError::Validation(format!("embedding failed: {e}")))?;
                let constraint = self
                    .constraints
                    .reinforce_or_create(
                        ctx.repo_id,
                        ctx.violation_reason,
                        snapshot,
                        record.developer_comment.as_str(),
                        embedding,
                    )
                    .await?;
                info!(
                    repo_id = ctx.repo_id,
                    constraint_id = %constraint.id,
                    confidence = constraint.confidence_score,
                    "constraint updated from rejection"
                );
            }
        }

        let ratio = self.log.false_positive_reduction(ctx.repo_id, 30).await?;
        info!(repo_id = ctx.repo_id, ratio, "feedback processed");

        Ok(record)
    }

    fn validate(&self, request: &FeedbackRequest) -> Result<()> {
        if request.comment_id.trim().is_empty() {
            return Err(RagBaseError::Validation("comment_id must not be empty".into()));
        }
        if request.action == FeedbackAction::Rejected && request.reason.as_deref().unwrap_or("").trim().is_empty()
        {
            return Err(RagBaseError::Validation(
                "reason is required when action is rejected".into(),
            ));
        }
        let len = request.developer_comment.chars().count();
        if len < 1 || len > 1000 {
            return Err(RagBaseError::Validation(
                "developer_comment must be 1..=1000 characters".into(),
            ));
        }
        Ok(())
    }
}
