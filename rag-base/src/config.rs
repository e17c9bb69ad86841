use crate::errors::{RagBaseError, Result};
use rag_store::{DistanceKind, RagConfig};

/// Configuration for the constraint store (`learned_constraints` collection).
///
/// Shares the Qdrant connection settings with the knowledge store
/// (`QDRANT_URL`, `QDRANT_API_KEY`) but targets its own collection and
/// retains its own retrieval thresholds.
#[derive(Clone, Debug)]
pub struct ConstraintConfig {
    pub rag: RagConfig,
    /// Suppression query threshold at review time (default 0.8).
    pub suppression_threshold: f32,
    /// Similar-constraint threshold at feedback time (default 0.7).
    pub feedback_threshold: f32,
    /// Default expiry window for newly created constraints, in days.
    pub expiry_days: i64,
}

impl ConstraintConfig {
    pub fn from_env() -> Result<Self> {
        let url = std::env::var("QDRANT_URL")
            .map_err(|_| RagBaseError::Config("QDRANT_URL is required".into()))?;
        let api_key = std::env::var("QDRANT_API_KEY").ok();
        let collection =
            std::env::var("CONSTRAINT_COLLECTION").unwrap_or_else(|_| "learned_constraints".into());
        let embedding_dim = std::env::var("EMBEDDING_DIM")
            .ok()
            .and_then(|s| s.parse::<usize>().ok());

        let suppression_threshold = std::env::var("RLHF_SUPPRESSION_THRESHOLD")
            .ok()
            .and_then(|s| s.parse::<f32>().ok())
            .unwrap_or(0.8);
        let feedback_threshold = std::env::var("RLHF_FEEDBACK_THRESHOLD")
            .ok()
            .and_then(|s| s.parse::<f32>().ok())
            .unwrap_or(0.7);
        let expiry_days = std::env::var("CONSTRAINT_EXPIRY_DAYS")
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(90);

        Ok(Self {
            rag: RagConfig {
                qdrant_url: url,
                qdrant_api_key: api_key,
                collection,
                distance: DistanceKind::Cosine,
                upsert_batch: 64,
                exact_search: false,
                embedding_dim,
                embedding_concurrency: None,
            },
            suppression_threshold,
            feedback_threshold,
            expiry_days,
        })
    }
}
