//! Review orchestrator (C9): wires the platform adapter, LLM, RAG context,
//! and learned-constraint suppression into a single `run_review_task` call.
//!
//! This crate used to carry its own copy of `mr-reviewer`'s provider
//! dispatch and diff parser; it now sits one layer above `mr-reviewer` and
//! adds exactly what that crate doesn't own: suppression of previously
//! learned false positives, idempotent publishing, and the stats/summary
//! shape the ingress gateway returns to callers.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, OnceLock};

use mr_reviewer::git_providers::{ChangeRequestId, ProviderClient, ProviderConfig};
use mr_reviewer::review::llm::LlmClient;
use mr_reviewer::review::RagContext;
use rag_base::ConstraintStore;
use services::domain::{Platform, PrMetadata, ReviewComment, ReviewConfig, ReviewResponse, ReviewStats};
use tracing::{debug, info, warn};

use crate::errors::{GitContextEngineError, GitContextEngineResult};

/// Everything the orchestrator needs to run one review end to end.
pub struct Orchestrator {
    providers: HashMap<Platform, ProviderConfig>,
    llm: Arc<LlmClient>,
    rag: Option<RagContext>,
    constraints: Option<Arc<ConstraintStore>>,
}

impl Orchestrator {
    pub fn new(
        providers: HashMap<Platform, ProviderConfig>,
        llm: Arc<LlmClient>,
        rag: Option<RagContext>,
        constraints: Option<Arc<ConstraintStore>>,
    ) -> Self {
        Self {
            providers,
            llm,
            rag,
            constraints,
        }
    }

    /// Runs the full pipeline for `meta`/`cfg`: fetch, draft comments,
    /// suppress previously-learned false positives, and publish back to the
    /// provider. Idempotent per `(repo_id, pr_number, head_sha)` — a second
    /// call for a head_sha already published this process's lifetime is
    /// rejected rather than double-posting.
    pub async fn run_review_task(
        &self,
        meta: &PrMetadata,
        cfg: &ReviewConfig,
    ) -> GitContextEngineResult<ReviewResponse> {
        let t0 = std::time::Instant::now();

        let provider_cfg = self.providers.get(&meta.platform).cloned().ok_or_else(|| {
            GitContextEngineError::Validation(format!(
                "no provider configured for platform {}",
                meta.platform
            ))
        })?;

        let id = ChangeRequestId {
            repo_id: meta.repo_id.clone(),
            pr_number: meta.pr_number,
        };

        let fingerprint = idempotency_fingerprint(&meta.repo_id, meta.pr_number, &meta.head_sha);
        if let Some(prior) = already_published(&fingerprint) {
            info!(
                repo_id = %meta.repo_id,
                pr_number = meta.pr_number,
                review_id = %prior.review_id,
                "idempotent re-run, short-circuiting with prior review"
            );
            return Ok(prior);
        }

        let (bundle, comments, tokens_used) = mr_reviewer::run_review(
            provider_cfg.clone(),
            id.clone(),
            &self.llm,
            self.rag.as_ref(),
            cfg,
        )
        .await?;

        let mut rlhf_applied = 0u32;
        let comments = if cfg.apply_learned_suppressions {
            match &self.constraints {
                Some(store) => {
                    self.suppress(store, &meta.repo_id, comments, &mut rlhf_applied)
                        .await
                }
                None => comments,
            }
        } else {
            comments
        };

        let response = build_response(
            comments,
            self.rag.is_some(),
            rlhf_applied,
            tokens_used,
            t0.elapsed().as_millis() as u64,
        );

        let client = ProviderClient::from_config(provider_cfg)?;
        client
            .post_review(&id, &bundle.meta.diff_refs.head_sha, &response)
            .await?;
        mark_published(fingerprint, response.clone());

        info!(
            repo_id = %meta.repo_id,
            pr_number = meta.pr_number,
            comments = response.comments.len(),
            rlhf_applied,
            elapsed_ms = t0.elapsed().as_millis(),
            "review published"
        );
        Ok(response)
    }

    /// Drops comments whose embedding matches a learned suppression pattern
    /// at or above the store's configured threshold.
    async fn suppress(
        &self,
        store: &ConstraintStore,
        repo_id: &str,
        comments: Vec<ReviewComment>,
        applied: &mut u32,
    ) -> Vec<ReviewComment> {
        let mut kept = Vec::with_capacity(comments.len());
        for comment in comments {
            let embedding = match self.llm.embed(&comment.message).await {
                Ok(v) => v,
                Err(e) => {
                    warn!("suppression embed failed for comment {}: {e}, keeping it", comment.id);
                    kept.push(comment);
                    continue;
                }
            };
            match store.check_suppressions(repo_id, embedding).await {
                Ok(hits) if !hits.is_empty() => {
                    debug!(
                        comment_id = %comment.id,
                        matches = hits.len(),
                        "comment suppressed by learned constraint"
                    );
                    *applied += 1;
                }
                Ok(_) => kept.push(comment),
                Err(e) => {
                    warn!("suppression lookup failed for comment {}: {e}, keeping it", comment.id);
                    kept.push(comment);
                }
            }
        }
        kept
    }
}

fn build_response(
    comments: Vec<ReviewComment>,
    rag_used: bool,
    rlhf_constraints_applied: u32,
    tokens_used: u32,
    execution_time_ms: u64,
) -> ReviewResponse {
    let mut counts_by_severity: BTreeMap<String, u32> = BTreeMap::new();
    for c in &comments {
        *counts_by_severity
            .entry(format!("{:?}", c.severity).to_lowercase())
            .or_insert(0) += 1;
    }

    let summary = if comments.is_empty() {
        "No issues found.".to_string()
    } else {
        format!("{} comment(s) across the changed files.", comments.len())
    };

    ReviewResponse {
        review_id: services::uuid::new_trace_id().to_string(),
        summary,
        stats: ReviewStats {
            counts_by_severity,
            execution_time_ms,
            rag_used,
            rlhf_used: rlhf_constraints_applied > 0,
            rlhf_constraints_applied,
            tokens_used,
        },
        comments,
    }
}

fn idempotency_fingerprint(repo_id: &str, pr_number: u64, head_sha: &str) -> String {
    format!("{repo_id}#{pr_number}@{head_sha}")
}

static PUBLISHED: OnceLock<Mutex<HashMap<String, ReviewResponse>>> = OnceLock::new();

fn already_published(fingerprint: &str) -> Option<ReviewResponse> {
    PUBLISHED
        .get_or_init(|| Mutex::new(HashMap::new()))
        .lock()
        .unwrap()
        .get(fingerprint)
        .cloned()
}

fn mark_published(fingerprint: String, response: ReviewResponse) {
    PUBLISHED
        .get_or_init(|| Mutex::new(HashMap::new()))
        .lock()
        .unwrap()
        .insert(fingerprint, response);
}
