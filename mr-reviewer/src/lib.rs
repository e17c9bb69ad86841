//! Public entry for the mr-reviewer pipeline.
//!
//! A single high-level function runs the whole pipeline for a pull request:
//!
//! 1. **Provider I/O + cache** — fetch PR metadata to get `head_sha`, check
//!    the on-disk large-diff cache, and on a miss fetch commits + the
//!    normalized diff from the provider and store it.
//! 2. **Review** — for each changed file, build a diff-scoped prompt
//!    (optionally enriched with RAG-retrieved related context), call the
//!    LLM, and turn its validated output into review comments.
//!
//! Provider and LLM dispatch are both enum-based (no `async-trait`, no heap
//! trait objects); errors are unified by the crate-level error type.

pub mod cache;
pub mod errors;
pub mod git_providers;
pub mod parser;
pub mod review;

use std::time::Instant;
use tracing::debug;

use errors::MrResult;
use git_providers::{ChangeRequestId, CrBundle, ProviderClient, ProviderConfig};
use review::{RagContext, llm::LlmClient};
use services::domain::{ReviewComment, ReviewConfig};

/// Run the full review pipeline for a single PR and return the normalized
/// bundle (useful for posting / diagnostics), the comments ready to be
/// published, and the total LLM tokens the review consumed.
pub async fn run_review(
    provider_cfg: ProviderConfig,
    id: ChangeRequestId,
    llm: &LlmClient,
    rag: Option<&RagContext>,
    review_cfg: &ReviewConfig,
) -> MrResult<(CrBundle, Vec<ReviewComment>, u32)> {
    let t0 = Instant::now();
    debug!("init provider client");
    let client = ProviderClient::from_config(provider_cfg.clone())?;

    debug!("fetch meta to obtain head_sha");
    let meta = client.fetch_meta(&id).await?;
    let head_sha = meta.diff_refs.head_sha.clone();
    debug!("meta ok, head_sha={}", head_sha);

    debug!("check large-diff cache");
    let bundle: CrBundle =
        if let Some(b) = cache::load_bundle(provider_cfg.platform, &id, &head_sha).await? {
            debug!(
                "cache hit → commits={}, files={} ({} ms)",
                b.commits.len(),
                b.changes.files.len(),
                t0.elapsed().as_millis()
            );
            b
        } else {
            debug!("cache miss — fetch from provider");

            let commits = client.fetch_commits(&id).await?;
            debug!("commits fetched, count={}", commits.len());

            let changes = client.get_diff(&id).await?;
            debug!(
                "diff fetched, files={}, truncated={}",
                changes.files.len(),
                changes.is_truncated
            );

            let b = CrBundle {
                meta,
                commits,
                changes,
            };

            cache::maybe_store_bundle(provider_cfg.platform, &id, &head_sha, &b).await?;
            debug!(
                "provider fetch done in {} ms (files={}, commits={})",
                t0.elapsed().as_millis(),
                b.changes.files.len(),
                b.commits.len()
            );

            b
        };

    let t1 = Instant::now();
    debug!("review: building draft comments");
    let draft = review::build_draft_comments(&bundle, &id.repo_id, llm, rag, review_cfg).await?;
    debug!(
        "review: {} comment(s) built in {} ms, {} token(s) used",
        draft.comments.len(),
        t1.elapsed().as_millis(),
        draft.tokens_used
    );

    Ok((bundle, draft.comments, draft.tokens_used))
}

pub use git_providers::{ProviderConfig as ReviewerProviderConfig, ProviderClient as ReviewerProviderClient};
pub use review::llm::{LlmClient as ReviewerLlmClient, LlmConfig as ReviewerLlmConfig};
