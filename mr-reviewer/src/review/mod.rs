//! Review orchestrator: for each changed file, build context → prompt →
//! call the LLM → parse/validate the response → emit review comments.
//!
//! Deliberately file-scoped rather than symbol-scoped: every hunk in a
//! changed file is reviewed in one call, anchored to new-file line ranges.

pub mod context;
pub mod llm;
pub mod policy;
pub mod prompt;

use std::sync::Arc;

use ai_llm_service::service_profiles::LlmServiceProfiles;
use rag_store::RagConfig;
use services::domain::{CommentType, LineRange, ReviewComment, ReviewConfig, Severity};
use tracing::{debug, info, warn};

use crate::errors::MrResult;
use crate::git_providers::types::CrBundle;
use context::{AnchorRange, RelatedContext, build_primary_context, fetch_related_context};
use llm::LlmClient;
use policy::{ParsedFinding, parse_and_validate};
use prompt::build_prompt;

/// Everything needed to run RAG-backed related-context lookups. `None`
/// disables the lookup entirely (e.g. no vector store configured).
pub struct RagContext {
    pub svc: Arc<LlmServiceProfiles>,
    pub config: RagConfig,
}

/// Output of [`build_draft_comments`]: the comments to post plus the total
/// tokens the LLM calls behind them consumed.
pub struct DraftReview {
    pub comments: Vec<ReviewComment>,
    pub tokens_used: u32,
}

/// Reviews every eligible file in `bundle` and returns the comments to post.
///
/// Binary and deleted files are skipped outright; files whose trailing
/// suffix matches `cfg.ignored_file_suffixes` are skipped before any LLM
/// call is made; renamed-only files with no hunks produce no comments.
/// Each file gets its own LLM call so a failure on one file doesn't take
/// down the whole PR's review.
pub async fn build_draft_comments(
    bundle: &CrBundle,
    repo_id: &str,
    llm: &LlmClient,
    rag: Option<&RagContext>,
    cfg: &ReviewConfig,
) -> MrResult<DraftReview> {
    let mut comments = Vec::new();
    let mut tokens_used = 0u32;

    for file in &bundle.changes.files {
        if file.is_binary || file.is_deleted || file.hunks.is_empty() {
            continue;
        }

        let path_for_ignore = file.new_path.as_deref().or(file.old_path.as_deref()).unwrap_or("");
        if cfg
            .ignored_file_suffixes
            .iter()
            .any(|suffix| path_for_ignore.ends_with(suffix.as_str()))
        {
            debug!("review: {} matches ignore list, skipping", path_for_ignore);
            continue;
        }

        let primary = build_primary_context(file);
        if primary.allowed.is_empty() {
            debug!("review: {} has no addable lines, skipping", primary.path);
            continue;
        }

        let related = if cfg.use_rag_context {
            match rag {
                Some(r) => {
                    match fetch_related_context(
                        &r.svc,
                        &r.config,
                        cfg,
                        repo_id,
                        &primary.path,
                        &primary.path,
                    )
                    .await
                    {
                        Ok(rc) => rc,
                        Err(e) => {
                            warn!("review: related context lookup failed for {}: {e}", primary.path);
                            RelatedContext::default()
                        }
                    }
                }
                None => RelatedContext::default(),
            }
        } else {
            RelatedContext::default()
        };

        let built = build_prompt(&primary, &related.text);

        let raw = match llm.generate(&built).await {
            Ok(outcome) => {
                tokens_used += outcome.tokens_used;
                outcome.text
            }
            Err(e) => {
                warn!("review: LLM generation failed for {}: {e}", primary.path);
                continue;
            }
        };

        let findings = parse_and_validate(&raw, &primary.allowed);
        debug!(
            "review: {} → {} raw block(s), {} validated finding(s)",
            primary.path,
            raw.lines().filter(|l| l.starts_with("ANCHOR:")).count(),
            findings.len()
        );

        for finding in findings {
            let severity = map_severity(finding.severity);
            if severity_rank(severity) < severity_rank(cfg.severity_threshold) {
                continue;
            }

            let comment = to_review_comment(
                &primary.path,
                &finding,
                severity,
                &related.sources,
                cfg.include_auto_fix_patches,
            );
            comments.push(comment);
        }
    }

    info!(
        "review: built {} comment(s) across the PR, {} token(s) used",
        comments.len(),
        tokens_used
    );
    Ok(DraftReview {
        comments,
        tokens_used,
    })
}

fn to_review_comment(
    path: &str,
    finding: &ParsedFinding,
    severity: Severity,
    citations: &[String],
    include_patch: bool,
) -> ReviewComment {
    let line_range = match finding.anchor {
        Some(AnchorRange { start, end }) => LineRange {
            start: start as u32,
            end: end as u32,
        },
        None => LineRange { start: 1, end: 1 },
    };

    let confidence_score = match severity {
        Severity::Critical => 0.9,
        Severity::High => 0.8,
        Severity::Medium => 0.65,
        Severity::Low => 0.5,
        Severity::Nit => 0.4,
    };

    ReviewComment {
        id: uuid_like(path, &line_range, &finding.title),
        file_path: path.to_string(),
        line_range,
        r#type: comment_type_for(&finding.title, &finding.body_markdown),
        severity,
        message: finding.title.clone(),
        suggestion: finding.body_markdown.clone(),
        confidence_score,
        fix_patch: if include_patch {
            finding.patch.clone()
        } else {
            None
        },
        citations: citations.to_vec(),
    }
}

/// Best-effort classification from the finding's own words — the model
/// isn't asked to pick a `CommentType` directly, so we infer it.
fn comment_type_for(title: &str, body: &str) -> CommentType {
    let haystack = format!("{title} {body}").to_lowercase();
    if haystack.contains("secret") || haystack.contains("inject") || haystack.contains("vulnerab")
    {
        CommentType::Security
    } else if haystack.contains("panic")
        || haystack.contains("unwrap")
        || haystack.contains("crash")
        || haystack.contains("bug")
        || haystack.contains("incorrect")
    {
        CommentType::Bug
    } else if haystack.contains("slow")
        || haystack.contains("allocat")
        || haystack.contains("n+1")
        || haystack.contains("performance")
    {
        CommentType::Performance
    } else if haystack.contains("naming")
        || haystack.contains("style")
        || haystack.contains("format")
    {
        CommentType::Style
    } else {
        CommentType::Nit
    }
}

fn map_severity(s: policy::Severity) -> Severity {
    match s {
        policy::Severity::High => Severity::High,
        policy::Severity::Medium => Severity::Medium,
        policy::Severity::Low => Severity::Low,
    }
}

fn severity_rank(s: Severity) -> u8 {
    match s {
        Severity::Nit => 0,
        Severity::Low => 1,
        Severity::Medium => 2,
        Severity::High => 3,
        Severity::Critical => 4,
    }
}

fn uuid_like(path: &str, range: &LineRange, title: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(path.as_bytes());
    hasher.update(range.start.to_le_bytes());
    hasher.update(range.end.to_le_bytes());
    hasher.update(title.as_bytes());
    format!("{:x}", hasher.finalize())[..16].to_string()
}
