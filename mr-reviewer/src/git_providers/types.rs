//! Provider-agnostic data model for change requests (PRs) and diffs.
//!
//! These types are the normalized output of the fetch stage and are consumed
//! by the review orchestrator and the prompt layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use services::domain::Platform;

/// A unique reference to a pull request inside a provider.
///
/// `repo_id` is always `owner/name`; `pr_number` is the PR/issue number
/// (GitHub and Gitea number PRs the same way).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRequestId {
    pub repo_id: String,
    pub pr_number: u64,
}

/// Triple of SHAs used to bind inline comments reliably.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffRefs {
    pub base_sha: String,
    pub head_sha: String,
}

/// Minimal author info about the human who opened the PR.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorInfo {
    pub id: String,
    pub username: Option<String>,
}

/// High-level metadata for a pull request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRequest {
    pub platform: Platform,
    pub id: ChangeRequestId,
    pub title: String,
    pub description: Option<String>,
    pub author: AuthorInfo,
    pub state: String,
    pub web_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub source_branch: Option<String>,
    pub target_branch: Option<String>,
    pub diff_refs: DiffRefs,
}

/// A single commit belonging to the PR.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrCommit {
    pub id: String,
    pub title: String,
    pub message: Option<String>,
    pub author_name: Option<String>,
    pub authored_at: Option<DateTime<Utc>>,
}

/// One changed line inside a diff hunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DiffLine {
    Added { new_line: u32, content: String },
    Removed { old_line: u32, content: String },
    Context { old_line: u32, new_line: u32, content: String },
}

/// A diff hunk (continuous block of changes).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffHunk {
    pub old_start: u32,
    pub old_lines: u32,
    pub new_start: u32,
    pub new_lines: u32,
    pub lines: Vec<DiffLine>,
}

/// File-level change and its hunks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileChange {
    pub old_path: Option<String>,
    pub new_path: Option<String>,
    pub is_new: bool,
    pub is_deleted: bool,
    pub is_renamed: bool,
    pub is_binary: bool,
    pub hunks: Vec<DiffHunk>,
    /// Provider raw unified diff text for this file, starting at its
    /// `diff --git` header.
    pub raw_unidiff: Option<String>,
}

/// The full set of changes for a PR.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeSet {
    pub files: Vec<FileChange>,
    pub is_truncated: bool,
}

/// All data needed by the review stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrBundle {
    pub meta: ChangeRequest,
    pub commits: Vec<CrCommit>,
    pub changes: ChangeSet,
}

/// Normalized webhook payload shape: a sum type rather than a
/// dynamically-typed event dict. `Other` is returned (and accepted with a
/// 202) for event types we don't act on.
#[derive(Debug, Clone)]
pub enum WebhookEvent {
    PullRequest(services::domain::PrMetadata),
    Push(services::domain::PrMetadata),
    Other { event_name: String },
}
