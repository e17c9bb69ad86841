//! Cross-crate domain types shared by the ingress gateway, the orchestrator,
//! and the learning plane. Kept free of any particular storage or transport
//! dependency so every crate in the workspace can depend on `services`
//! without pulling in axum, qdrant, or git2.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Git hosting platform a request originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Github,
    Gitea,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Github => write!(f, "github"),
            Platform::Gitea => write!(f, "gitea"),
        }
    }
}

/// Origin of the task that produced a `PRMetadata`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskSource {
    Webhook,
    Cli,
    Mcp,
}

impl Default for TaskSource {
    fn default() -> Self {
        TaskSource::Webhook
    }
}

/// Convention for push-event `pr_number`: always `1`, never `0`, so
/// downstream code can treat "no PR" and "PR zero" as distinct states.
pub const PUSH_EVENT_PR_NUMBER: u64 = 1;

/// Immutable value describing the change under review. Never mutated after
/// construction by `parse_webhook`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrMetadata {
    pub repo_id: String,
    pub pr_number: u64,
    pub base_sha: String,
    pub head_sha: String,
    pub author: Option<String>,
    pub title: Option<String>,
    pub platform: Platform,
    #[serde(default)]
    pub source: TaskSource,
    pub callback_url: Option<String>,
}

impl PrMetadata {
    /// Validates the repo-isolation and SHA-shape invariants.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.repo_id.trim().is_empty() {
            return Err("repo_id must not be empty");
        }
        if self.pr_number == 0 {
            return Err("pr_number must be >= 1");
        }
        if !is_40_hex(&self.base_sha) || !is_40_hex(&self.head_sha) {
            return Err("base_sha/head_sha must be exactly 40 lowercase hex chars");
        }
        Ok(())
    }
}

fn is_40_hex(s: &str) -> bool {
    s.len() == 40 && s.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Nit,
    Low,
    Medium,
    High,
    Critical,
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Low
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewConfig {
    #[serde(default = "default_true")]
    pub use_rag_context: bool,
    #[serde(default = "default_true")]
    pub apply_learned_suppressions: bool,
    #[serde(default)]
    pub severity_threshold: Severity,
    #[serde(default)]
    pub include_auto_fix_patches: bool,
    #[serde(default)]
    pub personas: Vec<String>,
    #[serde(default = "default_max_context_matches")]
    pub max_context_matches: u32,
    #[serde(default = "default_rag_min_score")]
    pub rag_min_score: f32,
    #[serde(default)]
    pub ignored_file_suffixes: Vec<String>,
}

fn default_true() -> bool {
    true
}
fn default_max_context_matches() -> u32 {
    5
}
fn default_rag_min_score() -> f32 {
    0.75
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            use_rag_context: true,
            apply_learned_suppressions: true,
            severity_threshold: Severity::Low,
            include_auto_fix_patches: false,
            personas: Vec::new(),
            max_context_matches: 5,
            rag_min_score: default_rag_min_score(),
            ignored_file_suffixes: Vec::new(),
        }
    }
}

impl ReviewConfig {
    /// `max_context_matches` clamped to the documented [3, 10] range.
    pub fn clamped_max_context_matches(&self) -> u32 {
        self.max_context_matches.clamp(3, 10)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewTask {
    pub task_id: String,
    pub trace_id: String,
    pub status: TaskStatus,
    pub queued_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub metadata: PrMetadata,
    pub config: ReviewConfig,
    pub result: Option<ReviewResponse>,
    pub error: Option<String>,
    pub retry_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentType {
    Security,
    Bug,
    Performance,
    Style,
    Nit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineRange {
    pub start: u32,
    pub end: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewComment {
    pub id: String,
    pub file_path: String,
    pub line_range: LineRange,
    pub r#type: CommentType,
    pub severity: Severity,
    pub message: String,
    #[serde(default)]
    pub suggestion: String,
    pub confidence_score: f32,
    pub fix_patch: Option<String>,
    #[serde(default)]
    pub citations: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewStats {
    pub counts_by_severity: std::collections::BTreeMap<String, u32>,
    pub execution_time_ms: u64,
    pub rag_used: bool,
    pub rlhf_used: bool,
    pub rlhf_constraints_applied: u32,
    pub tokens_used: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewResponse {
    pub review_id: String,
    pub summary: String,
    pub comments: Vec<ReviewComment>,
    pub stats: ReviewStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackAction {
    Accepted,
    Rejected,
    Modified,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRequest {
    pub review_id: String,
    pub comment_id: String,
    pub user_id: String,
    pub action: FeedbackAction,
    pub reason: Option<String>,
    pub developer_comment: String,
    pub final_code_snapshot: Option<String>,
    pub trace_id: String,
}

/// Which named queue a generic task handle belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    CodeReview,
    Indexing,
    Feedback,
}

/// `GET /tasks/{task_id}` record for queues other than `code_review`
/// (which has the richer `ReviewTask` shape). Indexing and feedback tasks
/// carry no typed result worth modeling here, so `result` is opaque JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task_id: String,
    pub trace_id: String,
    pub kind: TaskKind,
    pub status: TaskStatus,
    pub queued_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub retry_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub id: String,
    pub review_id: String,
    pub comment_id: String,
    pub user_id: String,
    pub action: FeedbackAction,
    pub reason: Option<String>,
    pub developer_comment: String,
    pub final_code_snapshot: Option<String>,
    pub trace_id: String,
    pub created_at: DateTime<Utc>,
}
