//! C5 Feedback Log: append-only `FeedbackRecord` storage, one JSONL file per
//! repo under `base_dir`. Grounded on `rag-store::io_jsonl`'s read style and
//! the teacher's JSONL-as-durable-log convention (`util::jsonl::JsonlWriter`
//! in the code-indexer crate uses the same append pattern).

use crate::errors::{RagBaseError, Result};
use services::domain::{FeedbackAction, FeedbackRecord};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

pub struct FeedbackLog {
    base_dir: PathBuf,
}

impl FeedbackLog {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn path_for(&self, repo_id: &str) -> PathBuf {
        // repo_id is "owner/name"; flatten the slash so it stays a single file.
        let flat = repo_id.replace('/', "__");
        self.base_dir.join(format!("{flat}.jsonl"))
    }

    /// Appends `record` to `repo_id`'s log. Never mutates or removes prior
    /// entries (invariant: feedback is append-only). `FeedbackRecord` itself
    /// carries no `repo_id`; the caller
    /// resolves it from the originating review's task metadata.
    pub async fn append(&self, repo_id: &str, record: &FeedbackRecord) -> Result<()> {
        fs::create_dir_all(&self.base_dir).await?;
        let path = self.path_for(repo_id);
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(line.as_bytes()).await?;

        metrics::counter!(
            "reviewbot_feedback_submitted_total",
            "action" => action_label(record.action)
        )
        .increment(1);

        debug!(review_id = %record.review_id, comment_id = %record.comment_id, "feedback recorded");
        Ok(())
    }

    /// Reads every record logged under `repo_id`.
    pub async fn read_all(&self, repo_id: &str) -> Result<Vec<FeedbackRecord>> {
        let path = self.path_for(repo_id);
        if !path.exists() {
            return Ok(Vec::new());
        }
        read_jsonl(&path).await
    }

    /// False-positive reduction ratio over the last `window_days`:
    /// rejected / total feedback entries for `repo_id`.
    pub async fn false_positive_reduction(&self, repo_id: &str, window_days: i64) -> Result<f64> {
        let records = self.read_all(repo_id).await?;
        let cutoff = chrono::Utc::now() - chrono::Duration::days(window_days);
        let windowed: Vec<&FeedbackRecord> = records.iter().filter(|r| r.created_at >= cutoff).collect();
        if windowed.is_empty() {
            return Ok(0.0);
        }
        let rejected = windowed
            .iter()
            .filter(|r| r.action == FeedbackAction::Rejected)
            .count();
        let ratio = rejected as f64 / windowed.len() as f64;
        info!(repo_id, ratio, "false positive reduction computed");
        metrics::gauge!("reviewbot_false_positive_reduction_ratio", "repo_id" => repo_id.to_string())
            .set(ratio);
        Ok(ratio)
    }
}

fn action_label(action: FeedbackAction) -> &'static str {
    match action {
        FeedbackAction::Accepted => "accepted",
        FeedbackAction::Rejected => "rejected",
        FeedbackAction::Modified => "modified",
    }
}

async fn read_jsonl(path: &Path) -> Result<Vec<FeedbackRecord>> {
    let content = fs::read_to_string(path).await?;
    let mut out = Vec::new();
    for (i, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record: FeedbackRecord = serde_json::from_str(line).map_err(|e| {
            RagBaseError::Validation(format!("feedback log {path:?} line {}: {e}", i + 1))
        })?;
        out.push(record);
    }
    Ok(out)
}
