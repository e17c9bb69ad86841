//! Gitea provider (API v1) for PR metadata/commits/diffs/review posting.
//!
//! Endpoints used:
//! - GET  /repos/{owner}/{repo}/pulls/{index}
//! - GET  /repos/{owner}/{repo}/pulls/{index}/commits
//! - GET  /repos/{owner}/{repo}/pulls/{index}.diff   (raw unified diff)
//! - POST /repos/{owner}/{repo}/pulls/{index}/reviews

use crate::errors::MrResult;
use crate::git_providers::github::split_repo_id;
use crate::git_providers::types::*;
use crate::parser::parse_unified_diff_advanced;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use services::domain::{CommentType, ReviewComment, ReviewResponse, Severity};

#[derive(Debug, Clone)]
pub struct GiteaClient {
    http: Client,
    base_api: String, // e.g. "https://git.example.com/api/v1"
    token: String,
}

impl GiteaClient {
    pub fn new(http: Client, base_api: String, token: String) -> Self {
        Self {
            http,
            base_api,
            token,
        }
    }

    fn pulls_url(&self, id: &ChangeRequestId, suffix: &str) -> MrResult<String> {
        let (owner, repo) = split_repo_id(&id.repo_id)?;
        Ok(format!(
            "{}/repos/{owner}/{repo}/pulls/{}{}",
            self.base_api, id.pr_number, suffix
        ))
    }

    pub async fn get_meta(&self, id: &ChangeRequestId) -> MrResult<ChangeRequest> {
        let url = self.pulls_url(id, "")?;
        let resp: GtPull = self
            .http
            .get(url)
            .header("Authorization", format!("token {}", self.token))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(ChangeRequest {
            platform: services::domain::Platform::Gitea,
            id: id.clone(),
            title: resp.title,
            description: resp.body,
            author: AuthorInfo {
                id: resp.user.id.to_string(),
                username: Some(resp.user.login),
            },
            state: resp.state,
            web_url: resp.html_url,
            created_at: resp.created_at,
            updated_at: resp.updated_at,
            source_branch: Some(resp.head.r#ref),
            target_branch: Some(resp.base.r#ref),
            diff_refs: DiffRefs {
                base_sha: resp.base.sha,
                head_sha: resp.head.sha,
            },
        })
    }

    pub async fn get_commits(&self, id: &ChangeRequestId) -> MrResult<Vec<CrCommit>> {
        let url = self.pulls_url(id, "/commits")?;
        let raw: Vec<GtCommit> = self
            .http
            .get(url)
            .header("Authorization", format!("token {}", self.token))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(raw
            .into_iter()
            .map(|c| CrCommit {
                id: c.sha,
                title: c
                    .commit
                    .message
                    .lines()
                    .next()
                    .unwrap_or_default()
                    .to_string(),
                message: Some(c.commit.message),
                author_name: c.commit.author.map(|a| a.name),
                authored_at: None,
            })
            .collect())
    }

    /// Gitea exposes the full PR diff as raw text rather than a per-file JSON
    /// array; it is split on `diff --git` boundaries the same way a `git
    /// diff` invocation would be.
    pub async fn get_changeset(&self, id: &ChangeRequestId) -> MrResult<ChangeSet> {
        let url = self.pulls_url(id, ".diff")?;
        let raw = self
            .http
            .get(url)
            .header("Authorization", format!("token {}", self.token))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let files = split_unidiff(&raw)
            .into_iter()
            .map(file_change_from_block)
            .collect();

        Ok(ChangeSet {
            files,
            is_truncated: false,
        })
    }

    pub async fn post_review(
        &self,
        id: &ChangeRequestId,
        head_sha: &str,
        review: &ReviewResponse,
    ) -> MrResult<()> {
        let url = self.pulls_url(id, "/reviews")?;
        let comments: Vec<GtReviewComment> = review
            .comments
            .iter()
            .map(|c| GtReviewComment {
                path: c.file_path.clone(),
                new_position: c.line_range.end,
                body: format_comment_body(c),
            })
            .collect();

        let body = GtReviewRequest {
            commit_id: head_sha.to_string(),
            body: review.summary.clone(),
            event: "COMMENT",
            comments,
        };

        self.http
            .post(url)
            .header("Authorization", format!("token {}", self.token))
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

fn format_comment_body(c: &ReviewComment) -> String {
    let sev = match c.severity {
        Severity::Nit => "nit",
        Severity::Low => "low",
        Severity::Medium => "medium",
        Severity::High => "high",
        Severity::Critical => "critical",
    };
    let kind = match c.r#type {
        CommentType::Security => "security",
        CommentType::Bug => "bug",
        CommentType::Performance => "performance",
        CommentType::Style => "style",
        CommentType::Nit => "nit",
    };
    let mut body = format!("**[{sev}] {kind}**\n\n{}", c.message);
    if !c.citations.is_empty() {
        body.push_str("\n\n");
        body.push_str(&c.citations.join("\n"));
    }
    if let Some(patch) = &c.fix_patch {
        body.push_str(&format!("\n\n```suggestion\n{patch}\n```"));
    }
    body
}

fn split_unidiff(raw: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut start = None;
    for (i, _) in raw.match_indices("diff --git ") {
        if let Some(s) = start {
            blocks.push(&raw[s..i]);
        }
        start = Some(i);
    }
    if let Some(s) = start {
        blocks.push(&raw[s..]);
    }
    blocks
}

fn file_change_from_block(block: &str) -> FileChange {
    let header = block.lines().next().unwrap_or_default();
    let (old_path, new_path) = parse_diff_git_header(header);
    let is_new = block.contains("\nnew file mode");
    let is_deleted = block.contains("\ndeleted file mode");
    let is_renamed = block.contains("\nrename from ") && block.contains("\nrename to ");
    let is_binary = block.contains("Binary files ") || block.contains("\nGIT binary patch");

    let hunks = if is_binary {
        Vec::new()
    } else {
        parse_unified_diff_advanced(block)
    };

    FileChange {
        old_path,
        new_path,
        is_new,
        is_deleted,
        is_renamed,
        is_binary,
        hunks,
        raw_unidiff: Some(block.to_string()),
    }
}

fn parse_diff_git_header(header: &str) -> (Option<String>, Option<String>) {
    let rest = header.strip_prefix("diff --git a/").unwrap_or(header);
    match rest.split_once(" b/") {
        Some((a, b)) => (Some(a.to_string()), Some(b.trim_end().to_string())),
        None => (None, None),
    }
}

#[derive(Debug, Deserialize)]
struct GtUser {
    id: u64,
    login: String,
}

#[derive(Debug, Deserialize)]
struct GtRef {
    r#ref: String,
    sha: String,
}

#[derive(Debug, Deserialize)]
struct GtPull {
    title: String,
    body: Option<String>,
    state: String,
    html_url: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    user: GtUser,
    head: GtRef,
    base: GtRef,
}

#[derive(Debug, Deserialize)]
struct GtCommitAuthor {
    name: String,
}

#[derive(Debug, Deserialize)]
struct GtCommitInner {
    message: String,
    author: Option<GtCommitAuthor>,
}

#[derive(Debug, Deserialize)]
struct GtCommit {
    sha: String,
    commit: GtCommitInner,
}

#[derive(Debug, serde::Serialize)]
struct GtReviewComment {
    path: String,
    new_position: u32,
    body: String,
}

#[derive(Debug, serde::Serialize)]
struct GtReviewRequest {
    commit_id: String,
    body: String,
    event: &'static str,
    comments: Vec<GtReviewComment>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_multi_file_diff() {
        let raw = "diff --git a/foo.rs b/foo.rs\nindex 111..222 100644\n--- a/foo.rs\n+++ b/foo.rs\n@@ -1,1 +1,1 @@\n-old\n+new\ndiff --git a/bar.rs b/bar.rs\nnew file mode 100644\n--- /dev/null\n+++ b/bar.rs\n@@ -0,0 +1,1 @@\n+hello\n";
        let blocks = split_unidiff(raw);
        assert_eq!(blocks.len(), 2);
        let foo = file_change_from_block(blocks[0]);
        assert_eq!(foo.new_path.as_deref(), Some("foo.rs"));
        assert!(!foo.is_new);
        let bar = file_change_from_block(blocks[1]);
        assert_eq!(bar.new_path.as_deref(), Some("bar.rs"));
        assert!(bar.is_new);
    }
}
