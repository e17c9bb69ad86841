//! GitHub provider (REST v3) for PR metadata/commits/diffs/review posting.
//!
//! Endpoints used:
//! - GET  /repos/{owner}/{repo}/pulls/{number}
//! - GET  /repos/{owner}/{repo}/pulls/{number}/commits
//! - GET  /repos/{owner}/{repo}/pulls/{number}/files
//! - POST /repos/{owner}/{repo}/pulls/{number}/reviews

use crate::errors::{MrResult, ProviderError};
use crate::git_providers::types::*;
use crate::parser::{looks_like_binary_patch, parse_unified_diff_advanced};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use services::domain::{CommentType, ReviewComment, ReviewResponse, Severity};

#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: Client,
    base_api: String, // "https://api.github.com"
    token: String,
}

impl GitHubClient {
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
        let resp: GhPull = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(ChangeRequest {
            platform: services::domain::Platform::Github,
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
        let raw: Vec<GhCommit> = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(raw
            .into_iter()
            .map(|c| CrCommit {
                id: c.sha,
                title: c.commit.message.lines().next().unwrap_or_default().to_string(),
                message: Some(c.commit.message),
                author_name: c.commit.author.map(|a| a.name),
                authored_at: None,
            })
            .collect())
    }

    pub async fn get_changeset(&self, id: &ChangeRequestId) -> MrResult<ChangeSet> {
        let url = self.pulls_url(id, "/files?per_page=100")?;
        let files: Vec<GhFile> = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mut changes = Vec::with_capacity(files.len());
        let mut is_truncated = false;
        for f in files {
            let is_binary = f.patch.is_none();
            if f.patch.is_none() && f.status != "removed" {
                is_truncated = true; // GitHub omits `patch` for very large diffs
            }
            let hunks = match &f.patch {
                Some(p) if !looks_like_binary_patch(p) => parse_unified_diff_advanced(p),
                _ => Vec::new(),
            };
            changes.push(FileChange {
                old_path: Some(f.previous_filename.unwrap_or_else(|| f.filename.clone())),
                new_path: Some(f.filename),
                is_new: f.status == "added",
                is_deleted: f.status == "removed",
                is_renamed: f.status == "renamed",
                is_binary,
                hunks,
                raw_unidiff: f.patch,
            });
        }

        Ok(ChangeSet {
            files: changes,
            is_truncated,
        })
    }

    /// Posts a native review with per-line comments.
    pub async fn post_review(
        &self,
        id: &ChangeRequestId,
        head_sha: &str,
        review: &ReviewResponse,
    ) -> MrResult<()> {
        let url = self.pulls_url(id, "/reviews")?;
        let comments: Vec<GhReviewComment> = review
            .comments
            .iter()
            .map(|c| GhReviewComment {
                path: c.file_path.clone(),
                line: c.line_range.end,
                body: format_comment_body(c, &review.summary),
            })
            .collect();

        let body = GhReviewRequest {
            commit_id: head_sha.to_string(),
            body: review.summary.clone(),
            event: "COMMENT",
            comments,
        };

        self.http
            .post(url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

fn format_comment_body(c: &ReviewComment, _summary: &str) -> String {
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

pub(crate) fn split_repo_id(repo_id: &str) -> MrResult<(&str, &str)> {
    repo_id
        .split_once('/')
        .ok_or_else(|| ProviderError::InvalidResponse(format!("repo_id not owner/name: {repo_id}")).into())
}

#[derive(Debug, Deserialize)]
struct GhUser {
    id: u64,
    login: String,
}

#[derive(Debug, Deserialize)]
struct GhRef {
    r#ref: String,
    sha: String,
}

#[derive(Debug, Deserialize)]
struct GhPull {
    title: String,
    body: Option<String>,
    state: String,
    html_url: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    user: GhUser,
    head: GhRef,
    base: GhRef,
}

#[derive(Debug, Deserialize)]
struct GhCommitAuthor {
    name: String,
}

#[derive(Debug, Deserialize)]
struct GhCommitInner {
    message: String,
    author: Option<GhCommitAuthor>,
}

#[derive(Debug, Deserialize)]
struct GhCommit {
    sha: String,
    commit: GhCommitInner,
}

#[derive(Debug, Deserialize)]
struct GhFile {
    filename: String,
    #[serde(default)]
    previous_filename: Option<String>,
    status: String,
    #[serde(default)]
    patch: Option<String>,
}

#[derive(Debug, serde::Serialize)]
struct GhReviewComment {
    path: String,
    line: u32,
    body: String,
}

#[derive(Debug, serde::Serialize)]
struct GhReviewRequest {
    commit_id: String,
    body: String,
    event: &'static str,
    comments: Vec<GhReviewComment>,
}
