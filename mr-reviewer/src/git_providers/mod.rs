//! Platform adapter: `parse_webhook`, `get_diff`, `post_review`,
//! `verify_signature` — four operations, one concrete client enum per
//! platform, no `async-trait` and no heap trait objects.

pub mod gitea;
pub mod github;
pub mod signature;
pub mod types;
pub mod webhook;

pub use types::*;

use crate::errors::MrResult;
use services::domain::{Platform, ReviewResponse};

/// Runtime configuration for a single platform's client.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub platform: Platform,
    /// API base, e.g. "https://api.github.com" or "https://git.example.com/api/v1"
    pub base_api: String,
    pub token: String,
    pub webhook_secret: Option<String>,
    /// Per-platform disable toggle: when false, signatures aren't
    /// required and a missing secret is accepted with a warning.
    pub verify_signatures: bool,
}

/// Concrete provider client (enum-dispatch).
#[derive(Debug, Clone)]
pub enum ProviderClient {
    GitHub(github::GitHubClient),
    Gitea(gitea::GiteaClient),
}

impl ProviderClient {
    pub fn from_config(cfg: ProviderConfig) -> MrResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent("code-review-bot/0.1")
            .build()?;
        Ok(match cfg.platform {
            Platform::Github => {
                Self::GitHub(github::GitHubClient::new(client, cfg.base_api, cfg.token))
            }
            Platform::Gitea => {
                Self::Gitea(gitea::GiteaClient::new(client, cfg.base_api, cfg.token))
            }
        })
    }

    pub async fn fetch_meta(&self, id: &types::ChangeRequestId) -> MrResult<types::ChangeRequest> {
        match self {
            Self::GitHub(c) => c.get_meta(id).await,
            Self::Gitea(c) => c.get_meta(id).await,
        }
    }

    pub async fn fetch_commits(&self, id: &types::ChangeRequestId) -> MrResult<Vec<types::CrCommit>> {
        match self {
            Self::GitHub(c) => c.get_commits(id).await,
            Self::Gitea(c) => c.get_commits(id).await,
        }
    }

    /// Normalized file-level diff for the PR.
    pub async fn get_diff(&self, id: &types::ChangeRequestId) -> MrResult<types::ChangeSet> {
        match self {
            Self::GitHub(c) => c.get_changeset(id).await,
            Self::Gitea(c) => c.get_changeset(id).await,
        }
    }

    /// Publish a native review with per-line comments (PR events) or a
    /// tracking-issue comment (push events, handled by the caller passing a
    /// synthetic single-comment response).
    pub async fn post_review(
        &self,
        id: &types::ChangeRequestId,
        head_sha: &str,
        review: &ReviewResponse,
    ) -> MrResult<()> {
        match self {
            Self::GitHub(c) => c.post_review(id, head_sha, review).await,
            Self::Gitea(c) => c.post_review(id, head_sha, review).await,
        }
    }
}
