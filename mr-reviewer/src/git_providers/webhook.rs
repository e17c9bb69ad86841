//! `parse_webhook`: normalizes GitHub/Gitea webhook payloads into
//! `WebhookEvent`. Unknown event types are not an error;
//! the ingress route accepts them with `202 {"status":"ignored"}`.

use crate::errors::{Error, MrResult};
use crate::git_providers::types::WebhookEvent;
use serde_json::Value;
use services::domain::{Platform, PrMetadata, TaskSource, PUSH_EVENT_PR_NUMBER};

/// Parses a webhook body for `platform`, keyed by the provider's event-name
/// header (`X-GitHub-Event` / `X-Gitea-Event`, identical shape on both).
pub fn parse_webhook(platform: Platform, event_name: &str, body: &[u8]) -> MrResult<WebhookEvent> {
    let payload: Value = serde_json::from_slice(body)
        .map_err(|e| Error::Validation(format!("invalid webhook JSON: {e}")))?;

    match event_name {
        "pull_request" => Ok(WebhookEvent::PullRequest(parse_pull_request(platform, &payload)?)),
        "push" => Ok(WebhookEvent::Push(parse_push(platform, &payload)?)),
        other => Ok(WebhookEvent::Other {
            event_name: other.to_string(),
        }),
    }
}

fn parse_pull_request(platform: Platform, v: &Value) -> MrResult<PrMetadata> {
    let repo_id = v
        .pointer("/repository/full_name")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Validation("missing repository.full_name".into()))?
        .to_string();
    let pr = v
        .get("pull_request")
        .ok_or_else(|| Error::Validation("missing pull_request".into()))?;
    let pr_number = v
        .get("number")
        .and_then(Value::as_u64)
        .ok_or_else(|| Error::Validation("missing number".into()))?;
    let base_sha = pr
        .pointer("/base/sha")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Validation("missing base.sha".into()))?
        .to_string();
    let head_sha = pr
        .pointer("/head/sha")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Validation("missing head.sha".into()))?
        .to_string();
    let author = pr
        .pointer("/user/login")
        .and_then(Value::as_str)
        .map(str::to_string);
    let title = pr.get("title").and_then(Value::as_str).map(str::to_string);

    let meta = PrMetadata {
        repo_id,
        pr_number,
        base_sha,
        head_sha,
        author,
        title,
        platform,
        source: TaskSource::Webhook,
        callback_url: None,
    };
    meta.validate()
        .map_err(|e| Error::Validation(e.to_string()))?;
    Ok(meta)
}

/// Push events have no PR number; the convention is `pr_number = 1`, never
/// `0`.
fn parse_push(platform: Platform, v: &Value) -> MrResult<PrMetadata> {
    let repo_id = v
        .pointer("/repository/full_name")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Validation("missing repository.full_name".into()))?
        .to_string();
    let head_sha = v
        .get("after")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Validation("missing after".into()))?
        .to_string();
    let base_sha = v
        .get("before")
        .and_then(Value::as_str)
        .unwrap_or(&head_sha)
        .to_string();
    let base_sha = if base_sha.bytes().all(|b| b == b'0') {
        head_sha.clone()
    } else {
        base_sha
    };
    let author = v
        .pointer("/pusher/name")
        .and_then(Value::as_str)
        .map(str::to_string);
    let title = v
        .get("head_commit")
        .and_then(|c| c.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string);

    let meta = PrMetadata {
        repo_id,
        pr_number: PUSH_EVENT_PR_NUMBER,
        base_sha,
        head_sha,
        author,
        title,
        platform,
        source: TaskSource::Webhook,
        callback_url: None,
    };
    meta.validate()
        .map_err(|e| Error::Validation(e.to_string()))?;
    Ok(meta)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_event_normalizes_per_scenario() {
        let body = serde_json::json!({
            "repository": {"full_name": "octocat/test-repo"},
            "before": "0".repeat(40),
            "after": "b".repeat(40),
            "pusher": {"name": "octocat"},
        });
        let meta = parse_push(Platform::Gitea, &body).unwrap();
        assert_eq!(meta.repo_id, "octocat/test-repo");
        assert_eq!(meta.head_sha, "b".repeat(40));
        assert_eq!(meta.pr_number, 1);
        assert_eq!(meta.title, None);
    }
}
