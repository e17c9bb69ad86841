//! `GET /mcp/manifest` — static tool manifest for MCP clients (§6).

use axum::Json;
use serde_json::{Value, json};

pub async fn handle() -> Json<Value> {
    Json(json!({
        "name": "code-review-bot",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Asynchronous, RAG- and RLHF-assisted code review automation.",
        "tools": [
            {
                "name": "analyze_diff",
                "description": "Runs the review pipeline over a pull request's diff.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "repo_id": {"type": "string"},
                        "pr_number": {"type": "integer"},
                        "base_sha": {"type": "string"},
                        "head_sha": {"type": "string"},
                        "platform": {"type": "string", "enum": ["github", "gitea"]}
                    },
                    "required": ["repo_id", "pr_number", "base_sha", "head_sha", "platform"]
                }
            },
            {
                "name": "index_repository",
                "description": "Clones and indexes a repository into the knowledge store.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "repo_id": {"type": "string"},
                        "git_url": {"type": "string"},
                        "access_token": {"type": "string"},
                        "branch": {"type": "string"},
                        "index_depth": {"type": "integer"}
                    },
                    "required": ["repo_id", "git_url", "access_token"]
                }
            },
            {
                "name": "submit_feedback",
                "description": "Records a developer's accept/reject/modify decision on a review comment.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "review_id": {"type": "string"},
                        "comment_id": {"type": "string"},
                        "user_id": {"type": "string"},
                        "action": {"type": "string", "enum": ["accepted", "rejected", "modified"]},
                        "reason": {"type": "string"},
                        "developer_comment": {"type": "string"},
                        "final_code_snapshot": {"type": "string"}
                    },
                    "required": ["review_id", "comment_id", "user_id", "action", "developer_comment"]
                }
            },
            {
                "name": "get_task_status",
                "description": "Looks up the status/result of a previously dispatched task.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "task_id": {"type": "string"}
                    },
                    "required": ["task_id"]
                }
            }
        ]
    }))
}
