//! Context assembly: per-file diff rendering plus optional RAG-retrieved
//! related snippets from the rest of the indexed repository.
//!
//! Primary context is built straight from the diff hunks already in hand —
//! no re-fetch of the head commit is needed. Related context is delegated to
//! `contextor`, which scopes the lookup to one `repo_id` and formats hits as
//! citations.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, OnceLock};

use ai_llm_service::service_profiles::LlmServiceProfiles;
use contextor::RetrieveOptions;
use rag_store::RagConfig;
use services::domain::ReviewConfig;
use tracing::debug;

use crate::errors::MrResult;
use crate::git_providers::types::{DiffLine, FileChange};

/// 1-based, inclusive line range in the *new* file. Used both to advertise
/// where the model is allowed to anchor a comment, and to validate that its
/// answer actually lands on a line the diff touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchorRange {
    pub start: usize,
    pub end: usize,
}

/// Everything the prompt builder needs for one changed file.
pub struct PrimaryContext {
    pub path: String,
    pub diff_text: String,
    pub allowed: Vec<AnchorRange>,
}

/// Render a file's hunks into a line-numbered diff block, and collect the
/// contiguous added-line runs as the allowed anchor windows.
pub fn build_primary_context(file: &FileChange) -> PrimaryContext {
    let path = file
        .new_path
        .clone()
        .or_else(|| file.old_path.clone())
        .unwrap_or_default();

    let mut diff_text = String::new();
    let mut allowed = Vec::new();

    for hunk in &file.hunks {
        diff_text.push_str(&format!(
            "@@ -{},{} +{},{} @@\n",
            hunk.old_start, hunk.old_lines, hunk.new_start, hunk.new_lines
        ));

        let mut run: Option<AnchorRange> = None;
        for line in &hunk.lines {
            match line {
                DiffLine::Added { new_line, content } => {
                    diff_text.push_str(&format!("{:>6} + {}\n", new_line, content));
                    run = Some(match run {
                        Some(r) => AnchorRange {
                            start: r.start,
                            end: *new_line as usize,
                        },
                        None => AnchorRange {
                            start: *new_line as usize,
                            end: *new_line as usize,
                        },
                    });
                }
                DiffLine::Context {
                    new_line, content, ..
                } => {
                    diff_text.push_str(&format!("{:>6}   {}\n", new_line, content));
                    if let Some(r) = run.take() {
                        allowed.push(r);
                    }
                }
                DiffLine::Removed { old_line, content } => {
                    diff_text.push_str(&format!("{:>6} - {}\n", old_line, content));
                }
            }
        }
        if let Some(r) = run.take() {
            allowed.push(r);
        }
    }

    PrimaryContext {
        path,
        diff_text,
        allowed,
    }
}

/// Knobs controlling related-context retrieval volume, derived from the
/// per-request `ReviewConfig` rather than process-wide env vars so every
/// task in flight can ask for a different k/threshold.
struct RagKnobs {
    disabled: bool,
    opts: RetrieveOptions,
}

impl RagKnobs {
    fn from_config(cfg: &ReviewConfig) -> Self {
        let top_k = cfg.clamped_max_context_matches() as u64;
        Self {
            disabled: std::env::var("RAG_DISABLE").unwrap_or_else(|_| "false".into()) == "true",
            opts: RetrieveOptions {
                top_k,
                min_score: cfg.rag_min_score,
            },
        }
    }
}

static RELATED_MEMO_CELL: OnceLock<Mutex<MemoStore>> = OnceLock::new();

fn related_memo() -> &'static Mutex<MemoStore> {
    RELATED_MEMO_CELL.get_or_init(|| Mutex::new(MemoStore::new()))
}

#[derive(Default)]
struct MemoStore {
    map: HashMap<String, RelatedContext>,
    order: VecDeque<String>,
    cap: usize,
}

impl MemoStore {
    fn new() -> Self {
        let cap = std::env::var("RAG_MEMO_CAP")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(64);
        Self {
            map: HashMap::new(),
            order: VecDeque::new(),
            cap,
        }
    }
    fn get(&self, k: &str) -> Option<RelatedContext> {
        self.map.get(k).cloned()
    }
    fn put(&mut self, k: String, v: RelatedContext) {
        if self.map.contains_key(&k) {
            self.map.insert(k, v);
            return;
        }
        if self.order.len() >= self.cap {
            if let Some(old) = self.order.pop_front() {
                self.map.remove(&old);
            }
        }
        self.order.push_back(k.clone());
        self.map.insert(k, v);
    }
}

/// Related context for a changed file: the text handed to the prompt, plus
/// the distinct source paths it came from (used as comment citations).
#[derive(Debug, Clone, Default)]
pub struct RelatedContext {
    pub text: String,
    pub sources: Vec<String>,
}

/// Fetch related context for a changed file via `contextor`, scoped to
/// `repo_id` and memoized per `(repo_id, path)` for the lifetime of the
/// process (a file's neighbors rarely change mid-run).
pub async fn fetch_related_context(
    svc: &Arc<LlmServiceProfiles>,
    rag_cfg: &RagConfig,
    cfg: &ReviewConfig,
    repo_id: &str,
    path: &str,
    query_hint: &str,
) -> MrResult<RelatedContext> {
    let knobs = RagKnobs::from_config(cfg);
    if knobs.disabled {
        debug!("context: RAG disabled via env");
        return Ok(RelatedContext::default());
    }

    let memo_key = format!("{repo_id}#{path}#{}", knobs.opts.top_k);
    if let Some(hit) = related_memo().lock().unwrap().get(&memo_key) {
        debug!("context: related memo hit path={}", path);
        return Ok(hit);
    }

    let mut query = query_hint.to_string();
    if query.len() < 32 {
        query.push_str(" code review context");
    }

    let related = contextor::fetch_related_context(svc, rag_cfg, repo_id, &query, knobs.opts)
        .await
        .map(|rc| RelatedContext {
            text: rc.text,
            sources: rc.citations,
        })
        .map_err(|e| crate::errors::Error::Other(format!("contextor retrieve: {e}")))?;

    related_memo().lock().unwrap().put(memo_key, related.clone());
    Ok(related)
}
