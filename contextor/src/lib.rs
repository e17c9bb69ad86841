//! Repo-scoped RAG retrieval facade used by the review pipeline's related-
//! context step (spec §4.3.2.b): embed a query, search the knowledge store
//! within one `repo_id`, and format the hits as citations the reviewer can
//! attach to a comment (`See <file>:<line>` / `See PR #<n>`).

pub mod error;

use std::sync::Arc;

use ai_llm_service::service_profiles::LlmServiceProfiles;
use rag_store::{KnowledgeHit, RagConfig, knowledge::KnowledgeStore, qdrant_facade::QdrantFacade};

pub use error::{ContextorError, Result};

/// Related context for one file: the text handed to the prompt, plus the
/// formatted citation strings the caller can attach to a comment.
#[derive(Debug, Clone, Default)]
pub struct RelatedContext {
    pub text: String,
    pub citations: Vec<String>,
}

/// Retrieval knobs. Callers build this from `ReviewConfig` so the k/
/// threshold follow the per-task config rather than a process-wide default.
#[derive(Debug, Clone, Copy)]
pub struct RetrieveOptions {
    pub top_k: u64,
    pub min_score: f32,
}

/// Fetches related context for `query_text` within `repo_id`. Returns an
/// empty `RelatedContext` (not an error) when the store has nothing above
/// `opts.min_score` — an empty related-context section is a normal outcome,
/// not a failure.
pub async fn fetch_related_context(
    svc: &Arc<LlmServiceProfiles>,
    rag_cfg: &RagConfig,
    repo_id: &str,
    query_text: &str,
    opts: RetrieveOptions,
) -> Result<RelatedContext> {
    let embedding = svc.embed(query_text).await?;

    let client = QdrantFacade::new(rag_cfg)?;
    let store = KnowledgeStore::new(rag_cfg, client);
    let hits = store
        .search(repo_id, embedding, opts.min_score, opts.top_k)
        .await?;

    let citations = hits
        .iter()
        .map(format_citation)
        .collect::<std::collections::BTreeSet<_>>()
        .into_iter()
        .collect();

    let text = hits
        .into_iter()
        .map(|h| h.chunk.content)
        .collect::<Vec<_>>()
        .join("\n---\n");

    Ok(RelatedContext { text, citations })
}

/// `See <file>:<line>` for a chunk with a known line, `See <file>` otherwise,
/// or `See PR #<n>` when the chunk came from a prior review's comment.
fn format_citation(hit: &KnowledgeHit) -> String {
    if let Some(pr) = hit.chunk.metadata.pr_number {
        return format!("See PR #{pr}");
    }
    match hit.chunk.metadata.line_number {
        Some(line) => format!("See {}:{line}", hit.chunk.metadata.file_path),
        None => format!("See {}", hit.chunk.metadata.file_path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rag_store::{ChunkMetadata, KnowledgeChunk};

    fn hit(pr_number: Option<u64>, line_number: Option<u32>) -> KnowledgeHit {
        KnowledgeHit {
            chunk: KnowledgeChunk {
                id: "id".into(),
                repo_id: "o/r".into(),
                content: "fn foo() {}".into(),
                metadata: ChunkMetadata {
                    file_path: "src/lib.rs".into(),
                    branch: "main".into(),
                    chunk_index: 0,
                    file_size: 11,
                    pr_number,
                    line_number,
                },
            },
            score: 0.9,
        }
    }

    #[test]
    fn citation_prefers_pr_number() {
        assert_eq!(format_citation(&hit(Some(42), Some(10))), "See PR #42");
    }

    #[test]
    fn citation_falls_back_to_file_and_line() {
        assert_eq!(format_citation(&hit(None, Some(10))), "See src/lib.rs:10");
    }

    #[test]
    fn citation_falls_back_to_file_only() {
        assert_eq!(format_citation(&hit(None, None)), "See src/lib.rs");
    }
}
