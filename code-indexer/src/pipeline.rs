//! C8 indexing pipeline: clone, walk, chunk, redact, embed, store.
//!
//! Each stage reports an [`IndexProgress`]/percentage pair through the
//! caller-supplied callback so `GET /tasks/{id}` can surface live progress
//! while the job runs.

use std::path::PathBuf;

use rag_store::embed::EmbeddingsProvider;
use rag_store::knowledge::{ChunkMetadata, KnowledgeStore};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::Result;
use crate::util::{chunk::chunk_text, fs_scan::scan_source_files};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexProgress {
    Queued,
    Cloning,
    Scanning,
    Chunking,
    SecretScanning,
    GeneratingEmbeddings,
    Storing,
    Completed,
    Failed,
}

#[derive(Debug, Clone)]
pub struct IndexParams {
    pub repo_id: String,
    pub git_url: String,
    pub access_token: String,
    pub branch: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexSummary {
    pub files_scanned: usize,
    pub chunks_created: usize,
    pub chunks_stored: usize,
    pub chunks_skipped_embedding: usize,
    pub secrets_redacted: usize,
}

/// Runs the full pipeline for one repository snapshot. The clone directory
/// is scoped to this run (named after a fresh trace id, not `repo_id`) and
/// is removed on every exit path, success or failure.
pub async fn run(
    params: IndexParams,
    embedder: &dyn EmbeddingsProvider,
    store: &KnowledgeStore,
    mut on_progress: impl FnMut(IndexProgress, u8),
) -> Result<IndexSummary> {
    on_progress(IndexProgress::Queued, 0);

    let scratch_name = format!("idx-{}", services::uuid::new_trace_id());
    let repo_dir = clone_repo(&scratch_name, &params, &mut on_progress).await;

    let result = match repo_dir {
        Ok(dir) => run_inner(&params, &dir, embedder, store, &mut on_progress).await,
        Err(e) => Err(e),
    };

    cleanup(&scratch_name);

    if result.is_err() {
        on_progress(IndexProgress::Failed, 100);
    }
    result
}

async fn clone_repo(
    scratch_name: &str,
    params: &IndexParams,
    on_progress: &mut impl FnMut(IndexProgress, u8),
) -> Result<PathBuf> {
    on_progress(IndexProgress::Cloning, 2);

    let authed_url = inject_token(&params.git_url, &params.access_token);
    project_code_store::clone_list(
        vec![authed_url],
        1,
        &scratch_name.to_string(),
        params.branch.clone(),
        Some(1),
    )
    .await?;

    let base_dir = PathBuf::from(format!("code_data/{scratch_name}"));
    let repo_dir = std::fs::read_dir(&base_dir)?
        .filter_map(|e| e.ok())
        .find(|e| e.path().is_dir())
        .map(|e| e.path())
        .unwrap_or(base_dir);

    Ok(repo_dir)
}

async fn run_inner(
    params: &IndexParams,
    repo_dir: &PathBuf,
    embedder: &dyn EmbeddingsProvider,
    store: &KnowledgeStore,
    on_progress: &mut impl FnMut(IndexProgress, u8),
) -> Result<IndexSummary> {
    on_progress(IndexProgress::Scanning, 10);
    let files = {
        let repo_dir = repo_dir.clone();
        tokio::task::spawn_blocking(move || scan_source_files(&repo_dir)).await?
    };
    let files_scanned = files.len();

    on_progress(IndexProgress::Chunking, 20);
    let mut per_file_chunks: Vec<(String, Vec<String>)> = Vec::with_capacity(files.len());
    for file in &files {
        let Ok(content) = tokio::fs::read_to_string(&file.path).await else {
            continue;
        };
        let chunks = chunk_text(&content);
        if chunks.is_empty() {
            continue;
        }
        per_file_chunks.push((file.repo_relative.clone(), chunks.into_iter().map(|c| c.content).collect()));
    }
    let chunks_created: usize = per_file_chunks.iter().map(|(_, c)| c.len()).sum();

    on_progress(IndexProgress::SecretScanning, 30);
    let mut secrets_redacted = 0usize;
    let mut redacted_chunks: Vec<(String, u32, String)> = Vec::with_capacity(chunks_created);
    for (file_path, chunks) in per_file_chunks {
        for (idx, content) in chunks.into_iter().enumerate() {
            let (redacted, matches) = secret_redactor::redact(&content);
            secrets_redacted += matches.len();
            redacted_chunks.push((file_path.clone(), idx as u32, redacted));
        }
    }

    on_progress(IndexProgress::GeneratingEmbeddings, 40);
    let mut embedded: Vec<(String, u32, String, Vec<f32>)> = Vec::with_capacity(redacted_chunks.len());
    let mut chunks_skipped_embedding = 0usize;
    let total = redacted_chunks.len().max(1);
    for (i, (file_path, idx, content)) in redacted_chunks.into_iter().enumerate() {
        match embedder.embed(&content).await {
            Ok(vector) => embedded.push((file_path, idx, content, vector)),
            Err(e) => {
                warn!(file = file_path, error = %e, "embedding failed, skipping chunk");
                chunks_skipped_embedding += 1;
            }
        }
        let pct = 40 + (i * 50 / total) as u8;
        on_progress(IndexProgress::GeneratingEmbeddings, pct.min(90));
    }

    on_progress(IndexProgress::Storing, 90);
    let mut superseded = std::collections::HashSet::new();
    let mut chunks_stored = 0usize;
    for (file_path, idx, content, vector) in embedded {
        if superseded.insert(file_path.clone()) {
            let _ = store.delete_file(&params.repo_id, &file_path).await;
        }
        let file_size = content.len() as u64;
        store
            .insert(
                &params.repo_id,
                &content,
                ChunkMetadata {
                    file_path,
                    branch: params.branch.clone().unwrap_or_default(),
                    chunk_index: idx,
                    file_size,
                    pr_number: None,
                    line_number: None,
                },
                vector,
            )
            .await?;
        chunks_stored += 1;
    }

    on_progress(IndexProgress::Completed, 100);
    info!(
        repo_id = %params.repo_id,
        files_scanned,
        chunks_created,
        chunks_stored,
        secrets_redacted,
        "repository indexed"
    );

    Ok(IndexSummary {
        files_scanned,
        chunks_created,
        chunks_stored,
        chunks_skipped_embedding,
        secrets_redacted,
    })
}

fn cleanup(scratch_name: &str) {
    let base_dir = PathBuf::from(format!("code_data/{scratch_name}"));
    let _ = std::fs::remove_dir_all(&base_dir);
}

fn inject_token(git_url: &str, token: &str) -> String {
    if token.trim().is_empty() {
        return git_url.to_string();
    }
    match git_url.find("://") {
        Some(idx) => {
            let (scheme, rest) = git_url.split_at(idx + 3);
            format!("{scheme}{token}@{rest}")
        }
        None => git_url.to_string(),
    }
}
