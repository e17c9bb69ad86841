//! C3 Knowledge Store contract: repo-scoped chunk insert/search/retention,
//! layered over [`crate::qdrant_facade::QdrantFacade`].
//!
//! Every operation here is filtered by `repo_id` (the repo-isolation
//! invariant): no query ever crosses a `repo_id` boundary.

use crate::config::{RagConfig, VectorSpace};
use crate::errors::RagError;
use crate::filters::to_qdrant_filter;
use crate::qdrant_facade::QdrantFacade;
use crate::record::RagFilter;

use qdrant_client::qdrant::{
    PointId, PointStruct, Value as QValue, Vector, Vectors, point_id, value, vectors,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

/// Metadata attached to a stored chunk, per the `KnowledgeChunk` entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub file_path: String,
    pub branch: String,
    pub chunk_index: u32,
    pub file_size: u64,
    pub pr_number: Option<u64>,
    pub line_number: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeChunk {
    pub id: String,
    pub repo_id: String,
    pub content: String,
    pub metadata: ChunkMetadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct KnowledgeHit {
    pub chunk: KnowledgeChunk,
    pub score: f32,
}

/// Thin wrapper pairing a `QdrantFacade` with the "knowledge_base" collection
/// semantics: insert, threshold/top-k search, and retention sweeps.
pub struct KnowledgeStore {
    client: QdrantFacade,
    embedding_dim: usize,
}

impl KnowledgeStore {
    pub fn new(cfg: &RagConfig, client: QdrantFacade) -> Self {
        Self {
            client,
            embedding_dim: cfg.embedding_dim.unwrap_or(1536),
        }
    }

    pub async fn ensure_ready(&self, distance: crate::config::DistanceKind) -> Result<(), RagError> {
        self.client
            .ensure_collection(&VectorSpace {
                size: self.embedding_dim,
                distance,
            })
            .await
    }

    /// `insert(repo_id, content, metadata, embedding)` — append-only.
    pub async fn insert(
        &self,
        repo_id: &str,
        content: &str,
        metadata: ChunkMetadata,
        embedding: Vec<f32>,
    ) -> Result<String, RagError> {
        if embedding.len() != self.embedding_dim {
            return Err(RagError::VectorSizeMismatch {
                got: embedding.len(),
                want: self.embedding_dim,
            });
        }

        let id = services::uuid::stable_uuid(&format!(
            "{repo_id}:{}:{}",
            metadata.file_path, metadata.chunk_index
        ))
        .to_string();

        let mut payload: HashMap<String, QValue> = HashMap::new();
        payload.insert("repo_id".into(), str_value(repo_id));
        payload.insert("content".into(), str_value(content));
        payload.insert("file_path".into(), str_value(&metadata.file_path));
        payload.insert("branch".into(), str_value(&metadata.branch));
        payload.insert(
            "chunk_index".into(),
            int_value(metadata.chunk_index as i64),
        );
        payload.insert("file_size".into(), int_value(metadata.file_size as i64));
        if let Some(pr) = metadata.pr_number {
            payload.insert("pr_number".into(), int_value(pr as i64));
        }
        if let Some(ln) = metadata.line_number {
            payload.insert("line_number".into(), int_value(ln as i64));
        }

        let point = PointStruct {
            id: Some(PointId {
                point_id_options: Some(point_id::PointIdOptions::Uuid(id.clone())),
            }),
            vectors: Some(Vectors {
                vectors_options: Some(vectors::VectorsOptions::Vector(Vector {
                    data: embedding,
                    ..Default::default()
                })),
            }),
            payload,
        };

        self.client.upsert_points(vec![point]).await?;
        debug!(repo_id, chunk_id = %id, "knowledge chunk stored");
        Ok(id)
    }

    /// Deletes every chunk previously stored for `(repo_id, file_path)`, used
    /// by the indexer to supersede stale chunks on re-index (Open Question
    /// supersede, not retain).
    pub async fn delete_file(&self, repo_id: &str, file_path: &str) -> Result<u64, RagError> {
        let filter = to_qdrant_filter(&RagFilter::And(vec![
            RagFilter::ByFieldEq {
                key: "repo_id".into(),
                value: serde_json::Value::String(repo_id.to_string()),
            },
            RagFilter::ByFieldEq {
                key: "file_path".into(),
                value: serde_json::Value::String(file_path.to_string()),
            },
        ]));
        self.client.delete_by_filter(filter).await
    }

    /// `search(repo_id, query_embedding, threshold, k)`: top-k chunks
    /// with cosine similarity >= threshold, ordered descending, never
    /// crossing `repo_id`.
    pub async fn search(
        &self,
        repo_id: &str,
        query_embedding: Vec<f32>,
        threshold: f32,
        k: u64,
    ) -> Result<Vec<KnowledgeHit>, RagError> {
        let filter = to_qdrant_filter(&RagFilter::ByFieldEq {
            key: "repo_id".into(),
            value: serde_json::Value::String(repo_id.to_string()),
        });

        let raw = self
            .client
            .search(query_embedding, k, Some(filter), true, false)
            .await?;

        let hits: Vec<KnowledgeHit> = raw
            .into_iter()
            .filter(|(score, _)| *score >= threshold)
            .filter_map(|(score, payload)| chunk_from_payload(repo_id, payload).map(|c| KnowledgeHit { chunk: c, score }))
            .collect();

        info!(repo_id, hits = hits.len(), "knowledge search");
        Ok(hits)
    }

    /// `delete_expired(before_ts)` — bulk delete older than cutoff.
    /// Expects callers to have tagged chunks with an `indexed_at_unix` field
    /// if age-based retention is required; this crate enforces no implicit
    /// clock access (per SPEC_FULL.md ambient-stack rule against hidden
    /// globals), so the cutoff must be supplied by the caller.
    pub async fn delete_expired(&self, before_unix: i64) -> Result<u64, RagError> {
        let filter = to_qdrant_filter(&RagFilter::ByFieldEq {
            key: "indexed_before".into(),
            value: serde_json::Value::Number(before_unix.into()),
        });
        self.client.delete_by_filter(filter).await
    }

    /// `delete_all(repo_id)` — right-to-forget.
    pub async fn delete_all(&self, repo_id: &str) -> Result<u64, RagError> {
        let filter = to_qdrant_filter(&RagFilter::ByFieldEq {
            key: "repo_id".into(),
            value: serde_json::Value::String(repo_id.to_string()),
        });
        self.client.delete_by_filter(filter).await
    }
}

fn str_value(s: &str) -> QValue {
    QValue {
        kind: Some(value::Kind::StringValue(s.to_string())),
    }
}

fn int_value(i: i64) -> QValue {
    QValue {
        kind: Some(value::Kind::IntegerValue(i)),
    }
}

fn chunk_from_payload(repo_id: &str, payload: serde_json::Value) -> Option<KnowledgeChunk> {
    let obj = payload.as_object()?;
    let content = obj.get("content")?.as_str()?.to_string();
    let file_path = obj.get("file_path")?.as_str()?.to_string();
    let branch = obj
        .get("branch")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    let chunk_index = obj.get("chunk_index").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
    let file_size = obj.get("file_size").and_then(|v| v.as_u64()).unwrap_or(0);
    let pr_number = obj.get("pr_number").and_then(|v| v.as_u64());
    let line_number = obj.get("line_number").and_then(|v| v.as_u64()).map(|v| v as u32);

    Some(KnowledgeChunk {
        id: String::new(),
        repo_id: repo_id.to_string(),
        content,
        metadata: ChunkMetadata {
            file_path,
            branch,
            chunk_index,
            file_size,
            pr_number,
            line_number,
        },
    })
}
