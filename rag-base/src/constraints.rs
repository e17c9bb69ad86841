//! C4 Constraint Store: per-repo suppression patterns with embedding,
//! confidence score, and expiry. Grounded on
//! `examples/original_source/repositories/constraints.py`
//! (`ConstraintRepository.create_constraint`/`check_suppressions`).

use crate::config::ConstraintConfig;
use crate::errors::Result;
use chrono::{DateTime, Duration, Utc};
use qdrant_client::qdrant::{PointId, PointStruct, Value as QValue, Vector, Vectors, point_id, value, vectors};
use rag_store::filters::to_qdrant_filter;
use rag_store::qdrant_facade::QdrantFacade;
use rag_store::{RagFilter, VectorSpace};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnedConstraint {
    pub id: String,
    pub repo_id: String,
    pub violation_reason: String,
    pub code_pattern: String,
    pub user_reason: String,
    pub confidence_score: f32,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub version: u32,
}

/// Bucket used for suppression metrics only; all above-threshold constraints
/// suppress equally regardless of bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    pub fn of(score: f32) -> Self {
        if score < 0.6 {
            ConfidenceLevel::Low
        } else if score < 0.8 {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::High
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConfidenceLevel::Low => "low",
            ConfidenceLevel::Medium => "medium",
            ConfidenceLevel::High => "high",
        }
    }
}

pub struct ConstraintStore {
    cfg: ConstraintConfig,
    client: QdrantFacade,
}

impl ConstraintStore {
    pub fn new(cfg: ConstraintConfig) -> Result<Self> {
        let client = QdrantFacade::new(&cfg.rag)?;
        Ok(Self { cfg, client })
    }

    pub async fn ensure_ready(&self) -> Result<()> {
        self.client
            .ensure_collection(&VectorSpace {
                size: self.cfg.rag.embedding_dim.unwrap_or(1536),
                distance: self.cfg.rag.distance,
            })
            .await?;
        Ok(())
    }

    /// Finds the single best matching constraint for `(repo_id, embedding)`
    /// at or above `threshold`, if any.
    async fn find_best(
        &self,
        repo_id: &str,
        embedding: Vec<f32>,
        threshold: f32,
    ) -> Result<Option<(f32, LearnedConstraint)>> {
        let filter = to_qdrant_filter(&RagFilter::ByFieldEq {
            key: "repo_id".into(),
            value: serde_json::Value::String(repo_id.to_string()),
        });
        let raw = self
            .client
            .search(embedding, 1, Some(filter), true, false)
            .await?;

        Ok(raw
            .into_iter()
            .find(|(score, _)| *score >= threshold)
            .and_then(|(score, payload)| constraint_from_payload(payload).map(|c| (score, c))))
    }

    /// Feedback-time path: reinforce an existing similar
    /// constraint, or create a new one at confidence 0.5.
    pub async fn reinforce_or_create(
        &self,
        repo_id: &str,
        violation_reason: &str,
        code_pattern: &str,
        user_reason: &str,
        embedding: Vec<f32>,
    ) -> Result<LearnedConstraint> {
        if let Some((_, existing)) = self
            .find_best(repo_id, embedding.clone(), self.cfg.feedback_threshold)
            .await?
        {
            let mut updated = existing.clone();
            updated.confidence_score = (existing.confidence_score + 0.1).min(1.0);
            updated.version += 1;
            self.upsert(&updated, embedding).await?;
            debug!(constraint_id = %updated.id, confidence = updated.confidence_score, "reinforced constraint");
            return Ok(updated);
        }

        let now = Utc::now();
        let constraint = LearnedConstraint {
            id: services::uuid::new_trace_id().to_string(),
            repo_id: repo_id.to_string(),
            violation_reason: violation_reason.to_string(),
            code_pattern: code_pattern.to_string(),
            user_reason: user_reason.to_string(),
            confidence_score: 0.5,
            expires_at: now + Duration::days(self.cfg.expiry_days),
            created_at: now,
            version: 1,
        };
        self.upsert(&constraint, embedding).await?;
        metrics::gauge!("reviewbot_constraint_count", "repo_id" => repo_id.to_string()).increment(1.0);
        info!(repo_id, constraint_id = %constraint.id, "created learned constraint");
        Ok(constraint)
    }

    /// Review-time path: constraints at
    /// or above `suppression_threshold`, excluding expired ones.
    pub async fn check_suppressions(
        &self,
        repo_id: &str,
        embedding: Vec<f32>,
    ) -> Result<Vec<LearnedConstraint>> {
        let filter = to_qdrant_filter(&RagFilter::ByFieldEq {
            key: "repo_id".into(),
            value: serde_json::Value::String(repo_id.to_string()),
        });
        let raw = self
            .client
            .search(embedding, 10, Some(filter), true, false)
            .await?;

        let now = Utc::now();
        let mut out = Vec::new();
        for (score, payload) in raw {
            if score < self.cfg.suppression_threshold {
                continue;
            }
            if let Some(c) = constraint_from_payload(payload) {
                if c.expires_at < now {
                    continue; // never return expired constraints
                }
                metrics::counter!(
                    "reviewbot_constraint_suppressions_total",
                    "repo_id" => repo_id.to_string(),
                    "confidence_level" => ConfidenceLevel::of(c.confidence_score).as_str()
                )
                .increment(1);
                out.push(c);
            }
        }
        Ok(out)
    }

    async fn upsert(&self, c: &LearnedConstraint, embedding: Vec<f32>) -> Result<()> {
        let point = PointStruct {
            id: Some(PointId {
                point_id_options: Some(point_id::PointIdOptions::Uuid(c.id.clone())),
            }),
            vectors: Some(Vectors {
                vectors_options: Some(vectors::VectorsOptions::Vector(Vector {
                    data: embedding,
                    ..Default::default()
                })),
            }),
            payload: to_payload(c),
        };
        self.client.upsert_points(vec![point]).await?;
        Ok(())
    }

    pub async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let filter = to_qdrant_filter(&RagFilter::ByFieldEq {
            key: "expires_before".into(),
            value: serde_json::Value::Number(now.timestamp().into()),
        });
        Ok(self.client.delete_by_filter(filter).await?)
    }
}

fn to_payload(c: &LearnedConstraint) -> HashMap<String, QValue> {
    let mut p = HashMap::new();
    // The point id is also duplicated into the payload: the facade's search
    // returns payload JSON only, not the Qdrant point id, so reinforcement
    // (which must overwrite the same point) needs it round-tripped here.
    p.insert("id".into(), sv(&c.id));
    p.insert("repo_id".into(), sv(&c.repo_id));
    p.insert("violation_reason".into(), sv(&c.violation_reason));
    p.insert("code_pattern".into(), sv(&c.code_pattern));
    p.insert("user_reason".into(), sv(&c.user_reason));
    p.insert(
        "confidence_score".into(),
        QValue {
            kind: Some(value::Kind::DoubleValue(c.confidence_score as f64)),
        },
    );
    p.insert(
        "expires_at_unix".into(),
        QValue {
            kind: Some(value::Kind::IntegerValue(c.expires_at.timestamp())),
        },
    );
    p.insert(
        "created_at_unix".into(),
        QValue {
            kind: Some(value::Kind::IntegerValue(c.created_at.timestamp())),
        },
    );
    p.insert(
        "version".into(),
        QValue {
            kind: Some(value::Kind::IntegerValue(c.version as i64)),
        },
    );
    p
}

fn sv(s: &str) -> QValue {
    QValue {
        kind: Some(value::Kind::StringValue(s.to_string())),
    }
}

fn constraint_from_payload(payload: serde_json::Value) -> Option<LearnedConstraint> {
    let obj = payload.as_object()?;
    let expires_at = DateTime::from_timestamp(obj.get("expires_at_unix")?.as_i64()?, 0)?;
    let created_at = DateTime::from_timestamp(obj.get("created_at_unix")?.as_i64()?, 0)?;
    Some(LearnedConstraint {
        id: obj.get("id").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
        repo_id: obj.get("repo_id")?.as_str()?.to_string(),
        violation_reason: obj.get("violation_reason")?.as_str()?.to_string(),
        code_pattern: obj.get("code_pattern")?.as_str()?.to_string(),
        user_reason: obj.get("user_reason")?.as_str()?.to_string(),
        confidence_score: obj.get("confidence_score")?.as_f64()? as f32,
        expires_at,
        created_at,
        version: obj.get("version").and_then(|v| v.as_u64()).unwrap_or(1) as u32,
    })
}
