//! Deduplication gate
//!
//! Decides whether a newly extracted question is one the owner has already
//! recorded. Two questions are the same when the cosine similarity of their
//! embeddings is at or above the threshold (0.95 by default, near-paraphrase).
//! Exam questions share a lot of boilerplate wording, so anything looser
//! collapses distinct questions.
//!
//! A failed similarity query fails open: the item is treated as new.

use super::embedding_client::EmbeddingClient;
use crate::db::questions::nearest_questions;
use crate::error::{IngestError, IngestResult};
use sqlx::SqlitePool;
use uuid::Uuid;

/// Gate verdict; both arms hand back the computed embedding for reuse
#[derive(Debug, Clone, PartialEq)]
pub enum DedupDecision {
    Duplicate {
        question_id: Uuid,
        similarity: f32,
        embedding: Vec<f32>,
    },
    New {
        embedding: Vec<f32>,
    },
}

impl DedupDecision {
    pub fn embedding(&self) -> &[f32] {
        match self {
            DedupDecision::Duplicate { embedding, .. } | DedupDecision::New { embedding } => embedding,
        }
    }
}

pub struct DedupGate {
    db: SqlitePool,
    embedder: EmbeddingClient,
    threshold: f32,
}

impl DedupGate {
    pub fn new(db: SqlitePool, embedder: EmbeddingClient, threshold: f32) -> Self {
        Self { db, embedder, threshold }
    }

    /// Check `content` against the owner's existing questions
    ///
    /// # Errors
    /// `EmbeddingUnavailable` when no vector could be computed; the caller
    /// must skip the item.
    pub async fn check(&self, owner: Uuid, content: &str) -> IngestResult<DedupDecision> {
        let embedding = self.embedder.embed(content).await?;

        let nearest = match nearest_questions(&self.db, owner, &embedding, self.threshold, 1).await {
            Ok(nearest) => nearest,
            Err(e) => {
                let err = IngestError::DuplicateCheckFailed(e.to_string());
                tracing::warn!(owner = %owner, error = %err, "Treating item as new");
                return Ok(DedupDecision::New { embedding });
            }
        };

        match nearest.into_iter().next() {
            Some((question_id, similarity)) if similarity >= self.threshold => {
                tracing::info!(owner = %owner, question_id = %question_id, similarity, "Duplicate question found");
                Ok(DedupDecision::Duplicate {
                    question_id,
                    similarity,
                    embedding,
                })
            }
            _ => Ok(DedupDecision::New { embedding }),
        }
    }
}
