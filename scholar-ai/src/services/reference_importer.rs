//! Reference question import
//!
//! An administrator uploads an official paper (photos or PDFs); every question
//! in it becomes an `is_reference` row that later anchors difficulty
//! calibration. All files go to the model in a single request because a
//! paper's questions span pages.

use super::embedding_client::EmbeddingClient;
use super::model_cascade::ModelCascade;
use super::prompts::reference_extraction_prompt;
use super::response_normalizer::normalize_items;
use crate::db::questions::insert_question;
use crate::error::{IngestError, IngestResult};
use crate::models::{AnalyzedQuestion, ImageUpload, NewQuestion, Subject};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceImportOutcome {
    pub inserted: usize,
    pub skipped: usize,
    pub model: String,
}

pub struct ReferenceImporter {
    db: SqlitePool,
    cascade: Arc<ModelCascade>,
    embedder: EmbeddingClient,
}

impl ReferenceImporter {
    pub fn new(db: SqlitePool, cascade: Arc<ModelCascade>, embedder: EmbeddingClient) -> Self {
        Self { db, cascade, embedder }
    }

    /// Extract and store every question in `files`
    ///
    /// `description` names the source paper (e.g. "2024 provincial exam") and
    /// is kept in each row's metadata as `official_source`.
    pub async fn import(
        &self,
        owner: Uuid,
        subject: Subject,
        description: &str,
        files: &[ImageUpload],
    ) -> IngestResult<ReferenceImportOutcome> {
        if files.is_empty() {
            return Err(IngestError::InvalidBatch("no files supplied".into()));
        }
        if let Some(bad) = files.iter().find(|f| !(f.is_image() || f.is_pdf())) {
            return Err(IngestError::InvalidBatch(format!(
                "{} is {}, expected an image or PDF",
                bad.file_name, bad.mime_type
            )));
        }

        tracing::info!(subject = %subject, files = files.len(), source = description, "Importing reference paper");

        let outcome = self
            .cascade
            .generate_vision(files, &reference_extraction_prompt(subject), None)
            .await?;
        let items = normalize_items(&outcome.text)?;

        let mut result = ReferenceImportOutcome {
            model: outcome.model.clone(),
            ..Default::default()
        };
        for (index, raw) in items.into_iter().enumerate() {
            let Some(item) = AnalyzedQuestion::from_value(raw) else {
                result.skipped += 1;
                continue;
            };
            match self.store(owner, subject, description, &outcome.model, item).await {
                Ok(_) => result.inserted += 1,
                Err(e) => {
                    tracing::warn!(item_index = index, error = %e, "Skipping reference question");
                    result.skipped += 1;
                }
            }
        }

        if result.inserted == 0 {
            return Err(IngestError::NoQuestionsRecognized);
        }
        tracing::info!(inserted = result.inserted, skipped = result.skipped, "Reference import complete");
        Ok(result)
    }

    async fn store(
        &self,
        owner: Uuid,
        subject: Subject,
        description: &str,
        model: &str,
        item: AnalyzedQuestion,
    ) -> IngestResult<Uuid> {
        let embedding = self.embedder.embed(&item.content).await?;
        let question = NewQuestion {
            user_id: owner,
            subject,
            content: item.content,
            images: vec![],
            knowledge_points: item.knowledge_points,
            error_type: None,
            error_analysis: None,
            solution: item.solution,
            difficulty: item.difficulty,
            embedding,
            is_reference: true,
            meta_data: json!({ "official_source": description, "model": model }),
            occurred_at: None,
        };
        Ok(insert_question(&self.db, &question).await?)
    }
}
