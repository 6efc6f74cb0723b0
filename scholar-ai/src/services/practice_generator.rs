//! Practice variant generation

use super::model_cascade::ModelCascade;
use super::prompts::variant_prompt;
use super::response_normalizer::{normalize_object, snippet};
use crate::db::{practice, questions};
use crate::error::{IngestError, IngestResult};
use crate::models::{PracticeRecord, VariantResult};
use serde_json::Value;
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;

pub struct PracticeGenerator {
    db: SqlitePool,
    cascade: Arc<ModelCascade>,
}

impl PracticeGenerator {
    pub fn new(db: SqlitePool, cascade: Arc<ModelCascade>) -> Self {
        Self { db, cascade }
    }

    /// Generate and store a variant of one of the owner's questions
    pub async fn generate(&self, owner: Uuid, question_id: Uuid) -> IngestResult<PracticeRecord> {
        let question = questions::get_owned_question(&self.db, owner, question_id).await?;
        let prompt = variant_prompt(&question.content, &question.knowledge_points);

        let outcome = self.cascade.generate_text(&prompt, None, true).await?;
        let object = normalize_object(&outcome.text)?;
        let variant: VariantResult = serde_json::from_value(Value::Object(object)).map_err(|_| {
            IngestError::MalformedAiResponse {
                snippet: snippet(&outcome.text),
            }
        })?;
        if variant.variant_content.trim().is_empty() {
            return Err(IngestError::MalformedAiResponse {
                snippet: snippet(&outcome.text),
            });
        }

        let record = practice::insert(&self.db, owner, question_id, &variant).await?;
        tracing::info!(owner = %owner, question_id = %question_id, model = %outcome.model, "Practice variant generated");
        Ok(record)
    }
}
