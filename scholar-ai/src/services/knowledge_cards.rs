//! Knowledge point cards
//!
//! Read-through cache over `knowledge_base`. A generation failure yields a
//! placeholder card that is never cached, so the next request tries again.

use super::model_cascade::ModelCascade;
use super::prompts::knowledge_card_prompt;
use super::response_normalizer::normalize_object;
use crate::db::knowledge;
use crate::error::IngestResult;
use crate::models::KnowledgeCard;
use scholar_common::Error;
use serde_json::Value;
use sqlx::SqlitePool;
use std::sync::Arc;

const DEFAULT_TIPS: &[&str] = &["Core concept", "Typical exam scenarios", "Key solving techniques"];

pub struct KnowledgeCards {
    db: SqlitePool,
    cascade: Arc<ModelCascade>,
}

impl KnowledgeCards {
    pub fn new(db: SqlitePool, cascade: Arc<ModelCascade>) -> Self {
        Self { db, cascade }
    }

    pub async fn card(&self, name: &str) -> IngestResult<KnowledgeCard> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("knowledge point name is empty".into()).into());
        }

        match knowledge::get_card(&self.db, name).await {
            Ok(Some(card)) => {
                tracing::debug!(name, "Knowledge card cache hit");
                return Ok(card);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(name, error = %e, "Knowledge cache read failed"),
        }

        let Some(card) = self.generate(name).await else {
            return Ok(placeholder(name));
        };
        if let Err(e) = knowledge::insert_card(&self.db, &card).await {
            tracing::warn!(name, error = %e, "Could not cache knowledge card");
        }
        Ok(card)
    }

    async fn generate(&self, name: &str) -> Option<KnowledgeCard> {
        let text = match self.cascade.generate_text(&knowledge_card_prompt(name), None, true).await {
            Ok(outcome) => outcome.text,
            Err(e) => {
                tracing::warn!(name, error = %e, "Knowledge card generation failed");
                return None;
            }
        };
        let object = match normalize_object(&text) {
            Ok(object) => object,
            Err(e) => {
                tracing::warn!(name, error = %e, "Knowledge card reply unusable");
                return None;
            }
        };

        let definition = object
            .get("definition")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|d| !d.is_empty())?
            .to_string();
        let tips: Vec<String> = match object.get("tips") {
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).map(str::to_string).collect(),
            _ => Vec::new(),
        };

        Some(KnowledgeCard {
            name: name.to_string(),
            definition,
            tips: if tips.is_empty() { default_tips() } else { tips },
            cached: false,
        })
    }
}

fn default_tips() -> Vec<String> {
    DEFAULT_TIPS.iter().map(|s| s.to_string()).collect()
}

fn placeholder(name: &str) -> KnowledgeCard {
    KnowledgeCard {
        name: name.to_string(),
        definition: format!("The explanation of **{}** is still being prepared. Please try again shortly.", name),
        tips: default_tips(),
        cached: false,
    }
}
