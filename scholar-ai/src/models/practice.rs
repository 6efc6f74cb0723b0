//! Practice variants and knowledge cards

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A generated practice question structurally similar to an original
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantResult {
    pub variant_content: String,
    #[serde(default)]
    pub analysis: String,
    #[serde(default)]
    pub solution: String,
    #[serde(default)]
    pub similarity_explanation: String,
}

/// Persisted practice attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PracticeRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub question_id: Uuid,
    pub variant: VariantResult,
    /// `None` until the student answers
    pub is_correct: Option<bool>,
    pub created_at: DateTime<Utc>,
}

/// Short explanation of one knowledge point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeCard {
    pub name: String,
    pub definition: String,
    #[serde(default)]
    pub tips: Vec<String>,
    /// True when served from the cache table
    #[serde(default)]
    pub cached: bool,
}
