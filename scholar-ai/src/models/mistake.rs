//! Mistake tracking rows

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Mistake lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MistakeStatus {
    Active,
    Corrected,
    Archived,
}

impl MistakeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MistakeStatus::Active => "active",
            MistakeStatus::Corrected => "corrected",
            MistakeStatus::Archived => "archived",
        }
    }
}

impl FromStr for MistakeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(MistakeStatus::Active),
            "corrected" => Ok(MistakeStatus::Corrected),
            "archived" => Ok(MistakeStatus::Archived),
            other => Err(format!("Unknown mistake status: {}", other)),
        }
    }
}

/// "This user got this question wrong and is tracking it"
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MistakeRecord {
    pub id: Uuid,
    pub question_id: Uuid,
    pub user_id: Uuid,
    pub status: MistakeStatus,
    /// `None` = visible; `Some` = in the trash
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
