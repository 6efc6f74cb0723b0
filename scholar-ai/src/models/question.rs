//! Question records and the model's per-question analysis payload

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Default difficulty when the model omits or garbles it
pub const DEFAULT_DIFFICULTY: u8 = 3;

/// School subject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subject {
    Math,
    Physics,
    Chemistry,
    Chinese,
    English,
    Politics,
    History,
}

impl Subject {
    pub fn as_str(&self) -> &'static str {
        match self {
            Subject::Math => "math",
            Subject::Physics => "physics",
            Subject::Chemistry => "chemistry",
            Subject::Chinese => "chinese",
            Subject::English => "english",
            Subject::Politics => "politics",
            Subject::History => "history",
        }
    }

    /// Science subjects get the formula-heavy analysis prompt
    pub fn is_science(&self) -> bool {
        matches!(self, Subject::Math | Subject::Physics | Subject::Chemistry)
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Subject {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "math" => Ok(Subject::Math),
            "physics" => Ok(Subject::Physics),
            "chemistry" => Ok(Subject::Chemistry),
            "chinese" => Ok(Subject::Chinese),
            "english" => Ok(Subject::English),
            "politics" => Ok(Subject::Politics),
            "history" => Ok(Subject::History),
            other => Err(format!("Unknown subject: {}", other)),
        }
    }
}

/// A persisted question row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub subject: Subject,
    /// Markdown with inline/display math
    pub content: String,
    /// Blob URLs, in upload order
    pub images: Vec<String>,
    pub knowledge_points: Vec<String>,
    pub error_type: Option<String>,
    pub error_analysis: Option<String>,
    pub solution: Option<String>,
    /// 1 (easiest) to 5
    pub difficulty: u8,
    /// Always exactly the canonical embedding dimension
    #[serde(skip)]
    pub embedding: Vec<f32>,
    pub is_reference: bool,
    pub meta_data: Value,
    /// When the student actually attempted the question
    pub occurred_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a question row
#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub user_id: Uuid,
    pub subject: Subject,
    pub content: String,
    pub images: Vec<String>,
    pub knowledge_points: Vec<String>,
    pub error_type: Option<String>,
    pub error_analysis: Option<String>,
    pub solution: Option<String>,
    pub difficulty: u8,
    pub embedding: Vec<f32>,
    pub is_reference: bool,
    pub meta_data: Value,
    pub occurred_at: Option<DateTime<Utc>>,
}

/// Curated reference question used as a difficulty anchor in prompts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceExemplar {
    pub content: String,
    pub difficulty: u8,
}

/// One question as extracted by the vision model
///
/// Deserialization is lenient: models return difficulty as `3`, `3.0` or
/// `"3"`, and knowledge points as a list or a single string.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnalyzedQuestion {
    #[serde(default)]
    pub content: String,
    #[serde(default, deserialize_with = "optional_bool")]
    pub is_mistake: Option<bool>,
    #[serde(default, deserialize_with = "string_list")]
    pub knowledge_points: Vec<String>,
    #[serde(default, deserialize_with = "optional_text")]
    pub error_type: Option<String>,
    #[serde(default, deserialize_with = "optional_text")]
    pub error_analysis: Option<String>,
    #[serde(default, deserialize_with = "optional_text")]
    pub solution: Option<String>,
    #[serde(default = "default_difficulty", deserialize_with = "difficulty")]
    pub difficulty: u8,
    #[serde(default, deserialize_with = "optional_text")]
    pub marking_details: Option<String>,
}

impl AnalyzedQuestion {
    /// Decode one normalized item; `None` when it is not an object or has no
    /// question text
    pub fn from_value(value: Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        let item: AnalyzedQuestion = serde_json::from_value(value).ok()?;
        if item.content.trim().is_empty() {
            return None;
        }
        Some(item)
    }
}

fn default_difficulty() -> u8 {
    DEFAULT_DIFFICULTY
}

/// Clamp any numeric difficulty into 1..=5
pub fn clamp_difficulty(raw: f64) -> u8 {
    if !raw.is_finite() {
        return DEFAULT_DIFFICULTY;
    }
    raw.round().clamp(1.0, 5.0) as u8
}

fn difficulty<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let raw = match &value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(raw.map(clamp_difficulty).unwrap_or(DEFAULT_DIFFICULTY))
}

fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Value::String(s) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    })
}

fn optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

/// Accepts `true`, `"true"`, `1` and their negatives; anything else is unknown
fn optional_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Bool(b) => Some(b),
        Value::Number(n) => match n.as_f64() {
            Some(x) if x == 1.0 => Some(true),
            Some(x) if x == 0.0 => Some(false),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    })
}
