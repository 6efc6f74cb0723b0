//! Configuration resolution for scholar-ai
//!
//! Bootstrap values come from `scholar_common::config`; this module adds the
//! pipeline tuning table and the Database → ENV → TOML resolution of the
//! generative service API key.

use scholar_common::config::TomlConfig;
use scholar_common::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Environment variable consulted for the API key
pub const API_KEY_ENV: &str = "SCHOLAR_GEMINI_API_KEY";

/// Default model variants, fastest/cheapest first, most capable last
pub const DEFAULT_MODEL_VARIANTS: &[&str] = &[
    "gemini-2.0-flash-exp",
    "gemini-2.0-pro-exp",
    "gemini-1.5-flash",
    "gemini-1.5-flash-latest",
    "gemini-1.5-pro",
];

/// Pipeline tuning knobs
///
/// Every field has a default, so a partial `[pipeline]` table in the TOML file
/// only overrides what it names.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum images per ingestion batch
    pub max_batch_size: usize,
    /// Inclusive cosine similarity at which two questions are the same
    pub dedup_threshold: f32,
    /// Canonical embedding length
    pub embedding_dimension: usize,
    /// Characters sent to the embedding service after whitespace collapse
    pub embedding_max_chars: usize,
    /// Reference exemplars per prompt
    pub calibration_limit: i64,
    /// Per-attempt model timeout
    pub model_timeout_secs: u64,
    /// Concurrent per-image analyses
    pub analysis_concurrency: usize,
    pub vision_temperature: f32,
    pub text_temperature: f32,
    pub model_variants: Vec<String>,
    pub embedding_model: String,
    /// Outbound requests per second to the generative service
    pub requests_per_second: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 10,
            dedup_threshold: 0.95,
            embedding_dimension: 3072,
            embedding_max_chars: 8000,
            calibration_limit: 3,
            model_timeout_secs: 300,
            analysis_concurrency: 10,
            vision_temperature: 0.4,
            text_temperature: 0.2,
            model_variants: DEFAULT_MODEL_VARIANTS.iter().map(|s| s.to_string()).collect(),
            embedding_model: "gemini-embedding-001".to_string(),
            requests_per_second: 5,
        }
    }
}

impl PipelineConfig {
    /// Decode the optional `[pipeline]` table, falling back to defaults
    pub fn from_toml(toml_config: &TomlConfig) -> Result<Self> {
        let config = match &toml_config.pipeline {
            Some(value) => value
                .clone()
                .try_into::<PipelineConfig>()
                .map_err(|e| Error::Config(format!("Invalid [pipeline] table: {}", e)))?,
            None => PipelineConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.max_batch_size == 0 {
            return Err(Error::Config("max_batch_size must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.dedup_threshold) {
            return Err(Error::Config(format!(
                "dedup_threshold must be within 0..=1, got {}",
                self.dedup_threshold
            )));
        }
        if self.embedding_dimension == 0 {
            return Err(Error::Config("embedding_dimension must be at least 1".into()));
        }
        if self.analysis_concurrency == 0 {
            return Err(Error::Config("analysis_concurrency must be at least 1".into()));
        }
        if self.requests_per_second == 0 {
            return Err(Error::Config("requests_per_second must be at least 1".into()));
        }
        Ok(())
    }
}

/// Resolve the generative service API key
///
/// **Priority:** Database → ENV → TOML
pub async fn resolve_gemini_api_key(db: &SqlitePool, toml_config: &TomlConfig) -> Result<String> {
    let db_key = crate::db::settings::get_gemini_api_key(db)
        .await?
        .filter(|k| is_valid_key(k));
    let env_key = std::env::var(API_KEY_ENV).ok().filter(|k| is_valid_key(k));
    let toml_key = toml_config.gemini_api_key.clone().filter(|k| is_valid_key(k));

    let sources: Vec<&str> = [
        db_key.as_ref().map(|_| "database"),
        env_key.as_ref().map(|_| "environment"),
        toml_key.as_ref().map(|_| "TOML"),
    ]
    .into_iter()
    .flatten()
    .collect();

    if sources.len() > 1 {
        warn!(
            "Gemini API key found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            sources[0]
        );
    }

    if let Some(key) = db_key {
        info!("Gemini API key loaded from database");
        return Ok(key);
    }
    if let Some(key) = env_key {
        info!("Gemini API key loaded from environment variable");
        return Ok(key);
    }
    if let Some(key) = toml_key {
        info!("Gemini API key loaded from TOML config");
        return Ok(key);
    }

    Err(Error::Config(format!(
        "Gemini API key not configured. Configure one of:\n\
         1. Database: scholar-ai set-api-key <key>\n\
         2. Environment: {}=your-key\n\
         3. TOML config: ~/.config/scholar-lens/scholar-ai.toml (gemini_api_key = \"your-key\")",
        API_KEY_ENV
    )))
}

/// Non-empty, non-whitespace
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
