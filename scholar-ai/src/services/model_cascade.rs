//! Model cascade executor
//!
//! Drives one generative model service through an ordered list of model
//! variants. Each attempt is bounded by its own timeout; any failure moves on
//! to the next variant, and the first success ends the cascade:
//!
//! `TRY(i) -> SUCCESS: done | FAILURE: TRY(i + 1) or EXHAUSTED`

use crate::error::{IngestError, IngestResult};
use crate::models::ImageUpload;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Failure of a single generation attempt
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ModelError {
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// The service refused the request (bad request, unknown model, auth)
    #[error("Rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    /// Reply carried no text (blocked, or no candidates)
    #[error("Empty response")]
    EmptyResponse,
}

/// One generation request
#[derive(Debug, Clone)]
pub struct GenerationRequest<'a> {
    pub prompt: &'a str,
    /// Inline files sent before the prompt; empty for text-only requests
    pub files: &'a [ImageUpload],
    pub temperature: f32,
    /// Ask the service for `application/json` output
    pub json_mode: bool,
}

/// A generative model service addressed by model variant name
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(&self, model: &str, request: &GenerationRequest<'_>) -> Result<String, ModelError>;
}

/// Successful cascade result
#[derive(Debug, Clone, PartialEq)]
pub struct CascadeOutcome {
    pub text: String,
    /// Variant that produced `text`
    pub model: String,
}

/// Ordered-fallback executor over a [`GenerativeModel`]
pub struct ModelCascade {
    model: Arc<dyn GenerativeModel>,
    variants: Vec<String>,
    attempt_timeout: Duration,
    vision_temperature: f32,
    text_temperature: f32,
}

impl ModelCascade {
    pub fn new(model: Arc<dyn GenerativeModel>, variants: Vec<String>, attempt_timeout: Duration) -> Self {
        Self {
            model,
            variants,
            attempt_timeout,
            vision_temperature: 0.4,
            text_temperature: 0.2,
        }
    }

    pub fn with_temperatures(mut self, vision: f32, text: f32) -> Self {
        self.vision_temperature = vision;
        self.text_temperature = text;
        self
    }

    /// Variant order for one call: the preferred variant first, no repeats
    pub fn variant_order(&self, preferred: Option<&str>) -> Vec<String> {
        let mut order: Vec<String> = Vec::with_capacity(self.variants.len() + 1);
        let preferred = preferred.map(str::trim).filter(|p| !p.is_empty());
        for name in preferred.into_iter().chain(self.variants.iter().map(String::as_str)) {
            if !order.iter().any(|existing| existing == name) {
                order.push(name.to_string());
            }
        }
        order
    }

    /// Analyse image files with the vision temperature, strict JSON output
    pub async fn generate_vision(
        &self,
        files: &[ImageUpload],
        prompt: &str,
        preferred: Option<&str>,
    ) -> IngestResult<CascadeOutcome> {
        let request = GenerationRequest {
            prompt,
            files,
            temperature: self.vision_temperature,
            json_mode: true,
        };
        self.run(&self.variant_order(preferred), &request).await
    }

    /// Text-only generation at the lower text temperature
    pub async fn generate_text(
        &self,
        prompt: &str,
        preferred: Option<&str>,
        json_mode: bool,
    ) -> IngestResult<CascadeOutcome> {
        let request = GenerationRequest {
            prompt,
            files: &[],
            temperature: self.text_temperature,
            json_mode,
        };
        self.run(&self.variant_order(preferred), &request).await
    }

    async fn run(&self, variants: &[String], request: &GenerationRequest<'_>) -> IngestResult<CascadeOutcome> {
        let mut last_failure: Option<(String, ModelError)> = None;

        for (attempt, variant) in variants.iter().enumerate() {
            debug!(model = %variant, attempt = attempt + 1, files = request.files.len(), "Generation attempt");

            let result = match tokio::time::timeout(self.attempt_timeout, self.model.generate(variant, request)).await {
                Ok(Ok(text)) if text.trim().is_empty() => Err(ModelError::EmptyResponse),
                Ok(result) => result,
                Err(_) => Err(ModelError::Timeout(self.attempt_timeout)),
            };

            match result {
                Ok(text) => {
                    info!(model = %variant, attempt = attempt + 1, "Generation succeeded");
                    return Ok(CascadeOutcome {
                        text,
                        model: variant.clone(),
                    });
                }
                Err(err) => {
                    warn!(model = %variant, error = %err, "Model variant failed, trying next");
                    last_failure = Some((variant.clone(), err));
                }
            }
        }

        let (last_model, message) = match last_failure {
            Some((model, err)) => (model, err.to_string()),
            None => ("<none>".to_string(), "no model variants configured".to_string()),
        };
        Err(IngestError::ModelCascadeExhausted { last_model, message })
    }
}
