//! Gemini REST client
//!
//! Implements both [`GenerativeModel`] and [`EmbeddingProvider`] over the
//! `v1beta` REST surface. Every outbound call waits on a shared token-bucket
//! limiter first.

use super::embedding_client::EmbeddingProvider;
use super::model_cascade::{GenerationRequest, GenerativeModel, ModelError};
use async_trait::async_trait;
use base64::Engine;
use governor::{Quota, RateLimiter};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::num::NonZeroU32;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const USER_AGENT: &str = concat!("ScholarLens/", env!("CARGO_PKG_VERSION"));

/// Categories whose blocking threshold is relaxed; exam photos of biology or
/// history questions otherwise trip the default filters
const SAFETY_CATEGORIES: &[&str] = &[
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Option<EmbeddingValues>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    #[serde(default)]
    values: Vec<f32>,
}

/// Gemini API client
pub struct GeminiClient {
    http_client: Client,
    base_url: String,
    api_key: String,
    request_timeout: Duration,
    rate_limiter: RateLimiter<
        governor::state::direct::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl GeminiClient {
    /// # Arguments
    /// * `base_url` - `None` for the public endpoint
    /// * `requests_per_second` - shared budget for generation and embedding
    /// * `request_timeout` - HTTP-level timeout; the cascade applies its own per-attempt bound
    pub fn new(
        api_key: String,
        base_url: Option<String>,
        requests_per_second: u32,
        request_timeout: Duration,
    ) -> Result<Self, ModelError> {
        let http_client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ModelError::Transport(e.to_string()))?;

        let quota = Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN));

        Ok(Self {
            http_client,
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key,
            request_timeout,
            rate_limiter: RateLimiter::direct(quota),
        })
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        let model = model.strip_prefix("models/").unwrap_or(model);
        format!("{}/v1beta/models/{}:{}", self.base_url, model, method)
    }

    async fn post(&self, url: &str, body: &Value) -> Result<reqwest::Response, ModelError> {
        self.rate_limiter.until_ready().await;

        let response = self
            .http_client
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ModelError::Timeout(self.request_timeout)
                } else {
                    ModelError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        let message: String = message.chars().take(500).collect();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ModelError::RateLimited(message));
        }
        Err(ModelError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

/// JSON body of a `generateContent` call: files first, prompt last
fn generation_body(request: &GenerationRequest<'_>) -> Value {
    let engine = base64::engine::general_purpose::STANDARD;
    let mut parts: Vec<Value> = request
        .files
        .iter()
        .map(|file| {
            json!({
                "inline_data": {
                    "mime_type": file.mime_type,
                    "data": engine.encode(&file.bytes),
                }
            })
        })
        .collect();
    parts.push(json!({ "text": request.prompt }));

    let mut generation_config = json!({ "temperature": request.temperature });
    if request.json_mode {
        generation_config["responseMimeType"] = json!("application/json");
    }

    json!({
        "contents": [{ "role": "user", "parts": parts }],
        "safetySettings": SAFETY_CATEGORIES
            .iter()
            .map(|category| json!({ "category": category, "threshold": "BLOCK_NONE" }))
            .collect::<Vec<_>>(),
        "generationConfig": generation_config,
    })
}

/// Concatenated text parts of the first candidate
fn response_text(response: GenerateResponse) -> Result<String, ModelError> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(ModelError::EmptyResponse);
    }
    Ok(text)
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate(&self, model: &str, request: &GenerationRequest<'_>) -> Result<String, ModelError> {
        let url = self.endpoint(model, "generateContent");
        tracing::debug!(model, files = request.files.len(), json_mode = request.json_mode, "POST generateContent");

        let response = self.post(&url, &generation_body(request)).await?;
        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ModelError::Transport(format!("Unreadable generateContent reply: {}", e)))?;
        response_text(parsed)
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiClient {
    async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>, ModelError> {
        let url = self.endpoint(model, "embedContent");
        let body = json!({ "content": { "parts": [{ "text": text }] } });
        tracing::debug!(model, chars = text.chars().count(), "POST embedContent");

        let response = self.post(&url, &body).await?;
        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| ModelError::Transport(format!("Unreadable embedContent reply: {}", e)))?;
        match parsed.embedding {
            Some(embedding) if !embedding.values.is_empty() => Ok(embedding.values),
            _ => Err(ModelError::EmptyResponse),
        }
    }
}
