//! In-process stand-ins for the external collaborators

use async_trait::async_trait;
use scholar_ai::services::{BlobError, BlobStore, EmbeddingProvider, GenerationRequest, GenerativeModel, ModelError};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

const PNG_HEADER: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
];

/// PNG-sniffable bytes carrying `tag` after the header
pub fn png(tag: &str) -> Vec<u8> {
    let mut bytes = PNG_HEADER.to_vec();
    bytes.extend_from_slice(tag.as_bytes());
    bytes
}

fn tag_of(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes.get(PNG_HEADER.len()..).unwrap_or_default()).into_owned()
}

/// One recorded generation call
#[derive(Debug, Clone)]
pub struct ModelCall {
    pub model: String,
    pub tags: Vec<String>,
    pub prompt: String,
    pub temperature: f32,
}

/// Generative model whose replies are keyed by image tag
#[derive(Default)]
pub struct ScriptedModel {
    image_replies: Mutex<HashMap<String, String>>,
    text_reply: Mutex<Option<String>>,
    failing_variants: Mutex<HashSet<String>>,
    calls: Mutex<Vec<ModelCall>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply for requests whose first file carries `tag`
    pub fn reply_for(&self, tag: &str, reply: &str) -> &Self {
        self.image_replies
            .lock()
            .unwrap()
            .insert(tag.to_string(), reply.to_string());
        self
    }

    /// Reply for text-only requests
    pub fn text_reply(&self, reply: &str) -> &Self {
        *self.text_reply.lock().unwrap() = Some(reply.to_string());
        self
    }

    /// Make a variant fail with a rate-limit error
    pub fn fail_variant(&self, model: &str) -> &Self {
        self.failing_variants.lock().unwrap().insert(model.to_string());
        self
    }

    pub fn calls(&self) -> Vec<ModelCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn models_called(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.model).collect()
    }
}

#[async_trait]
impl GenerativeModel for ScriptedModel {
    async fn generate(&self, model: &str, request: &GenerationRequest<'_>) -> Result<String, ModelError> {
        let tags: Vec<String> = request.files.iter().map(|f| tag_of(&f.bytes)).collect();
        self.calls.lock().unwrap().push(ModelCall {
            model: model.to_string(),
            tags: tags.clone(),
            prompt: request.prompt.to_string(),
            temperature: request.temperature,
        });

        if self.failing_variants.lock().unwrap().contains(model) {
            return Err(ModelError::RateLimited(format!("{} quota exhausted", model)));
        }

        let reply = match tags.first() {
            Some(tag) => self.image_replies.lock().unwrap().get(tag).cloned(),
            None => self.text_reply.lock().unwrap().clone(),
        };
        reply.ok_or(ModelError::Rejected {
            status: 400,
            message: "no scripted reply".to_string(),
        })
    }
}

/// Deterministic embeddings: identical text gives identical vectors, distinct
/// text gives near-orthogonal ones
#[derive(Default)]
pub struct FakeEmbedder {
    overrides: Mutex<HashMap<String, Vec<f32>>>,
    failing: Mutex<HashSet<String>>,
    calls: Mutex<usize>,
}

impl FakeEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_vector(&self, text: &str, vector: Vec<f32>) -> &Self {
        self.overrides.lock().unwrap().insert(text.to_string(), vector);
        self
    }

    pub fn fail_on(&self, text: &str) -> &Self {
        self.failing.lock().unwrap().insert(text.to_string());
        self
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }

    /// Pseudo-random vector seeded by an FNV-1a hash of the text
    pub fn hashed_vector(text: &str, dimension: usize) -> Vec<f32> {
        let mut state: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in text.as_bytes() {
            state ^= *byte as u64;
            state = state.wrapping_mul(0x0100_0000_01b3);
        }
        (0..dimension)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                ((state >> 33) as f32 / (1u64 << 31) as f32) * 2.0 - 1.0
            })
            .collect()
    }
}

#[async_trait]
impl EmbeddingProvider for FakeEmbedder {
    async fn embed(&self, _model: &str, text: &str) -> Result<Vec<f32>, ModelError> {
        *self.calls.lock().unwrap() += 1;
        if self.failing.lock().unwrap().contains(text) {
            return Err(ModelError::Transport("embedding service unavailable".to_string()));
        }
        if let Some(vector) = self.overrides.lock().unwrap().get(text) {
            return Ok(vector.clone());
        }
        Ok(Self::hashed_vector(text, super::db_utils::TEST_DIMENSION))
    }
}

/// Blob store kept in memory; URLs are `mem://{path}`
#[derive(Default)]
pub struct MemoryBlobStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    fail_on_suffix: Mutex<Option<String>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail any write whose path ends with `suffix`
    pub fn fail_on(&self, suffix: &str) -> &Self {
        *self.fail_on_suffix.lock().unwrap() = Some(suffix.to_string());
        self
    }

    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        paths.sort();
        paths
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, path: &str, bytes: &[u8], _content_type: &str) -> Result<String, BlobError> {
        if let Some(suffix) = self.fail_on_suffix.lock().unwrap().as_deref() {
            if path.ends_with(suffix) {
                return Err(BlobError::Backend("bucket unavailable".to_string()));
            }
        }
        self.objects.lock().unwrap().insert(path.to_string(), bytes.to_vec());
        Ok(format!("mem://{}", path))
    }
}
