//! Embedding client
//!
//! Wraps an [`EmbeddingProvider`] so callers always receive a vector of the
//! canonical length. Services reject oversized input, so text is
//! whitespace-collapsed and cut to a character budget before sending.

use super::model_cascade::ModelError;
use crate::error::{IngestError, IngestResult};
use async_trait::async_trait;
use std::sync::Arc;

/// A text embedding service
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>, ModelError>;
}

/// Canonical-length embedding client
#[derive(Clone)]
pub struct EmbeddingClient {
    provider: Arc<dyn EmbeddingProvider>,
    model: String,
    dimension: usize,
    max_chars: usize,
}

impl EmbeddingClient {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, model: impl Into<String>, dimension: usize, max_chars: usize) -> Self {
        Self {
            provider,
            model: model.into(),
            dimension,
            max_chars,
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Embed `text`; the result is exactly [`Self::dimension`] long
    pub async fn embed(&self, text: &str) -> IngestResult<Vec<f32>> {
        let prepared = prepare_text(text, self.max_chars);
        if prepared.is_empty() {
            return Err(IngestError::EmbeddingUnavailable("empty text".to_string()));
        }

        let raw = self
            .provider
            .embed(&self.model, &prepared)
            .await
            .map_err(|e| IngestError::EmbeddingUnavailable(e.to_string()))?;

        if raw.len() != self.dimension {
            tracing::debug!(
                returned = raw.len(),
                canonical = self.dimension,
                "Embedding length mismatch, fitting to canonical length"
            );
        }
        Ok(fit_dimension(raw, self.dimension))
    }
}

/// Collapse whitespace runs, trim, and keep at most `max_chars` characters
pub fn prepare_text(text: &str, max_chars: usize) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(max_chars)
        .collect()
}

/// Truncate or zero-pad to `dimension`
pub fn fit_dimension(mut vector: Vec<f32>, dimension: usize) -> Vec<f32> {
    vector.resize(dimension, 0.0);
    vector
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FixedProvider {
        values: Result<Vec<f32>, ModelError>,
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl EmbeddingProvider for FixedProvider {
        async fn embed(&self, _model: &str, text: &str) -> Result<Vec<f32>, ModelError> {
            self.seen.lock().unwrap().push(text.to_string());
            self.values.clone()
        }
    }

    fn client(values: Result<Vec<f32>, ModelError>) -> (EmbeddingClient, Arc<FixedProvider>) {
        let provider = Arc::new(FixedProvider {
            values,
            seen: Mutex::new(Vec::new()),
        });
        (EmbeddingClient::new(provider.clone(), "test-embed", 8, 20), provider)
    }

    #[tokio::test]
    async fn test_output_always_canonical_length() {
        for returned in [vec![1.0; 3], vec![1.0; 8], vec![1.0; 12]] {
            let (client, _) = client(Ok(returned.clone()));
            let vector = client.embed("text").await.unwrap();
            assert_eq!(vector.len(), 8);
            let kept = returned.len().min(8);
            assert!(vector[..kept].iter().all(|v| *v == 1.0));
            assert!(vector[kept..].iter().all(|v| *v == 0.0));
        }
    }

    #[tokio::test]
    async fn test_text_is_collapsed_and_truncated() {
        let (client, provider) = client(Ok(vec![0.5; 8]));
        client.embed("  Solve\n\n  for   x \t please  and show every step").await.unwrap();
        let seen = provider.seen.lock().unwrap()[0].clone();
        assert_eq!(seen, "Solve for x please a");
        assert_eq!(seen.chars().count(), 20);
    }

    #[tokio::test]
    async fn test_provider_failure_is_embedding_unavailable() {
        let (client, _) = client(Err(ModelError::RateLimited("quota".into())));
        assert!(matches!(client.embed("x").await, Err(IngestError::EmbeddingUnavailable(_))));
    }

    #[tokio::test]
    async fn test_blank_text_not_sent() {
        let (client, provider) = client(Ok(vec![0.5; 8]));
        assert!(matches!(client.embed(" \n\t ").await, Err(IngestError::EmbeddingUnavailable(_))));
        assert!(provider.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_prepare_text_counts_chars_not_bytes() {
        assert_eq!(prepare_text("二次 函数 图像", 4), "二次 函");
    }
}
