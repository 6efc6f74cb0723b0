//! scholar-ai library interface
//!
//! The exam-photo ingestion analysis pipeline. `AppState` wires the injected
//! collaborators (model service, embedding service, blob store, database) into
//! the services; tests substitute fakes for any of them.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;

pub use crate::error::{IngestError, IngestResult};

use crate::config::PipelineConfig;
use crate::services::{
    BlobStore, EmbeddingClient, EmbeddingProvider, GenerativeModel, IngestionOrchestrator, KnowledgeCards,
    ModelCascade, PracticeGenerator, ReferenceImporter,
};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

/// Shared handles for every pipeline service
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub cascade: Arc<ModelCascade>,
    pub embedder: EmbeddingClient,
    pub blobs: Arc<dyn BlobStore>,
    pub config: PipelineConfig,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        model: Arc<dyn GenerativeModel>,
        embeddings: Arc<dyn EmbeddingProvider>,
        blobs: Arc<dyn BlobStore>,
        config: PipelineConfig,
    ) -> Self {
        let cascade = ModelCascade::new(
            model,
            config.model_variants.clone(),
            Duration::from_secs(config.model_timeout_secs),
        )
        .with_temperatures(config.vision_temperature, config.text_temperature);
        let embedder = EmbeddingClient::new(
            embeddings,
            config.embedding_model.clone(),
            config.embedding_dimension,
            config.embedding_max_chars,
        );

        Self {
            db,
            cascade: Arc::new(cascade),
            embedder,
            blobs,
            config,
        }
    }

    pub fn orchestrator(&self) -> IngestionOrchestrator {
        IngestionOrchestrator::new(
            self.db.clone(),
            self.blobs.clone(),
            self.cascade.clone(),
            self.embedder.clone(),
            self.config.clone(),
        )
    }

    pub fn reference_importer(&self) -> ReferenceImporter {
        ReferenceImporter::new(self.db.clone(), self.cascade.clone(), self.embedder.clone())
    }

    pub fn practice(&self) -> PracticeGenerator {
        PracticeGenerator::new(self.db.clone(), self.cascade.clone())
    }

    pub fn knowledge(&self) -> KnowledgeCards {
        KnowledgeCards::new(self.db.clone(), self.cascade.clone())
    }
}
