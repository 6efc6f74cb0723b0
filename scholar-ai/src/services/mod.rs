//! Pipeline services
//!
//! Leaves first: normalizer, cascade, embedding, calibration, dedup; then the
//! orchestrator and the auxiliary generators built on the same cascade.

pub mod blob_store;
pub mod calibration_retriever;
pub mod dedup_gate;
pub mod embedding_client;
pub mod gemini_client;
pub mod ingestion_orchestrator;
pub mod knowledge_cards;
pub mod model_cascade;
pub mod practice_generator;
pub mod prompts;
pub mod reference_importer;
pub mod response_normalizer;

pub use blob_store::{BlobError, BlobStore, LocalBlobStore};
pub use calibration_retriever::CalibrationRetriever;
pub use dedup_gate::{DedupDecision, DedupGate};
pub use embedding_client::{EmbeddingClient, EmbeddingProvider};
pub use gemini_client::GeminiClient;
pub use ingestion_orchestrator::IngestionOrchestrator;
pub use knowledge_cards::KnowledgeCards;
pub use model_cascade::{CascadeOutcome, GenerationRequest, GenerativeModel, ModelCascade, ModelError};
pub use practice_generator::PracticeGenerator;
pub use reference_importer::{ReferenceImportOutcome, ReferenceImporter};
