//! Data models for scholar-ai
//!
//! - Question/mistake rows as persisted by the store
//! - The per-item analysis payload returned by the vision model
//! - Ingestion request/outcome types

pub mod ingest;
pub mod mistake;
pub mod practice;
pub mod question;

pub use ingest::{ImageUpload, IngestOutcome, IngestRequest};
pub use mistake::{MistakeRecord, MistakeStatus};
pub use practice::{KnowledgeCard, PracticeRecord, VariantResult};
pub use question::{AnalyzedQuestion, NewQuestion, QuestionRecord, ReferenceExemplar, Subject};
