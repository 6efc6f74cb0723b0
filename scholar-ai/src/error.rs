//! Error types for scholar-ai
//!
//! Severity of each variant within a batch:
//! - Batch-fatal: `InvalidBatch`, `UploadFailed`, `NoQuestionsRecognized`
//! - Image-fatal: `ModelCascadeExhausted`, `MalformedAiResponse`
//! - Item-fatal: `EmbeddingUnavailable`
//! - Fail-open (logged, never surfaced by the orchestrator):
//!   `DuplicateCheckFailed`, `CalibrationFetchFailed`

use thiserror::Error;

/// Ingestion pipeline error
#[derive(Debug, Error)]
pub enum IngestError {
    /// Batch rejected before any work started (empty, too large, non-image)
    #[error("Invalid batch: {0}")]
    InvalidBatch(String),

    /// Every model variant in the cascade failed
    #[error("All model variants failed; last tried {last_model}: {message}")]
    ModelCascadeExhausted { last_model: String, message: String },

    /// Model reply contained no recoverable JSON payload
    #[error("Malformed AI response: {snippet}")]
    MalformedAiResponse { snippet: String },

    /// Embedding service failed; the item cannot be deduplicated or stored
    #[error("Embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// Blob upload failed; the whole batch is aborted
    #[error("Image upload failed: {0}")]
    UploadFailed(String),

    /// Nearest-neighbour query failed
    #[error("Duplicate check failed: {0}")]
    DuplicateCheckFailed(String),

    /// Reference exemplar read failed
    #[error("Calibration fetch failed: {0}")]
    CalibrationFetchFailed(String),

    /// Nothing in the batch survived analysis
    #[error("No recognizable question found")]
    NoQuestionsRecognized,

    /// Store or configuration failure
    #[error(transparent)]
    Common(#[from] scholar_common::Error),
}

impl From<sqlx::Error> for IngestError {
    fn from(err: sqlx::Error) -> Self {
        IngestError::Common(scholar_common::Error::Database(err))
    }
}

impl IngestError {
    /// Stable machine-readable code for CLI/JSON output
    pub fn code(&self) -> &'static str {
        match self {
            IngestError::InvalidBatch(_) => "INVALID_BATCH",
            IngestError::ModelCascadeExhausted { .. } => "MODEL_CASCADE_EXHAUSTED",
            IngestError::MalformedAiResponse { .. } => "MALFORMED_AI_RESPONSE",
            IngestError::EmbeddingUnavailable(_) => "EMBEDDING_UNAVAILABLE",
            IngestError::UploadFailed(_) => "UPLOAD_FAILED",
            IngestError::DuplicateCheckFailed(_) => "DUPLICATE_CHECK_FAILED",
            IngestError::CalibrationFetchFailed(_) => "CALIBRATION_FETCH_FAILED",
            IngestError::NoQuestionsRecognized => "NO_QUESTIONS_RECOGNIZED",
            IngestError::Common(scholar_common::Error::NotFound(_)) => "NOT_FOUND",
            IngestError::Common(scholar_common::Error::Config(_)) => "CONFIG_ERROR",
            IngestError::Common(_) => "STORE_ERROR",
        }
    }
}

/// Result type for pipeline operations
pub type IngestResult<T> = Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhausted_message_names_last_model() {
        let err = IngestError::ModelCascadeExhausted {
            last_model: "gemini-1.5-pro".to_string(),
            message: "HTTP 429".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("gemini-1.5-pro"));
        assert!(text.contains("HTTP 429"));
        assert_eq!(err.code(), "MODEL_CASCADE_EXHAUSTED");
    }

    #[test]
    fn test_store_errors_map_to_codes() {
        let not_found: IngestError = scholar_common::Error::NotFound("question".into()).into();
        assert_eq!(not_found.code(), "NOT_FOUND");

        let db: IngestError = sqlx::Error::RowNotFound.into();
        assert_eq!(db.code(), "STORE_ERROR");
    }
}
