//! Ingestion batch input and aggregated outcome

use super::Subject;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// One cropped exam photo (or, for reference import, a PDF page set)
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// Build an upload, sniffing the MIME type from the bytes
    ///
    /// Unrecognized content is labelled `application/octet-stream`, which the
    /// batch validation then rejects.
    pub fn from_bytes(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let mime_type = infer::get(&bytes)
            .map(|kind| kind.mime_type().to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());
        Self {
            file_name: file_name.into(),
            mime_type,
            bytes,
        }
    }

    /// Read a file from disk
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self::from_bytes(file_name, bytes))
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    pub fn is_pdf(&self) -> bool {
        self.mime_type == "application/pdf"
    }
}

/// One ingestion batch
#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub owner: Uuid,
    pub subject: Subject,
    pub images: Vec<ImageUpload>,
    /// When the exam was taken; defaults to ingestion time
    pub occurred_at: Option<DateTime<Utc>>,
    /// Model variant to try first
    pub preferred_model: Option<String>,
}

/// Aggregated result of a successful batch
///
/// `question_count` is the number of distinct questions touched (new or
/// reused) and may differ from the number of images.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestOutcome {
    pub question_count: usize,
    pub new_questions: usize,
    pub reused_questions: usize,
    pub new_mistakes: usize,
    /// Images whose analysis produced nothing usable
    pub dropped_images: usize,
    pub question_ids: Vec<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    // Minimal PNG signature plus IHDR chunk header
    const PNG_HEADER: &[u8] = &[
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    ];

    #[test]
    fn test_sniffs_png() {
        let upload = ImageUpload::from_bytes("q1.png", PNG_HEADER.to_vec());
        assert_eq!(upload.mime_type, "image/png");
        assert!(upload.is_image());
    }

    #[test]
    fn test_sniffs_pdf() {
        let upload = ImageUpload::from_bytes("paper.pdf", b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n".to_vec());
        assert!(upload.is_pdf());
        assert!(!upload.is_image());
    }

    #[test]
    fn test_unknown_bytes() {
        let upload = ImageUpload::from_bytes("notes.txt", b"hello".to_vec());
        assert_eq!(upload.mime_type, "application/octet-stream");
        assert!(!upload.is_image());
    }
}
