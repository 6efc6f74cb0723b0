//! Calibration retriever
//!
//! Supplies the few curated reference questions that anchor the model's
//! difficulty scoring. Calibration only improves quality, so a failed read
//! degrades to an empty list instead of failing the analysis.

use crate::db::questions::list_references;
use crate::error::{IngestError, IngestResult};
use crate::models::{ReferenceExemplar, Subject};
use sqlx::SqlitePool;

pub struct CalibrationRetriever {
    db: SqlitePool,
    limit: i64,
}

impl CalibrationRetriever {
    pub fn new(db: SqlitePool, limit: i64) -> Self {
        Self { db, limit }
    }

    /// Most recent exemplars for `subject`, or an error
    pub async fn try_fetch(&self, subject: Subject) -> IngestResult<Vec<ReferenceExemplar>> {
        list_references(&self.db, subject, self.limit)
            .await
            .map_err(|e| IngestError::CalibrationFetchFailed(e.to_string()))
    }

    /// Most recent exemplars for `subject`; empty on any store error
    pub async fn fetch(&self, subject: Subject) -> Vec<ReferenceExemplar> {
        match self.try_fetch(subject).await {
            Ok(exemplars) => {
                tracing::debug!(subject = %subject, count = exemplars.len(), "Calibration exemplars loaded");
                exemplars
            }
            Err(e) => {
                tracing::warn!(subject = %subject, error = %e, "Proceeding without difficulty calibration");
                Vec::new()
            }
        }
    }
}
