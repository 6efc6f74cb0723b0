//! Ingestion orchestrator
//!
//! Turns one batch of cropped exam photos into question and mistake rows:
//!
//! 1. validate the batch (non-empty, images only, bounded size)
//! 2. upload every image; any upload failure aborts the batch
//! 3. build one calibrated prompt, then analyse images concurrently
//! 4. normalize each reply; a bad reply drops only its image
//! 5. dedup each extracted item, reusing or inserting a question
//! 6. link an active mistake unless one already exists
//! 7. aggregate, or fail with `NoQuestionsRecognized` when nothing survived

use super::blob_store::{blob_path, BlobStore};
use super::calibration_retriever::CalibrationRetriever;
use super::dedup_gate::{DedupDecision, DedupGate};
use super::embedding_client::{prepare_text, EmbeddingClient};
use super::model_cascade::ModelCascade;
use super::prompts::analysis_prompt;
use super::response_normalizer::normalize_items;
use crate::config::PipelineConfig;
use crate::db::{mistakes, questions};
use crate::error::{IngestError, IngestResult};
use crate::models::{AnalyzedQuestion, ImageUpload, IngestOutcome, IngestRequest, NewQuestion};
use futures::future::try_join_all;
use futures::stream::{self, StreamExt};
use serde_json::json;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Where one uploaded image landed
#[derive(Debug, Clone)]
struct StoredImage {
    path: String,
    url: String,
}

/// Result of one successfully processed item
#[derive(Debug, Clone, Copy)]
struct ItemReport {
    question_id: Uuid,
    created: bool,
    new_mistake: bool,
}

pub struct IngestionOrchestrator {
    db: SqlitePool,
    blobs: Arc<dyn BlobStore>,
    cascade: Arc<ModelCascade>,
    calibration: CalibrationRetriever,
    dedup: DedupGate,
    config: PipelineConfig,
}

impl IngestionOrchestrator {
    pub fn new(
        db: SqlitePool,
        blobs: Arc<dyn BlobStore>,
        cascade: Arc<ModelCascade>,
        embedder: EmbeddingClient,
        config: PipelineConfig,
    ) -> Self {
        Self {
            calibration: CalibrationRetriever::new(db.clone(), config.calibration_limit),
            dedup: DedupGate::new(db.clone(), embedder, config.dedup_threshold),
            db,
            blobs,
            cascade,
            config,
        }
    }

    /// Ingest one batch
    ///
    /// Succeeds with at least one touched question, or fails with a single
    /// error. Per-image and per-item failures are logged and left out of the
    /// count.
    pub async fn ingest(&self, request: IngestRequest) -> IngestResult<IngestOutcome> {
        self.validate(&request)?;
        let owner = request.owner;
        info!(
            owner = %owner,
            subject = %request.subject,
            images = request.images.len(),
            "Starting ingestion batch"
        );

        let stored = self.upload_all(owner, &request.images).await?;

        let exemplars = self.calibration.fetch(request.subject).await;
        let prompt = analysis_prompt(request.subject, &exemplars);

        let reports: Vec<Vec<ItemReport>> = stream::iter(request.images.iter().zip(stored.iter()).enumerate())
            .map(|(index, (image, stored))| self.analyze_image(&request, &prompt, index, image, stored))
            .buffer_unordered(self.config.analysis_concurrency.max(1))
            .collect()
            .await;

        let mut outcome = IngestOutcome::default();
        let mut created = Vec::new();
        for items in &reports {
            if items.is_empty() {
                outcome.dropped_images += 1;
            }
            for item in items {
                if item.created {
                    outcome.new_questions += 1;
                    created.push(item.question_id);
                }
                if item.new_mistake {
                    outcome.new_mistakes += 1;
                }
                if !outcome.question_ids.contains(&item.question_id) {
                    outcome.question_ids.push(item.question_id);
                }
            }
        }
        outcome.question_count = outcome.question_ids.len();
        outcome.reused_questions = outcome
            .question_ids
            .iter()
            .filter(|id| !created.contains(id))
            .count();

        if outcome.question_count == 0 {
            warn!(owner = %owner, images = request.images.len(), "No recognizable question in batch");
            return Err(IngestError::NoQuestionsRecognized);
        }

        info!(
            owner = %owner,
            questions = outcome.question_count,
            new_questions = outcome.new_questions,
            reused = outcome.reused_questions,
            new_mistakes = outcome.new_mistakes,
            dropped_images = outcome.dropped_images,
            "Ingestion batch complete"
        );
        Ok(outcome)
    }

    fn validate(&self, request: &IngestRequest) -> IngestResult<()> {
        if request.images.is_empty() {
            return Err(IngestError::InvalidBatch("no images supplied".into()));
        }
        if request.images.len() > self.config.max_batch_size {
            return Err(IngestError::InvalidBatch(format!(
                "{} images exceeds the limit of {}",
                request.images.len(),
                self.config.max_batch_size
            )));
        }
        if let Some(bad) = request.images.iter().find(|image| !image.is_image()) {
            return Err(IngestError::InvalidBatch(format!(
                "{} is {}, not an image",
                bad.file_name, bad.mime_type
            )));
        }
        Ok(())
    }

    async fn upload_all(&self, owner: Uuid, images: &[ImageUpload]) -> IngestResult<Vec<StoredImage>> {
        let millis = chrono::Utc::now().timestamp_millis();
        let batch = Uuid::new_v4().simple().to_string();
        let batch_tag = &batch[..8];
        try_join_all(images.iter().enumerate().map(|(index, image)| async move {
            let path = blob_path(owner, millis, batch_tag, index, &image.file_name);
            let url = self
                .blobs
                .put(&path, &image.bytes, &image.mime_type)
                .await
                .map_err(|e| IngestError::UploadFailed(format!("{}: {}", image.file_name, e)))?;
            Ok::<_, IngestError>(StoredImage { path, url })
        }))
        .await
    }

    /// Analyse one image; an empty report means the image was dropped
    async fn analyze_image(
        &self,
        request: &IngestRequest,
        prompt: &str,
        index: usize,
        image: &ImageUpload,
        stored: &StoredImage,
    ) -> Vec<ItemReport> {
        let owner = request.owner;
        let outcome = match self
            .cascade
            .generate_vision(std::slice::from_ref(image), prompt, request.preferred_model.as_deref())
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(owner = %owner, image_index = index, error = %e, "Dropping image: analysis failed");
                return Vec::new();
            }
        };

        let raw_items = match normalize_items(&outcome.text) {
            Ok(items) => items,
            Err(e) => {
                warn!(owner = %owner, image_index = index, model = %outcome.model, error = %e, "Dropping image: unusable reply");
                return Vec::new();
            }
        };

        let mut reports = Vec::new();
        for (item_index, raw) in raw_items.into_iter().enumerate() {
            let Some(item) = AnalyzedQuestion::from_value(raw) else {
                warn!(owner = %owner, image_index = index, item_index, "Skipping item without question content");
                continue;
            };
            match self.process_item(request, &outcome.model, stored, &item).await {
                Ok(report) => reports.push(report),
                Err(e) => {
                    warn!(owner = %owner, image_index = index, item_index, error = %e, "Skipping item");
                }
            }
        }

        if reports.is_empty() {
            warn!(owner = %owner, image_index = index, "Dropping image: no item could be recorded");
        }
        reports
    }

    async fn process_item(
        &self,
        request: &IngestRequest,
        model: &str,
        stored: &StoredImage,
        item: &AnalyzedQuestion,
    ) -> IngestResult<ItemReport> {
        let owner = request.owner;

        let (question_id, created) = match self.dedup.check(owner, &item.content).await? {
            DedupDecision::Duplicate { question_id, .. } => {
                if let Err(e) = questions::append_image(&self.db, question_id, &stored.url).await {
                    warn!(question_id = %question_id, error = %e, "Could not attach image to existing question");
                }
                (question_id, false)
            }
            DedupDecision::New { embedding } => {
                let question = NewQuestion {
                    user_id: owner,
                    subject: request.subject,
                    content: item.content.clone(),
                    images: vec![stored.url.clone()],
                    knowledge_points: item.knowledge_points.clone(),
                    error_type: item.error_type.clone(),
                    error_analysis: item.error_analysis.clone(),
                    solution: item.solution.clone(),
                    difficulty: item.difficulty,
                    embedding,
                    is_reference: false,
                    meta_data: json!({
                        "model": model,
                        "is_mistake": item.is_mistake,
                        "marking_details": item.marking_details,
                        "solution": item.solution,
                        "storage_path": stored.path,
                        "content_hash": content_hash(&item.content),
                    }),
                    occurred_at: Some(request.occurred_at.unwrap_or_else(chrono::Utc::now)),
                };
                (questions::insert_question(&self.db, &question).await?, true)
            }
        };

        let new_mistake = mistakes::link(&self.db, owner, question_id).await?;

        Ok(ItemReport {
            question_id,
            created,
            new_mistake,
        })
    }
}

/// SHA-256 of whitespace-normalized content, lowercase hex
pub fn content_hash(content: &str) -> String {
    let digest = Sha256::digest(prepare_text(content, usize::MAX).as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}
