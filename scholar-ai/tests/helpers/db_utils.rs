//! Database fixtures

use super::fakes::{FakeEmbedder, MemoryBlobStore, ScriptedModel};
use scholar_ai::config::PipelineConfig;
use scholar_ai::AppState;
use sqlx::SqlitePool;
use std::sync::Arc;
use tempfile::TempDir;

/// Dimension used by every test embedding
pub const TEST_DIMENSION: usize = 64;

/// Create a temporary database with the full schema
///
/// The TempDir must be kept alive for the duration of the test
pub async fn create_test_db() -> (TempDir, SqlitePool) {
    let temp_dir = TempDir::new().unwrap();
    let pool = scholar_common::db::init_database(&temp_dir.path().join("scholar.db"))
        .await
        .unwrap();
    (temp_dir, pool)
}

/// Small, fast pipeline settings with two model variants
pub fn test_config() -> PipelineConfig {
    PipelineConfig {
        embedding_dimension: TEST_DIMENSION,
        model_variants: vec!["flash".to_string(), "pro".to_string()],
        model_timeout_secs: 5,
        ..PipelineConfig::default()
    }
}

pub fn test_state(
    pool: &SqlitePool,
    model: Arc<ScriptedModel>,
    embedder: Arc<FakeEmbedder>,
    blobs: Arc<MemoryBlobStore>,
) -> AppState {
    AppState::new(pool.clone(), model, embedder, blobs, test_config())
}

/// `SELECT COUNT(*)` helper
pub async fn count_rows(pool: &SqlitePool, sql: &str) -> i64 {
    sqlx::query_scalar(sql).fetch_one(pool).await.unwrap()
}
