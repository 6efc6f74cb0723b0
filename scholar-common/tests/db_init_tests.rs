//! Database initialization tests
//!
//! - Database file is created on first run
//! - Re-opening an existing database is idempotent
//! - Every pipeline table exists with the expected columns
//! - Default settings are seeded and NULL settings are repaired

use scholar_common::db::{get_setting, get_setting_i64, init_database, set_setting};
use tempfile::TempDir;

async fn table_columns(pool: &sqlx::SqlitePool, table: &str) -> Vec<String> {
    sqlx::query_scalar::<_, String>(&format!("SELECT name FROM pragma_table_info('{}')", table))
        .fetch_all(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("nested").join("scholar.db");

    let result = init_database(&db_path).await;

    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("scholar.db");

    let pool1 = init_database(&db_path).await.unwrap();
    pool1.close().await;

    let pool2 = init_database(&db_path).await;
    assert!(pool2.is_ok(), "Failed to open existing database: {:?}", pool2.err());
}

#[tokio::test]
async fn test_pipeline_tables_created() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("scholar.db")).await.unwrap();

    let questions = table_columns(&pool, "questions").await;
    for col in [
        "id", "user_id", "subject", "content", "images", "knowledge_points", "error_type",
        "error_analysis", "solution", "difficulty", "embedding", "is_reference", "meta_data",
        "occurred_at", "created_at",
    ] {
        assert!(questions.contains(&col.to_string()), "questions.{} missing", col);
    }

    let mistakes = table_columns(&pool, "mistakes").await;
    for col in ["id", "question_id", "user_id", "status", "deleted_at", "created_at"] {
        assert!(mistakes.contains(&col.to_string()), "mistakes.{} missing", col);
    }

    assert!(!table_columns(&pool, "practice_records").await.is_empty());
    assert!(!table_columns(&pool, "knowledge_base").await.is_empty());
}

#[tokio::test]
async fn test_difficulty_check_constraint() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("scholar.db")).await.unwrap();

    let result = sqlx::query(
        "INSERT INTO questions (id, user_id, subject, content, difficulty, created_at) VALUES ('q', 'u', 'math', 'x', 9, '2026-01-01T00:00:00Z')",
    )
    .execute(&pool)
    .await;

    assert!(result.is_err(), "difficulty outside 1-5 must be rejected");
}

#[tokio::test]
async fn test_default_settings_initialized() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("scholar.db")).await.unwrap();

    assert_eq!(get_setting_i64(&pool, "database_max_lock_wait_ms", 0).await.unwrap(), 5000);
    // Backoff steps are fixed in the retry helper, only the total wait is tunable
    assert!(get_setting(&pool, "database_lock_retry_ms").await.unwrap().is_none());
}

#[tokio::test]
async fn test_null_setting_reset_on_startup() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("scholar.db");
    let pool = init_database(&db_path).await.unwrap();

    sqlx::query("UPDATE settings SET value = NULL WHERE key = 'database_max_lock_wait_ms'")
        .execute(&pool)
        .await
        .unwrap();
    pool.close().await;

    let pool = init_database(&db_path).await.unwrap();
    assert_eq!(
        get_setting(&pool, "database_max_lock_wait_ms").await.unwrap(),
        Some("5000".to_string())
    );
}

#[tokio::test]
async fn test_set_setting_overwrites() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("scholar.db")).await.unwrap();

    set_setting(&pool, "gemini_api_key", "first").await.unwrap();
    set_setting(&pool, "gemini_api_key", "second").await.unwrap();

    assert_eq!(
        get_setting(&pool, "gemini_api_key").await.unwrap(),
        Some("second".to_string())
    );
    assert_eq!(get_setting(&pool, "missing_key").await.unwrap(), None);
}
