//! Practice records: generated variants and the student's answers

use super::parse_uuid;
use crate::models::{PracticeRecord, VariantResult};
use crate::utils::{max_lock_wait_ms, retry_on_lock};
use scholar_common::time::{from_db, now, to_db};
use scholar_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

fn row_to_record(row: &SqliteRow) -> Result<PracticeRecord> {
    let id: String = row.try_get("id")?;
    let user_id: String = row.try_get("user_id")?;
    let question_id: String = row.try_get("question_id")?;
    let variant: String = row.try_get("variant_content")?;
    let is_correct: Option<i64> = row.try_get("is_correct")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(PracticeRecord {
        id: parse_uuid(&id)?,
        user_id: parse_uuid(&user_id)?,
        question_id: parse_uuid(&question_id)?,
        variant: serde_json::from_str(&variant)?,
        is_correct: is_correct.map(|v| v != 0),
        created_at: from_db(&created_at)?,
    })
}

/// Store a freshly generated variant (unanswered)
pub async fn insert(
    pool: &SqlitePool,
    owner: Uuid,
    question_id: Uuid,
    variant: &VariantResult,
) -> Result<PracticeRecord> {
    let record = PracticeRecord {
        id: Uuid::new_v4(),
        user_id: owner,
        question_id,
        variant: variant.clone(),
        is_correct: None,
        created_at: now(),
    };
    let variant_json = serde_json::to_string(&record.variant)?;
    let created_at = to_db(&record.created_at);

    let max_wait = max_lock_wait_ms(pool).await;
    retry_on_lock("insert practice record", max_wait, || async {
        sqlx::query(
            r#"
            INSERT INTO practice_records (id, user_id, question_id, variant_content, is_correct, created_at)
            VALUES (?, ?, ?, ?, NULL, ?)
            "#,
        )
        .bind(record.id.to_string())
        .bind(owner.to_string())
        .bind(question_id.to_string())
        .bind(&variant_json)
        .bind(&created_at)
        .execute(pool)
        .await?;
        Ok(())
    })
    .await?;

    Ok(record)
}

/// Practice history for one question, newest first
pub async fn list_for_question(pool: &SqlitePool, owner: Uuid, question_id: Uuid) -> Result<Vec<PracticeRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT * FROM practice_records
        WHERE user_id = ? AND question_id = ?
        ORDER BY created_at DESC
        "#,
    )
    .bind(owner.to_string())
    .bind(question_id.to_string())
    .fetch_all(pool)
    .await?;
    rows.iter().map(row_to_record).collect()
}

/// Record whether the student answered the variant correctly
pub async fn record_answer(pool: &SqlitePool, owner: Uuid, id: Uuid, is_correct: bool) -> Result<()> {
    let result = sqlx::query("UPDATE practice_records SET is_correct = ? WHERE id = ? AND user_id = ?")
        .bind(is_correct as i64)
        .bind(id.to_string())
        .bind(owner.to_string())
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("practice record {}", id)));
    }
    Ok(())
}
