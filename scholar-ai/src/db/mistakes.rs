//! Mistake linkage and lifecycle
//!
//! Every operation is scoped to the owner; an id that exists but belongs to
//! someone else behaves exactly like a missing id.

use super::parse_uuid;
use crate::models::{MistakeRecord, MistakeStatus};
use crate::utils::{max_lock_wait_ms, retry_on_lock};
use scholar_common::time::{from_db, now, to_db};
use scholar_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

fn row_to_mistake(row: &SqliteRow) -> Result<MistakeRecord> {
    let id: String = row.try_get("id")?;
    let question_id: String = row.try_get("question_id")?;
    let user_id: String = row.try_get("user_id")?;
    let status: String = row.try_get("status")?;
    let deleted_at: Option<String> = row.try_get("deleted_at")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(MistakeRecord {
        id: parse_uuid(&id)?,
        question_id: parse_uuid(&question_id)?,
        user_id: parse_uuid(&user_id)?,
        status: status.parse::<MistakeStatus>().map_err(Error::Internal)?,
        deleted_at: deleted_at.as_deref().map(from_db).transpose()?,
        created_at: from_db(&created_at)?,
    })
}

/// Active, non-deleted mistake for (owner, question), if any
pub async fn find_active(pool: &SqlitePool, owner: Uuid, question_id: Uuid) -> Result<Option<Uuid>> {
    let id: Option<String> = sqlx::query_scalar(
        r#"
        SELECT id FROM mistakes
        WHERE user_id = ? AND question_id = ? AND status = 'active' AND deleted_at IS NULL
        LIMIT 1
        "#,
    )
    .bind(owner.to_string())
    .bind(question_id.to_string())
    .fetch_optional(pool)
    .await?;
    id.as_deref().map(parse_uuid).transpose()
}

/// Insert an active mistake row
pub async fn insert(pool: &SqlitePool, owner: Uuid, question_id: Uuid) -> Result<Uuid> {
    let id = Uuid::new_v4();
    let created_at = to_db(&now());
    let max_wait = max_lock_wait_ms(pool).await;

    retry_on_lock("insert mistake", max_wait, || async {
        sqlx::query(
            "INSERT INTO mistakes (id, question_id, user_id, status, created_at) VALUES (?, ?, ?, 'active', ?)",
        )
        .bind(id.to_string())
        .bind(question_id.to_string())
        .bind(owner.to_string())
        .bind(&created_at)
        .execute(pool)
        .await?;
        Ok(())
    })
    .await?;

    Ok(id)
}

/// Link (owner, question) as a tracked mistake unless an active one exists
///
/// Returns `true` when a row was inserted. The check and insert are two
/// statements, so two concurrent callers can still both insert.
pub async fn link(pool: &SqlitePool, owner: Uuid, question_id: Uuid) -> Result<bool> {
    if find_active(pool, owner, question_id).await?.is_some() {
        return Ok(false);
    }
    insert(pool, owner, question_id).await?;
    Ok(true)
}

pub async fn get(pool: &SqlitePool, owner: Uuid, id: Uuid) -> Result<MistakeRecord> {
    let row = sqlx::query("SELECT * FROM mistakes WHERE id = ? AND user_id = ?")
        .bind(id.to_string())
        .bind(owner.to_string())
        .fetch_optional(pool)
        .await?;
    match row {
        Some(row) => row_to_mistake(&row),
        None => Err(Error::NotFound(format!("mistake {}", id))),
    }
}

/// Visible mistakes, newest first
pub async fn list_active(pool: &SqlitePool, owner: Uuid) -> Result<Vec<MistakeRecord>> {
    let rows = sqlx::query(
        "SELECT * FROM mistakes WHERE user_id = ? AND deleted_at IS NULL ORDER BY created_at DESC",
    )
    .bind(owner.to_string())
    .fetch_all(pool)
    .await?;
    rows.iter().map(row_to_mistake).collect()
}

/// Soft-deleted mistakes, most recently deleted first
pub async fn list_trash(pool: &SqlitePool, owner: Uuid) -> Result<Vec<MistakeRecord>> {
    let rows = sqlx::query(
        "SELECT * FROM mistakes WHERE user_id = ? AND deleted_at IS NOT NULL ORDER BY deleted_at DESC",
    )
    .bind(owner.to_string())
    .fetch_all(pool)
    .await?;
    rows.iter().map(row_to_mistake).collect()
}

pub async fn set_status(pool: &SqlitePool, owner: Uuid, id: Uuid, status: MistakeStatus) -> Result<()> {
    let result = sqlx::query("UPDATE mistakes SET status = ? WHERE id = ? AND user_id = ?")
        .bind(status.as_str())
        .bind(id.to_string())
        .bind(owner.to_string())
        .execute(pool)
        .await?;
    expect_one(result.rows_affected(), id)
}

pub async fn soft_delete(pool: &SqlitePool, owner: Uuid, id: Uuid) -> Result<()> {
    let affected = bulk_soft_delete(pool, owner, &[id]).await?;
    expect_one(affected, id)
}

pub async fn restore(pool: &SqlitePool, owner: Uuid, id: Uuid) -> Result<()> {
    let affected = bulk_restore(pool, owner, &[id]).await?;
    expect_one(affected, id)
}

/// Remove a trashed mistake for good; rows not in the trash are untouched
pub async fn permanent_delete(pool: &SqlitePool, owner: Uuid, id: Uuid) -> Result<()> {
    let affected = bulk_permanent_delete(pool, owner, &[id]).await?;
    expect_one(affected, id)
}

/// Move mistakes to the trash; already-trashed rows keep their timestamp
pub async fn bulk_soft_delete(pool: &SqlitePool, owner: Uuid, ids: &[Uuid]) -> Result<u64> {
    execute_for_ids(
        pool,
        "UPDATE mistakes SET deleted_at = ? WHERE deleted_at IS NULL AND user_id = ?",
        vec![to_db(&now()), owner.to_string()],
        ids,
        "soft delete mistakes",
    )
    .await
}

pub async fn bulk_restore(pool: &SqlitePool, owner: Uuid, ids: &[Uuid]) -> Result<u64> {
    execute_for_ids(
        pool,
        "UPDATE mistakes SET deleted_at = NULL WHERE deleted_at IS NOT NULL AND user_id = ?",
        vec![owner.to_string()],
        ids,
        "restore mistakes",
    )
    .await
}

pub async fn bulk_permanent_delete(pool: &SqlitePool, owner: Uuid, ids: &[Uuid]) -> Result<u64> {
    execute_for_ids(
        pool,
        "DELETE FROM mistakes WHERE deleted_at IS NOT NULL AND user_id = ?",
        vec![owner.to_string()],
        ids,
        "purge mistakes",
    )
    .await
}

/// Run `statement` restricted to `ids`, returning the affected row count
async fn execute_for_ids(
    pool: &SqlitePool,
    statement: &str,
    leading_binds: Vec<String>,
    ids: &[Uuid],
    operation: &str,
) -> Result<u64> {
    if ids.is_empty() {
        return Ok(0);
    }
    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!("{} AND id IN ({})", statement, placeholders);
    let binds: Vec<String> = leading_binds
        .into_iter()
        .chain(ids.iter().map(Uuid::to_string))
        .collect();

    let max_wait = max_lock_wait_ms(pool).await;
    retry_on_lock(operation, max_wait, || async {
        let mut query = sqlx::query(&sql);
        for value in &binds {
            query = query.bind(value);
        }
        let result = query.execute(pool).await?;
        Ok(result.rows_affected())
    })
    .await
}

fn expect_one(affected: u64, id: Uuid) -> Result<()> {
    if affected == 0 {
        return Err(Error::NotFound(format!("mistake {}", id)));
    }
    Ok(())
}
