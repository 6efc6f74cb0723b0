//! Question rows, embeddings and the nearest-neighbour capability
//!
//! SQLite has no vector index, so nearest-neighbour search loads an owner's
//! embeddings and scores them with cosine similarity in process.

use super::parse_uuid;
use crate::models::{NewQuestion, QuestionRecord, ReferenceExemplar, Subject};
use crate::utils::{max_lock_wait_ms, retry_on_lock};
use chrono::{DateTime, Utc};
use scholar_common::time::{from_db, now, to_db};
use scholar_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Encode a vector as little-endian f32 bytes
pub fn encode_embedding(vector: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vector.len() * 4);
    for value in vector {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Decode little-endian f32 bytes
pub fn decode_embedding(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(Error::Internal(format!(
            "Embedding blob length {} is not a multiple of 4",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Cosine similarity; 0.0 for mismatched lengths or zero vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())) as f32
}

fn json_list(text: &str) -> Result<Vec<String>> {
    Ok(serde_json::from_str(text)?)
}

fn row_to_question(row: &SqliteRow) -> Result<QuestionRecord> {
    let id: String = row.try_get("id")?;
    let user_id: String = row.try_get("user_id")?;
    let subject: String = row.try_get("subject")?;
    let images: String = row.try_get("images")?;
    let knowledge_points: String = row.try_get("knowledge_points")?;
    let difficulty: i64 = row.try_get("difficulty")?;
    let embedding: Option<Vec<u8>> = row.try_get("embedding")?;
    let meta_data: String = row.try_get("meta_data")?;
    let occurred_at: Option<String> = row.try_get("occurred_at")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(QuestionRecord {
        id: parse_uuid(&id)?,
        user_id: parse_uuid(&user_id)?,
        subject: subject.parse::<Subject>().map_err(Error::Internal)?,
        content: row.try_get("content")?,
        images: json_list(&images)?,
        knowledge_points: json_list(&knowledge_points)?,
        error_type: row.try_get("error_type")?,
        error_analysis: row.try_get("error_analysis")?,
        solution: row.try_get("solution")?,
        difficulty: difficulty.clamp(1, 5) as u8,
        embedding: match embedding {
            Some(bytes) => decode_embedding(&bytes)?,
            None => Vec::new(),
        },
        is_reference: row.try_get::<i64, _>("is_reference")? != 0,
        meta_data: serde_json::from_str(&meta_data)?,
        occurred_at: occurred_at.as_deref().map(from_db).transpose()?,
        created_at: from_db(&created_at)?,
    })
}

/// Insert a question row, returning its new identity
pub async fn insert_question(pool: &SqlitePool, question: &NewQuestion) -> Result<Uuid> {
    let id = Uuid::new_v4();
    let images = serde_json::to_string(&question.images)?;
    let knowledge_points = serde_json::to_string(&question.knowledge_points)?;
    let meta_data = serde_json::to_string(&question.meta_data)?;
    let embedding = encode_embedding(&question.embedding);
    let occurred_at = question.occurred_at.as_ref().map(to_db);
    let created_at = to_db(&now());

    let max_wait = max_lock_wait_ms(pool).await;
    retry_on_lock("insert question", max_wait, || async {
        sqlx::query(
            r#"
            INSERT INTO questions (
                id, user_id, subject, content, images, knowledge_points,
                error_type, error_analysis, solution, difficulty, embedding,
                is_reference, meta_data, occurred_at, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(question.user_id.to_string())
        .bind(question.subject.as_str())
        .bind(&question.content)
        .bind(&images)
        .bind(&knowledge_points)
        .bind(&question.error_type)
        .bind(&question.error_analysis)
        .bind(&question.solution)
        .bind(question.difficulty.clamp(1, 5) as i64)
        .bind(&embedding)
        .bind(question.is_reference as i64)
        .bind(&meta_data)
        .bind(&occurred_at)
        .bind(&created_at)
        .execute(pool)
        .await?;
        Ok(())
    })
    .await?;

    Ok(id)
}

pub async fn get_question(pool: &SqlitePool, id: Uuid) -> Result<Option<QuestionRecord>> {
    let row = sqlx::query("SELECT * FROM questions WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(row_to_question).transpose()
}

/// Fetch a question the owner may read; anything else is `NotFound`
pub async fn get_owned_question(pool: &SqlitePool, owner: Uuid, id: Uuid) -> Result<QuestionRecord> {
    let row = sqlx::query("SELECT * FROM questions WHERE id = ? AND user_id = ?")
        .bind(id.to_string())
        .bind(owner.to_string())
        .fetch_optional(pool)
        .await?;
    match row {
        Some(row) => row_to_question(&row),
        None => Err(Error::NotFound(format!("question {}", id))),
    }
}

/// Most recent reference questions for a subject
pub async fn list_references(pool: &SqlitePool, subject: Subject, limit: i64) -> Result<Vec<ReferenceExemplar>> {
    let rows = sqlx::query(
        r#"
        SELECT content, difficulty FROM questions
        WHERE is_reference = 1 AND subject = ?
        ORDER BY created_at DESC
        LIMIT ?
        "#,
    )
    .bind(subject.as_str())
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let difficulty: Option<i64> = row.try_get("difficulty")?;
            Ok(ReferenceExemplar {
                content: row.try_get("content")?,
                difficulty: difficulty.unwrap_or(3).clamp(1, 5) as u8,
            })
        })
        .collect()
}

/// Owner-scoped nearest neighbours at or above `threshold`, best first
///
/// Reference rows are curated material, not the owner's own history, and are
/// never candidates.
pub async fn nearest_questions(
    pool: &SqlitePool,
    owner: Uuid,
    query: &[f32],
    threshold: f32,
    limit: usize,
) -> Result<Vec<(Uuid, f32)>> {
    let rows = sqlx::query(
        r#"
        SELECT id, embedding FROM questions
        WHERE user_id = ? AND is_reference = 0 AND embedding IS NOT NULL
        "#,
    )
    .bind(owner.to_string())
    .fetch_all(pool)
    .await?;

    let mut scored = Vec::new();
    for row in &rows {
        let id: String = row.try_get("id")?;
        let bytes: Vec<u8> = row.try_get("embedding")?;
        let candidate = decode_embedding(&bytes)?;
        let similarity = cosine_similarity(query, &candidate);
        if similarity >= threshold {
            scored.push((parse_uuid(&id)?, similarity));
        }
    }

    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(limit);
    Ok(scored)
}

/// Append an image URL to a question unless already present
///
/// Single statement so concurrent appends to one question cannot lose URLs.
pub async fn append_image(pool: &SqlitePool, id: Uuid, url: &str) -> Result<()> {
    let max_wait = max_lock_wait_ms(pool).await;
    let appended = retry_on_lock("append question image", max_wait, || async {
        let result = sqlx::query(
            r#"
            UPDATE questions SET images = json_insert(images, '$[#]', ?)
            WHERE id = ?
              AND NOT EXISTS (SELECT 1 FROM json_each(questions.images) WHERE value = ?)
            "#,
        )
        .bind(url)
        .bind(id.to_string())
        .bind(url)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    })
    .await?;

    if appended == 0 {
        let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM questions WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(pool)
            .await?;
        if exists.is_none() {
            return Err(Error::NotFound(format!("question {}", id)));
        }
    }
    Ok(())
}

/// Change when the owner attempted the question
pub async fn update_occurred_at(
    pool: &SqlitePool,
    owner: Uuid,
    id: Uuid,
    occurred_at: DateTime<Utc>,
) -> Result<()> {
    let result = sqlx::query("UPDATE questions SET occurred_at = ? WHERE id = ? AND user_id = ?")
        .bind(to_db(&occurred_at))
        .bind(id.to_string())
        .bind(owner.to_string())
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("question {}", id)));
    }
    Ok(())
}

/// Count an owner's non-reference questions
pub async fn count_questions(pool: &SqlitePool, owner: Uuid) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE user_id = ? AND is_reference = 0")
        .bind(owner.to_string())
        .fetch_one(pool)
        .await?;
    Ok(count)
}
