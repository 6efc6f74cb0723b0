//! Knowledge card cache

use crate::models::KnowledgeCard;
use scholar_common::time::{now, to_db};
use scholar_common::Result;
use sqlx::{Row, SqlitePool};

/// Cached card by exact name
pub async fn get_card(pool: &SqlitePool, name: &str) -> Result<Option<KnowledgeCard>> {
    let row = sqlx::query("SELECT name, definition, tips FROM knowledge_base WHERE name = ?")
        .bind(name)
        .fetch_optional(pool)
        .await?;

    let Some(row) = row else {
        return Ok(None);
    };
    let tips: String = row.try_get("tips")?;
    Ok(Some(KnowledgeCard {
        name: row.try_get("name")?,
        definition: row.try_get("definition")?,
        tips: serde_json::from_str(&tips)?,
        cached: true,
    }))
}

/// Cache a card; a concurrent writer's row for the same name wins
pub async fn insert_card(pool: &SqlitePool, card: &KnowledgeCard) -> Result<()> {
    sqlx::query(
        "INSERT OR IGNORE INTO knowledge_base (name, definition, tips, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(&card.name)
    .bind(&card.definition)
    .bind(serde_json::to_string(&card.tips)?)
    .bind(to_db(&now()))
    .execute(pool)
    .await?;
    Ok(())
}
