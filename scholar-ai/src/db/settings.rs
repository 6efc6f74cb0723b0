//! Service-specific settings accessors

use scholar_common::db::{get_setting, set_setting};
use scholar_common::Result;
use sqlx::SqlitePool;

const GEMINI_API_KEY: &str = "gemini_api_key";

/// Stored generative service key, if any
pub async fn get_gemini_api_key(db: &SqlitePool) -> Result<Option<String>> {
    get_setting(db, GEMINI_API_KEY).await
}

/// Persist the generative service key (highest priority source)
pub async fn set_gemini_api_key(db: &SqlitePool, key: &str) -> Result<()> {
    set_setting(db, GEMINI_API_KEY, key.trim()).await
}
