//! Retry of SQLite writes that hit "database is locked"
//!
//! Writes from concurrently analyzed images share one database file, so a
//! writer can briefly find the file locked beyond the connection busy
//! timeout. Those errors are retried with exponential backoff (10 ms doubling
//! to 1 s) until `database_max_lock_wait_ms` has elapsed.

use scholar_common::{Error, Result};
use sqlx::SqlitePool;
use std::future::Future;
use std::time::{Duration, Instant};

const INITIAL_BACKOFF_MS: u64 = 10;
const MAX_BACKOFF_MS: u64 = 1000;
const DEFAULT_MAX_LOCK_WAIT_MS: i64 = 5000;

/// Read the retry budget from the settings table
pub async fn max_lock_wait_ms(pool: &SqlitePool) -> u64 {
    match scholar_common::db::get_setting_i64(pool, "database_max_lock_wait_ms", DEFAULT_MAX_LOCK_WAIT_MS).await {
        Ok(ms) if ms > 0 => ms as u64,
        Ok(_) => DEFAULT_MAX_LOCK_WAIT_MS as u64,
        Err(e) => {
            tracing::warn!(error = %e, "Could not read database_max_lock_wait_ms, using default");
            DEFAULT_MAX_LOCK_WAIT_MS as u64
        }
    }
}

fn is_lock_error(err: &Error) -> bool {
    match err {
        Error::Database(db_err) => {
            let text = db_err.to_string();
            text.contains("database is locked") || text.contains("database table is locked")
        }
        _ => false,
    }
}

/// Run `operation` until it succeeds, fails with a non-lock error, or the
/// `max_wait_ms` budget is spent
pub async fn retry_on_lock<F, Fut, T>(operation_name: &str, max_wait_ms: u64, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let started = Instant::now();
    let budget = Duration::from_millis(max_wait_ms);
    let mut backoff_ms = INITIAL_BACKOFF_MS;
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        let err = match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::debug!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Write succeeded after lock retry"
                    );
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        if !is_lock_error(&err) {
            return Err(err);
        }

        let elapsed = started.elapsed();
        if elapsed >= budget {
            tracing::error!(
                operation = operation_name,
                attempt,
                elapsed_ms = elapsed.as_millis() as u64,
                max_wait_ms,
                "Giving up on locked database"
            );
            return Err(Error::Internal(format!(
                "{}: database locked after {} attempts ({} ms)",
                operation_name,
                attempt,
                elapsed.as_millis()
            )));
        }

        tracing::warn!(
            operation = operation_name,
            attempt,
            backoff_ms,
            "Database locked, backing off"
        );
        tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
        backoff_ms = (backoff_ms * 2).min(MAX_BACKOFF_MS);
    }
}
