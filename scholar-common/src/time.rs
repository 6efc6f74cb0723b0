//! Timestamp utilities
//!
//! All timestamps are stored as RFC 3339 text with microsecond precision and
//! a `Z` suffix, so lexical order in SQL matches chronological order.

use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Format a timestamp for storage
pub fn to_db(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp
pub fn from_db(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Invalid stored timestamp '{}': {}", text, e)))
}

/// Parse a user-supplied date: either `YYYY-MM-DD` (midnight UTC) or a full
/// RFC 3339 timestamp
pub fn parse_user_date(text: &str) -> Result<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        let midnight = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| Error::InvalidInput(format!("Invalid date: {}", text)))?;
        return Ok(midnight.and_utc());
    }
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| Error::InvalidInput(format!("Expected YYYY-MM-DD or RFC 3339 date, got '{}'", text)))
}
