//! Store operations for scholar-ai
//!
//! Schema creation lives in `scholar_common::db::init`; these modules read and
//! write the rows.

pub mod knowledge;
pub mod mistakes;
pub mod practice;
pub mod questions;
pub mod settings;

use scholar_common::{Error, Result};
use uuid::Uuid;

/// Parse a TEXT identity column
pub(crate) fn parse_uuid(text: &str) -> Result<Uuid> {
    Uuid::parse_str(text).map_err(|e| Error::Internal(format!("Invalid stored UUID '{}': {}", text, e)))
}
