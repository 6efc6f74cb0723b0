//! Common error types for Scholar Lens

use thiserror::Error;

/// Common result type for Scholar Lens operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors shared by the store, configuration and service layers
#[derive(Error, Debug)]
pub enum Error {
    /// Store query or connection failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Filesystem failure (blob writes, database directory creation)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON column could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Missing or unusable configuration (API keys, root folder, TOML)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Row addressed by identity does not exist (or is not owned by the caller)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller supplied a value the store cannot accept
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Stored data violates an invariant (bad UUID text, ragged embedding blob)
    #[error("Internal error: {0}")]
    Internal(String),
}
