//! # Scholar Lens Common Library
//!
//! Shared code for Scholar Lens services:
//! - Common error type
//! - Bootstrap configuration (TOML, environment, compiled defaults)
//! - SQLite initialization and settings access
//! - Timestamp helpers

pub mod config;
pub mod db;
pub mod error;
pub mod time;

pub use error::{Error, Result};
