//! Test helper utilities
//!
//! Shared fixtures for scholar-ai integration tests

#![allow(dead_code)]

pub mod db_utils;
pub mod fakes;
pub mod log_capture;

pub use db_utils::{count_rows, create_test_db, test_config, test_state};
pub use fakes::{png, FakeEmbedder, MemoryBlobStore, ScriptedModel};
pub use log_capture::LogCapture;
