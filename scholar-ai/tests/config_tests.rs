//! API key resolution: Database → ENV → TOML

mod helpers;

use helpers::create_test_db;
use scholar_ai::config::{resolve_gemini_api_key, API_KEY_ENV};
use scholar_ai::db::settings::set_gemini_api_key;
use scholar_common::config::TomlConfig;
use scholar_common::Error;
use serial_test::serial;

fn toml_with_key(key: Option<&str>) -> TomlConfig {
    TomlConfig {
        gemini_api_key: key.map(str::to_string),
        ..Default::default()
    }
}

#[tokio::test]
#[serial]
async fn test_database_key_wins() {
    let (_dir, pool) = create_test_db().await;
    set_gemini_api_key(&pool, "db-key").await.unwrap();
    std::env::set_var(API_KEY_ENV, "env-key");

    let key = resolve_gemini_api_key(&pool, &toml_with_key(Some("toml-key"))).await.unwrap();
    assert_eq!(key, "db-key");

    std::env::remove_var(API_KEY_ENV);
}

#[tokio::test]
#[serial]
async fn test_env_key_beats_toml() {
    let (_dir, pool) = create_test_db().await;
    std::env::set_var(API_KEY_ENV, "env-key");

    let key = resolve_gemini_api_key(&pool, &toml_with_key(Some("toml-key"))).await.unwrap();
    assert_eq!(key, "env-key");

    std::env::remove_var(API_KEY_ENV);
}

#[tokio::test]
#[serial]
async fn test_toml_key_used_last() {
    let (_dir, pool) = create_test_db().await;
    std::env::remove_var(API_KEY_ENV);

    let key = resolve_gemini_api_key(&pool, &toml_with_key(Some("toml-key"))).await.unwrap();
    assert_eq!(key, "toml-key");
}

#[tokio::test]
#[serial]
async fn test_blank_keys_are_ignored() {
    let (_dir, pool) = create_test_db().await;
    set_gemini_api_key(&pool, "   ").await.unwrap();
    std::env::set_var(API_KEY_ENV, "");

    let result = resolve_gemini_api_key(&pool, &toml_with_key(Some(" "))).await;
    match result {
        Err(Error::Config(msg)) => assert!(msg.contains(API_KEY_ENV)),
        other => panic!("expected config error, got {:?}", other),
    }

    std::env::remove_var(API_KEY_ENV);
}
