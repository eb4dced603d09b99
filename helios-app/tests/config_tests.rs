#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
//! Integration tests for loading and saving `AppConfig`.

use helios_app::{AppConfig, AppError};

#[tokio::test]
async fn missing_file_gives_defaults() {
    let tmp = tempfile::tempdir().expect("failed to create temp dir");
    let config = AppConfig::load(&tmp.path().join("absent.json")).await.unwrap();
    assert_eq!(config, AppConfig::default());
}

#[tokio::test]
async fn file_overrides_defaults() {
    let tmp = tempfile::tempdir().expect("failed to create temp dir");
    let path = tmp.path().join("config.json");
    std::fs::write(&path, r#"{"baseUrl": "http://nas.local:9000", "pageSize": 24}"#).unwrap();

    let config = AppConfig::load(&path).await.unwrap();

    assert_eq!(config.base_url, "http://nas.local:9000");
    assert_eq!(config.page_size, 24);
    assert_eq!(config.max_retries, 0);
    assert_eq!(config.client_config().base_url, "http://nas.local:9000");
}

#[tokio::test]
async fn malformed_file_is_a_config_error() {
    let tmp = tempfile::tempdir().expect("failed to create temp dir");
    let path = tmp.path().join("config.json");
    std::fs::write(&path, "{ not json").unwrap();

    let err = AppConfig::load(&path).await.unwrap_err();

    assert!(matches!(err, AppError::Config { .. }), "unexpected error: {err:?}");
    assert!(err.is_expected());
}

#[tokio::test]
async fn empty_base_url_is_rejected() {
    let tmp = tempfile::tempdir().expect("failed to create temp dir");
    let path = tmp.path().join("config.json");
    std::fs::write(&path, r#"{"baseUrl": "  "}"#).unwrap();

    let err = AppConfig::load(&path).await.unwrap_err();
    assert!(err.to_string().contains("baseUrl"));
}

#[tokio::test]
async fn save_then_load() {
    let tmp = tempfile::tempdir().expect("failed to create temp dir");
    let path = tmp.path().join("nested").join("config.json");
    let config = AppConfig {
        base_url: "https://photos.example".to_string(),
        timeout_secs: 12,
        max_retries: 2,
        page_size: 48,
    };

    config.save(&path).await.unwrap();
    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("\"timeoutSecs\": 12"));

    assert_eq!(AppConfig::load(&path).await.unwrap(), config);
}
