use daytona::config::{Config, API_KEY_ENV, DEFAULT_API_URL};
use daytona::prelude::*;

#[tokio::test]
async fn test_client_creation() {
    let client = Client::with_api_key("test_key").unwrap();
    assert_eq!(client.config().api_key, "test_key");
}

// Everything that touches DAYTONA_API_KEY lives in this one test so parallel
// tests never observe a half-set environment.
#[tokio::test]
async fn test_api_key_from_environment() {
    std::env::remove_var(API_KEY_ENV);
    match Client::new() {
        Err(Error::ApiKeyNotFound) => (),
        Err(other) => panic!("Expected ApiKeyNotFound error, got {other:?}"),
        Ok(_) => panic!("Expected ApiKeyNotFound error"),
    }
    match Client::with_api_key("") {
        Err(Error::ApiKeyNotFound) => (),
        Err(other) => panic!("Expected ApiKeyNotFound error, got {other:?}"),
        Ok(_) => panic!("Expected ApiKeyNotFound error"),
    }

    std::env::set_var(API_KEY_ENV, "test_env_key");
    let from_env = Client::new();
    let empty_literal = Client::with_api_key("");
    let literal = Client::with_api_key("literal_key");
    std::env::remove_var(API_KEY_ENV);

    assert_eq!(from_env.unwrap().config().api_key, "test_env_key");
    assert_eq!(empty_literal.unwrap().config().api_key, "test_env_key");
    assert_eq!(literal.unwrap().config().api_key, "literal_key");
}

#[tokio::test]
async fn test_custom_server_url() {
    let config = Config::with_api_key("test_key").api_url("https://api.daytona.ai");
    let client = Client::with_config(config).unwrap();
    assert_eq!(client.config().api_url, "https://api.daytona.ai");
}

#[tokio::test]
async fn test_default_server_url() {
    let config = Config::from_lookup(|key| (key == API_KEY_ENV).then(|| "k".to_string())).unwrap();
    assert_eq!(config.api_url, DEFAULT_API_URL);
}

#[tokio::test]
async fn test_invalid_api_key_header() {
    let result = Client::with_api_key("bad\nkey");
    assert!(matches!(result, Err(Error::Configuration(_))));
}

#[tokio::test]
async fn test_builders() {
    let client = Client::with_api_key("test_key").unwrap();

    let _sandbox = client
        .sandbox()
        .snapshot("scira-analysis-sandbox")
        .language("python")
        .auto_stop_interval(0)
        .env_var("MPLBACKEND", "Agg")
        .label("purpose", "stock-analysis")
        .timeout(0);

    let params = client
        .snapshot()
        .name("test-snapshot")
        .image(Image::base("python:3.12-slim"))
        .resources(Resources::new(1, 1, 3))
        .entrypoint(["sleep", "infinity"])
        .params()
        .unwrap();
    assert_eq!(params.name, "test-snapshot");
    assert_eq!(params.resources, Some(Resources::new(1, 1, 3)));
    assert_eq!(
        params.entrypoint,
        Some(vec!["sleep".to_string(), "infinity".to_string()])
    );
}

#[tokio::test]
async fn test_error_types() {
    let api_error = Error::Api {
        status: 409,
        message: "Snapshot already exists".to_string(),
    };
    assert_eq!(api_error.to_string(), "API error (409): Snapshot already exists");

    let build_error = Error::BuildFailed {
        name: "scira-analysis:1".to_string(),
        reason: "pip failed".to_string(),
    };
    assert_eq!(
        build_error.to_string(),
        "Snapshot scira-analysis:1 failed to build: pip failed"
    );

    assert!(matches!(Error::Timeout, Error::Timeout));
}
