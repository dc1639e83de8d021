//! Unit tests for registry client

use super::*;

use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer, max_retries: u32) -> RegistryClient {
    RegistryClient::with_options(ClientOptions {
        base_url: server.uri(),
        retry: RetryConfig {
            max_retries,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            multiplier: 2.0,
        },
        ..ClientOptions::default()
    })
    .unwrap()
}

#[tokio::test]
async fn test_registry_client_creation() {
    let client = RegistryClient::new().unwrap();
    assert_eq!(client.base_url(), "https://registry.npmjs.org");
    assert_eq!(client.retry_config.max_retries, 3);
}

#[tokio::test]
async fn test_registry_client_with_auth() {
    let auth = AuthConfig {
        token: Some("test-token".to_string()),
        ..AuthConfig::default()
    };

    let client = RegistryClient::with_auth(auth).unwrap();
    assert_eq!(client.base_url(), "https://registry.npmjs.org");
}

#[test]
fn test_invalid_registry_url() {
    let result = RegistryClient::with_options(ClientOptions {
        base_url: "not a url".to_string(),
        ..ClientOptions::default()
    });

    match result {
        Err(BumpError::ConfigValidation { field, .. }) => assert_eq!(field, "registry.url"),
        other => panic!("Expected ConfigValidation error, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_encode_package_name() {
    let client = RegistryClient::new().unwrap();

    assert_eq!(client.encode_package_name("lodash"), "lodash");
    assert_eq!(client.encode_package_name("@types/node"), "@types%2fnode");
}

#[tokio::test]
async fn test_fetch_metadata_success() {
    let mock_server = MockServer::start().await;

    let mock_response = serde_json::json!({
        "name": "test-package",
        "dist-tags": { "latest": "1.1.0" },
        "versions": {
            "1.0.0": { "version": "1.0.0" },
            "1.1.0": {
                "version": "1.1.0",
                "peerDependencies": { "react": "^18.0.0" }
            }
        }
    });

    Mock::given(method("GET"))
        .and(path("/test-package"))
        .and(header("Accept", "application/vnd.npm.install-v1+json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&mock_response))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, 0);
    let metadata = client.fetch_metadata("test-package").await.unwrap();

    assert_eq!(metadata.name, "test-package");
    assert_eq!(metadata.latest(), Some("1.1.0"));
    assert_eq!(metadata.version("1.1.0").unwrap().peer_range("react"), Some("^18.0.0"));
}

#[tokio::test]
async fn test_fetch_metadata_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/nonexistent-package"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, 3);
    let result = client.fetch_metadata("nonexistent-package").await;

    match result.unwrap_err() {
        BumpError::PackageNotFound { name } => assert_eq!(name, "nonexistent-package"),
        other => panic!("Expected PackageNotFound error, got {}", other),
    }
}

#[tokio::test]
async fn test_fetch_metadata_forbidden_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/private-package"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, 3);
    let result = client.fetch_metadata("private-package").await;

    assert!(matches!(result, Err(BumpError::PermissionDenied { .. })));
}

#[tokio::test]
async fn test_server_errors_are_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, 2);
    let result = client.fetch_metadata("flaky").await;

    match result.unwrap_err() {
        BumpError::Network { message, .. } => assert!(message.contains("503")),
        other => panic!("Expected Network error, got {}", other),
    }
}

#[tokio::test]
async fn test_scoped_package_url_encoding() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/@types%2fnode"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "@types/node",
            "dist-tags": { "latest": "1.0.0" },
            "versions": {}
        })))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, 0);
    let result = client.fetch_metadata("@types/node").await;
    assert!(result.is_ok());
}
