// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Token lifecycle and 401-retry contract.
//!
//! The gateway must reuse a valid token across calls, refresh exactly once
//! on a 401, and treat a second 401 as terminal.

use serde_json::json;
use sleeppod::{PodClient, PodError};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;
use common::{auth_body, mount_account_summary, test_config};

#[tokio::test]
async fn test_token_reused_across_calls() {
    let server = MockServer::start().await;

    // Exactly one auth round trip for any number of API calls
    Mock::given(method("POST"))
        .and(path("/v1/tokens"))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_body()))
        .expect(1)
        .mount(&server)
        .await;
    mount_account_summary(&server, &["cooling"]).await;

    let client = PodClient::new(test_config(&server)).unwrap();
    client.discover_devices().await.unwrap();
    client.discover_devices().await.unwrap();

    assert!(client.is_cooling_capable());
}

#[tokio::test]
async fn test_bearer_token_attached() {
    let server = MockServer::start().await;
    common::mount_auth(&server).await;

    Mock::given(method("GET"))
        .and(path("/v1/users/me"))
        .and(header("authorization", "Bearer bearer-token-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": {"devices": ["device-1"], "features": []}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = PodClient::new(test_config(&server)).unwrap();
    client.discover_devices().await.unwrap();
    assert_eq!(client.device_id().as_deref(), Some("device-1"));
}

#[tokio::test]
async fn test_401_refreshes_token_and_retries_once() {
    let server = MockServer::start().await;

    // Initial auth plus the refresh triggered by the 401
    Mock::given(method("POST"))
        .and(path("/v1/tokens"))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_body()))
        .expect(2)
        .mount(&server)
        .await;

    // First data call is rejected, the retry succeeds
    Mock::given(method("GET"))
        .and(path("/v1/users/me"))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_account_summary(&server, &["cooling", "elevation"]).await;

    let client = PodClient::new(test_config(&server)).unwrap();
    client.discover_devices().await.unwrap();

    assert!(client.is_cooling_capable());
    assert!(client.has_base());
}

#[tokio::test]
async fn test_second_401_is_terminal() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/tokens"))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_body()))
        .expect(2)
        .mount(&server)
        .await;

    // Both the original call and its single retry are rejected; there must
    // be no third attempt.
    Mock::given(method("GET"))
        .and(path("/v1/users/me"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    let client = PodClient::new(test_config(&server)).unwrap();
    let err = client.discover_devices().await.unwrap_err();

    match err {
        PodError::Request { status, .. } => assert_eq!(status, Some(401)),
        other => panic!("Expected Request error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_rejected_credentials_fail_with_auth_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/tokens"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"error": "invalid_grant"})),
        )
        .mount(&server)
        .await;

    let client = PodClient::new(test_config(&server)).unwrap();
    let err = client.start().await.unwrap_err();

    match err {
        PodError::Auth { status, message } => {
            assert_eq!(status, Some(401));
            assert!(message.contains("invalid_grant"));
        }
        other => panic!("Expected Auth error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_http_error_captures_status_and_body() {
    let server = MockServer::start().await;
    common::mount_auth(&server).await;

    Mock::given(method("GET"))
        .and(path("/v1/users/me"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance window"))
        .mount(&server)
        .await;

    let client = PodClient::new(test_config(&server)).unwrap();
    let err = client.discover_devices().await.unwrap_err();

    match err {
        PodError::Request { status, message } => {
            assert_eq!(status, Some(503));
            assert!(message.contains("maintenance window"));
        }
        other => panic!("Expected Request error, got {other:?}"),
    }
}
