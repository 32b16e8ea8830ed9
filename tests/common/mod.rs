// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use serde_json::json;
use sleeppod::Config;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Config pointed at a mock server instead of the production endpoints.
#[allow(dead_code)]
pub fn test_config(server: &MockServer) -> Config {
    Config::new("sleeper@example.com", "hunter2", "UTC")
        .expect("test config should build")
        .with_api_urls(
            format!("{}/v1/tokens", server.uri()),
            format!("{}/v1", server.uri()),
            server.uri(),
        )
}

/// Mount a happy-path auth endpoint with no call-count expectations.
#[allow(dead_code)]
pub async fn mount_auth(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/tokens"))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_body()))
        .mount(server)
        .await;
}

/// The auth payload used across tests.
#[allow(dead_code)]
pub fn auth_body() -> serde_json::Value {
    json!({
        "access_token": "bearer-token-1",
        "expires_in": 3600,
        "userId": "account-1"
    })
}

/// Mount the account summary with the given feature tokens.
#[allow(dead_code)]
pub async fn mount_account_summary(server: &MockServer, features: &[&str]) {
    Mock::given(method("GET"))
        .and(path("/v1/users/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": {
                "userId": "account-1",
                "devices": ["device-1"],
                "features": features,
            }
        })))
        .mount(server)
        .await;
}
