// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! The single chokepoint for authenticated API calls.
//!
//! Every request builds its headers fresh, attaches the current bearer token
//! and classifies failures into [`PodError`]. A 401 on the first attempt
//! forces a token refresh and exactly one retry; a second 401 is terminal.
//! Transport failures are wrapped, never retried — the external poller owns
//! the retry schedule.

use reqwest::{header, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::auth::{Token, TokenManager};
use crate::config::Config;
use crate::error::{PodError, Result};

/// User agent the vendor API expects from mobile clients.
pub(crate) const USER_AGENT: &str = "okhttp/4.9.3";

/// Gateway for all authenticated REST calls.
pub(crate) struct ApiGateway {
    http: reqwest::Client,
    tokens: TokenManager,
}

impl ApiGateway {
    pub(crate) fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {e}"))?;
        let tokens = TokenManager::new(http.clone(), config);
        Ok(Self { http, tokens })
    }

    /// Authenticate eagerly (used at session start so credential problems
    /// surface before the first data fetch).
    pub(crate) async fn ensure_authenticated(&self) -> Result<()> {
        self.tokens.current().await.map(|_| ())
    }

    /// GET returning a decoded JSON payload.
    pub(crate) async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.get_with_query(url, &[]).await
    }

    /// GET with query parameters, returning a decoded JSON payload.
    pub(crate) async fn get_with_query<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let response = self.dispatch(Method::GET, url, query, None).await?;
        let response = check(response, url).await?;
        response.json().await.map_err(|e| {
            PodError::request(None, format!("Failed to decode response from {url}: {e}"))
        })
    }

    /// PUT with a JSON body; the response payload, if any, is discarded.
    pub(crate) async fn put(&self, url: &str, body: &impl Serialize) -> Result<()> {
        self.send_body(Method::PUT, url, body).await
    }

    /// POST with a JSON body; the response payload, if any, is discarded.
    pub(crate) async fn post(&self, url: &str, body: &impl Serialize) -> Result<()> {
        self.send_body(Method::POST, url, body).await
    }

    async fn send_body(&self, method: Method, url: &str, body: &impl Serialize) -> Result<()> {
        let body = serde_json::to_value(body)
            .map_err(|e| anyhow::anyhow!("Failed to serialize request body: {e}"))?;
        let response = self.dispatch(method, url, &[], Some(&body)).await?;
        check(response, url).await?;
        Ok(())
    }

    /// Issue the call, transparently re-authenticating once on 401.
    async fn dispatch(
        &self,
        method: Method,
        url: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<reqwest::Response> {
        let token = self.tokens.current().await?;
        let response = self
            .send_once(method.clone(), url, query, body, &token)
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::info!(%method, url, "Unauthorized (401), refreshing token and retrying");
            let token = self.tokens.refresh_after_unauthorized(&token).await?;
            // A second 401 falls through to status classification as terminal
            return self.send_once(method, url, query, body, &token).await;
        }

        Ok(response)
    }

    async fn send_once(
        &self,
        method: Method,
        url: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
        token: &Token,
    ) -> Result<reqwest::Response> {
        // Headers are constructed per call; nothing mutable is shared
        // between in-flight requests.
        let mut request = self
            .http
            .request(method.clone(), url)
            .header(header::USER_AGENT, USER_AGENT)
            .header(header::ACCEPT, "application/json")
            .bearer_auth(&token.bearer_token);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        request.send().await.map_err(|e| {
            PodError::request(None, format!("Network error during {method} {url}: {e}"))
        })
    }
}

/// Classify a response status, capturing the body of failures for
/// diagnostics.
async fn check(response: reqwest::Response, url: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::error!(status = status.as_u16(), url, body = %body, "API request failed");
    Err(PodError::request(
        Some(status.as_u16()),
        format!("HTTP {status} from {url}: {body}"),
    ))
}
