// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bearer-token lifecycle.
//!
//! Tokens come from a password-grant exchange and are replaced wholesale on
//! refresh; nothing ever mutates a [`Token`] in place. Every access path
//! re-validates against the expiry buffer, so there is no externally visible
//! "expired" state. Refresh is single-flight: concurrent callers wait on one
//! in-flight authentication and then reuse its result.

use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::error::{PodError, Result};
use crate::http::USER_AGENT;

/// Margin before token expiration when we proactively refresh.
const TOKEN_TIME_BUFFER_SECS: i64 = 120;

/// An issued bearer token. Immutable once created.
#[derive(Debug, Clone)]
pub struct Token {
    pub bearer_token: String,
    pub expiration: DateTime<Utc>,
    pub account_id: String,
}

impl Token {
    /// A token is usable only while `now + buffer < expiration`.
    fn is_usable(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(TOKEN_TIME_BUFFER_SECS) < self.expiration
    }
}

/// Shape of a successful password-grant response.
#[derive(Debug, Deserialize)]
struct AuthResponse {
    access_token: String,
    expires_in: f64,
    #[serde(rename = "userId")]
    user_id: String,
}

/// Owns token acquisition and refresh for one account session.
pub(crate) struct TokenManager {
    http: reqwest::Client,
    auth_url: String,
    client_id: String,
    client_secret: String,
    email: String,
    password: String,
    token: RwLock<Option<Token>>,
    /// Serializes refresh attempts so concurrent callers share one
    /// authentication round trip.
    refresh_lock: Mutex<()>,
}

impl TokenManager {
    pub(crate) fn new(http: reqwest::Client, config: &Config) -> Self {
        Self {
            http,
            auth_url: config.auth_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            email: config.email.clone(),
            password: config.password.clone(),
            token: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    fn cached(&self) -> Option<Token> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn store(&self, token: Token) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
    }

    /// Return a usable token, authenticating or refreshing as needed.
    pub(crate) async fn current(&self) -> Result<Token> {
        if let Some(token) = self.cached() {
            if token.is_usable(Utc::now()) {
                return Ok(token);
            }
        }

        let _guard = self.refresh_lock.lock().await;

        // Re-check after acquiring the lock: another task may have
        // refreshed while we waited.
        if let Some(token) = self.cached() {
            if token.is_usable(Utc::now()) {
                return Ok(token);
            }
        }

        let token = self.authenticate().await?;
        self.store(token.clone());
        Ok(token)
    }

    /// Force a refresh after a 401. Skipped when another task already
    /// replaced the token the caller was holding.
    pub(crate) async fn refresh_after_unauthorized(&self, stale: &Token) -> Result<Token> {
        let _guard = self.refresh_lock.lock().await;

        if let Some(current) = self.cached() {
            if current.bearer_token != stale.bearer_token {
                return Ok(current);
            }
        }

        let token = self.authenticate().await?;
        self.store(token.clone());
        Ok(token)
    }

    /// Perform the password-grant exchange.
    async fn authenticate(&self) -> Result<Token> {
        let body = serde_json::json!({
            "client_id": self.client_id,
            "client_secret": self.client_secret,
            "grant_type": "password",
            "username": self.email,
            "password": self.password,
        });

        let response = self
            .http
            .post(&self.auth_url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .json(&body)
            .send()
            .await
            .map_err(|e| PodError::auth(None, format!("Auth endpoint unreachable: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), body = %body, "Auth request rejected");
            return Err(PodError::auth(
                Some(status.as_u16()),
                format!("Auth request failed with status {status}: {body}"),
            ));
        }

        let auth: AuthResponse = response.json().await.map_err(|e| {
            PodError::auth(
                Some(status.as_u16()),
                format!("Failed to parse auth response: {e}"),
            )
        })?;

        let token = Token {
            bearer_token: auth.access_token,
            expiration: Utc::now() + Duration::seconds(auth.expires_in as i64),
            account_id: auth.user_id,
        };
        tracing::debug!(
            account_id = %token.account_id,
            expiration = %token.expiration,
            "Authenticated"
        );
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_usable_inside_buffer() {
        let token = Token {
            bearer_token: "abc".to_string(),
            expiration: Utc::now() + Duration::seconds(3600),
            account_id: "u1".to_string(),
        };
        assert!(token.is_usable(Utc::now()));
    }

    #[test]
    fn test_token_unusable_near_expiry() {
        let token = Token {
            bearer_token: "abc".to_string(),
            expiration: Utc::now() + Duration::seconds(TOKEN_TIME_BUFFER_SECS - 1),
            account_id: "u1".to_string(),
        };
        assert!(!token.is_usable(Utc::now()));
    }
}
