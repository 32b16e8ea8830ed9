// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client configuration: account credentials, timezone and endpoint URLs.
//!
//! All values are fixed at construction time. `from_env()` exists for local
//! development and integration testing; library consumers normally build a
//! [`Config`] directly from their own credential source.

use std::env;
use std::time::Duration;

use chrono_tz::Tz;
use validator::Validate;

/// Production endpoint for the password-grant token exchange.
pub const DEFAULT_AUTH_URL: &str = "https://auth-api.8slp.net/v1/tokens";
/// Production base URL for the "client" API surface (discovery, trends).
pub const DEFAULT_CLIENT_API_URL: &str = "https://client-api.8slp.net/v1";
/// Production base URL for the "app" API surface (temperature, routines, base).
pub const DEFAULT_APP_API_URL: &str = "https://app-api.8slp.net";

/// OAuth client pair of the vendor's mobile app. Works for any account;
/// accounts with their own registered client can override it.
const KNOWN_CLIENT_ID: &str = "0894c7f33bb94800a03f1f4df13a4f38";
const KNOWN_CLIENT_SECRET: &str = "f0954a3ed5763ba3d06834c73731a32f15f168f47d4f164751275def86db0c76";

/// The vendor API routinely takes tens of seconds to answer; budget minutes.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(240);

/// Client configuration, fixed for the lifetime of a session.
#[derive(Debug, Clone, Validate)]
pub struct Config {
    /// Account email (the auth username).
    #[validate(email)]
    pub email: String,
    /// Account password.
    #[validate(length(min = 1))]
    pub password: String,
    /// Account timezone; sent with trend queries and used to localize
    /// vendor timestamps.
    pub timezone: Tz,
    /// OAuth client id, defaults to the known mobile-app id.
    pub client_id: String,
    /// OAuth client secret, defaults to the known mobile-app secret.
    pub client_secret: String,
    /// Preferred device id for multi-device accounts. When unset, the first
    /// discovered device is used.
    pub device_id: Option<String>,

    /// Token endpoint.
    pub auth_url: String,
    /// Base URL for the client API surface.
    pub client_api_url: String,
    /// Base URL for the app API surface.
    pub app_api_url: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl Config {
    /// Build a configuration with production endpoints and the known
    /// client pair.
    pub fn new(
        email: impl Into<String>,
        password: impl Into<String>,
        timezone: &str,
    ) -> Result<Self, ConfigError> {
        let timezone: Tz = timezone
            .parse()
            .map_err(|_| ConfigError::InvalidTimezone(timezone.to_string()))?;

        Ok(Self {
            email: email.into(),
            password: password.into(),
            timezone,
            client_id: KNOWN_CLIENT_ID.to_string(),
            client_secret: KNOWN_CLIENT_SECRET.to_string(),
            device_id: None,
            auth_url: DEFAULT_AUTH_URL.to_string(),
            client_api_url: DEFAULT_CLIENT_API_URL.to_string(),
            app_api_url: DEFAULT_APP_API_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    /// Override the OAuth client pair.
    pub fn with_client_credentials(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.client_id = client_id.into();
        self.client_secret = client_secret.into();
        self
    }

    /// Pin the session to a specific device id.
    pub fn with_device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    /// Point the client at alternative endpoints (used by integration tests
    /// against a mock server).
    pub fn with_api_urls(
        mut self,
        auth_url: impl Into<String>,
        client_api_url: impl Into<String>,
        app_api_url: impl Into<String>,
    ) -> Self {
        self.auth_url = auth_url.into();
        self.client_api_url = client_api_url.into();
        self.app_api_url = app_api_url.into();
        self
    }

    /// Load configuration from environment variables.
    ///
    /// Reads `SLEEPPOD_EMAIL`, `SLEEPPOD_PASSWORD` and `SLEEPPOD_TIMEZONE`
    /// (required), plus optional `SLEEPPOD_CLIENT_ID`, `SLEEPPOD_CLIENT_SECRET`
    /// and `SLEEPPOD_DEVICE_ID`.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let email =
            env::var("SLEEPPOD_EMAIL").map_err(|_| ConfigError::Missing("SLEEPPOD_EMAIL"))?;
        let password =
            env::var("SLEEPPOD_PASSWORD").map_err(|_| ConfigError::Missing("SLEEPPOD_PASSWORD"))?;
        let timezone =
            env::var("SLEEPPOD_TIMEZONE").map_err(|_| ConfigError::Missing("SLEEPPOD_TIMEZONE"))?;

        let mut config = Self::new(email, password.trim(), timezone.trim())?;

        if let (Ok(id), Ok(secret)) = (
            env::var("SLEEPPOD_CLIENT_ID"),
            env::var("SLEEPPOD_CLIENT_SECRET"),
        ) {
            config = config.with_client_credentials(id.trim(), secret.trim());
        }
        if let Ok(device_id) = env::var("SLEEPPOD_DEVICE_ID") {
            config = config.with_device_id(device_id.trim());
        }

        Ok(config)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Unknown IANA timezone: {0}")]
    InvalidTimezone(String),
}
