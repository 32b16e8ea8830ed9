// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client error types.
//!
//! The gateway is the only place raw HTTP/transport failures are translated
//! into [`PodError`]; everything above it either propagates or, for optional
//! capability data, logs and continues.

/// Error type for all client operations.
#[derive(Debug, thiserror::Error)]
pub enum PodError {
    /// Credentials were rejected or the auth endpoint is unreachable.
    /// Fatal to the session until the credentials are corrected.
    #[error("Authentication failed: {message}")]
    Auth {
        /// HTTP status returned by the auth endpoint, if it answered at all.
        status: Option<u16>,
        message: String,
    },

    /// Any other HTTP-level or transport-level failure. May be transient;
    /// the caller's poller is expected to retry on its own schedule.
    #[error("API request failed: {message}")]
    Request {
        /// HTTP status, if the failure happened after a response arrived.
        status: Option<u16>,
        message: String,
    },

    /// Caller supplied an out-of-domain value. Rejected before any
    /// network call.
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl PodError {
    pub(crate) fn auth(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Auth {
            status,
            message: message.into(),
        }
    }

    pub(crate) fn request(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Request {
            status,
            message: message.into(),
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// HTTP status attached to this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Auth { status, .. } | Self::Request { status, .. } => *status,
            _ => None,
        }
    }
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, PodError>;
