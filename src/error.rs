//! Error taxonomy surfaced by the auth flows.
//!
//! Backend adapters normalize their transport- and vendor-specific failures
//! into [`AuthError`] at the trait boundary, so everything above the
//! [`crate::backend::IdentityBackend`] seam matches on a closed set.

use std::time::Duration;

use thiserror::Error;

use crate::validate::parse_retry_after_secs;

/// Closed set of failures the session and auth flows can produce.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Input rejected locally before any backend call was made.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The backend rejected the request (bad credentials, expired or reused
    /// confirmation token, unconfirmed account, ...).
    #[error("{0}")]
    Auth(String),

    /// Too many attempts. `retry_after` carries the backend-provided or
    /// client-computed wait when one is known.
    #[error("rate limited")]
    RateLimited { retry_after: Option<Duration> },
}

impl AuthError {
    /// Build a rate-limit error from a backend message, keeping whatever
    /// wait-time hint the message carries.
    #[must_use]
    pub fn rate_limited_from_message(message: &str) -> Self {
        Self::RateLimited {
            retry_after: parse_retry_after_secs(message).map(Duration::from_secs),
        }
    }

    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Wait-time hint, when the error is a rate limit that carries one.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}
