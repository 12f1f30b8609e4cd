//! Generation error types

use serde::Deserialize;
use thiserror::Error;

/// Generation error with classification
#[derive(Debug, Error)]
#[error("{message}")]
pub struct GenError {
    pub kind: GenErrorKind,
    pub message: String,
}

impl GenError {
    pub fn new(kind: GenErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(GenErrorKind::RateLimited, message)
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::new(GenErrorKind::Upstream, message)
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(GenErrorKind::Invalid, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(GenErrorKind::Unknown, message)
    }
}

/// Closed classification for dispatch; provider exception identity never
/// leaks past this boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenErrorKind {
    /// Rate limited (429) - retryable after a wait
    RateLimited,
    /// The provider reported a processing failure - retryable
    Upstream,
    /// Bad request (400) - not retryable
    Invalid,
    /// Anything else (transport, parse, decode)
    Unknown,
}

impl GenErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::RateLimited | Self::Upstream)
    }
}

/// Error body shape shared by both provider endpoints.
#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    error: ProviderError,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    message: String,
}

/// Map a non-success HTTP response onto the error taxonomy.
///
/// When the body carries a provider-reported failure, its message is kept
/// verbatim for `Upstream`; otherwise the raw status and body are preserved.
pub(crate) fn classify_status(status: reqwest::StatusCode, body: &str) -> GenError {
    match serde_json::from_str::<ProviderErrorBody>(body) {
        Ok(parsed) => {
            let message = parsed.error.message;
            match status.as_u16() {
                429 => GenError::rate_limited(format!("Rate limit exceeded: {message}")),
                400 => GenError::invalid(message),
                _ => GenError::upstream(message),
            }
        }
        Err(_) => match status.as_u16() {
            429 => GenError::rate_limited("Rate limit exceeded"),
            500..=599 => GenError::upstream(format!("Server error: HTTP {status}")),
            _ => GenError::unknown(format!("HTTP {status}: {body}")),
        },
    }
}
