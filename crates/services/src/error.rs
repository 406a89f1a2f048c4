//! Shared error types for the services crate.

use thiserror::Error;

pub const REQUEST_TIMEOUT_MESSAGE: &str =
    "Request timeout. Please check your connection and try again.";
pub const CONNECTION_TIMEOUT_MESSAGE: &str =
    "Connection timeout. The server may be slow or unreachable. Please try again.";
pub const NETWORK_ERROR_MESSAGE: &str = "Network error. Please check your connection and try again.";
pub const DECODE_TIMEOUT_MESSAGE: &str = "Response parsing timeout. Server may be slow.";
pub const INVALID_BODY_MESSAGE: &str = "Invalid response from server. Please try again.";
pub const MALFORMED_RESPONSE_MESSAGE: &str =
    "Invalid response format from server. Please try again.";
pub const REGISTRATION_FAILED_MESSAGE: &str = "Registration failed";

/// Errors emitted by the transport guard.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// No response headers arrived within the request budget.
    #[error("{}", REQUEST_TIMEOUT_MESSAGE)]
    Timeout,
    /// Headers arrived but the body did not finish within its own budget.
    #[error("{message}")]
    DecodeTimeout { message: String },
    #[error("network failure: {0}")]
    NetworkFailure(#[from] reqwest::Error),
}

impl TransportError {
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout | Self::DecodeTimeout { .. })
    }
}

/// Errors emitted by `AuthApi` and surfaced by `SessionController::try_register`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("registration rejected ({status}): {message}")]
    RegistrationRejected {
        status: reqwest::StatusCode,
        message: String,
    },
    #[error("could not decode response body: {0}")]
    InvalidBody(String),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl AuthError {
    /// The single human-readable message shown for a failed attempt.
    ///
    /// Timeouts rank above network failures, which rank above everything else.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport(TransportError::Timeout) => CONNECTION_TIMEOUT_MESSAGE.to_owned(),
            Self::Transport(TransportError::DecodeTimeout { message }) => message.clone(),
            Self::Transport(TransportError::NetworkFailure(_)) => NETWORK_ERROR_MESSAGE.to_owned(),
            Self::RegistrationRejected { message, .. } => message.clone(),
            Self::InvalidBody(_) => INVALID_BODY_MESSAGE.to_owned(),
            Self::MalformedResponse(_) => MALFORMED_RESPONSE_MESSAGE.to_owned(),
        }
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(err) if err.is_timeout())
    }
}

/// Errors emitted while resolving configuration or building the HTTP client.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("invalid base url {raw:?}: {source}")]
    InvalidBaseUrl {
        raw: String,
        #[source]
        source: url::ParseError,
    },
    #[error("base url {raw:?} must be an http(s) url")]
    UnsupportedScheme { raw: String },
    #[error("failed to build http client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
