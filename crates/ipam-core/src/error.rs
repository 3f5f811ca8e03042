//! Error types for IPAM client operations.
//!
//! Configuration problems are always fatal to the attempted operation. Request errors
//! carry the parsed response envelope so callers can inspect the status code, message
//! and body the server sent back.

use crate::response::Response;
use thiserror::Error;

/// Main error type for IPAM client operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Invalid construction input or use of a connection that is not usable
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The server answered with a failure, or the exchange failed after a response arrived
    #[error("Request failed: {message}")]
    RequestError {
        /// Parsed response envelope
        response: Box<Response>,
        /// Human-readable error message
        message: String,
    },

    /// HTTP request failed before a response was received
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    /// Operation timed out
    #[error("Timeout waiting for server: {0}")]
    Timeout(String),

    /// Server could not be reached
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Failed to decode a response body or a resource record
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// A request URL could not be built
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Payload encryption failed
    #[error("Encryption error: {0}")]
    CryptoError(String),

    /// Caller supplied parameters are incomplete
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Specialized result type for IPAM client operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Builds a request error from a response, using the server message when present.
    #[must_use]
    pub fn request(response: Response) -> Self {
        let message = response.message().map_or_else(
            || format!("request failed with code {}", response.code()),
            str::to_string,
        );
        Self::RequestError {
            response: Box::new(response),
            message,
        }
    }

    /// Builds a request error with an explicit message.
    #[must_use]
    pub fn request_with_message(response: Response, message: impl Into<String>) -> Self {
        Self::RequestError {
            response: Box::new(response),
            message: message.into(),
        }
    }

    /// Returns the error code for this error type.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::RequestError { .. } => "REQUEST_ERROR",
            Self::HttpError(_) => "HTTP_ERROR",
            Self::Timeout(_) => "TIMEOUT",
            Self::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            Self::ParseError(_) => "PARSE_ERROR",
            Self::InvalidEndpoint(_) => "INVALID_ENDPOINT",
            Self::CryptoError(_) => "CRYPTO_ERROR",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
        }
    }

    /// The response envelope attached to a request error.
    #[must_use]
    pub fn response(&self) -> Option<&Response> {
        match self {
            Self::RequestError { response, .. } => Some(response),
            _ => None,
        }
    }

    /// Returns true for configuration errors.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::ConfigError(_))
    }

    /// Returns true if this error should be logged as a serious error.
    #[must_use]
    pub const fn should_log(&self) -> bool {
        matches!(
            self,
            Self::ConfigError(_) | Self::CryptoError(_) | Self::ParseError(_)
        )
    }
}

// Conversions from external error types
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::ServiceUnavailable(err.to_string())
        } else {
            Self::HttpError(err.to_string())
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidEndpoint(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::ConfigError(err.to_string())
    }
}
