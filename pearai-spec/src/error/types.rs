//! Core error type shared by every pearai crate.

use thiserror::Error;

/// Error returned by the PearAI server client.
///
/// Only a subset of these ever reaches callers of the streaming operations:
/// `AuthResolutionFailed` and `UsageRecordingError` are logged and swallowed
/// by the client, and `StreamDecodeError` only surfaces under the abort
/// policy for malformed lines.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    /// Usage accounting is switched off; the server refuses anonymous traffic.
    #[error("Usage accounting disabled: {0}")]
    UsageAccountingDisabled(String),

    /// The auth provider could not produce a fresh access token.
    #[error("Auth resolution failed: {0}")]
    AuthResolutionFailed(String),

    /// Generic transport failure while issuing a request.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Could not establish a connection.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The request did not finish within the configured timeout.
    #[error("Timeout error: {0}")]
    TimeoutError(String),

    /// The server answered with a non-success status.
    #[error("API error {code}: {message}")]
    ApiError {
        code: u16,
        message: String,
        details: Option<serde_json::Value>,
    },

    /// The transport failed after the response stream had started.
    #[error("Stream error: {0}")]
    StreamError(String),

    /// A streamed line could not be decoded.
    #[error("Stream decode error: {message} (line: {line})")]
    StreamDecodeError { line: String, message: String },

    /// The usage recorder rejected an event.
    #[error("Usage recording error: {0}")]
    UsageRecordingError(String),

    /// JSON (de)serialization failure.
    #[error("JSON error: {0}")]
    JsonError(String),

    /// Invalid client configuration (header values, URLs, proxies).
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// A request parameter is missing or invalid.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl LlmError {
    /// Build an `ApiError` without structured details.
    pub fn api_error(code: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// HTTP status carried by the error, if any.
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::ApiError { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Whether repeating the same request may succeed.
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::ConnectionError(_) | Self::TimeoutError(_) => true,
            Self::ApiError { code, .. } => *code == 429 || *code >= 500,
            _ => false,
        }
    }

    /// Whether the error terminated a stream that had already started.
    pub const fn is_mid_stream(&self) -> bool {
        matches!(self, Self::StreamError(_) | Self::StreamDecodeError { .. })
    }
}
