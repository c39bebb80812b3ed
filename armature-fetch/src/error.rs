//! Fetch client error types.

use std::time::Duration;
use thiserror::Error;

use crate::Response;

/// Result type for fetch client operations.
pub type Result<T> = std::result::Result<T, FetchError>;

/// Which configured body limit a payload exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyLimit {
    /// `max_content_length`.
    ContentLength,
    /// `max_body_length`.
    BodyLength,
}

impl std::fmt::Display for BodyLimit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ContentLength => f.write_str("content length"),
            Self::BodyLength => f.write_str("body length"),
        }
    }
}

/// Fetch client errors.
///
/// Every pipeline stage fails with one of these; the client never retries
/// and never returns a partial response alongside an error.
#[derive(Debug, Error)]
pub enum FetchError {
    /// An interceptor was registered without a fulfilled transform.
    #[error("Invalid interceptor: {0}")]
    InvalidHandler(String),

    /// Request body exceeds a configured size limit.
    #[error("Request body exceeds maximum {kind} of {limit} bytes (got {size})")]
    PayloadTooLarge {
        /// Limit that was exceeded.
        kind: BodyLimit,
        /// Configured limit in bytes.
        limit: u64,
        /// Measured body size in bytes.
        size: u64,
    },

    /// Redirect limit reached.
    #[error("Exceeded maximum redirect limit of {max} ({hops} redirects followed)")]
    TooManyRedirects {
        /// Configured limit.
        max: usize,
        /// Redirects reported by the transport.
        hops: usize,
    },

    /// Response body could not be decoded as the declared response type.
    #[error("Failed to parse response body: {0}")]
    ResponseParse(String),

    /// Status rejected by `validate_status`.
    #[error("Request failed with status code {status}")]
    RequestFailed {
        /// HTTP status code.
        status: u16,
    },

    /// Opaque transport failure.
    #[error("Network error: {0}")]
    Network(String),

    /// Underlying HTTP client error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Request timed out.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Request was cancelled through its cancel token.
    #[error("Request cancelled: {0}")]
    Cancelled(String),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Header name or value could not be encoded.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// Request body or params could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Error raised by an interceptor or caller code.
    #[error("{message}")]
    Rejected {
        /// Error message.
        message: String,
        /// Response the error relates to, if any.
        response: Option<Box<Response>>,
    },
}

impl FetchError {
    /// Create a rejection with a message and no response.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
            response: None,
        }
    }

    /// Create a rejection carrying the response it relates to.
    pub fn rejected_with_response(message: impl Into<String>, response: Response) -> Self {
        Self::Rejected {
            message: message.into(),
            response: Some(Box::new(response)),
        }
    }

    /// Human-readable failure message.
    pub fn message(&self) -> String {
        match self {
            Self::Rejected { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Response attached to this failure, if any.
    pub fn response(&self) -> Option<&Response> {
        match self {
            Self::Rejected { response, .. } => response.as_deref(),
            _ => None,
        }
    }

    /// Check if this is a timeout error.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_)) || matches!(self, Self::Http(e) if e.is_timeout())
    }

    /// Check if the request was aborted by its timeout or cancel token.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Cancelled(_))
    }

    /// Get the HTTP status code if this failure carries one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::RequestFailed { status } => Some(*status),
            Self::Rejected {
                response: Some(response),
                ..
            } => Some(response.status.as_u16()),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl From<url::ParseError> for FetchError {
    fn from(e: url::ParseError) -> Self {
        Self::InvalidUrl(e.to_string())
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
