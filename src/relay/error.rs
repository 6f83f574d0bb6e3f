//! Relay error taxonomy and the JSON error envelope.

use crate::http::{RelayResponse, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of raw upstream characters kept in diagnostics.
pub const DIAGNOSTIC_SNIPPET_CHARS: usize = 500;

/// Failures the relay reports itself, as opposed to upstream HTTP errors,
/// which pass through untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    #[error("Backend URL is not configured")]
    MissingBackend,

    #[error("Invalid backend URL '{0}'")]
    InvalidBackend(String),

    #[error("Backend unreachable at {url}: {reason}")]
    Unreachable { url: String, reason: String },

    #[error("Backend returned invalid JSON (status {status}): {parse_error}")]
    InvalidUpstreamJson {
        status: u16,
        raw: String,
        parse_error: String,
    },

    #[error("Backend returned an unexpected non-JSON response (status {status}, content type {content_type})")]
    UnexpectedNonJson {
        status: u16,
        content_type: String,
        raw: String,
    },

    #[error("Method {0} is not supported by the relay")]
    MethodNotAllowed(String),

    #[error("Request body of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: usize, limit: usize },

    /// The body was cut off while streaming, so only the limit is known.
    #[error("Request body exceeds the {limit} byte limit")]
    PayloadLimitExceeded { limit: usize },

    #[error("No relay route for {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl RelayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::MissingBackend
            | RelayError::InvalidBackend(_)
            | RelayError::Unreachable { .. }
            | RelayError::InvalidUpstreamJson { .. }
            | RelayError::UnexpectedNonJson { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            RelayError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            RelayError::PayloadTooLarge { .. } | RelayError::PayloadLimitExceeded { .. } => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            RelayError::NotFound(_) => StatusCode::NOT_FOUND,
            RelayError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            RelayError::MissingBackend | RelayError::InvalidBackend(_) => "config_error",
            RelayError::Unreachable { .. } => "backend_unreachable",
            RelayError::InvalidUpstreamJson { .. } => "invalid_upstream_json",
            RelayError::UnexpectedNonJson { .. } => "unexpected_non_json",
            RelayError::MethodNotAllowed(_) => "method_not_allowed",
            RelayError::PayloadTooLarge { .. } | RelayError::PayloadLimitExceeded { .. } => {
                "payload_too_large"
            }
            RelayError::NotFound(_) => "not_found",
            RelayError::BadRequest(_) => "bad_request",
        }
    }

    /// Build the envelope sent to the browser.
    pub fn envelope(&self) -> ErrorEnvelope {
        let details = match self {
            RelayError::InvalidUpstreamJson {
                status,
                raw,
                parse_error,
            } => Some(serde_json::json!({
                "upstream_status": status,
                "raw": raw,
                "parse_error": parse_error,
            })),
            RelayError::UnexpectedNonJson {
                status,
                content_type,
                raw,
            } => Some(serde_json::json!({
                "upstream_status": status,
                "content_type": content_type,
                "raw": raw,
            })),
            _ => None,
        };

        ErrorEnvelope {
            error: self.error_code().to_string(),
            message: self.to_string(),
            details,
        }
    }
}

/// `{ "error": ..., "message": ... }` body returned for every relay failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<RelayError> for RelayResponse {
    fn from(err: RelayError) -> Self {
        let status = err.status_code();
        let envelope = err.envelope();
        // An envelope of plain strings cannot fail to serialize.
        RelayResponse::json(status, &envelope).unwrap_or_else(|_| RelayResponse::new(status))
    }
}

/// First [`DIAGNOSTIC_SNIPPET_CHARS`] characters of a raw body, for diagnostics.
pub fn snippet(body: &[u8]) -> String {
    String::from_utf8_lossy(body)
        .chars()
        .take(DIAGNOSTIC_SNIPPET_CHARS)
        .collect()
}

pub type Result<T> = std::result::Result<T, RelayError>;
