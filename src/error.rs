//! Error types for the Jira client.
//!
//! This module defines `JiraError`, the unified error type returned by every
//! connection, command and paging operation.
//!
//! # Security
//!
//! No variant carries request bodies, so the login password never appears
//! in an error message.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, JiraError>;

/// Unified error type for all Jira client operations.
///
/// Cancellation is reported as its own variant so callers can tell a
/// deliberate stop apart from a failure (see [`JiraError::is_cancelled`]).
#[derive(Error, Debug)]
pub enum JiraError {
    /// A required argument was missing or empty.
    #[error("validation error: {0}")]
    Validation(String),

    /// Configuration error - missing or invalid environment variables.
    #[error("configuration error: {0}")]
    Config(String),

    /// The connection was disposed before or during the operation.
    #[error("connection has been disposed")]
    Disposed,

    /// The session endpoint rejected the credentials.
    #[error("failed to connect to Jira: {reason} ({status})")]
    Authentication {
        /// Status returned by the session endpoint.
        status: reqwest::StatusCode,
        /// Reason phrase of the status.
        reason: String,
    },

    /// A REST endpoint returned a non-success status.
    #[error("Jira returned {status} {reason} for {address}")]
    Remote {
        /// Status returned by the endpoint.
        status: reqwest::StatusCode,
        /// Reason phrase of the status.
        reason: String,
        /// The resolved address that failed.
        address: String,
    },

    /// The response was valid JSON but lacked an expected field or shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The response body was not valid JSON.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request failed during transmission.
    #[error("HTTP request failed: {0}")]
    Http(#[source] reqwest::Error),

    /// HTTP client initialization failed.
    #[error("HTTP client error: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// The caller's cancellation token fired.
    #[error("operation was cancelled")]
    Cancelled,
}

impl JiraError {
    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        JiraError::Validation(message.into())
    }

    /// Creates a validation error for a missing connection-string key.
    pub fn missing_key(key: &str) -> Self {
        JiraError::Validation(format!("connection string is missing required key: {}", key))
    }

    /// Creates a configuration error for a missing environment variable.
    pub fn missing_env(var_name: &str) -> Self {
        JiraError::Config(format!(
            "missing required environment variable: {}",
            var_name
        ))
    }

    /// Creates a configuration error for an invalid value.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        JiraError::Config(message.into())
    }

    /// Creates a malformed-response error.
    pub fn malformed(message: impl Into<String>) -> Self {
        JiraError::MalformedResponse(message.into())
    }

    /// Creates a remote error from a non-success status.
    pub fn remote(status: reqwest::StatusCode, address: impl Into<String>) -> Self {
        JiraError::Remote {
            status,
            reason: reason_phrase(status),
            address: address.into(),
        }
    }

    /// Creates an authentication error from a non-success status.
    pub fn authentication(status: reqwest::StatusCode) -> Self {
        JiraError::Authentication {
            status,
            reason: reason_phrase(status),
        }
    }

    /// Returns true if the operation stopped because the caller cancelled it.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, JiraError::Cancelled)
    }

    /// Returns true if the server answered but the body could not be used.
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        matches!(self, JiraError::MalformedResponse(_) | JiraError::Json(_))
    }

    /// Returns the HTTP status for remote and authentication failures.
    #[must_use]
    pub fn status(&self) -> Option<reqwest::StatusCode> {
        match self {
            JiraError::Remote { status, .. } | JiraError::Authentication { status, .. } => {
                Some(*status)
            }
            JiraError::Http(e) => e.status(),
            _ => None,
        }
    }
}

/// Reason phrase for a status, falling back to the numeric code.
fn reason_phrase(status: reqwest::StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.as_u16().to_string())
}
