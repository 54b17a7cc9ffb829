//! # Remote Error Types
//!
//! Failures talking to the pharmacy backend.
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Remote Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Transport     │  │     Backend             │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  MissingToken   │  │  Connection     │  │  Rejected (non-2xx)     │ │
//! │  │  InvalidUrl     │  │  Timeout        │  │  DeserializationFailed  │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  Nothing here is retried automatically. `is_retryable` only tells the  │
//! │  caller whether trying again by hand could help.                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Result type alias for remote operations.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Remote error type covering every backend failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// No API token configured.
    #[error("No token found. Please log in.")]
    MissingToken,

    /// The backend base URL could not be used.
    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),

    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// The request never got an HTTP answer.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The request exceeded the configured timeout.
    #[error("Request timed out")]
    Timeout,

    // =========================================================================
    // Backend Errors
    // =========================================================================
    /// The backend answered with a non-success status.
    #[error("Backend rejected request ({status}){}", detail_suffix(.message))]
    Rejected {
        status: u16,
        message: Option<String>,
    },

    /// The response body did not have the expected shape.
    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),
}

fn detail_suffix(message: &Option<String>) -> String {
    message.as_deref().map(|m| format!(": {m}")).unwrap_or_default()
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RemoteError::Timeout
        } else if err.is_decode() {
            RemoteError::DeserializationFailed(err.to_string())
        } else if err.is_builder() {
            RemoteError::InvalidUrl(err.to_string())
        } else {
            RemoteError::ConnectionFailed(err.to_string())
        }
    }
}

impl From<serde_json::Error> for RemoteError {
    fn from(err: serde_json::Error) -> Self {
        RemoteError::DeserializationFailed(err.to_string())
    }
}

impl From<url::ParseError> for RemoteError {
    fn from(err: url::ParseError) -> Self {
        RemoteError::InvalidUrl(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl RemoteError {
    /// Returns true if a manual retry of the same request could succeed.
    ///
    /// ## Retryable
    /// - Connection failures and timeouts
    /// - 5xx answers and 429 (Too Many Requests)
    ///
    /// ## Not Retryable
    /// - Missing token, bad URL
    /// - 4xx rejections (the backend disagrees with the request itself)
    pub fn is_retryable(&self) -> bool {
        match self {
            RemoteError::ConnectionFailed(_) | RemoteError::Timeout => true,
            RemoteError::Rejected { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Returns true if the cashier has to (re)authenticate.
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            RemoteError::MissingToken | RemoteError::Rejected { status: 401 | 403, .. }
        )
    }

    /// The human-readable message the backend supplied, if any.
    pub fn remote_message(&self) -> Option<&str> {
        match self {
            RemoteError::Rejected { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}
