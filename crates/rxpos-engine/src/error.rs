//! # API Error Type
//!
//! The error the rendering layer sees, plus configuration errors.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in rxpos                                  │
//! │                                                                         │
//! │  handle.checkout()                                                      │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  PosEngine                                                       │  │
//! │  │         │                                                        │  │
//! │  │  Precondition? ─── CoreError::EmptyCart ──────────┐              │  │
//! │  │         │                                         │              │  │
//! │  │  Backend said no? ─ RemoteError::Rejected ──►     ▼              │  │
//! │  │                     CoreError::RemoteSubmission ─► ApiError ────►│  │
//! │  │         │                                                        │  │
//! │  │  Success ──────────────────────────────────────────────────────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  UI receives: { "code": "INSUFFICIENT_STOCK",                           │
//! │                 "message": "Only 4 AMX-250 in stock (6 requested)" }    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use thiserror::Error;
use ts_rs::TS;

use rxpos_core::CoreError;
use rxpos_remote::RemoteError;

// =============================================================================
// API Error
// =============================================================================

/// Result type alias for `PosHandle` operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Error returned from every `PosHandle` operation.
///
/// ## Serialization
/// ```json
/// {
///   "code": "CHECKOUT_IN_FLIGHT",
///   "message": "A checkout is already in progress",
///   "retryable": false
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,

    /// The backend was unreachable or overloaded; the same request may
    /// succeed if the cashier tries again.
    pub retryable: bool,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Product or code not found
    NotFound,

    /// Input validation failed
    ValidationError,

    /// Checkout attempted on an empty cart
    EmptyCart,

    /// A line exceeds current stock
    InsufficientStock,

    /// Another checkout is pending
    CheckoutInFlight,

    /// Product archived or out of stock
    ProductUnavailable,

    /// The backend rejected the sale or could not be reached
    RemoteSubmissionFailed,

    /// Catalog fetch or search failed
    RemoteError,

    /// Missing or rejected API token
    Unauthorized,

    /// Configuration problem
    ConfigError,

    /// The engine loop is gone
    EngineStopped,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
            retryable: false,
        }
    }

    /// Sets whether trying again could help.
    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    /// The engine task has exited and can no longer answer.
    pub fn engine_stopped() -> Self {
        ApiError::new(ErrorCode::EngineStopped, "POS engine is not running")
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::EmptyCart => ApiError::new(ErrorCode::EmptyCart, "Cart is empty"),
            CoreError::InsufficientStock {
                sku,
                available,
                requested,
                ..
            } => ApiError::new(
                ErrorCode::InsufficientStock,
                format!(
                    "Only {} {} in stock ({} requested)",
                    available, sku, requested
                ),
            ),
            CoreError::CheckoutInFlight => ApiError::new(
                ErrorCode::CheckoutInFlight,
                "A checkout is already in progress",
            ),
            CoreError::RemoteSubmission { reason } => {
                ApiError::new(ErrorCode::RemoteSubmissionFailed, reason)
            }
            CoreError::ProductNotFound(code) => {
                ApiError::new(ErrorCode::NotFound, format!("Product not found: {}", code))
            }
            CoreError::ProductUnavailable { sku, reason } => ApiError::new(
                ErrorCode::ProductUnavailable,
                format!("{} is {}", sku, reason),
            ),
            CoreError::Validation(e) => ApiError::validation(e.to_string()),
        }
    }
}

/// Converts catalog-side remote errors to API errors.
///
/// Sale submission failures go through `CoreError::RemoteSubmission` instead.
impl From<RemoteError> for ApiError {
    fn from(err: RemoteError) -> Self {
        if err.is_auth_error() {
            let message = err
                .remote_message()
                .map(String::from)
                .unwrap_or_else(|| err.to_string());
            return ApiError::new(ErrorCode::Unauthorized, message);
        }
        ApiError::new(ErrorCode::RemoteError, err.to_string()).with_retryable(err.is_retryable())
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::new(ErrorCode::ConfigError, err.to_string())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// =============================================================================
// Config Error
// =============================================================================

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration load and validation failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A setting has an unusable value.
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// The API URL could not be parsed or has the wrong scheme.
    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),

    /// Failed to read or parse the config file.
    #[error("Failed to load config: {0}")]
    LoadFailed(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::LoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::LoadFailed(err.to_string())
    }
}

impl From<url::ParseError> for ConfigError {
    fn from(err: url::ParseError) -> Self {
        ConfigError::InvalidUrl(err.to_string())
    }
}
