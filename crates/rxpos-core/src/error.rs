//! # Error Types
//!
//! Domain-specific error types for rxpos-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  rxpos-core errors (this file)                                         │
//! │  ├── CoreError        - Checkout & scan failures                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  rxpos-remote errors (separate crate)                                  │
//! │  └── RemoteError      - Network / backend failures                     │
//! │                                                                         │
//! │  rxpos-engine errors                                                   │
//! │  └── ApiError         - What the rendering layer sees (serialized)     │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError ─┬─► ApiError → UI                  │
//! │        RemoteError ─► RemoteSubmission                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Recoverability
//! Nothing here is fatal. Every variant is fixed by a user action: adjust the
//! cart, rescan, or retry the checkout.

use std::fmt;

use serde::Serialize;
use thiserror::Error;
use ts_rs::TS;

/// Reason used when the backend rejects a sale without saying why.
pub const GENERIC_SUBMISSION_FAILURE: &str = "Sale submission failed";

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Checkout attempted with zero lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// A line asks for more than the last known stock.
    ///
    /// ## User Workflow
    /// ```text
    /// Cart: Insulin (10ml) x4
    ///      │
    ///      ▼
    /// Catalog refresh: stock=3
    ///      │
    ///      ▼
    /// checkout() ──► InsufficientStock { sku: "INS-10", available: 3, requested: 4 }
    ///      │
    ///      ▼
    /// UI shows: "Only 3 INS-10 in stock"
    /// ```
    #[error("Insufficient stock for {sku}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        sku: String,
        available: i64,
        requested: i64,
    },

    /// A second checkout was attempted while one is pending.
    #[error("A checkout is already in progress")]
    CheckoutInFlight,

    /// The backend rejected the sale or could not be reached.
    /// The cart is left untouched so the user can retry.
    #[error("Checkout failed: {reason}")]
    RemoteSubmission { reason: String },

    /// A scanned code matches no catalog entry.
    #[error("No product matches code '{0}'")]
    ProductNotFound(String),

    /// A scanned product exists but cannot be sold.
    #[error("Product {sku} is {reason}")]
    ProductUnavailable {
        sku: String,
        reason: UnavailableReason,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Builds a `RemoteSubmission` error, falling back to the generic reason
    /// when the backend gave no message.
    pub fn remote_submission(reason: Option<String>) -> Self {
        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| GENERIC_SUBMISSION_FAILURE.to_string());
        CoreError::RemoteSubmission { reason }
    }
}

// =============================================================================
// Unavailable Reason
// =============================================================================

/// Why a product cannot enter a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum UnavailableReason {
    Archived,
    OutOfStock,
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnavailableReason::Archived => write!(f, "archived"),
            UnavailableReason::OutOfStock => write!(f, "out of stock"),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when input (from the user, the scanner or the wire)
/// doesn't meet requirements.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Invalid format (e.g., unparsable price, control characters in a code).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
