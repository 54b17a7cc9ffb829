//! # Validation Module
//!
//! Input validation for everything that enters the core from outside:
//! scanner codes, search text, page numbers and wire prices.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Rendering layer                                              │
//! │  └── Basic format checks, immediate feedback                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Engine commands                                              │
//! │  └── THIS MODULE: reject malformed input before it reaches state       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Backend                                                       │
//! │  └── Authoritative stock and price checks at sale time                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use rxpos_core::validation::validate_scan_code;
//!
//! assert_eq!(validate_scan_code("  AMX-250 \n").unwrap(), "AMX-250");
//! assert!(validate_scan_code("   ").is_err());
//! ```

use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest code a scanner is expected to produce.
pub const MAX_SCAN_CODE_LEN: usize = 64;

/// Longest free-text search accepted.
pub const MAX_SEARCH_QUERY_LEN: usize = 100;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a raw scanner code.
///
/// ## Rules
/// - Surrounding whitespace (including the scanner's trailing newline) is
///   stripped
/// - Must not be empty after trimming
/// - At most 64 characters
/// - No control characters inside the code
///
/// ## Returns
/// The trimmed code.
pub fn validate_scan_code(raw: &str) -> ValidationResult<String> {
    let code = raw.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "code".to_string(),
        });
    }

    if code.chars().count() > MAX_SCAN_CODE_LEN {
        return Err(ValidationError::TooLong {
            field: "code".to_string(),
            max: MAX_SCAN_CODE_LEN,
        });
    }

    if code.chars().any(char::is_control) {
        return Err(ValidationError::InvalidFormat {
            field: "code".to_string(),
            reason: "must not contain control characters".to_string(),
        });
    }

    Ok(code.to_string())
}

/// Validates a search query.
///
/// ## Rules
/// - Can be empty; the engine then reloads the first catalog page
///   instead of sending a search
/// - Maximum 100 characters
///
/// ## Returns
/// The trimmed query string.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > MAX_SEARCH_QUERY_LEN {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: MAX_SEARCH_QUERY_LEN,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a price in cents.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (free samples)
///
/// ## Example
/// ```rust
/// use rxpos_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents(1099).is_ok());
/// assert!(validate_price_cents(0).is_ok());
/// assert!(validate_price_cents(-100).is_err());
/// ```
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::Negative {
            field: "price".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
