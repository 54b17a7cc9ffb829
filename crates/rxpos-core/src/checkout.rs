//! # Checkout Preconditions
//!
//! Turns a cart into the immutable value that is submitted to the backend.
//!
//! ## Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Cart (live)                                                            │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  prepare_checkout() ← THIS MODULE (pure, no network)                   │
//! │      │                                                                  │
//! │      ├── empty cart? ─────────────► EmptyCart                          │
//! │      ├── qty > current stock? ────► InsufficientStock { sku, ... }     │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  SaleSnapshot ─┬─► CheckoutRequest ──► POST /sales/bulk (engine)       │
//! │                └─► cart lines + total ──► Receipt (on success)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The in-flight guard lives in the engine because it is state, not a
//! property of the cart.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::cart::{Cart, CartLine};
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::receipt::Receipt;
use crate::types::StockLookup;

/// One line of the bulk sale submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutLine {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price: Money,
}

/// Immutable bulk submission built from the cart at checkout time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    request_id: Uuid,
    lines: Vec<CheckoutLine>,
}

impl CheckoutRequest {
    /// Idempotency key for this submission attempt.
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn lines(&self) -> &[CheckoutLine] {
        &self.lines
    }
}

/// Everything captured from the cart when a checkout starts.
///
/// The receipt is built from this snapshot, not from whatever the cart holds
/// when the backend answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleSnapshot {
    request: CheckoutRequest,
    lines: Vec<CartLine>,
    total: Money,
}

impl SaleSnapshot {
    pub fn request(&self) -> &CheckoutRequest {
        &self.request
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn total(&self) -> Money {
        self.total
    }

    /// Converts the snapshot into the receipt of a completed sale.
    pub fn into_receipt(self, receipt_number: String, timestamp: DateTime<Utc>) -> Receipt {
        Receipt::new(receipt_number, timestamp, self.lines, self.total)
    }
}

/// Validates the cart against current stock and snapshots it.
///
/// ## Rules
/// - The cart must have at least one line
/// - Every line's quantity must be within the *current* stock. `stock` is
///   consulted first (the latest catalog read); a product it doesn't know is
///   checked against the line's own `known_stock`
/// - The first offending line in cart order is reported
pub fn prepare_checkout<S>(cart: &Cart, stock: &S) -> CoreResult<SaleSnapshot>
where
    S: StockLookup + ?Sized,
{
    if cart.is_empty() {
        return Err(CoreError::EmptyCart);
    }

    for line in cart.lines() {
        let available = stock
            .stock_of(&line.product_id)
            .unwrap_or(line.known_stock)
            .max(0);
        if line.quantity > available {
            return Err(CoreError::InsufficientStock {
                product_id: line.product_id.clone(),
                sku: line.sku.clone(),
                available,
                requested: line.quantity,
            });
        }
    }

    let lines = cart
        .lines()
        .iter()
        .map(|l| CheckoutLine {
            product_id: l.product_id.clone(),
            quantity: l.quantity,
            unit_price: l.unit_price(),
        })
        .collect();

    Ok(SaleSnapshot {
        request: CheckoutRequest {
            request_id: Uuid::new_v4(),
            lines,
        },
        lines: cart.lines().to_vec(),
        total: cart.total(),
    })
}
