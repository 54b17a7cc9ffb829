//! # Domain Types
//!
//! The catalog record shared by every component of the POS core.
//!
//! ## Ownership
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Catalog View ──owns──► Product ◄──reads── Cart Engine                │
//! │                             │                                           │
//! │                             └──reads── Scan pipeline, Checkout         │
//! │                                                                         │
//! │   Nothing outside the Catalog View ever mutates a Product.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! - `id`: opaque and stable, used for cart lines and sale submission
//! - `sku`: human-readable business key, used for scan lookups

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use ts_rs::TS;

use crate::error::UnavailableReason;
use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// A product record from the remote catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Opaque stable identifier.
    pub id: String,

    /// Stock Keeping Unit - the scan lookup key.
    pub sku: String,

    /// Display name shown to cashier and on receipt.
    pub name: String,

    /// Price in cents (never negative).
    pub price_cents: i64,

    /// Units available according to the last catalog read.
    pub stock_quantity: i64,

    /// Archived products stay in the catalog but cannot be sold.
    pub is_archived: bool,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Checks whether this product may enter a cart at all.
    ///
    /// ## Rules
    /// - Archived products are never sellable
    /// - A product with no stock is never sellable
    pub fn availability(&self) -> Result<(), UnavailableReason> {
        if self.is_archived {
            return Err(UnavailableReason::Archived);
        }
        if self.stock_quantity <= 0 {
            return Err(UnavailableReason::OutOfStock);
        }
        Ok(())
    }

    /// Shorthand for `availability().is_ok()`.
    #[inline]
    pub fn is_sellable(&self) -> bool {
        self.availability().is_ok()
    }
}

// =============================================================================
// Stock Lookup
// =============================================================================

/// Source of the most recently known stock level for a product.
///
/// The Cart Engine and the checkout preconditions clamp and validate against
/// whatever implements this; in the running engine that is the Catalog View.
pub trait StockLookup {
    /// Returns the last known stock for `product_id`, or `None` if unknown.
    fn stock_of(&self, product_id: &str) -> Option<i64>;
}

/// A single product knows its own stock.
impl StockLookup for Product {
    fn stock_of(&self, product_id: &str) -> Option<i64> {
        (self.id == product_id).then_some(self.stock_quantity)
    }
}

impl StockLookup for [Product] {
    fn stock_of(&self, product_id: &str) -> Option<i64> {
        self.iter()
            .find(|p| p.id == product_id)
            .map(|p| p.stock_quantity)
    }
}

impl StockLookup for HashMap<String, i64> {
    fn stock_of(&self, product_id: &str) -> Option<i64> {
        self.get(product_id).copied()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
