//! # Cart Engine
//!
//! The ordered collection of line items for the sale in progress.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                      │
//! │                                                                         │
//! │  Entry point              Operation              Cart change            │
//! │  ───────────              ─────────              ───────────            │
//! │                                                                         │
//! │  Click product ─┐                                                      │
//! │                 ├───────► add_item() ──────────► push / qty + 1        │
//! │  Scan barcode ──┘              (no-op at stock ceiling)                │
//! │                                                                         │
//! │  Edit quantity ─────────► set_quantity() ──────► clamp to [1, stock]   │
//! │                                                                         │
//! │  Click remove ──────────► remove_item() ───────► line deleted          │
//! │                                                                         │
//! │  Sale accepted ─────────► settle() ────────────► sold units out        │
//! │  New sale / cancel ─────► clear() ─────────────► empty                 │
//! │                                                                         │
//! │  NOTE: quantity violations never raise. They saturate or clamp.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - At most one line per `product_id`
//! - `1 <= quantity <= known_stock` for every line the engine creates
//! - `total()` is recomputed on every call, never cached

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{Product, StockLookup};

/// An item in the cart.
///
/// ## Price Freezing
/// `name`, `sku` and `unit_price_cents` are captured when the product is
/// first added. Later catalog price changes do not touch an existing line;
/// remove and re-add the product to pick them up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: String,

    /// SKU at time of adding (frozen)
    pub sku: String,

    /// Product name at time of adding (frozen)
    pub name: String,

    /// Price in cents at time of adding (frozen)
    pub unit_price_cents: i64,

    pub quantity: i64,

    /// Most recently known stock for this product. Refreshed whenever the
    /// cart is handed newer product data; used as the clamp ceiling when the
    /// catalog no longer knows the product.
    pub known_stock: i64,

    #[ts(as = "String")]
    pub added_at: DateTime<Utc>,
}

impl CartLine {
    /// Creates a line with quantity 1, freezing the product's current data.
    pub fn from_product(product: &Product) -> Self {
        CartLine {
            product_id: product.id.clone(),
            sku: product.sku.clone(),
            name: product.name.clone(),
            unit_price_cents: product.price_cents,
            quantity: 1,
            known_stock: product.stock_quantity,
            added_at: Utc::now(),
        }
    }

    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Calculates the line total (unit price × quantity).
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price().multiply_quantity(self.quantity)
    }
}

/// What a cart operation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartChange {
    /// A new line was appended with quantity 1.
    Inserted,
    /// An existing line now has `quantity`.
    Updated { quantity: i64 },
    Removed,
    Cleared,
    /// Nothing happened (unsellable product, stock ceiling, absent line).
    Unchanged,
}

impl CartChange {
    #[inline]
    pub fn is_change(&self) -> bool {
        !matches!(self, CartChange::Unchanged)
    }
}

/// The cart for the sale in progress.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Creates a new empty cart.
    pub fn new() -> Self {
        Cart { lines: Vec::new() }
    }

    /// Adds one unit of `product`.
    ///
    /// ## Behavior
    /// - Archived or out-of-stock product: no-op
    /// - Already in cart and below its stock: quantity + 1
    /// - Already in cart at its stock: no-op (saturates, never errors)
    /// - Not in cart: new line with quantity 1
    pub fn add_item(&mut self, product: &Product) -> CartChange {
        if !product.is_sellable() {
            return CartChange::Unchanged;
        }

        if let Some(line) = self.line_mut(&product.id) {
            line.known_stock = product.stock_quantity;
            if line.quantity >= product.stock_quantity {
                return CartChange::Unchanged;
            }
            line.quantity += 1;
            return CartChange::Updated {
                quantity: line.quantity,
            };
        }

        self.lines.push(CartLine::from_product(product));
        CartChange::Inserted
    }

    /// Sets a line's quantity, clamped into `[1, stock]`.
    ///
    /// `stock` is asked first; when it doesn't know the product the line's own
    /// `known_stock` is the ceiling. A `requested` of zero or less becomes 1:
    /// this call never removes a line.
    ///
    /// The floor wins over the ceiling. When the latest stock is 0 the line
    /// stays at quantity 1 with `known_stock` 0, and `prepare_checkout` turns
    /// it away with `InsufficientStock` until the cashier removes it.
    pub fn set_quantity<S>(&mut self, product_id: &str, requested: i64, stock: &S) -> CartChange
    where
        S: StockLookup + ?Sized,
    {
        let current_stock = stock.stock_of(product_id);
        let Some(line) = self.line_mut(product_id) else {
            return CartChange::Unchanged;
        };

        if let Some(latest) = current_stock {
            line.known_stock = latest.max(0);
        }

        let clamped = requested.min(line.known_stock).max(1);
        if clamped == line.quantity {
            return CartChange::Unchanged;
        }

        line.quantity = clamped;
        CartChange::Updated { quantity: clamped }
    }

    /// Removes a line by product ID. No-op if absent.
    pub fn remove_item(&mut self, product_id: &str) -> CartChange {
        let initial_len = self.lines.len();
        self.lines.retain(|l| l.product_id != product_id);

        if self.lines.len() == initial_len {
            CartChange::Unchanged
        } else {
            CartChange::Removed
        }
    }

    /// Clears all lines.
    pub fn clear(&mut self) -> CartChange {
        if self.lines.is_empty() {
            return CartChange::Unchanged;
        }
        self.lines.clear();
        CartChange::Cleared
    }

    /// Takes the lines of a completed sale out of the cart.
    ///
    /// Each sold line reduces the matching cart line by the sold quantity and
    /// drops it once nothing is left. Units added while the sale was being
    /// submitted, and products that were not part of it, stay in the cart.
    pub fn settle(&mut self, sold: &[CartLine]) -> CartChange {
        let before = self.lines.clone();
        for s in sold {
            if let Some(line) = self.line_mut(&s.product_id) {
                line.quantity -= s.quantity;
            }
        }
        self.lines.retain(|l| l.quantity > 0);

        if self.lines == before {
            CartChange::Unchanged
        } else if self.lines.is_empty() {
            CartChange::Cleared
        } else {
            CartChange::Removed
        }
    }

    /// Lines in insertion order.
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn line(&self, product_id: &str) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.product_id == product_id)
    }

    fn line_mut(&mut self, product_id: &str) -> Option<&mut CartLine> {
        self.lines.iter_mut().find(|l| l.product_id == product_id)
    }

    /// Returns the number of distinct products in the cart.
    pub fn item_count(&self) -> usize {
        self.lines.len()
    }

    /// Returns the total quantity of all lines.
    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Σ quantity × unit price.
    pub fn total(&self) -> Money {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Cart totals summary for the rendering layer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    pub item_count: usize,
    pub total_quantity: i64,
    pub total_cents: i64,
}

impl From<&Cart> for CartTotals {
    fn from(cart: &Cart) -> Self {
        CartTotals {
            item_count: cart.item_count(),
            total_quantity: cart.total_quantity(),
            total_cents: cart.total().cents(),
        }
    }
}

/// Cart lines plus totals, as handed to the rendering layer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub lines: Vec<CartLine>,
    pub totals: CartTotals,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        CartView {
            lines: cart.lines.clone(),
            totals: CartTotals::from(cart),
        }
    }
}
