//! # rxpos-core: Pure Business Logic for the Pharmacy POS
//!
//! Everything that decides what the cart, a checkout or a scan *means*.
//! Nothing in this crate touches the network, a clock-driven timer or a file.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        rxpos Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Rendering layer / terminal driver               │   │
//! │  │       Catalog list ──► Cart ──► Checkout ──► Receipt            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ PosHandle                              │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              rxpos-engine (event loop, catalog view)            │   │
//! │  └──────────────┬──────────────────────────────────┬───────────────┘   │
//! │                 │                                  │                    │
//! │  ┌──────────────▼──────────────────┐   ┌──────────▼────────────────┐   │
//! │  │     ★ rxpos-core (THIS CRATE) ★ │   │   rxpos-remote            │   │
//! │  │                                 │   │   catalog feed, sales API │   │
//! │  │  cart  checkout  scan  receipt  │   └───────────────────────────┘   │
//! │  │  money  types  validation       │                                    │
//! │  │                                 │                                    │
//! │  │  NO I/O • NO TIMERS • PURE      │                                    │
//! │  └─────────────────────────────────┘                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Product and the `StockLookup` seam
//! - [`money`] - Money type with integer arithmetic
//! - [`cart`] - Cart Engine (stock-clamped add / set / remove)
//! - [`checkout`] - Checkout preconditions and the submission snapshot
//! - [`receipt`] - Receipt projection and receipt numbers
//! - [`scan`] - Scan de-duplication and resolution state machine
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use rxpos_core::{Cart, Product};
//!
//! let paracetamol = Product {
//!     id: "p1".to_string(),
//!     sku: "PCM-500".to_string(),
//!     name: "Paracetamol 500mg".to_string(),
//!     price_cents: 1000,
//!     stock_quantity: 5,
//!     is_archived: false,
//! };
//!
//! let mut cart = Cart::new();
//! cart.add_item(&paracetamol);
//! cart.set_quantity("p1", 9, &paracetamol);
//!
//! // Clamped to the 5 in stock.
//! assert_eq!(cart.total().cents(), 5000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod checkout;
pub mod error;
pub mod money;
pub mod receipt;
pub mod scan;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{Cart, CartChange, CartLine, CartTotals, CartView};
pub use checkout::{prepare_checkout, CheckoutLine, CheckoutRequest, SaleSnapshot};
pub use error::{CoreError, CoreResult, UnavailableReason, ValidationError};
pub use money::Money;
pub use receipt::{Receipt, ReceiptNumberGenerator};
pub use scan::{ScanDecision, ScanEvent, ScanPipeline, ScanResolution, ScanStatus};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Window in which a repeated identical code counts as the same physical scan.
pub const DEFAULT_SCAN_COOLDOWN_MS: u64 = 500;

/// How long a scan result stays on screen before returning to Idle.
pub const DEFAULT_SCAN_DISPLAY_MS: u64 = 2000;
