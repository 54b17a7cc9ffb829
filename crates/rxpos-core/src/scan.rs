//! # Scan Ingestion
//!
//! Turns the raw stream of decoded barcodes into at most one cart mutation
//! per physical scan.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │           observe(code)                 resolve(product)                │
//! │   Idle ─────────────────► Scanning ─────────┬──► Resolved(msg)          │
//! │    ▲                                        ├──► NotFound(code)         │
//! │    │                                        └──► Error(reason)          │
//! │    │                                                  │                 │
//! │    └──────────── expire(generation) ◄─────────────────┘                 │
//! │                  (after the display interval)                           │
//! │                                                                         │
//! │  Duplicate suppression:                                                 │
//! │    scanner @ 30Hz:  A A A A A A A A ... B B B                           │
//! │    accepted:        A                   B                               │
//! │    (identical codes dropped until `cooldown` has passed since the      │
//! │     last ACCEPTED event; a different code is always accepted)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! This module is pure: it never sleeps and never looks anything up. The
//! engine owns the clock, the catalog lookup and the expiry timers, and feeds
//! their results back in.

use std::time::{Duration, Instant};

use serde::Serialize;
use ts_rs::TS;

use crate::cart::{Cart, CartChange};
use crate::error::{CoreError, CoreResult};
use crate::types::Product;
use crate::validation::validate_scan_code;

// =============================================================================
// Events and Status
// =============================================================================

/// One decoded barcode as delivered by the scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEvent {
    pub code: String,
    pub timestamp: Instant,
}

impl ScanEvent {
    pub fn new(code: impl Into<String>, timestamp: Instant) -> Self {
        ScanEvent {
            code: code.into(),
            timestamp,
        }
    }

    /// Event stamped with the current instant.
    pub fn now(code: impl Into<String>) -> Self {
        Self::new(code, Instant::now())
    }
}

/// Scan session status shown to the cashier.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, TS)]
#[ts(export)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum ScanStatus {
    #[default]
    Idle,
    /// A code was accepted and is being looked up.
    Scanning(String),
    /// The cart was updated; carries the confirmation message.
    Resolved(String),
    /// Carries the code nothing matched.
    NotFound(String),
    /// Carries the reason shown to the cashier.
    Error(String),
}

impl ScanStatus {
    /// Resolved, NotFound and Error auto-expire back to Idle.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ScanStatus::Resolved(_) | ScanStatus::NotFound(_) | ScanStatus::Error(_)
        )
    }
}

/// What the pipeline decided about an incoming event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanDecision {
    /// Empty or malformed code, dropped.
    Ignored,
    /// Same code as the last accepted one, inside the cooldown.
    Suppressed,
    /// New physical scan: look `code` up and call `resolve`.
    Lookup { code: String, generation: u64 },
}

/// Result of a successful resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResolution {
    pub product_id: String,
    pub quantity: i64,
    pub message: String,
}

// =============================================================================
// Pipeline
// =============================================================================

/// Duplicate suppression and status tracking for one scanner.
#[derive(Debug, Clone)]
pub struct ScanPipeline {
    cooldown: Duration,
    last_accepted: Option<(String, Instant)>,
    status: ScanStatus,
    generation: u64,
}

impl ScanPipeline {
    pub fn new(cooldown: Duration) -> Self {
        ScanPipeline {
            cooldown,
            last_accepted: None,
            status: ScanStatus::Idle,
            generation: 0,
        }
    }

    pub fn status(&self) -> &ScanStatus {
        &self.status
    }

    /// Bumped on every accepted scan.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Decides whether `event` starts a new scan.
    pub fn observe(&mut self, event: &ScanEvent) -> ScanDecision {
        let Ok(code) = validate_scan_code(&event.code) else {
            return ScanDecision::Ignored;
        };

        if let Some((last_code, accepted_at)) = &self.last_accepted {
            let elapsed = event.timestamp.saturating_duration_since(*accepted_at);
            if *last_code == code && elapsed < self.cooldown {
                return ScanDecision::Suppressed;
            }
        }

        self.last_accepted = Some((code.clone(), event.timestamp));
        self.generation += 1;
        self.status = ScanStatus::Scanning(code.clone());

        ScanDecision::Lookup {
            code,
            generation: self.generation,
        }
    }

    /// Applies the lookup result for `code` to `cart`.
    ///
    /// ## Outcomes
    /// | Lookup                         | Status       | Cart            |
    /// |--------------------------------|--------------|-----------------|
    /// | no product                     | NotFound     | unchanged       |
    /// | archived / zero stock          | Error        | unchanged       |
    /// | in cart, at stock ceiling      | Error        | unchanged       |
    /// | in cart, room to grow          | Resolved     | quantity + 1    |
    /// | not in cart                    | Resolved     | new line, qty 1 |
    pub fn resolve(
        &mut self,
        code: &str,
        product: Option<&Product>,
        cart: &mut Cart,
    ) -> CoreResult<ScanResolution> {
        let Some(product) = product else {
            self.status = ScanStatus::NotFound(code.to_string());
            return Err(CoreError::ProductNotFound(code.to_string()));
        };

        if let Err(reason) = product.availability() {
            self.status = ScanStatus::Error(format!("{} is {}", product.name, reason));
            return Err(CoreError::ProductUnavailable {
                sku: product.sku.clone(),
                reason,
            });
        }

        let change = match cart.line(&product.id).map(|l| l.quantity) {
            Some(quantity) if quantity >= product.stock_quantity => {
                self.status = ScanStatus::Error(format!(
                    "Only {} {} available",
                    product.stock_quantity, product.name
                ));
                return Err(CoreError::InsufficientStock {
                    product_id: product.id.clone(),
                    sku: product.sku.clone(),
                    available: product.stock_quantity,
                    requested: quantity + 1,
                });
            }
            Some(quantity) => cart.set_quantity(&product.id, quantity + 1, product),
            None => cart.add_item(product),
        };

        let quantity = match change {
            CartChange::Updated { quantity } => quantity,
            _ => 1,
        };
        let message = format!("Added {} (qty {})", product.name, quantity);
        self.status = ScanStatus::Resolved(message.clone());

        Ok(ScanResolution {
            product_id: product.id.clone(),
            quantity,
            message,
        })
    }

    /// Marks the current scan as failed (e.g. the remote lookup errored).
    pub fn fail(&mut self, reason: impl Into<String>) {
        self.status = ScanStatus::Error(reason.into());
    }

    /// Returns to Idle if `generation` is still the latest scan and its
    /// status is terminal. Returns whether anything changed.
    pub fn expire(&mut self, generation: u64) -> bool {
        if generation != self.generation || !self.status.is_terminal() {
            return false;
        }
        self.status = ScanStatus::Idle;
        true
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
