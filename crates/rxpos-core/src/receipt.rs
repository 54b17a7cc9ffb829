//! # Receipt Projection
//!
//! Immutable record of a completed sale, for display and for the external
//! print collaborator.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SaleSnapshot ──(remote success)──► Receipt ──► shown until next sale  │
//! │                                        │                                │
//! │                                        └──► render_text() ──► printer  │
//! │                                                                         │
//! │  A receipt is never edited. The next successful checkout replaces it.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Receipt Number Format
//! `RX-YYMMDD-HHMMSS-NNNN`, e.g. `RX-261019-143012-0001`. `NNNN` comes from a
//! per-engine counter so two sales inside the same second stay distinct.

use chrono::{DateTime, Utc};
use serde::Serialize;
use ts_rs::TS;
use uuid::Uuid;

use crate::cart::CartLine;
use crate::money::Money;

/// Narrowest slip `render_text` will produce.
pub const MIN_RECEIPT_WIDTH: usize = 24;

// =============================================================================
// Receipt
// =============================================================================

/// A completed sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    id: String,
    receipt_number: String,
    #[ts(as = "String")]
    timestamp: DateTime<Utc>,
    lines: Vec<CartLine>,
    total: Money,
}

impl Receipt {
    pub(crate) fn new(
        receipt_number: String,
        timestamp: DateTime<Utc>,
        lines: Vec<CartLine>,
        total: Money,
    ) -> Self {
        Receipt {
            id: Uuid::new_v4().to_string(),
            receipt_number,
            timestamp,
            lines,
            total,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn receipt_number(&self) -> &str {
        &self.receipt_number
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn total(&self) -> Money {
        self.total
    }

    /// Renders a fixed-width plain-text slip.
    ///
    /// ## Layout (width 32)
    /// ```text
    /// Corner Pharmacy
    /// ================================
    /// Paracetamol 500mg
    ///   5 x $10.00              $50.00
    /// --------------------------------
    /// TOTAL                     $50.00
    /// ================================
    /// RX-261019-143012-0001
    /// 2026-10-19 14:30:12 UTC
    /// ```
    pub fn render_text(&self, store_name: &str, width: usize) -> String {
        let width = width.max(MIN_RECEIPT_WIDTH);
        let heavy = "=".repeat(width);
        let light = "-".repeat(width);

        let mut out = Vec::with_capacity(self.lines.len() * 2 + 8);
        out.push(truncate(store_name.trim(), width));
        out.push(heavy.clone());

        for line in &self.lines {
            out.push(truncate(&line.name, width));
            let qty = format!("  {} x {}", line.quantity, line.unit_price());
            out.push(two_columns(&qty, &line.line_total().to_string(), width));
        }

        out.push(light);
        out.push(two_columns("TOTAL", &self.total.to_string(), width));
        out.push(heavy);
        out.push(truncate(&self.receipt_number, width));
        out.push(self.timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string());

        let mut text = out.join("\n");
        text.push('\n');
        text
    }
}

fn truncate(text: &str, width: usize) -> String {
    text.chars().take(width).collect()
}

/// Left text and right-aligned text on one row. The left side gives way when
/// both do not fit.
fn two_columns(left: &str, right: &str, width: usize) -> String {
    let right_len = right.chars().count();
    let room = width.saturating_sub(right_len + 1);
    let left = truncate(left, room);
    let pad = width.saturating_sub(left.chars().count() + right_len);
    format!("{}{}{}", left, " ".repeat(pad), right)
}

// =============================================================================
// Receipt Numbers
// =============================================================================

/// Hands out receipt numbers for one engine.
#[derive(Debug, Clone, Default)]
pub struct ReceiptNumberGenerator {
    next_seq: u32,
}

impl ReceiptNumberGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number for a sale completed at `at`.
    pub fn next(&mut self, at: DateTime<Utc>) -> String {
        self.next_seq = self.next_seq % 9999 + 1;
        format!("RX-{}-{:04}", at.format("%y%m%d-%H%M%S"), self.next_seq)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
