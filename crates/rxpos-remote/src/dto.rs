//! # Wire Format
//!
//! JSON shapes exchanged with the pharmacy backend, and their conversion to
//! and from core types.
//!
//! ## Shapes Accepted
//! ```text
//! GET /products?page=N
//!   { "items": [...], "hasNextPage": true }          ← plain page
//!   { "results": [...], "next": "...?page=3" }        ← paginated (DRF style)
//!   [ ... ]                                           ← bare list (search)
//!
//! Product record (any of the aliases):
//!   id          : 7 | "7" | "a1b2"
//!   price       : price | unitPrice | unit_price      → "10.00" | 10.0
//!   stock       : stock | stockQuantity | stock_quantity
//!   archived    : isArchived | is_archived | archived (default false)
//!
//! POST /sales/bulk
//!   [ { "product_id": 7, "quantity": 2, "unit_price": "0.45" }, ... ]
//! ```
//!
//! A page with some malformed records still loads: bad records are skipped
//! with a warning.

use rxpos_core::validation::validate_price_cents;
use rxpos_core::{CheckoutRequest, Money, Product};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::error::{RemoteError, RemoteResult};
use crate::feed::ProductPage;

// =============================================================================
// Product Records
// =============================================================================

#[derive(Debug, Deserialize)]
struct ProductRecord {
    id: Value,
    #[serde(default)]
    sku: String,
    name: String,
    #[serde(alias = "unitPrice", alias = "unit_price")]
    price: Value,
    #[serde(default, alias = "stockQuantity", alias = "stock_quantity")]
    stock: i64,
    #[serde(default, rename = "isArchived", alias = "is_archived", alias = "archived")]
    is_archived: bool,
}

impl ProductRecord {
    fn into_product(self) -> RemoteResult<Product> {
        let id = scalar_text(&self.id)
            .ok_or_else(|| RemoteError::DeserializationFailed(format!("bad product id {}", self.id)))?;

        let price_text = scalar_text(&self.price).ok_or_else(|| {
            RemoteError::DeserializationFailed(format!("bad price for product {id}"))
        })?;
        let price = Money::parse_decimal(&price_text)
            .map_err(|e| RemoteError::DeserializationFailed(e.to_string()))?;
        validate_price_cents(price.cents())
            .map_err(|e| RemoteError::DeserializationFailed(e.to_string()))?;

        Ok(Product {
            id,
            sku: self.sku.trim().to_string(),
            name: self.name.trim().to_string(),
            price_cents: price.cents(),
            stock_quantity: self.stock.max(0),
            is_archived: self.is_archived,
        })
    }
}

/// Strings pass through, numbers keep their JSON text.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn decode_products(records: Vec<Value>) -> Vec<Product> {
    records
        .into_iter()
        .filter_map(|raw| {
            let parsed = serde_json::from_value::<ProductRecord>(raw)
                .map_err(RemoteError::from)
                .and_then(ProductRecord::into_product);
            match parsed {
                Ok(product) => Some(product),
                Err(e) => {
                    warn!(error = %e, "Skipping malformed product record");
                    None
                }
            }
        })
        .collect()
}

// =============================================================================
// Pages
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ProductListBody {
    Bare(Vec<Value>),
    Items {
        items: Vec<Value>,
        #[serde(default, rename = "hasNextPage", alias = "has_next_page")]
        has_next_page: bool,
    },
    Paginated {
        results: Vec<Value>,
        #[serde(default)]
        next: Option<Value>,
    },
}

/// Decodes a product list response body into a page.
pub fn decode_page(body: &[u8]) -> RemoteResult<ProductPage> {
    let page = match serde_json::from_slice::<ProductListBody>(body)? {
        ProductListBody::Bare(records) => ProductPage {
            items: decode_products(records),
            has_next_page: false,
        },
        ProductListBody::Items {
            items,
            has_next_page,
        } => ProductPage {
            items: decode_products(items),
            has_next_page,
        },
        ProductListBody::Paginated { results, next } => ProductPage {
            items: decode_products(results),
            has_next_page: next.is_some_and(|n| !n.is_null()),
        },
    };
    Ok(page)
}

// =============================================================================
// Sale Submission
// =============================================================================

/// Builds the bulk sale body for `request`.
///
/// Numeric ids go back out as JSON numbers, as the backend issued them.
pub fn encode_sale(request: &CheckoutRequest) -> Value {
    request
        .lines()
        .iter()
        .map(|line| {
            let product_id = line
                .product_id
                .parse::<i64>()
                .map(Value::from)
                .unwrap_or_else(|_| Value::from(line.product_id.clone()));
            json!({
                "product_id": product_id,
                "quantity": line.quantity,
                "unit_price": line.unit_price.to_decimal_string(),
            })
        })
        .collect()
}

// =============================================================================
// Error Bodies
// =============================================================================

/// Pulls a human-readable message out of an error response body.
///
/// Looks at `detail`, `message` and `error`, in that order. A list of strings
/// is joined with "; ".
pub fn error_message(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    ["detail", "message", "error"]
        .iter()
        .filter_map(|key| value.get(key))
        .find_map(message_text)
}

fn message_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("; "),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

// =============================================================================
// Unit Tests
// =============================================================================
