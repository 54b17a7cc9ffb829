//! # Catalog View
//!
//! The engine's local copy of the remote product catalog: every page loaded
//! so far, plus products picked up by searches.
//!
//! ## Loading
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  load_first_page()   page 1 ──► replaces everything (startup, and the  │
//! │                                  refresh after every completed sale)    │
//! │  load_next_page()    page N+1 ─► appended while has_next_page          │
//! │  merge(search hits)  ─────────► upserted by id                         │
//! │                                                                         │
//! │  A failed fetch leaves the view exactly as it was.                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The view is the "last known stock" source for the Cart Engine and the
//! checkout preconditions, through [`StockLookup`].

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, info};
use ts_rs::TS;

use rxpos_core::{Product, StockLookup};
use rxpos_remote::{CatalogFeed, ProductPage, RemoteResult};

/// Loaded products in arrival order, indexed by id.
#[derive(Debug, Clone, Default)]
pub struct CatalogView {
    products: Vec<Product>,
    index: HashMap<String, usize>,
    pages_loaded: u32,
    has_next_page: bool,
}

/// Catalog status for the rendering layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSummary {
    pub product_count: usize,
    pub pages_loaded: u32,
    pub has_next_page: bool,
}

impl CatalogView {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Fetches page 1 and replaces the view with it.
    pub async fn load_first_page(&mut self, feed: &dyn CatalogFeed) -> RemoteResult<usize> {
        let page = feed.get_products(1).await?;
        let count = page.items.len();
        self.replace(page);
        info!(count, has_next_page = self.has_next_page, "Catalog loaded");
        Ok(count)
    }

    /// Fetches and appends the next page. Returns how many products arrived;
    /// zero when there is nothing more to load.
    pub async fn load_next_page(&mut self, feed: &dyn CatalogFeed) -> RemoteResult<usize> {
        if self.pages_loaded > 0 && !self.has_next_page {
            debug!("No further catalog pages");
            return Ok(0);
        }

        let next = self.pages_loaded + 1;
        let page = feed.get_products(next).await?;
        let count = page.items.len();
        self.merge(page.items);
        self.pages_loaded = next;
        self.has_next_page = page.has_next_page;
        info!(page = next, count, "Catalog page appended");
        Ok(count)
    }

    /// Replaces the whole view with page 1 content.
    pub fn replace(&mut self, page: ProductPage) {
        self.products.clear();
        self.index.clear();
        self.merge(page.items);
        self.pages_loaded = 1;
        self.has_next_page = page.has_next_page;
    }

    /// Inserts new products and overwrites known ones in place.
    pub fn merge(&mut self, products: impl IntoIterator<Item = Product>) {
        for product in products {
            match self.index.get(&product.id) {
                Some(&slot) => self.products[slot] = product,
                None => {
                    self.index.insert(product.id.clone(), self.products.len());
                    self.products.push(product);
                }
            }
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn get(&self, product_id: &str) -> Option<&Product> {
        self.index.get(product_id).map(|&slot| &self.products[slot])
    }

    /// Scan lookup: exact SKU match first, then exact name match. Both
    /// ignore case and surrounding whitespace.
    pub fn find_by_code(&self, code: &str) -> Option<&Product> {
        let code = code.trim();
        if code.is_empty() {
            return None;
        }
        self.products
            .iter()
            .find(|p| p.sku.eq_ignore_ascii_case(code))
            .or_else(|| {
                self.products
                    .iter()
                    .find(|p| p.name.trim().eq_ignore_ascii_case(code))
            })
    }

    /// Products whose name or SKU contains `query`, ignoring case. An empty
    /// query matches everything.
    pub fn filter(&self, query: &str) -> Vec<Product> {
        let needle = query.trim().to_lowercase();
        self.products
            .iter()
            .filter(|p| {
                needle.is_empty()
                    || p.name.to_lowercase().contains(&needle)
                    || p.sku.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect()
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn summary(&self) -> CatalogSummary {
        CatalogSummary {
            product_count: self.products.len(),
            pages_loaded: self.pages_loaded,
            has_next_page: self.has_next_page,
        }
    }
}

impl StockLookup for CatalogView {
    fn stock_of(&self, product_id: &str) -> Option<i64> {
        self.get(product_id).map(|p| p.stock_quantity)
    }
}
