//! # Remote Seams
//!
//! The two things the POS core consumes from the backend, as traits so the
//! engine can run against the HTTP backend or an in-memory fake.

use async_trait::async_trait;
use rxpos_core::{CheckoutRequest, Product};

use crate::error::RemoteResult;

/// One page of the product catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductPage {
    pub items: Vec<Product>,
    pub has_next_page: bool,
}

/// Read access to the remote product catalog.
#[async_trait]
pub trait CatalogFeed: Send + Sync {
    /// Fetches catalog page `page` (1-based).
    async fn get_products(&self, page: u32) -> RemoteResult<ProductPage>;

    /// Free-text product search. Scan lookups pass the scanned code.
    async fn search_products(&self, query: &str) -> RemoteResult<Vec<Product>>;
}

/// The remote authority that records sales.
#[async_trait]
pub trait SaleSubmitter: Send + Sync {
    /// Submits every line of `request` as one bulk sale.
    ///
    /// Either the whole sale is recorded or none of it is.
    async fn submit_sale(&self, request: &CheckoutRequest) -> RemoteResult<()>;
}
