//! # rxpos-remote: The Pharmacy Backend
//!
//! The catalog feed and the sale submission endpoint, behind traits.
//!
//! ## Modules
//!
//! - [`feed`] - `CatalogFeed` / `SaleSubmitter` seams and `ProductPage`
//! - [`http`] - `HttpBackend`, the `reqwest` implementation
//! - [`dto`] - JSON wire shapes and their conversion to core types
//! - [`error`] - `RemoteError`
//!
//! ## Usage
//! ```rust,no_run
//! use std::time::Duration;
//! use rxpos_remote::{ApiSettings, CatalogFeed, HttpBackend};
//!
//! # async fn demo() -> Result<(), rxpos_remote::RemoteError> {
//! let backend = HttpBackend::new(ApiSettings {
//!     base_url: "https://pharmacy.example/api".parse().unwrap(),
//!     token: Some("token".to_string()),
//!     timeout: Duration::from_secs(10),
//! })?;
//!
//! let page = backend.get_products(1).await?;
//! println!("{} products", page.items.len());
//! # Ok(())
//! # }
//! ```

pub mod dto;
pub mod error;
pub mod feed;
pub mod http;

pub use error::{RemoteError, RemoteResult};
pub use feed::{CatalogFeed, ProductPage, SaleSubmitter};
pub use http::{ApiSettings, HttpBackend};
