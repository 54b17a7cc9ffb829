//! # HTTP Backend
//!
//! `reqwest` implementation of [`CatalogFeed`] and [`SaleSubmitter`].
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  get_products(2)                                                        │
//! │      │                                                                  │
//! │      ├── token configured? ── no ──► MissingToken (no request sent)     │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  GET {base}/products?page=2   Authorization: Bearer …                   │
//! │      │                                                                  │
//! │      ├── transport failure ──► ConnectionFailed / Timeout               │
//! │      ├── non-2xx ────────────► Rejected { status, detail|message|error }│
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  dto::decode_page(body) ──► ProductPage                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `submit_sale` sends the request id as an `Idempotency-Key` header. It is
//! sent once; retrying is the caller's decision.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use rxpos_core::{CheckoutRequest, Product};
use tracing::{debug, info, instrument};
use url::Url;

use crate::dto;
use crate::error::{RemoteError, RemoteResult};
use crate::feed::{CatalogFeed, ProductPage, SaleSubmitter};

/// Header carrying the per-attempt request id on sale submission.
pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// Connection settings for the backend.
#[derive(Clone)]
pub struct ApiSettings {
    pub base_url: Url,
    pub token: Option<String>,
    pub timeout: Duration,
}

impl fmt::Debug for ApiSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiSettings")
            .field("base_url", &self.base_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// HTTP client for the pharmacy backend.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpBackend")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl HttpBackend {
    /// Builds a client with the configured timeout.
    pub fn new(settings: ApiSettings) -> RemoteResult<Self> {
        if !matches!(settings.base_url.scheme(), "http" | "https") {
            return Err(RemoteError::InvalidUrl(format!(
                "unsupported scheme '{}'",
                settings.base_url.scheme()
            )));
        }

        let client = Client::builder().timeout(settings.timeout).build()?;
        Ok(Self {
            client,
            base_url: settings.base_url,
            token: settings
                .token
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
        })
    }

    /// `{base}/{path}`, keeping any path prefix on the base URL.
    fn endpoint(&self, path: &str) -> RemoteResult<Url> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }

    fn token(&self) -> RemoteResult<&str> {
        self.token.as_deref().ok_or(RemoteError::MissingToken)
    }

    /// Sends `request` and turns non-2xx answers into `Rejected`.
    async fn send(&self, request: RequestBuilder) -> RemoteResult<Response> {
        let response = request.bearer_auth(self.token()?).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.bytes().await.unwrap_or_default();
        let message = dto::error_message(&body);
        debug!(status = status.as_u16(), ?message, "Backend rejected request");
        Err(RemoteError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl CatalogFeed for HttpBackend {
    #[instrument(skip(self))]
    async fn get_products(&self, page: u32) -> RemoteResult<ProductPage> {
        let url = self.endpoint("products")?;
        let response = self
            .send(self.client.get(url).query(&[("page", page)]))
            .await?;
        let body = response.bytes().await?;

        let page = dto::decode_page(&body)?;
        debug!(
            count = page.items.len(),
            has_next_page = page.has_next_page,
            "Fetched catalog page"
        );
        Ok(page)
    }

    #[instrument(skip(self))]
    async fn search_products(&self, query: &str) -> RemoteResult<Vec<Product>> {
        let url = self.endpoint("products")?;
        let response = self
            .send(self.client.get(url).query(&[("search", query)]))
            .await?;
        let body = response.bytes().await?;

        let page = dto::decode_page(&body)?;
        debug!(count = page.items.len(), "Product search returned");
        Ok(page.items)
    }
}

#[async_trait]
impl SaleSubmitter for HttpBackend {
    #[instrument(skip(self, request), fields(request_id = %request.request_id(), lines = request.lines().len()))]
    async fn submit_sale(&self, request: &CheckoutRequest) -> RemoteResult<()> {
        let url = self.endpoint("sales/bulk")?;
        let body = dto::encode_sale(request);

        self.send(
            self.client
                .post(url)
                .header(IDEMPOTENCY_HEADER, request.request_id().to_string())
                .json(&body),
        )
        .await?;

        info!("Sale accepted by backend");
        Ok(())
    }
}
