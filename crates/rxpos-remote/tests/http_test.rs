//! Request-level tests for `HttpBackend` against an in-process backend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use url::Url;

use rxpos_core::{prepare_checkout, Cart, Product};
use rxpos_remote::http::IDEMPOTENCY_HEADER;
use rxpos_remote::{ApiSettings, CatalogFeed, HttpBackend, RemoteError, SaleSubmitter};

const TOKEN: &str = "tok-123";

// --- Recording backend ---

/// One request as the backend received it.
#[derive(Debug, Clone)]
struct Seen {
    method: Method,
    path: String,
    query: HashMap<String, String>,
    authorization: Option<String>,
    idempotency_key: Option<String>,
    body: Option<Value>,
}

struct FakeBackend {
    seen: Mutex<Vec<Seen>>,
    reply: Mutex<(StatusCode, Value)>,
}

impl FakeBackend {
    fn replying(status: StatusCode, body: Value) -> Arc<Self> {
        Arc::new(FakeBackend {
            seen: Mutex::new(Vec::new()),
            reply: Mutex::new((status, body)),
        })
    }

    fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }
}

async fn record(
    State(backend): State<Arc<FakeBackend>>,
    method: Method,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    };
    backend.seen.lock().unwrap().push(Seen {
        method,
        path: uri.path().to_string(),
        query,
        authorization: header("authorization"),
        idempotency_key: header(IDEMPOTENCY_HEADER),
        body: serde_json::from_slice(&body).ok(),
    });

    let (status, reply) = backend.reply.lock().unwrap().clone();
    (status, Json(reply))
}

struct TestServer {
    base_url: Url,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(backend: Arc<FakeBackend>) -> Self {
        let app = Router::new().fallback(record).with_state(backend);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: Url::parse(&format!("http://{}/api/", addr)).unwrap(),
            handle,
        }
    }

    fn client(&self) -> HttpBackend {
        HttpBackend::new(ApiSettings {
            base_url: self.base_url.clone(),
            token: Some(TOKEN.to_string()),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn vitamin_c() -> Product {
    Product {
        id: "7".to_string(),
        sku: "VTC-1000".to_string(),
        name: "Vitamin C 1000mg".to_string(),
        price_cents: 45,
        stock_quantity: 10,
        is_archived: false,
    }
}

// =============================================================================
// Catalog
// =============================================================================

#[tokio::test]
async fn test_get_products_sends_page_and_bearer_token() {
    let backend = FakeBackend::replying(
        StatusCode::OK,
        json!({
            "items": [{ "id": 7, "sku": "VTC-1000", "name": "Vitamin C 1000mg",
                        "price": "0.45", "stockQuantity": 10 }],
            "hasNextPage": true
        }),
    );
    let server = TestServer::spawn(backend.clone()).await;

    let page = server.client().get_products(2).await.unwrap();
    assert!(page.has_next_page);
    assert_eq!(page.items, vec![vitamin_c()]);

    let seen = backend.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].method, Method::GET);
    assert_eq!(seen[0].path, "/api/products");
    assert_eq!(seen[0].query.get("page").map(String::as_str), Some("2"));
    assert_eq!(seen[0].authorization.as_deref(), Some("Bearer tok-123"));
}

#[tokio::test]
async fn test_search_sends_query_text() {
    let backend = FakeBackend::replying(
        StatusCode::OK,
        json!([{ "id": "7", "sku": "VTC-1000", "name": "Vitamin C 1000mg",
                 "unit_price": 0.45, "stock": 10 }]),
    );
    let server = TestServer::spawn(backend.clone()).await;

    let hits = server.client().search_products("vitamin c").await.unwrap();
    assert_eq!(hits, vec![vitamin_c()]);

    let seen = backend.seen();
    assert_eq!(seen[0].path, "/api/products");
    assert_eq!(seen[0].query.get("search").map(String::as_str), Some("vitamin c"));
    assert!(!seen[0].query.contains_key("page"));
}

// =============================================================================
// Sale submission
// =============================================================================

#[tokio::test]
async fn test_submit_sale_posts_bulk_body_with_idempotency_key() {
    let backend = FakeBackend::replying(StatusCode::CREATED, json!({ "created": 1 }));
    let server = TestServer::spawn(backend.clone()).await;

    let mut cart = Cart::new();
    cart.add_item(&vitamin_c());
    cart.add_item(&vitamin_c());
    let snapshot = prepare_checkout(&cart, &vitamin_c()).unwrap();

    server.client().submit_sale(snapshot.request()).await.unwrap();

    let seen = backend.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].method, Method::POST);
    assert_eq!(seen[0].path, "/api/sales/bulk");
    assert_eq!(seen[0].authorization.as_deref(), Some("Bearer tok-123"));
    assert_eq!(
        seen[0].idempotency_key,
        Some(snapshot.request().request_id().to_string())
    );
    assert_eq!(
        seen[0].body,
        Some(json!([{ "product_id": 7, "quantity": 2, "unit_price": "0.45" }]))
    );
}

#[tokio::test]
async fn test_rejection_carries_backend_detail() {
    let backend = FakeBackend::replying(
        StatusCode::CONFLICT,
        json!({ "detail": "Insufficient stock for VTC-1000" }),
    );
    let server = TestServer::spawn(backend).await;

    let mut cart = Cart::new();
    cart.add_item(&vitamin_c());
    let snapshot = prepare_checkout(&cart, &vitamin_c()).unwrap();

    let err = server.client().submit_sale(snapshot.request()).await.unwrap_err();
    assert_eq!(
        err,
        RemoteError::Rejected {
            status: 409,
            message: Some("Insufficient stock for VTC-1000".into()),
        }
    );
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_expired_token_is_auth_error() {
    let backend = FakeBackend::replying(
        StatusCode::UNAUTHORIZED,
        json!({ "message": "Token expired" }),
    );
    let server = TestServer::spawn(backend).await;

    let err = server.client().get_products(1).await.unwrap_err();
    assert!(err.is_auth_error());
    assert_eq!(err.remote_message(), Some("Token expired"));
}

#[tokio::test]
async fn test_server_error_is_retryable() {
    let backend = FakeBackend::replying(StatusCode::SERVICE_UNAVAILABLE, json!({}));
    let server = TestServer::spawn(backend).await;

    let err = server.client().get_products(1).await.unwrap_err();
    assert_eq!(
        err,
        RemoteError::Rejected {
            status: 503,
            message: None
        }
    );
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_closed_port_is_connection_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let backend = HttpBackend::new(ApiSettings {
        base_url: Url::parse(&format!("http://{}", addr)).unwrap(),
        token: Some(TOKEN.to_string()),
        timeout: Duration::from_secs(5),
    })
    .unwrap();

    let err = backend.get_products(1).await.unwrap_err();
    assert!(matches!(err, RemoteError::ConnectionFailed(_)), "{err:?}");
    assert!(err.is_retryable());
}
