use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use rxpos_core::{CheckoutRequest, Money, Product, ScanStatus};
use rxpos_engine::{
    AudioCue, AudioError, EngineConfig, ErrorCode, PosEngine, PosHandle, SalePhase,
};
use rxpos_remote::{CatalogFeed, ProductPage, RemoteError, RemoteResult, SaleSubmitter};

// --- Fixtures ---

fn product(id: &str, sku: &str, name: &str, price_cents: i64, stock: i64) -> Product {
    Product {
        id: id.to_string(),
        sku: sku.to_string(),
        name: name.to_string(),
        price_cents,
        stock_quantity: stock,
        is_archived: false,
    }
}

fn paracetamol(stock: i64) -> Product {
    product("p1", "PCM-500", "Paracetamol 500mg", 1000, stock)
}

fn amoxicillin(stock: i64) -> Product {
    product("p2", "AMX-250", "Amoxicillin 250mg", 650, stock)
}

// --- Fake catalog feed ---

#[derive(Default)]
struct FakeFeed {
    page_one: Mutex<Vec<Product>>,
    search_hits: Mutex<HashMap<String, Vec<Product>>>,
    fail_pages: Mutex<bool>,
    fail_search: Mutex<bool>,
    page_calls: AtomicUsize,
    search_calls: AtomicUsize,
}

impl FakeFeed {
    fn with_products(products: Vec<Product>) -> Arc<Self> {
        let feed = FakeFeed::default();
        *feed.page_one.lock().unwrap() = products;
        Arc::new(feed)
    }

    fn set_products(&self, products: Vec<Product>) {
        *self.page_one.lock().unwrap() = products;
    }

    fn add_search_hit(&self, query: &str, product: Product) {
        self.search_hits
            .lock()
            .unwrap()
            .entry(query.to_string())
            .or_default()
            .push(product);
    }

    fn page_calls(&self) -> usize {
        self.page_calls.load(Ordering::SeqCst)
    }

    fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogFeed for FakeFeed {
    async fn get_products(&self, page: u32) -> RemoteResult<ProductPage> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);
        if *self.fail_pages.lock().unwrap() {
            return Err(RemoteError::ConnectionFailed("catalog offline".into()));
        }
        if page != 1 {
            return Ok(ProductPage::default());
        }
        Ok(ProductPage {
            items: self.page_one.lock().unwrap().clone(),
            has_next_page: false,
        })
    }

    async fn search_products(&self, query: &str) -> RemoteResult<Vec<Product>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if *self.fail_search.lock().unwrap() {
            return Err(RemoteError::Timeout);
        }
        Ok(self
            .search_hits
            .lock()
            .unwrap()
            .get(query)
            .cloned()
            .unwrap_or_default())
    }
}

// --- Fake sale submitter ---

struct FakeSubmitter {
    outcome: Mutex<RemoteResult<()>>,
    requests: Mutex<Vec<CheckoutRequest>>,
    gate: Option<Arc<Notify>>,
}

impl FakeSubmitter {
    fn accepting() -> Arc<Self> {
        Self::with_outcome(Ok(()))
    }

    fn with_outcome(outcome: RemoteResult<()>) -> Arc<Self> {
        Arc::new(FakeSubmitter {
            outcome: Mutex::new(outcome),
            requests: Mutex::new(Vec::new()),
            gate: None,
        })
    }

    fn gated(gate: Arc<Notify>) -> Arc<Self> {
        Arc::new(FakeSubmitter {
            outcome: Mutex::new(Ok(())),
            requests: Mutex::new(Vec::new()),
            gate: Some(gate),
        })
    }

    fn requests(&self) -> Vec<CheckoutRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl SaleSubmitter for FakeSubmitter {
    async fn submit_sale(&self, request: &CheckoutRequest) -> RemoteResult<()> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.outcome.lock().unwrap().clone()
    }
}

// --- Audio cues ---

#[derive(Default)]
struct CountingCue {
    plays: AtomicUsize,
}

impl AudioCue for CountingCue {
    fn play_confirmation(&self) -> Result<(), AudioError> {
        self.plays.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FailingCue;

impl AudioCue for FailingCue {
    fn play_confirmation(&self) -> Result<(), AudioError> {
        Err(AudioError::Unavailable("no sound card".into()))
    }
}

async fn start(feed: Arc<FakeFeed>, submitter: Arc<FakeSubmitter>) -> PosHandle {
    let handle = PosEngine::new(EngineConfig::default(), feed, submitter).start();
    handle.load_first_page().await.unwrap();
    handle
}

// =============================================================================
// Cart and checkout
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_quantity_clamped_then_sale_completes() {
    let feed = FakeFeed::with_products(vec![paracetamol(5)]);
    let submitter = FakeSubmitter::accepting();
    let handle = start(feed.clone(), submitter.clone()).await;

    handle.add_item("p1").await.unwrap();
    let view = handle.set_quantity("p1", 9).await.unwrap();
    assert_eq!(view.lines[0].quantity, 5);
    assert_eq!(view.totals.total_cents, 5000);

    let receipt = handle.checkout().await.unwrap();
    assert_eq!(receipt.total(), Money::from_cents(5000));
    assert_eq!(receipt.lines().len(), 1);
    assert!(receipt.receipt_number().starts_with("RX-"));

    let requests = submitter.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].lines()[0].quantity, 5);
    assert_eq!(requests[0].lines()[0].unit_price, Money::from_cents(1000));

    let snapshot = handle.snapshot().await.unwrap();
    assert!(snapshot.cart.lines.is_empty());
    assert_eq!(snapshot.phase, SalePhase::Receipt);
    assert_eq!(snapshot.receipt.as_ref(), Some(&receipt));
    assert!(!snapshot.checkout_pending);

    // Startup load plus the post-sale refresh.
    assert_eq!(feed.page_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_add_out_of_stock_is_noop() {
    let feed = FakeFeed::with_products(vec![paracetamol(0)]);
    let handle = start(feed, FakeSubmitter::accepting()).await;

    let view = handle.add_item("p1").await.unwrap();
    assert!(view.lines.is_empty());
    assert_eq!(view.totals.total_cents, 0);
}

#[tokio::test(start_paused = true)]
async fn test_add_unknown_product_is_not_found() {
    let handle = start(FakeFeed::with_products(vec![]), FakeSubmitter::accepting()).await;

    let err = handle.add_item("ghost").await.unwrap_err();
    assert_eq!(err.code, ErrorCode::NotFound);
}

#[tokio::test(start_paused = true)]
async fn test_empty_cart_checkout_rejected_locally() {
    let submitter = FakeSubmitter::accepting();
    let handle = start(FakeFeed::with_products(vec![]), submitter.clone()).await;

    let err = handle.checkout().await.unwrap_err();
    assert_eq!(err.code, ErrorCode::EmptyCart);
    assert!(submitter.requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_checkout_rejected_when_stock_dropped() {
    let feed = FakeFeed::with_products(vec![amoxicillin(3)]);
    let submitter = FakeSubmitter::accepting();
    let handle = start(feed.clone(), submitter.clone()).await;

    handle.add_item("p2").await.unwrap();
    handle.set_quantity("p2", 3).await.unwrap();

    feed.set_products(vec![amoxicillin(1)]);
    handle.load_first_page().await.unwrap();

    let err = handle.checkout().await.unwrap_err();
    assert_eq!(err.code, ErrorCode::InsufficientStock);
    assert_eq!(err.message, "Only 1 AMX-250 in stock (3 requested)");
    assert!(submitter.requests().is_empty());

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.cart.lines[0].quantity, 3);
}

#[tokio::test(start_paused = true)]
async fn test_second_checkout_rejected_while_in_flight() {
    let gate = Arc::new(Notify::new());
    let submitter = FakeSubmitter::gated(gate.clone());
    let handle = start(
        FakeFeed::with_products(vec![amoxicillin(40)]),
        submitter.clone(),
    )
    .await;
    handle.add_item("p2").await.unwrap();

    let first = {
        let handle = handle.clone();
        tokio::spawn(async move { handle.checkout().await })
    };

    let mut updates = handle.subscribe();
    updates.wait_for(|s| s.checkout_pending).await.unwrap();

    let err = handle.checkout().await.unwrap_err();
    assert_eq!(err.code, ErrorCode::CheckoutInFlight);

    // The cart stays editable while the backend thinks.
    let view = handle.set_quantity("p2", 2).await.unwrap();
    assert_eq!(view.lines[0].quantity, 2);

    gate.notify_one();
    let receipt = first.await.unwrap().unwrap();
    assert_eq!(receipt.total(), Money::from_cents(650));
    assert_eq!(submitter.requests().len(), 1);

    // Only the unit that was sold leaves the cart.
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.cart.lines.len(), 1);
    assert_eq!(snapshot.cart.lines[0].quantity, 1);
    assert!(!snapshot.checkout_pending);
}

#[tokio::test(start_paused = true)]
async fn test_items_added_during_submission_survive_the_sale() {
    let gate = Arc::new(Notify::new());
    let submitter = FakeSubmitter::gated(gate.clone());
    let handle = start(
        FakeFeed::with_products(vec![paracetamol(5), amoxicillin(40)]),
        submitter.clone(),
    )
    .await;
    handle.add_item("p1").await.unwrap();

    let first = {
        let handle = handle.clone();
        tokio::spawn(async move { handle.checkout().await })
    };
    let mut updates = handle.subscribe();
    updates.wait_for(|s| s.checkout_pending).await.unwrap();

    // Next customer's item is scanned before the backend answers.
    handle.scan("AMX-250").await.unwrap();
    let pending = handle.snapshot().await.unwrap();
    let ids: Vec<&str> = pending.cart.lines.iter().map(|l| l.product_id.as_str()).collect();
    assert_eq!(ids, vec!["p1", "p2"]);

    gate.notify_one();
    let receipt = first.await.unwrap().unwrap();
    assert_eq!(receipt.lines().len(), 1);
    assert_eq!(receipt.lines()[0].product_id, "p1");
    assert_eq!(receipt.total(), Money::from_cents(1000));

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.cart.lines.len(), 1);
    assert_eq!(snapshot.cart.lines[0].product_id, "p2");
    assert_eq!(snapshot.cart.totals.total_cents, 650);

    // And it can be sold on its own.
    gate.notify_one();
    let receipt = handle.checkout().await.unwrap();
    assert_eq!(receipt.total(), Money::from_cents(650));
    assert!(handle.snapshot().await.unwrap().cart.lines.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_rejected_sale_leaves_cart_untouched() {
    let submitter = FakeSubmitter::with_outcome(Err(RemoteError::Rejected {
        status: 409,
        message: Some("Insufficient stock for AMX-250".into()),
    }));
    let handle = start(
        FakeFeed::with_products(vec![paracetamol(5), amoxicillin(40)]),
        submitter,
    )
    .await;
    handle.add_item("p1").await.unwrap();
    handle.add_item("p2").await.unwrap();
    handle.set_quantity("p2", 4).await.unwrap();

    let before = handle.snapshot().await.unwrap();

    let err = handle.checkout().await.unwrap_err();
    assert_eq!(err.code, ErrorCode::RemoteSubmissionFailed);
    assert_eq!(err.message, "Insufficient stock for AMX-250");
    assert!(!err.retryable);

    let after = handle.snapshot().await.unwrap();
    assert_eq!(after.cart, before.cart);
    assert!(after.receipt.is_none());
    assert!(!after.checkout_pending);
    assert_eq!(after.phase, SalePhase::Selling);
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_backend_gives_generic_message() {
    let handle = start(
        FakeFeed::with_products(vec![paracetamol(5)]),
        FakeSubmitter::with_outcome(Err(RemoteError::Timeout)),
    )
    .await;
    handle.add_item("p1").await.unwrap();

    let err = handle.checkout().await.unwrap_err();
    assert_eq!(err.code, ErrorCode::RemoteSubmissionFailed);
    assert_eq!(err.message, "Sale submission failed");
    assert!(err.retryable);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_failure_after_sale_still_succeeds() {
    let feed = FakeFeed::with_products(vec![paracetamol(5)]);
    let handle = start(feed.clone(), FakeSubmitter::accepting()).await;
    handle.add_item("p1").await.unwrap();

    *feed.fail_pages.lock().unwrap() = true;
    let receipt = handle.checkout().await.unwrap();
    assert_eq!(receipt.total(), Money::from_cents(1000));

    let snapshot = handle.snapshot().await.unwrap();
    assert!(snapshot.cart.lines.is_empty());
    assert_eq!(snapshot.catalog.product_count, 1);
}

#[tokio::test(start_paused = true)]
async fn test_editing_after_receipt_returns_to_selling() {
    let handle = start(
        FakeFeed::with_products(vec![paracetamol(5)]),
        FakeSubmitter::accepting(),
    )
    .await;
    handle.add_item("p1").await.unwrap();
    handle.checkout().await.unwrap();

    handle.add_item("p1").await.unwrap();
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.phase, SalePhase::Selling);
    assert!(snapshot.receipt.is_some());

    handle.clear_cart().await.unwrap();
    handle.new_sale().await.unwrap();
    assert_eq!(handle.snapshot().await.unwrap().phase, SalePhase::Selling);
}

// =============================================================================
// Scanning
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_scan_burst_adds_one_unit() {
    let handle = start(
        FakeFeed::with_products(vec![amoxicillin(40)]),
        FakeSubmitter::accepting(),
    )
    .await;

    for _ in 0..20 {
        handle.scan("AMX-250").await.unwrap();
    }

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.cart.lines.len(), 1);
    assert_eq!(snapshot.cart.lines[0].quantity, 1);
    assert_eq!(
        snapshot.scan,
        ScanStatus::Resolved("Added Amoxicillin 250mg (qty 1)".into())
    );
}

#[tokio::test(start_paused = true)]
async fn test_same_code_after_cooldown_adds_again() {
    let handle = start(
        FakeFeed::with_products(vec![amoxicillin(40)]),
        FakeSubmitter::accepting(),
    )
    .await;

    handle.scan("AMX-250").await.unwrap();
    tokio::time::advance(Duration::from_millis(40)).await;
    handle.scan("AMX-250").await.unwrap();
    assert_eq!(handle.snapshot().await.unwrap().cart.lines[0].quantity, 1);

    tokio::time::advance(Duration::from_millis(600)).await;
    handle.scan("AMX-250").await.unwrap();
    assert_eq!(handle.snapshot().await.unwrap().cart.lines[0].quantity, 2);
}

#[tokio::test(start_paused = true)]
async fn test_scan_status_expires_to_idle() {
    let handle = start(
        FakeFeed::with_products(vec![amoxicillin(40)]),
        FakeSubmitter::accepting(),
    )
    .await;

    handle.scan("AMX-250").await.unwrap();
    assert!(handle.snapshot().await.unwrap().scan.is_terminal());

    tokio::time::sleep(Duration::from_millis(2001)).await;
    assert_eq!(handle.snapshot().await.unwrap().scan, ScanStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_stale_expiry_keeps_newer_status() {
    let handle = start(
        FakeFeed::with_products(vec![paracetamol(5), amoxicillin(40)]),
        FakeSubmitter::accepting(),
    )
    .await;

    handle.scan("AMX-250").await.unwrap();
    handle.snapshot().await.unwrap();
    tokio::time::advance(Duration::from_millis(1500)).await;
    handle.scan("PCM-500").await.unwrap();

    // First scan's timer has fired by now.
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(
        handle.snapshot().await.unwrap().scan,
        ScanStatus::Resolved("Added Paracetamol 500mg (qty 1)".into())
    );

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(handle.snapshot().await.unwrap().scan, ScanStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_scan_falls_back_to_remote_search() {
    let feed = FakeFeed::with_products(vec![]);
    feed.add_search_hit("INS-10", product("p9", "INS-10", "Insulin", 2500, 2));
    let handle = start(feed.clone(), FakeSubmitter::accepting()).await;

    handle.scan("INS-10").await.unwrap();
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.cart.lines[0].product_id, "p9");
    assert_eq!(snapshot.catalog.product_count, 1);
    assert_eq!(feed.search_calls(), 1);

    // Now known locally.
    tokio::time::advance(Duration::from_millis(600)).await;
    handle.scan("INS-10").await.unwrap();
    assert_eq!(handle.snapshot().await.unwrap().cart.lines[0].quantity, 2);
    assert_eq!(feed.search_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_code_is_not_found() {
    let handle = start(FakeFeed::with_products(vec![]), FakeSubmitter::accepting()).await;

    handle.scan("ZZZ-999").await.unwrap();
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.scan, ScanStatus::NotFound("ZZZ-999".into()));
    assert!(snapshot.cart.lines.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_remote_lookup_failure_sets_error() {
    let feed = FakeFeed::with_products(vec![]);
    *feed.fail_search.lock().unwrap() = true;
    let handle = start(feed, FakeSubmitter::accepting()).await;

    handle.scan("ZZZ-999").await.unwrap();
    let snapshot = handle.snapshot().await.unwrap();
    match snapshot.scan {
        ScanStatus::Error(reason) => assert!(reason.starts_with("Lookup failed")),
        other => panic!("expected error status, got {:?}", other),
    }
    assert!(snapshot.cart.lines.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_scan_at_stock_ceiling_reports_error() {
    let handle = start(
        FakeFeed::with_products(vec![paracetamol(1)]),
        FakeSubmitter::accepting(),
    )
    .await;

    handle.scan("PCM-500").await.unwrap();
    tokio::time::advance(Duration::from_millis(600)).await;
    handle.scan("PCM-500").await.unwrap();

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.cart.lines[0].quantity, 1);
    assert_eq!(
        snapshot.scan,
        ScanStatus::Error("Only 1 Paracetamol 500mg available".into())
    );
}

#[tokio::test(start_paused = true)]
async fn test_confirmation_cue_plays_once_per_added_scan() {
    let cue = Arc::new(CountingCue::default());
    let handle = PosEngine::new(
        EngineConfig::default(),
        FakeFeed::with_products(vec![amoxicillin(40)]),
        FakeSubmitter::accepting(),
    )
    .with_audio(cue.clone())
    .start();
    handle.load_first_page().await.unwrap();

    handle.scan("AMX-250").await.unwrap();
    handle.scan("AMX-250").await.unwrap();
    handle.scan("NOPE").await.unwrap();
    handle.snapshot().await.unwrap();

    assert_eq!(cue.plays.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_audio_failure_does_not_block_scan() {
    let handle = PosEngine::new(
        EngineConfig::default(),
        FakeFeed::with_products(vec![amoxicillin(40)]),
        FakeSubmitter::accepting(),
    )
    .with_audio(Arc::new(FailingCue))
    .start();
    handle.load_first_page().await.unwrap();

    handle.scan("AMX-250").await.unwrap();
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.cart.lines[0].quantity, 1);
}

// =============================================================================
// Catalog and lifecycle
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_search_merges_into_local_filter() {
    let feed = FakeFeed::with_products(vec![paracetamol(5)]);
    feed.add_search_hit("insulin", product("p9", "INS-10", "Insulin", 2500, 2));
    let handle = start(feed, FakeSubmitter::accepting()).await;

    let hits = handle.search("insulin").await.unwrap();
    assert_eq!(hits.len(), 1);

    let local = handle.filter("ins").await.unwrap();
    assert_eq!(local.len(), 1);
    assert_eq!(local[0].id, "p9");
    assert_eq!(handle.filter("").await.unwrap().len(), 2);

    handle.add_item("p9").await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_blank_search_returns_first_page() {
    let feed = FakeFeed::with_products(vec![paracetamol(5)]);
    feed.add_search_hit("insulin", product("p9", "INS-10", "Insulin", 2500, 2));
    let handle = start(feed.clone(), FakeSubmitter::accepting()).await;
    handle.search("insulin").await.unwrap();
    assert_eq!(handle.snapshot().await.unwrap().catalog.product_count, 2);

    feed.set_products(vec![paracetamol(5), amoxicillin(40)]);
    let hits = handle.search("   ").await.unwrap();
    let ids: Vec<&str> = hits.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["p1", "p2"]);

    assert_eq!(feed.search_calls(), 1);
    assert_eq!(feed.page_calls(), 2);
    assert_eq!(handle.snapshot().await.unwrap().catalog.product_count, 2);
}

#[tokio::test(start_paused = true)]
async fn test_failed_catalog_load_keeps_view() {
    let feed = FakeFeed::with_products(vec![paracetamol(5)]);
    let handle = start(feed.clone(), FakeSubmitter::accepting()).await;

    *feed.fail_pages.lock().unwrap() = true;
    let err = handle.load_first_page().await.unwrap_err();
    assert_eq!(err.code, ErrorCode::RemoteError);
    assert_eq!(handle.snapshot().await.unwrap().catalog.product_count, 1);
}

#[tokio::test(start_paused = true)]
async fn test_calls_after_shutdown_report_stopped() {
    let handle = start(FakeFeed::with_products(vec![]), FakeSubmitter::accepting()).await;

    handle.shutdown().await.unwrap();
    let err = handle.snapshot().await.unwrap_err();
    assert_eq!(err.code, ErrorCode::EngineStopped);
}
