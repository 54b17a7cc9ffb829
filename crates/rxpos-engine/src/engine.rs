//! # POS Engine
//!
//! The single task that owns the live sale.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                            PosEngine                                    │
//! │                                                                         │
//! │  PosHandle ──► mpsc<Command> ───┐                                       │
//! │  (UI, terminal, scanner)        │                                       │
//! │                                 ▼                                       │
//! │                    ┌─────────────────────────┐                          │
//! │  submit task ───►  │  run loop (select!)     │ ──► watch<PosSnapshot>   │
//! │  expiry timers ──► │                         │                          │
//! │  (internal events) │  Cart   CatalogView     │                          │
//! │                    │  ScanPipeline  Receipt  │                          │
//! │                    └────────────┬────────────┘                          │
//! │                                 │                                       │
//! │                   CatalogFeed ◄─┴─► SaleSubmitter                       │
//! │                                                                         │
//! │  Cart mutations (manual and scanned) are applied one at a time, in     │
//! │  arrival order. Sale submission runs on its own task so the loop keeps │
//! │  answering while the backend thinks.                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Checkout
//! ```text
//!   Checkout ──► pending? ── yes ──► CHECKOUT_IN_FLIGHT
//!                   │ no
//!                   ▼
//!            prepare_checkout (empty cart / stock vs. catalog view)
//!                   │ ok
//!                   ▼
//!            pending = true, spawn submit(snapshot)
//!                   │
//!        ┌──────────┴───────────┐
//!        ▼ Ok                   ▼ Err
//!   receipt from snapshot   cart untouched
//!   sold lines settled      REMOTE_SUBMISSION_FAILED
//!   catalog page 1 reload   (retryable if unreachable)
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, instrument, warn};
use ts_rs::TS;

use rxpos_core::{
    prepare_checkout, Cart, CartChange, CartView, CoreError, Product, Receipt,
    ReceiptNumberGenerator, SaleSnapshot, ScanDecision, ScanEvent, ScanPipeline, ScanStatus,
    DEFAULT_SCAN_COOLDOWN_MS, DEFAULT_SCAN_DISPLAY_MS,
};
use rxpos_core::validation::validate_search_query;
use rxpos_remote::{CatalogFeed, RemoteResult, SaleSubmitter};

use crate::audio::{AudioCue, SilentCue};
use crate::catalog::{CatalogSummary, CatalogView};
use crate::config::PosConfig;
use crate::error::{ApiError, ApiResult};

// =============================================================================
// Configuration
// =============================================================================

/// Runtime knobs for the engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Same-code duplicate window.
    pub scan_cooldown: Duration,
    /// How long a scan result stays on screen.
    pub scan_display: Duration,
    /// Command queue capacity.
    pub queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            scan_cooldown: Duration::from_millis(DEFAULT_SCAN_COOLDOWN_MS),
            scan_display: Duration::from_millis(DEFAULT_SCAN_DISPLAY_MS),
            queue_capacity: 256,
        }
    }
}

impl From<&PosConfig> for EngineConfig {
    fn from(config: &PosConfig) -> Self {
        EngineConfig {
            scan_cooldown: config.scan_cooldown(),
            scan_display: config.scan_display(),
            queue_capacity: config.engine.queue_capacity.max(1),
        }
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// Which screen the sale is on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SalePhase {
    /// Building the cart.
    #[default]
    Selling,
    /// Showing the receipt of the last completed sale.
    Receipt,
}

/// Everything the rendering layer needs, published after every change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PosSnapshot {
    pub cart: CartView,
    pub scan: ScanStatus,
    pub receipt: Option<Receipt>,
    pub phase: SalePhase,
    pub checkout_pending: bool,
    pub catalog: CatalogSummary,
}

// =============================================================================
// Commands
// =============================================================================

type Reply<T> = oneshot::Sender<ApiResult<T>>;

enum Command {
    AddItem { product_id: String, reply: Reply<CartView> },
    SetQuantity { product_id: String, quantity: i64, reply: Reply<CartView> },
    RemoveItem { product_id: String, reply: Reply<CartView> },
    ClearCart { reply: Reply<CartView> },
    Checkout { reply: Reply<Receipt> },
    Scan(ScanEvent),
    LoadFirstPage { reply: Reply<CatalogSummary> },
    LoadNextPage { reply: Reply<CatalogSummary> },
    Search { query: String, reply: Reply<Vec<Product>> },
    Filter { query: String, reply: Reply<Vec<Product>> },
    NewSale { reply: Reply<()> },
    Snapshot { reply: Reply<PosSnapshot> },
    Shutdown,
}

/// Events produced by tasks the engine spawned.
enum Internal {
    CheckoutFinished {
        snapshot: SaleSnapshot,
        result: RemoteResult<()>,
        reply: Reply<Receipt>,
    },
    ScanExpired { generation: u64 },
}

// =============================================================================
// Handle
// =============================================================================

/// Cloneable front door to a running [`PosEngine`].
#[derive(Clone)]
pub struct PosHandle {
    cmd_tx: mpsc::Sender<Command>,
    snapshot_rx: watch::Receiver<PosSnapshot>,
}

impl PosHandle {
    async fn request<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> ApiResult<T> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(make(reply))
            .await
            .map_err(|_| ApiError::engine_stopped())?;
        rx.await.map_err(|_| ApiError::engine_stopped())?
    }

    /// Adds one unit of a catalog product (no-op at its stock ceiling).
    pub async fn add_item(&self, product_id: impl Into<String>) -> ApiResult<CartView> {
        let product_id = product_id.into();
        self.request(|reply| Command::AddItem { product_id, reply }).await
    }

    /// Sets a line's quantity, clamped into `[1, stock]`.
    pub async fn set_quantity(
        &self,
        product_id: impl Into<String>,
        quantity: i64,
    ) -> ApiResult<CartView> {
        let product_id = product_id.into();
        self.request(|reply| Command::SetQuantity {
            product_id,
            quantity,
            reply,
        })
        .await
    }

    pub async fn remove_item(&self, product_id: impl Into<String>) -> ApiResult<CartView> {
        let product_id = product_id.into();
        self.request(|reply| Command::RemoveItem { product_id, reply }).await
    }

    pub async fn clear_cart(&self) -> ApiResult<CartView> {
        self.request(|reply| Command::ClearCart { reply }).await
    }

    /// Submits the cart. Resolves once the backend has answered.
    pub async fn checkout(&self) -> ApiResult<Receipt> {
        self.request(|reply| Command::Checkout { reply }).await
    }

    /// Feeds a scanned code stamped with the current instant.
    pub async fn scan(&self, code: impl Into<String>) -> ApiResult<()> {
        let event = ScanEvent::new(code, tokio::time::Instant::now().into_std());
        self.submit_scan(event).await
    }

    /// Feeds a scan event. Outcomes show up in the snapshot's `scan` status.
    pub async fn submit_scan(&self, event: ScanEvent) -> ApiResult<()> {
        self.cmd_tx
            .send(Command::Scan(event))
            .await
            .map_err(|_| ApiError::engine_stopped())
    }

    pub async fn load_first_page(&self) -> ApiResult<CatalogSummary> {
        self.request(|reply| Command::LoadFirstPage { reply }).await
    }

    pub async fn load_next_page(&self) -> ApiResult<CatalogSummary> {
        self.request(|reply| Command::LoadNextPage { reply }).await
    }

    /// Remote search; hits are merged into the catalog view. A blank query
    /// reloads and returns the first catalog page.
    pub async fn search(&self, query: impl Into<String>) -> ApiResult<Vec<Product>> {
        let query = query.into();
        self.request(|reply| Command::Search { query, reply }).await
    }

    /// Filters the loaded catalog without a network call.
    pub async fn filter(&self, query: impl Into<String>) -> ApiResult<Vec<Product>> {
        let query = query.into();
        self.request(|reply| Command::Filter { query, reply }).await
    }

    /// Leaves the receipt screen.
    pub async fn new_sale(&self) -> ApiResult<()> {
        self.request(|reply| Command::NewSale { reply }).await
    }

    /// State after every previously queued command has been applied.
    pub async fn snapshot(&self) -> ApiResult<PosSnapshot> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    /// Live snapshot stream.
    pub fn subscribe(&self) -> watch::Receiver<PosSnapshot> {
        self.snapshot_rx.clone()
    }

    pub async fn shutdown(&self) -> ApiResult<()> {
        self.cmd_tx
            .send(Command::Shutdown)
            .await
            .map_err(|_| ApiError::engine_stopped())
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Owns the cart, catalog view, scan pipeline and receipt of one terminal.
pub struct PosEngine {
    config: EngineConfig,
    feed: Arc<dyn CatalogFeed>,
    submitter: Arc<dyn SaleSubmitter>,
    audio: Arc<dyn AudioCue>,

    cart: Cart,
    catalog: CatalogView,
    scan: ScanPipeline,
    receipt: Option<Receipt>,
    phase: SalePhase,
    checkout_pending: bool,
    numbers: ReceiptNumberGenerator,

    snapshot_tx: watch::Sender<PosSnapshot>,
    internal_tx: mpsc::UnboundedSender<Internal>,
}

impl PosEngine {
    pub fn new(
        config: EngineConfig,
        feed: Arc<dyn CatalogFeed>,
        submitter: Arc<dyn SaleSubmitter>,
    ) -> Self {
        let (snapshot_tx, _) = watch::channel(PosSnapshot::default());
        // Replaced in `start`; events sent before then have nowhere to go.
        let (internal_tx, _) = mpsc::unbounded_channel();

        PosEngine {
            scan: ScanPipeline::new(config.scan_cooldown),
            config,
            feed,
            submitter,
            audio: Arc::new(SilentCue),
            cart: Cart::new(),
            catalog: CatalogView::new(),
            receipt: None,
            phase: SalePhase::Selling,
            checkout_pending: false,
            numbers: ReceiptNumberGenerator::new(),
            snapshot_tx,
            internal_tx,
        }
    }

    /// Replaces the default silent confirmation cue.
    pub fn with_audio(mut self, audio: Arc<dyn AudioCue>) -> Self {
        self.audio = audio;
        self
    }

    /// Starts the engine and returns a handle.
    pub fn start(mut self) -> PosHandle {
        let (cmd_tx, cmd_rx) = mpsc::channel(self.config.queue_capacity);
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        self.internal_tx = internal_tx;
        let snapshot_rx = self.snapshot_tx.subscribe();

        tokio::spawn(async move {
            self.run(cmd_rx, internal_rx).await;
        });

        PosHandle {
            cmd_tx,
            snapshot_rx,
        }
    }

    /// Main engine loop.
    async fn run(
        mut self,
        mut cmd_rx: mpsc::Receiver<Command>,
        mut internal_rx: mpsc::UnboundedReceiver<Internal>,
    ) {
        info!(
            cooldown_ms = self.config.scan_cooldown.as_millis() as u64,
            display_ms = self.config.scan_display.as_millis() as u64,
            "POS engine started"
        );

        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(Command::Shutdown) | None => {
                            info!("POS engine shutting down");
                            break;
                        }
                        Some(cmd) => self.handle_command(cmd).await,
                    }
                }
                Some(event) = internal_rx.recv() => {
                    self.handle_internal(event).await;
                }
            }
        }
    }

    async fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::AddItem { product_id, reply } => {
                let result = self.add_item(&product_id);
                self.finish(reply, result);
            }
            Command::SetQuantity {
                product_id,
                quantity,
                reply,
            } => {
                let change = self.cart.set_quantity(&product_id, quantity, &self.catalog);
                let result = Ok(self.after_cart_change(change));
                self.finish(reply, result);
            }
            Command::RemoveItem { product_id, reply } => {
                let change = self.cart.remove_item(&product_id);
                let result = Ok(self.after_cart_change(change));
                self.finish(reply, result);
            }
            Command::ClearCart { reply } => {
                let change = self.cart.clear();
                let result = Ok(self.after_cart_change(change));
                self.finish(reply, result);
            }
            Command::Checkout { reply } => self.begin_checkout(reply),
            Command::Scan(event) => self.handle_scan(event).await,
            Command::LoadFirstPage { reply } => {
                let result = self
                    .catalog
                    .load_first_page(self.feed.as_ref())
                    .await
                    .map(|_| self.catalog.summary())
                    .map_err(ApiError::from);
                self.finish(reply, result);
            }
            Command::LoadNextPage { reply } => {
                let result = self
                    .catalog
                    .load_next_page(self.feed.as_ref())
                    .await
                    .map(|_| self.catalog.summary())
                    .map_err(ApiError::from);
                self.finish(reply, result);
            }
            Command::Search { query, reply } => {
                let result = self.search(&query).await;
                self.finish(reply, result);
            }
            Command::Filter { query, reply } => {
                let _ = reply.send(Ok(self.catalog.filter(&query)));
            }
            Command::NewSale { reply } => {
                self.phase = SalePhase::Selling;
                self.finish(reply, Ok(()));
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(Ok(self.snapshot()));
            }
            Command::Shutdown => {}
        }
    }

    async fn handle_internal(&mut self, event: Internal) {
        match event {
            Internal::CheckoutFinished {
                snapshot,
                result,
                reply,
            } => self.finish_checkout(snapshot, result, reply).await,
            Internal::ScanExpired { generation } => {
                if self.scan.expire(generation) {
                    debug!(generation, "Scan status expired");
                    self.publish();
                }
            }
        }
    }

    /// Publishes the new state, then answers the caller.
    fn finish<T>(&self, reply: Reply<T>, result: ApiResult<T>) {
        self.publish();
        let _ = reply.send(result);
    }

    // =========================================================================
    // Cart
    // =========================================================================

    fn add_item(&mut self, product_id: &str) -> ApiResult<CartView> {
        let product = self
            .catalog
            .get(product_id)
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;
        let change = self.cart.add_item(product);
        Ok(self.after_cart_change(change))
    }

    fn after_cart_change(&mut self, change: CartChange) -> CartView {
        if change.is_change() {
            self.phase = SalePhase::Selling;
            debug!(?change, items = self.cart.item_count(), "Cart updated");
        }
        CartView::from(&self.cart)
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    fn begin_checkout(&mut self, reply: Reply<Receipt>) {
        if self.checkout_pending {
            let _ = reply.send(Err(CoreError::CheckoutInFlight.into()));
            return;
        }

        let snapshot = match prepare_checkout(&self.cart, &self.catalog) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                debug!(error = %e, "Checkout precondition failed");
                let _ = reply.send(Err(e.into()));
                return;
            }
        };

        info!(
            request_id = %snapshot.request().request_id(),
            lines = snapshot.lines().len(),
            total = %snapshot.total(),
            "Submitting sale"
        );

        self.checkout_pending = true;
        self.publish();

        let submitter = Arc::clone(&self.submitter);
        let internal_tx = self.internal_tx.clone();
        tokio::spawn(async move {
            let result = submitter.submit_sale(snapshot.request()).await;
            let _ = internal_tx.send(Internal::CheckoutFinished {
                snapshot,
                result,
                reply,
            });
        });
    }

    #[instrument(skip_all, fields(request_id = %snapshot.request().request_id()))]
    async fn finish_checkout(
        &mut self,
        snapshot: SaleSnapshot,
        result: RemoteResult<()>,
        reply: Reply<Receipt>,
    ) {
        self.checkout_pending = false;

        if let Err(e) = result {
            warn!(error = %e, "Sale submission failed");
            let err = CoreError::remote_submission(e.remote_message().map(String::from));
            self.finish(reply, Err(ApiError::from(err).with_retryable(e.is_retryable())));
            return;
        }

        self.cart.settle(snapshot.lines());
        let now = Utc::now();
        let receipt = snapshot.into_receipt(self.numbers.next(now), now);
        info!(
            receipt_number = receipt.receipt_number(),
            total = %receipt.total(),
            "Sale completed"
        );

        self.receipt = Some(receipt.clone());
        self.phase = SalePhase::Receipt;

        if let Err(e) = self.catalog.load_first_page(self.feed.as_ref()).await {
            warn!(error = %e, "Catalog refresh after sale failed");
        }

        self.finish(reply, Ok(receipt));
    }

    // =========================================================================
    // Scanning
    // =========================================================================

    async fn handle_scan(&mut self, event: ScanEvent) {
        let (code, generation) = match self.scan.observe(&event) {
            ScanDecision::Lookup { code, generation } => (code, generation),
            ScanDecision::Suppressed => {
                debug!(code = %event.code, "Duplicate scan suppressed");
                return;
            }
            ScanDecision::Ignored => return,
        };
        self.publish();

        match self.lookup(&code).await {
            Ok(product) => {
                match self.scan.resolve(&code, product.as_ref(), &mut self.cart) {
                    Ok(resolution) => {
                        debug!(
                            product_id = %resolution.product_id,
                            quantity = resolution.quantity,
                            "Scan resolved"
                        );
                        self.phase = SalePhase::Selling;
                        if let Err(e) = self.audio.play_confirmation() {
                            warn!(error = %e, "Confirmation cue failed");
                        }
                    }
                    Err(e) => debug!(code = %code, error = %e, "Scan not added"),
                }
            }
            Err(e) => {
                warn!(code = %code, error = %e, "Remote scan lookup failed");
                self.scan.fail(format!("Lookup failed: {}", e));
            }
        }

        self.schedule_expiry(generation);
        self.publish();
    }

    /// Local catalog first, then a remote search merged into the view.
    async fn lookup(&mut self, code: &str) -> RemoteResult<Option<Product>> {
        if let Some(product) = self.catalog.find_by_code(code) {
            return Ok(Some(product.clone()));
        }

        let hits = self.feed.search_products(code).await?;
        self.catalog.merge(hits);
        Ok(self.catalog.find_by_code(code).cloned())
    }

    fn schedule_expiry(&self, generation: u64) {
        let display = self.config.scan_display;
        let internal_tx = self.internal_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(display).await;
            let _ = internal_tx.send(Internal::ScanExpired { generation });
        });
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// An empty query reloads page 1 and returns it instead of asking the
    /// backend to search for nothing.
    async fn search(&mut self, query: &str) -> ApiResult<Vec<Product>> {
        let query = validate_search_query(query).map_err(CoreError::from)?;
        if query.is_empty() {
            self.catalog.load_first_page(self.feed.as_ref()).await?;
            return Ok(self.catalog.products().to_vec());
        }
        let hits = self.feed.search_products(&query).await?;
        self.catalog.merge(hits.clone());
        Ok(hits)
    }

    // =========================================================================
    // Snapshot
    // =========================================================================

    fn snapshot(&self) -> PosSnapshot {
        PosSnapshot {
            cart: CartView::from(&self.cart),
            scan: self.scan.status().clone(),
            receipt: self.receipt.clone(),
            phase: self.phase,
            checkout_pending: self.checkout_pending,
            catalog: self.catalog.summary(),
        }
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.snapshot());
    }
}
