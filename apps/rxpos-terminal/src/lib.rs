//! # rxpos Terminal
//!
//! Drives one POS engine from a terminal: the scanner (or the cashier)
//! types lines, the terminal prints the cart, scan results and receipts.
//!
//! ## Module Organization
//! ```text
//! rxpos_terminal/
//! ├── lib.rs          ◄─── You are here (startup & input loop)
//! └── commands.rs     ◄─── stdin line parsing
//! ```

pub mod commands;

use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn, Subscriber};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use commands::{Input, HELP};
use rxpos_core::{CartView, Money, ScanStatus};
use rxpos_engine::{ApiError, ApiResult, EngineConfig, PosConfig, PosEngine, PosHandle, TerminalBell};
use rxpos_remote::HttpBackend;

/// Runs the terminal until `:quit` or end of input.
///
/// ## Startup Sequence
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  1. Initialize Logging ─────── RUST_LOG, else the built-in filter      │
/// │  2. Load PosConfig ─────────── defaults ◄ rxpos.toml ◄ RXPOS_* env     │
/// │  3. Build HttpBackend ──────── base URL, bearer token, timeout         │
/// │  4. Start PosEngine ────────── terminal bell as the scan cue           │
/// │  5. Load catalog page 1 ────── failure is reported, not fatal          │
/// │  6. Read stdin ─────────────── one line per scan or command            │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub async fn run(config_path: Option<PathBuf>) -> ApiResult<()> {
    init_tracing();

    let config = PosConfig::load(config_path)?;
    info!(api = %config.api.base_url, store = %config.store.name, "Starting rxpos terminal");

    let backend = Arc::new(HttpBackend::new(config.api_settings()?)?);
    let handle = PosEngine::new(EngineConfig::from(&config), backend.clone(), backend)
        .with_audio(Arc::new(TerminalBell))
        .start();

    match handle.load_first_page().await {
        Ok(summary) => println!("Catalog: {} products loaded", summary.product_count),
        Err(e) => println!("Catalog unavailable: {}", error_line(&e)),
    }
    println!("Scan a code or type :help");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let Some(input) = commands::parse(&line) else {
            continue;
        };
        if input == Input::Quit {
            break;
        }
        if let Err(e) = dispatch(&handle, &config, input).await {
            println!("! {}", error_line(&e));
        }
    }

    handle.shutdown().await
}

async fn dispatch(handle: &PosHandle, config: &PosConfig, input: Input) -> ApiResult<()> {
    match input {
        Input::Scan(code) => {
            handle.scan(code).await?;
            let snapshot = handle.snapshot().await?;
            print_scan(&snapshot.scan);
        }
        Input::Add(id) => print_cart(&handle.add_item(id).await?),
        Input::SetQuantity {
            product_id,
            quantity,
        } => print_cart(&handle.set_quantity(product_id, quantity).await?),
        Input::Remove(id) => print_cart(&handle.remove_item(id).await?),
        Input::Clear => print_cart(&handle.clear_cart().await?),
        Input::Checkout => {
            let receipt = handle.checkout().await?;
            print!(
                "{}",
                receipt.render_text(&config.store.name, config.store.receipt_width)
            );
        }
        Input::Search(query) => {
            for p in handle.search(query).await? {
                println!("{:<10} {:<32} {:>10} x{}", p.sku, p.name, p.price(), p.stock_quantity);
            }
        }
        Input::Filter(query) => {
            for p in handle.filter(query).await? {
                println!("{:<10} {:<32} {:>10} x{}", p.sku, p.name, p.price(), p.stock_quantity);
            }
        }
        Input::NextPage => {
            let summary = handle.load_next_page().await?;
            println!(
                "Catalog: {} products ({} pages{})",
                summary.product_count,
                summary.pages_loaded,
                if summary.has_next_page { ", more available" } else { "" }
            );
        }
        Input::ShowCart => print_cart(&handle.snapshot().await?.cart),
        Input::ShowReceipt => match handle.snapshot().await?.receipt {
            Some(receipt) => print!(
                "{}",
                receipt.render_text(&config.store.name, config.store.receipt_width)
            ),
            None => println!("No receipt yet"),
        },
        Input::NewSale => {
            handle.new_sale().await?;
            println!("New sale");
        }
        Input::Help => println!("{}", HELP),
        Input::Invalid(message) => println!("! {}", message),
        Input::Quit => {}
    }
    Ok(())
}

fn error_line(e: &ApiError) -> String {
    if e.retryable {
        format!("{} (try again)", e.message)
    } else {
        e.message.clone()
    }
}

fn print_cart(view: &CartView) {
    if view.lines.is_empty() {
        println!("Cart is empty");
        return;
    }
    for line in &view.lines {
        println!(
            "{:<10} {:<32} {:>4} x {:>10} = {:>10}",
            line.sku,
            line.name,
            line.quantity,
            line.unit_price(),
            line.line_total()
        );
    }
    println!(
        "{} items, total {}",
        view.totals.total_quantity,
        Money::from_cents(view.totals.total_cents)
    );
}

fn print_scan(status: &ScanStatus) {
    match status {
        ScanStatus::Resolved(message) => println!("+ {}", message),
        ScanStatus::NotFound(code) => println!("? No product for {}", code),
        ScanStatus::Error(reason) => println!("! {}", reason),
        ScanStatus::Scanning(_) | ScanStatus::Idle => {}
    }
}

/// Filter used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_LOG_FILTER: &str = "info,rxpos=debug,reqwest=warn";

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=rxpos=trace` - Show trace for rxpos crates only
/// - Default: INFO, debug for rxpos, warn for reqwest
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    if log_subscriber(filter).try_init().is_err() {
        warn!("Tracing subscriber already installed");
    }
}

/// Formats to stderr; `filter` alone decides what gets through.
fn log_subscriber(filter: EnvFilter) -> impl Subscriber + Send + Sync {
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish()
}
