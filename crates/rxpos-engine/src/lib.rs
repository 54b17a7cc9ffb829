//! # rxpos-engine: The Live Sale
//!
//! Runs one terminal's sale as a single Tokio task and exposes it through a
//! cloneable [`PosHandle`].
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Engine Architecture                             │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                      PosEngine (one task)                        │  │
//! │  │                                                                  │  │
//! │  │  Cart ─── CatalogView ─── ScanPipeline ─── Receipt               │  │
//! │  └───────────┬─────────────────────┬────────────────────┬──────────┘  │
//! │              ▼                     ▼                    ▼              │
//! │  ┌────────────────┐  ┌────────────────────┐  ┌──────────────────┐     │
//! │  │  CatalogFeed   │  │  SaleSubmitter     │  │  AudioCue        │     │
//! │  │  page 1..N,    │  │  POST sales/bulk   │  │  best effort     │     │
//! │  │  search        │  │  Idempotency-Key   │  │                  │     │
//! │  └────────────────┘  └────────────────────┘  └──────────────────┘     │
//! │                                                                         │
//! │  STATE OUT: watch<PosSnapshot> after every change                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`engine`] - `PosEngine`, `PosHandle`, `PosSnapshot`
//! - [`catalog`] - Loaded catalog pages and search hits
//! - [`config`] - `PosConfig` (defaults, TOML file, environment)
//! - [`audio`] - Scan confirmation cue
//! - [`error`] - `ApiError` and `ConfigError`
//!
//! ## Usage
//! ```rust,no_run
//! use std::sync::Arc;
//! use rxpos_engine::{EngineConfig, PosConfig, PosEngine};
//! use rxpos_remote::HttpBackend;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PosConfig::load(None)?;
//! let backend = Arc::new(HttpBackend::new(config.api_settings()?)?);
//!
//! let handle = PosEngine::new(EngineConfig::from(&config), backend.clone(), backend).start();
//! handle.load_first_page().await?;
//! handle.scan("AMX-250").await?;
//! # Ok(())
//! # }
//! ```

pub mod audio;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;

pub use audio::{AudioCue, AudioError, SilentCue, TerminalBell};
pub use catalog::{CatalogSummary, CatalogView};
pub use config::PosConfig;
pub use engine::{EngineConfig, PosEngine, PosHandle, PosSnapshot, SalePhase};
pub use error::{ApiError, ApiResult, ConfigError, ConfigResult, ErrorCode};
