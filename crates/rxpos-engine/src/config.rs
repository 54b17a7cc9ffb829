//! # POS Configuration
//!
//! Configuration management for the POS engine and its backend connection.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     RXPOS_API_URL=https://pharmacy.example/api                         │
//! │     RXPOS_API_TOKEN=…                                                  │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/rxpos/rxpos.toml (Linux)                                 │
//! │     ~/Library/Application Support/com.rxpos.rxpos/rxpos.toml (macOS)   │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [api]
//! base_url = "https://pharmacy.example/api"
//! token = "…"
//! timeout_secs = 10
//!
//! [scanner]
//! cooldown_ms = 500
//! display_ms = 2000
//!
//! [store]
//! name = "Corner Pharmacy"
//! receipt_width = 42
//!
//! [engine]
//! queue_capacity = 256
//! ```

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use rxpos_core::{DEFAULT_SCAN_COOLDOWN_MS, DEFAULT_SCAN_DISPLAY_MS};
use rxpos_remote::ApiSettings;

use crate::error::{ConfigError, ConfigResult};

// =============================================================================
// API Configuration
// =============================================================================

/// Backend connection settings.
#[derive(Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL; endpoints are appended to it (`{base_url}/products`).
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token. Absent until the cashier logs in.
    #[serde(default)]
    pub token: Option<String>,

    /// Per-request timeout (seconds).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_timeout() -> u64 {
    10
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            base_url: default_base_url(),
            token: None,
            timeout_secs: default_timeout(),
        }
    }
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

// =============================================================================
// Scanner Configuration
// =============================================================================

/// Barcode scanner behavior.
#[derive(Debug, Clone, Deserialize)]
pub struct ScannerConfig {
    /// Identical codes inside this window count as one physical scan.
    #[serde(default = "default_cooldown")]
    pub cooldown_ms: u64,

    /// How long a scan result stays visible before returning to idle.
    #[serde(default = "default_display")]
    pub display_ms: u64,
}

fn default_cooldown() -> u64 {
    DEFAULT_SCAN_COOLDOWN_MS
}

fn default_display() -> u64 {
    DEFAULT_SCAN_DISPLAY_MS
}

impl Default for ScannerConfig {
    fn default() -> Self {
        ScannerConfig {
            cooldown_ms: default_cooldown(),
            display_ms: default_display(),
        }
    }
}

// =============================================================================
// Store Configuration
// =============================================================================

/// The pharmacy this terminal belongs to.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Printed at the top of every receipt.
    #[serde(default = "default_store_name")]
    pub name: String,

    /// Receipt slip width in columns.
    #[serde(default = "default_receipt_width")]
    pub receipt_width: usize,
}

fn default_store_name() -> String {
    "rxpos Pharmacy".to_string()
}

fn default_receipt_width() -> usize {
    42
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            name: default_store_name(),
            receipt_width: default_receipt_width(),
        }
    }
}

// =============================================================================
// Engine Settings
// =============================================================================

/// Event loop tuning.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineSettings {
    /// Capacity of the command queue.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_queue_capacity() -> usize {
    256
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            queue_capacity: default_queue_capacity(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete POS configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PosConfig {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub scanner: ScannerConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub engine: EngineSettings,
}

impl PosConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (rxpos.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        let url = Url::parse(&self.api.base_url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl(format!(
                "API URL must start with http:// or https://, got: {}",
                self.api.base_url
            )));
        }

        if self.api.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if self.scanner.cooldown_ms == 0 {
            return Err(ConfigError::Invalid(
                "cooldown_ms must be greater than 0".into(),
            ));
        }

        if self.engine.queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "queue_capacity must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies `RXPOS_*` overrides read through `lookup`.
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("RXPOS_API_URL") {
            debug!(url = %url, "Overriding API URL from environment");
            self.api.base_url = url;
        }

        if let Some(token) = lookup("RXPOS_API_TOKEN") {
            self.api.token = Some(token);
        }

        if let Some(cooldown) = lookup("RXPOS_SCAN_COOLDOWN_MS") {
            match cooldown.parse::<u64>() {
                Ok(ms) => self.scanner.cooldown_ms = ms,
                Err(_) => warn!(value = %cooldown, "Ignoring invalid RXPOS_SCAN_COOLDOWN_MS"),
            }
        }

        if let Some(display_ms) = lookup("RXPOS_SCAN_DISPLAY_MS") {
            match display_ms.parse::<u64>() {
                Ok(ms) => self.scanner.display_ms = ms,
                Err(_) => warn!(value = %display_ms, "Ignoring invalid RXPOS_SCAN_DISPLAY_MS"),
            }
        }

        if let Some(name) = lookup("RXPOS_STORE_NAME") {
            self.store.name = name;
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "rxpos", "rxpos")
            .map(|dirs| dirs.config_dir().join("rxpos.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Backend settings for `HttpBackend`.
    pub fn api_settings(&self) -> ConfigResult<ApiSettings> {
        Ok(ApiSettings {
            base_url: Url::parse(&self.api.base_url)?,
            token: self.api.token.clone(),
            timeout: Duration::from_secs(self.api.timeout_secs),
        })
    }

    pub fn scan_cooldown(&self) -> Duration {
        Duration::from_millis(self.scanner.cooldown_ms)
    }

    pub fn scan_display(&self) -> Duration {
        Duration::from_millis(self.scanner.display_ms)
    }
}
