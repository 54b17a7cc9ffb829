//! # rxpos Terminal Entry Point
//!
//! `rxpos-terminal [config.toml]`
//!
//! Without an argument the config is read from the platform config
//! directory (see `PosConfig::default_config_path`); missing files fall back
//! to defaults and `RXPOS_*` environment overrides.

use std::path::PathBuf;

#[tokio::main]
async fn main() {
    let config_path = std::env::args().nth(1).map(PathBuf::from);

    if let Err(e) = rxpos_terminal::run(config_path).await {
        eprintln!("rxpos-terminal: {}", e);
        std::process::exit(1);
    }
}
