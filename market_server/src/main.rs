//! Market data server binary.
//!
//! Listens on TCP (default `0.0.0.0:9999`), accepts a `setup` frame from each
//! client and then serves `currentMarketData`, `feedMarketData` and
//! `collectMarketData` from a repository that lives for the lifetime of the
//! process. Nothing is persisted.
//!
//! Usage example (CLI):
//! ```bash
//! RUST_LOG=debug market_server --port 9999
//! ```
#![warn(missing_docs)]
mod args;

use std::sync::Arc;

use clap::Parser;
use log::error;
use market_common::Result;
use market_server::{MarketDataRepository, MarketDataServer, ServerConfig};

use crate::args::Args;

fn main() -> Result<()> {
    init_logger();
    let config = ServerConfig::from(Args::parse());
    let repository = Arc::new(MarketDataRepository::new());

    let server = MarketDataServer::bind(config, repository).inspect_err(|e| {
        error!("Failed to start server: {}", e);
    })?;
    server.run()
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}
