//! Market data client — sends one request to the market data server and logs the
//! outcome. The connection is opened on first use and retried with a fixed delay
//! (2 attempts, 2 s apart by default) before the call fails.
//!
//! Usage example (CLI):
//! ```bash
//! market_client --host localhost --port 9999 collect AAPL 150
//! market_client current AAPL
//! market_client feed AAPL
//! ```
#![warn(missing_docs)]
mod args;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use log::{error, info, warn};
use market_client::MarketDataRequester;
use market_common::{MarketData, Result};

use crate::args::{Action, Args};

fn main() -> Result<()> {
    init_logger();
    let args = Args::parse();
    let requester = MarketDataRequester::new(args.client_config());

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        if let Err(e) = ctrlc::set_handler(move || {
            info!("Ctrl+C received. Shutting down client...");
            shutdown.store(true, Ordering::SeqCst);
        }) {
            warn!("Ctrl+C handler not installed: {}", e);
        }
    }

    let result = run(&requester, args.action, &shutdown);
    if let Err(e) = &result {
        error!("Request failed: {}", e);
    }
    result
}

fn run(requester: &MarketDataRequester, action: Action, shutdown: &AtomicBool) -> Result<()> {
    match action {
        Action::Current { symbol } => match requester.current_market_data(&symbol)? {
            Some(data) => info!("CURRENT: {} Price={}", data.symbol, data.price),
            None => info!("No market data for {}", symbol),
        },
        Action::Feed { symbol } => {
            let mut count = 0usize;
            for item in requester.feed_market_data(&symbol)? {
                let data = item?;
                info!("FEED: {} Price={}", data.symbol, data.price);
                count += 1;
                if shutdown.load(Ordering::Relaxed) {
                    info!("Feed for {} cancelled after {} record(s)", symbol, count);
                    return Ok(());
                }
            }
            info!("Feed for {} completed with {} record(s)", symbol, count);
        }
        Action::Collect { symbol, price } => {
            requester.collect_market_data(&MarketData::new(symbol.clone(), price))?;
            info!("Sent {} Price={}", symbol, price);
        }
    }
    Ok(())
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}
