//! Command-line arguments for the market data client.
//!
//! This module defines the CLI interface using `clap`. See `main` for end-to-end usage.
use std::time::Duration;

use clap::{Parser, Subcommand};
use market_client::config::{
    DEFAULT_RECONNECT_ATTEMPTS, DEFAULT_RECONNECT_DELAY_MS, DEFAULT_STREAM_WINDOW,
    DEFAULT_TIMEOUT_MS,
};
use market_client::ClientConfig;
use market_common::net::{DEFAULT_HOST, DEFAULT_MIME_TYPE, DEFAULT_PORT};

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Server host name or IP address.
    #[clap(long, default_value = DEFAULT_HOST)]
    pub host: String,

    /// Server TCP port.
    #[clap(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Reconnect attempts after a failed connect.
    #[clap(long, default_value_t = DEFAULT_RECONNECT_ATTEMPTS)]
    pub reconnect_attempts: u32,

    /// Delay between reconnect attempts, in milliseconds.
    #[clap(long, default_value_t = DEFAULT_RECONNECT_DELAY_MS)]
    pub reconnect_delay_ms: u64,

    /// Payload MIME type; must match the server.
    #[clap(long, default_value = DEFAULT_MIME_TYPE)]
    pub mime_type: String,

    /// Per-call timeout, in milliseconds.
    #[clap(long, default_value_t = DEFAULT_TIMEOUT_MS)]
    pub timeout_ms: u64,

    /// Items requested ahead when streaming.
    #[clap(long, default_value_t = DEFAULT_STREAM_WINDOW)]
    pub window: u32,

    /// Interaction to perform.
    #[command(subcommand)]
    pub action: Action,
}

/// One call against the server.
#[derive(Debug, Subcommand)]
pub enum Action {
    /// Fetch the current record for a symbol (`currentMarketData`).
    Current {
        /// Stock symbol.
        symbol: String,
    },
    /// Stream every stored record for a symbol (`feedMarketData`).
    Feed {
        /// Stock symbol.
        symbol: String,
    },
    /// Store a record on the server (`collectMarketData`).
    Collect {
        /// Stock symbol.
        symbol: String,
        /// Current price.
        #[arg(allow_negative_numbers = true)]
        price: i32,
    },
}

impl Args {
    /// Connection settings from the parsed flags.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            host: self.host.trim().replace('"', ""),
            port: self.port,
            reconnect_attempts: self.reconnect_attempts,
            reconnect_delay: Duration::from_millis(self.reconnect_delay_ms),
            data_mime_type: self.mime_type.clone(),
            request_timeout: Duration::from_millis(self.timeout_ms),
            stream_window: self.window,
        }
    }
}
