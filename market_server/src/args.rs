//! Command-line arguments for the market data server.
use clap::Parser;
use market_common::net::{DEFAULT_BIND_HOST, DEFAULT_MIME_TYPE, DEFAULT_PORT};
use market_server::config::DEFAULT_QUEUE_CAPACITY;
use market_server::ServerConfig;

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Host or IP address to listen on.
    #[clap(long, default_value = DEFAULT_BIND_HOST)]
    pub host: String,

    /// TCP port to listen on.
    #[clap(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Payload MIME type clients must use.
    #[clap(long, default_value = DEFAULT_MIME_TYPE)]
    pub mime_type: String,

    /// Outbound frames buffered per connection before producers block.
    #[clap(long, default_value_t = DEFAULT_QUEUE_CAPACITY)]
    pub queue_capacity: usize,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        ServerConfig {
            host: args.host.trim().replace('"', ""),
            port: args.port,
            data_mime_type: args.mime_type,
            queue_capacity: args.queue_capacity,
        }
    }
}
