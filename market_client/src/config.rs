//! Client settings fixed at process start.
use std::time::Duration;

use market_common::net::{addr, DEFAULT_HOST, DEFAULT_MIME_TYPE, DEFAULT_PORT};

/// Retries after a failed connect before giving up.
pub const DEFAULT_RECONNECT_ATTEMPTS: u32 = 2;
/// Pause between connect attempts, in milliseconds.
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 2000;
/// Per-call timeout, in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
/// Items requested up front for a stream; demand is topped up as they are consumed.
pub const DEFAULT_STREAM_WINDOW: u32 = 64;

/// Where to connect and how to behave when the connection is lost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Server host name or IP.
    pub host: String,
    /// Server TCP port.
    pub port: u16,
    /// Retries after the first failed connect.
    pub reconnect_attempts: u32,
    /// Fixed delay between connect attempts.
    pub reconnect_delay: Duration,
    /// Payload MIME type announced in the setup frame.
    pub data_mime_type: String,
    /// Upper bound for a request-response call or for the wait on the next stream item.
    pub request_timeout: Duration,
    /// Stream demand window.
    pub stream_window: u32,
}

impl ClientConfig {
    /// Address string suitable for `TcpStream::connect`.
    pub fn server_addr(&self) -> String {
        addr(&self.host, self.port)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: String::from(DEFAULT_HOST),
            port: DEFAULT_PORT,
            reconnect_attempts: DEFAULT_RECONNECT_ATTEMPTS,
            reconnect_delay: Duration::from_millis(DEFAULT_RECONNECT_DELAY_MS),
            data_mime_type: String::from(DEFAULT_MIME_TYPE),
            request_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            stream_window: DEFAULT_STREAM_WINDOW,
        }
    }
}
