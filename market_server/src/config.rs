//! Server settings fixed at process start.
use market_common::net::{addr, DEFAULT_BIND_HOST, DEFAULT_MIME_TYPE, DEFAULT_PORT};

/// Default capacity of each connection's outbound frame queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Listening address and per-connection limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host or IP to bind.
    pub host: String,
    /// TCP port to bind; `0` picks a free port.
    pub port: u16,
    /// Payload MIME type clients must announce in their setup frame.
    pub data_mime_type: String,
    /// Frames buffered per connection before producers block.
    pub queue_capacity: usize,
}

impl ServerConfig {
    /// Address string suitable for `TcpListener::bind`.
    pub fn bind_addr(&self) -> String {
        addr(&self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::from(DEFAULT_BIND_HOST),
            port: DEFAULT_PORT,
            data_mime_type: String::from(DEFAULT_MIME_TYPE),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}
