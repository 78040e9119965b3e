//! Market data client.
//!
//! Talks to the market data server over one persistent TCP connection and
//! reconnects with a fixed delay when it is lost.
//!
//! - `config` — server address, retry policy, timeouts and stream window.
//! - `reconnect` — connection state machine and retry budget.
//! - `session` — one open connection with its frame reader thread.
//! - `connection` — owns the session and runs connect cycles.
//! - `requester` — typed calls to the market data routes.
//! - `stream` — iterator over a request-stream call with demand control.
#![warn(missing_docs)]
pub mod config;
pub mod connection;
pub mod reconnect;
pub mod requester;
pub mod session;
pub mod stream;

pub use config::ClientConfig;
pub use connection::ConnectionManager;
pub use reconnect::ConnectionState;
pub use requester::MarketDataRequester;
pub use stream::MarketDataStream;
