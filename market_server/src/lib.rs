//! Market data server.
//!
//! Serves three routes over one persistent TCP connection per client:
//!
//! - `currentMarketData` — request-response, first stored record for a symbol.
//! - `feedMarketData` — request-stream, every stored record for a symbol.
//! - `collectMarketData` — fire-and-forget, append a record.
//!
//! Building blocks:
//! - `repository` — the append-only in-memory store with snapshot scans.
//! - `controller` — route name to handler dispatch.
//! - `connection` — per-connection frame loop, writer thread and stream tasks.
//! - `server` — the accept loop.
//! - `config` — bind address and limits.
#![warn(missing_docs)]
pub mod config;
pub mod connection;
pub mod controller;
pub mod repository;
pub mod server;

pub use config::ServerConfig;
pub use controller::MarketDataController;
pub use repository::MarketDataRepository;
pub use server::MarketDataServer;
