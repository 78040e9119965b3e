//!
//! Common types and utilities shared by the market data server and client.
//!
//! This crate aggregates:
//! - `error` — unified error type `MarketError` and the remote `ErrorKind`.
//! - `result` — handy `Result<T, MarketError>` alias.
//! - `market_data` — `MarketData` and `MarketDataRequest` payloads.
//! - `route` — route names and interaction modes.
//! - `frame` — the frame envelope exchanged over TCP.
//! - `codec` — newline-delimited JSON framing.
//! - `net` — networking defaults and small helpers.
#![warn(missing_docs)]
pub mod codec;
pub mod error;
pub mod frame;
pub mod market_data;
pub mod net;
pub mod result;
pub mod route;

pub use error::{ErrorKind, MarketError};
pub use frame::Frame;
pub use market_data::{MarketData, MarketDataRequest};
pub use result::Result;
pub use route::{InteractionMode, Route};
