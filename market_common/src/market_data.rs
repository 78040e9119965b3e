//! Market data payloads exchanged between client and server.
//!
//! Field names on the wire are `stock` and `currentPrice` so the JSON stays
//! interchangeable with existing peers that speak the same routes.
use serde::{Deserialize, Serialize};

/// A single price observation for a stock symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketData {
    /// Stock symbol (e.g., `AAPL`).
    #[serde(rename = "stock")]
    pub symbol: String,
    /// Current price in the smallest unit the producer uses.
    #[serde(rename = "currentPrice", default)]
    pub price: i32,
}

impl MarketData {
    /// Creates a new record.
    pub fn new(symbol: impl Into<String>, price: i32) -> Self {
        Self {
            symbol: symbol.into(),
            price,
        }
    }
}

/// Parameter of the `currentMarketData` and `feedMarketData` routes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketDataRequest {
    /// Symbol to look up.
    #[serde(rename = "stock")]
    pub symbol: String,
}

impl MarketDataRequest {
    /// Creates a request for `symbol`.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
        }
    }
}
