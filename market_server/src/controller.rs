//! Route dispatch for the market data server.
//!
//! `MarketDataController` owns a handle to the repository and maps a route name
//! plus raw JSON payload onto one of three handlers:
//!
//! | route               | mode             | input               | reply            |
//! |---------------------|------------------|---------------------|------------------|
//! | `currentMarketData` | request-response | `MarketDataRequest` | `Reply::Single`  |
//! | `feedMarketData`    | request-stream   | `MarketDataRequest` | `Reply::Stream`  |
//! | `collectMarketData` | fire-and-forget  | `MarketData`        | `Reply::Accepted`|
//!
//! Failures are returned as `MarketError`; the connection layer turns them into
//! `error` frames.
use std::str::FromStr;
use std::sync::Arc;

use log::{debug, info};
use market_common::{InteractionMode, MarketData, MarketDataRequest, MarketError, Result, Route};
use serde_json::Value;

use crate::repository::{MarketDataFeed, MarketDataRepository};

/// Outcome of a dispatched call.
#[derive(Debug)]
pub enum Reply {
    /// Request-response answer; `None` is a valid empty result.
    Single(Option<MarketData>),
    /// Request-stream answer, consumed lazily by the connection.
    Stream(MarketDataFeed),
    /// Fire-and-forget was handled; nothing is sent back.
    Accepted,
}

/// Handlers for the market data routes.
#[derive(Debug, Clone)]
pub struct MarketDataController {
    repository: Arc<MarketDataRepository>,
}

impl MarketDataController {
    /// Create a controller backed by `repository`.
    pub fn new(repository: Arc<MarketDataRepository>) -> Self {
        Self { repository }
    }

    /// The repository this controller serves.
    pub fn repository(&self) -> &Arc<MarketDataRepository> {
        &self.repository
    }

    /// Resolve `route` and invoke its handler with `data` decoded to the handler's
    /// input type.
    pub fn dispatch(&self, route: &str, mode: InteractionMode, data: Value) -> Result<Reply> {
        let resolved =
            Route::from_str(route).map_err(|_| MarketError::UnknownRoute(route.to_string()))?;
        if resolved.mode() != mode {
            return Err(MarketError::ModeMismatch {
                route: route.to_string(),
                mode: mode.to_string(),
            });
        }
        debug!("Dispatching {} ({})", resolved, mode);

        match resolved {
            Route::CurrentMarketData => {
                let request: MarketDataRequest = serde_json::from_value(data)?;
                self.current_market_data(&request).map(Reply::Single)
            }
            Route::FeedMarketData => {
                let request: MarketDataRequest = serde_json::from_value(data)?;
                self.feed_market_data(&request).map(Reply::Stream)
            }
            Route::CollectMarketData => {
                let record: MarketData = serde_json::from_value(data)?;
                self.collect_market_data(record).map(|_| Reply::Accepted)
            }
        }
    }

    /// `currentMarketData`: first stored record for the symbol.
    pub fn current_market_data(&self, request: &MarketDataRequest) -> Result<Option<MarketData>> {
        self.repository.get_one(&request.symbol)
    }

    /// `feedMarketData`: every stored record for the symbol.
    pub fn feed_market_data(&self, request: &MarketDataRequest) -> Result<MarketDataFeed> {
        self.repository.get_all(&request.symbol)
    }

    /// `collectMarketData`: store the record.
    pub fn collect_market_data(&self, record: MarketData) -> Result<()> {
        info!("Collected {} at {}", record.symbol, record.price);
        self.repository.add(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use market_common::ErrorKind;
    use serde_json::json;

    fn controller() -> MarketDataController {
        MarketDataController::new(Arc::new(MarketDataRepository::new()))
    }

    #[test]
    fn collect_then_current() {
        let c = controller();
        let reply = c
            .dispatch(
                "collectMarketData",
                InteractionMode::FireAndForget,
                json!({"stock": "AAPL", "currentPrice": 150}),
            )
            .unwrap();
        assert!(matches!(reply, Reply::Accepted));

        let reply = c
            .dispatch(
                "currentMarketData",
                InteractionMode::RequestResponse,
                json!({"stock": "AAPL"}),
            )
            .unwrap();
        match reply {
            Reply::Single(Some(record)) => assert_eq!(record, MarketData::new("AAPL", 150)),
            other => panic!("unexpected reply: {:?}", other),
        }
    }

    #[test]
    fn current_for_unknown_symbol_is_empty_not_error() {
        let reply = controller()
            .dispatch(
                "currentMarketData",
                InteractionMode::RequestResponse,
                json!({"stock": "GOOG"}),
            )
            .unwrap();
        assert!(matches!(reply, Reply::Single(None)));
    }

    #[test]
    fn feed_streams_matching_records() {
        let c = controller();
        c.collect_market_data(MarketData::new("AAPL", 1)).unwrap();
        c.collect_market_data(MarketData::new("MSFT", 2)).unwrap();
        c.collect_market_data(MarketData::new("AAPL", 3)).unwrap();
        let reply = c
            .dispatch(
                "feedMarketData",
                InteractionMode::RequestStream,
                json!({"stock": "AAPL"}),
            )
            .unwrap();
        let Reply::Stream(feed) = reply else {
            panic!("expected a stream");
        };
        let prices: Vec<i32> = feed.map(|r| r.price).collect();
        assert_eq!(prices, vec![1, 3]);
    }

    #[test]
    fn unknown_route_and_wrong_mode_are_rejected() {
        let c = controller();
        let err = c
            .dispatch("deleteMarketData", InteractionMode::RequestResponse, json!({}))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownRoute);

        let err = c
            .dispatch(
                "feedMarketData",
                InteractionMode::RequestResponse,
                json!({"stock": "AAPL"}),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ModeMismatch);
    }

    #[test]
    fn bad_payload_is_invalid_payload() {
        let c = controller();
        let err = c
            .dispatch(
                "collectMarketData",
                InteractionMode::FireAndForget,
                json!({"currentPrice": "high"}),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPayload);
        assert!(c.repository().is_empty().unwrap());
    }
}
