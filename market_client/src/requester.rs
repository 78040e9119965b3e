//! Typed calls to the market data routes.
//!
//! `MarketDataRequester` wraps a [`ConnectionManager`] and exposes the three
//! interactions both generically (any route, any serde payload) and as the typed
//! `current_market_data` / `feed_market_data` / `collect_market_data` helpers.
use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::RecvTimeoutError;
use log::debug;
use market_common::{
    Frame, InteractionMode, MarketData, MarketDataRequest, MarketError, Result, Route,
};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::ClientConfig;
use crate::connection::ConnectionManager;
use crate::session::Inbound;
use crate::stream::MarketDataStream;

/// Client handle; cheap to clone, all clones share one connection.
#[derive(Clone)]
pub struct MarketDataRequester {
    connection: Arc<ConnectionManager>,
}

impl MarketDataRequester {
    /// Create a requester; the connection is opened lazily.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            connection: Arc::new(ConnectionManager::new(config)),
        }
    }

    /// The underlying connection manager.
    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    /// Open the connection now instead of on the first call.
    pub fn connect(&self) -> Result<()> {
        self.connection.session().map(|_| ())
    }

    /// Latest record for `symbol` via `currentMarketData`; `None` if the server has none.
    pub fn current_market_data(&self, symbol: &str) -> Result<Option<MarketData>> {
        self.request_response(
            &Route::CurrentMarketData.to_string(),
            &MarketDataRequest::new(symbol),
        )
    }

    /// Every record for `symbol` via `feedMarketData`.
    pub fn feed_market_data(&self, symbol: &str) -> Result<MarketDataStream<MarketData>> {
        self.request_stream(
            &Route::FeedMarketData.to_string(),
            &MarketDataRequest::new(symbol),
        )
    }

    /// Send `record` to `collectMarketData`; returns once it is written.
    pub fn collect_market_data(&self, record: &MarketData) -> Result<()> {
        self.fire_and_forget(&Route::CollectMarketData.to_string(), record)
    }

    /// Request-response on `route`.
    pub fn request_response<T, R>(&self, route: &str, data: &T) -> Result<Option<R>>
    where
        T: Serialize,
        R: DeserializeOwned,
    {
        let session = self.connection.session()?;
        let (stream_id, inbound) = session.register()?;
        let request = Frame::Request {
            stream_id,
            route: route.to_string(),
            mode: InteractionMode::RequestResponse,
            initial_n: 0,
            data: serde_json::to_value(data)?,
        };
        if let Err(e) = session.send(&request) {
            session.unregister(stream_id);
            return Err(e);
        }
        debug!("{} sent as stream {}", route, stream_id);

        let timeout = self.connection.config().request_timeout;
        let deadline = Instant::now() + timeout;
        let mut response = None;
        loop {
            match inbound.recv_deadline(deadline) {
                Ok(Inbound::Next(value)) => response = Some(value),
                Ok(Inbound::Complete) => break,
                Ok(Inbound::Failed(e)) => return Err(e),
                Err(RecvTimeoutError::Timeout) => {
                    session.unregister(stream_id);
                    return Err(MarketError::Timeout(timeout));
                }
                Err(RecvTimeoutError::Disconnected) => return Err(MarketError::Closed),
            }
        }
        response
            .map(|value| serde_json::from_value(value).map_err(MarketError::from))
            .transpose()
    }

    /// Request-stream on `route`.
    pub fn request_stream<T, R>(&self, route: &str, data: &T) -> Result<MarketDataStream<R>>
    where
        T: Serialize,
        R: DeserializeOwned,
    {
        let config = self.connection.config();
        let window = config.stream_window.max(1);
        let session = self.connection.session()?;
        let (stream_id, inbound) = session.register()?;
        let request = Frame::Request {
            stream_id,
            route: route.to_string(),
            mode: InteractionMode::RequestStream,
            initial_n: window,
            data: serde_json::to_value(data)?,
        };
        if let Err(e) = session.send(&request) {
            session.unregister(stream_id);
            return Err(e);
        }
        debug!("{} opened as stream {}", route, stream_id);

        Ok(MarketDataStream::new(
            session,
            stream_id,
            inbound,
            window,
            config.request_timeout,
        ))
    }

    /// Fire-and-forget on `route`; no acknowledgement is awaited.
    pub fn fire_and_forget<T: Serialize>(&self, route: &str, data: &T) -> Result<()> {
        let session = self.connection.session()?;
        let stream_id = session.next_stream_id();
        session.send(&Frame::Request {
            stream_id,
            route: route.to_string(),
            mode: InteractionMode::FireAndForget,
            initial_n: 0,
            data: serde_json::to_value(data)?,
        })
    }
}
