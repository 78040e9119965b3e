//! Route names and interaction modes that form the wire contract.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// How a request is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum InteractionMode {
    /// One request, at most one response.
    RequestResponse,
    /// One request, zero or more responses terminated by the producer.
    RequestStream,
    /// One request, no response and no acknowledgement.
    FireAndForget,
}

/// Named endpoints served by the market data server.
///
/// The string forms are exact and must match on both peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
pub enum Route {
    /// Latest record for a symbol.
    #[strum(serialize = "currentMarketData")]
    CurrentMarketData,
    /// All stored records for a symbol, streamed.
    #[strum(serialize = "feedMarketData")]
    FeedMarketData,
    /// Append a record to the server's repository.
    #[strum(serialize = "collectMarketData")]
    CollectMarketData,
}

impl Route {
    /// Interaction mode this route is served with.
    pub fn mode(self) -> InteractionMode {
        match self {
            Route::CurrentMarketData => InteractionMode::RequestResponse,
            Route::FeedMarketData => InteractionMode::RequestStream,
            Route::CollectMarketData => InteractionMode::FireAndForget,
        }
    }
}
