//! Error types shared between client and server.
//!
//! The `MarketError` enum unifies transport, codec, protocol and remote failures so
//! that both binaries and their libraries propagate a single error type. Remote
//! handler failures travel as an explicit [`ErrorKind`] plus message, never as a
//! data record.
use std::io;
use std::sync::PoisonError;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum_macros::Display;
use thiserror::Error;

/// Category of a failure reported by the server in an `error` frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// The payload could not be decoded into the route's input type.
    InvalidPayload,
    /// No handler is registered under the requested route name.
    UnknownRoute,
    /// The route exists but not for the requested interaction mode.
    ModeMismatch,
    /// Connection setup was refused (e.g. MIME type mismatch).
    Rejected,
    /// A frame was malformed or out of sequence.
    Protocol,
    /// The handler failed while producing a response.
    Internal,
}

/// Unified error type shared by client and server.
#[derive(Error, Debug)]
pub enum MarketError {
    /// I/O error originating from sockets.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Failure while encoding/decoding JSON via serde_json.
    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    /// Malformed or unexpected frame on the wire.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Route name not part of the contract.
    #[error("Unknown route: {0}")]
    UnknownRoute(String),

    /// Route invoked with an interaction mode it does not support.
    #[error("Route {route} does not support {mode} interactions")]
    ModeMismatch {
        /// Route name as received.
        route: String,
        /// Interaction mode as received.
        mode: String,
    },

    /// All reconnect attempts were used up.
    #[error("Connection failed after {attempts} attempt(s): {reason}")]
    ConnectionFailed {
        /// Number of connects tried in the last cycle.
        attempts: u32,
        /// Last observed failure.
        reason: String,
    },

    /// The session dropped while a call was in flight.
    #[error("Connection closed")]
    Closed,

    /// The server refused the connection setup.
    #[error("Connection rejected by server: {0}")]
    Rejected(String),

    /// No answer arrived within the per-call timeout.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// The server answered with an explicit error frame.
    #[error("Remote error ({kind}): {message}")]
    Remote {
        /// Failure category.
        kind: ErrorKind,
        /// Human-readable message from the server.
        message: String,
    },

    /// Channel send failed (e.g., receiver dropped); contains a short context string.
    #[error("Channel send failed: {0}")]
    ChannelSend(String),

    /// Error indicating a poisoned lock was encountered.
    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
}

impl MarketError {
    /// Kind to report to a peer when this error ends a call on the server side.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MarketError::SerdeJson(_) => ErrorKind::InvalidPayload,
            MarketError::Protocol(_) => ErrorKind::Protocol,
            MarketError::UnknownRoute(_) => ErrorKind::UnknownRoute,
            MarketError::ModeMismatch { .. } => ErrorKind::ModeMismatch,
            MarketError::Rejected(_) => ErrorKind::Rejected,
            MarketError::Remote { kind, .. } => *kind,
            _ => ErrorKind::Internal,
        }
    }
}

impl<T> From<PoisonError<T>> for MarketError {
    fn from(err: PoisonError<T>) -> Self {
        MarketError::LockPoisoned(err.to_string())
    }
}
