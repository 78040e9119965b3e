//! Frame envelope exchanged over the connection.
//!
//! Every message is one `Frame` serialized as a single JSON object and tagged by
//! `type`. Calls are multiplexed by `streamId`; id `0` addresses the connection
//! itself.
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ErrorKind;
use crate::route::InteractionMode;

/// Protocol version announced in the setup frame.
pub const PROTOCOL_VERSION: &str = "1.0";
/// Stream id reserved for connection-level frames.
pub const CONNECTION_STREAM_ID: u32 = 0;

/// A single protocol message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Frame {
    /// First frame from the client; fixes the payload encoding for the session.
    Setup {
        /// Protocol version.
        version: String,
        /// MIME type of every `data` payload.
        data_mime_type: String,
    },
    /// Opens a call on `route`.
    Request {
        /// Call identifier chosen by the client.
        stream_id: u32,
        /// Route name as a string so unknown names can still be answered.
        route: String,
        /// Requested interaction mode.
        mode: InteractionMode,
        /// Initial demand for request-stream calls; ignored otherwise.
        #[serde(default)]
        initial_n: u32,
        /// Request payload.
        data: Value,
    },
    /// Grants `n` more items to a request-stream call.
    RequestN {
        /// Target call.
        stream_id: u32,
        /// Additional demand.
        n: u32,
    },
    /// Stops a call; the server drops its per-call state.
    Cancel {
        /// Target call.
        stream_id: u32,
    },
    /// One response item.
    Next {
        /// Call being answered.
        stream_id: u32,
        /// Response payload.
        data: Value,
    },
    /// Successful end of a call.
    Complete {
        /// Finished call.
        stream_id: u32,
    },
    /// Failed end of a call, or of the connection when `stream_id` is 0.
    Error {
        /// Failed call.
        stream_id: u32,
        /// Failure category.
        kind: ErrorKind,
        /// Human-readable description.
        message: String,
    },
}

impl Frame {
    /// Creates the client setup frame for `data_mime_type`.
    pub fn setup(data_mime_type: &str) -> Self {
        Frame::Setup {
            version: String::from(PROTOCOL_VERSION),
            data_mime_type: String::from(data_mime_type),
        }
    }

    /// Creates an error frame.
    pub fn error(stream_id: u32, kind: ErrorKind, message: impl Into<String>) -> Self {
        Frame::Error {
            stream_id,
            kind,
            message: message.into(),
        }
    }

    /// Stream id this frame addresses, or `None` for setup.
    pub fn stream_id(&self) -> Option<u32> {
        match self {
            Frame::Setup { .. } => None,
            Frame::Request { stream_id, .. }
            | Frame::RequestN { stream_id, .. }
            | Frame::Cancel { stream_id }
            | Frame::Next { stream_id, .. }
            | Frame::Complete { stream_id }
            | Frame::Error { stream_id, .. } => Some(*stream_id),
        }
    }

    /// `true` when no further frames follow for this stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Frame::Complete { .. } | Frame::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_frame_wire_shape() {
        let frame = Frame::Request {
            stream_id: 1,
            route: "feedMarketData".into(),
            mode: InteractionMode::RequestStream,
            initial_n: 64,
            data: json!({"stock": "AAPL"}),
        };
        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "request",
                "streamId": 1,
                "route": "feedMarketData",
                "mode": "requestStream",
                "initialN": 64,
                "data": {"stock": "AAPL"}
            })
        );
    }

    #[test]
    fn setup_and_request_n_tags() {
        let value = serde_json::to_value(Frame::setup("application/json")).unwrap();
        assert_eq!(value["type"], "setup");
        assert_eq!(value["dataMimeType"], "application/json");

        let frame: Frame = serde_json::from_value(json!({"type": "requestN", "streamId": 3, "n": 8})).unwrap();
        assert_eq!(frame, Frame::RequestN { stream_id: 3, n: 8 });
        assert_eq!(frame.stream_id(), Some(3));
        assert!(!frame.is_terminal());
    }

    #[test]
    fn error_frame_is_terminal() {
        let frame = Frame::error(5, ErrorKind::UnknownRoute, "nope");
        assert!(frame.is_terminal());
        assert!(Frame::Complete { stream_id: 5 }.is_terminal());
        assert_eq!(Frame::setup("x").stream_id(), None);
    }
}
