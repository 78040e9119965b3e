//! Client side of a request-stream call.
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::debug;
use market_common::{Frame, MarketError, Result};
use serde::de::DeserializeOwned;

use crate::session::{Inbound, Session};

/// Blocking iterator over the items of one request-stream call.
///
/// Demand is granted in windows: the request asks for `window` items and every
/// time half a window has been consumed the same amount is granted again, so the
/// server never runs more than one window ahead of the consumer. Dropping the
/// stream before it completes cancels the call on the server.
pub struct MarketDataStream<R> {
    session: Arc<Session>,
    stream_id: u32,
    inbound: Receiver<Inbound>,
    refill_at: u32,
    consumed: u32,
    timeout: Duration,
    done: bool,
    deferred: Option<MarketError>,
    _item: PhantomData<fn() -> R>,
}

impl<R> MarketDataStream<R> {
    pub(crate) fn new(
        session: Arc<Session>,
        stream_id: u32,
        inbound: Receiver<Inbound>,
        window: u32,
        timeout: Duration,
    ) -> Self {
        Self {
            session,
            stream_id,
            inbound,
            refill_at: (window / 2).max(1),
            consumed: 0,
            timeout,
            done: false,
            deferred: None,
            _item: PhantomData,
        }
    }

    /// Stream id of this call on its session.
    pub fn stream_id(&self) -> u32 {
        self.stream_id
    }

    /// Stop the call; no further items are produced.
    pub fn cancel(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if self.done {
            return;
        }
        self.done = true;
        self.session.unregister(self.stream_id);
        if let Err(e) = self.session.send(&Frame::Cancel {
            stream_id: self.stream_id,
        }) {
            debug!("Cancel for stream {} not sent: {}", self.stream_id, e);
        }
    }

    fn replenish(&mut self) -> Result<()> {
        self.consumed += 1;
        if self.consumed >= self.refill_at {
            self.session.send(&Frame::RequestN {
                stream_id: self.stream_id,
                n: self.consumed,
            })?;
            self.consumed = 0;
        }
        Ok(())
    }
}

impl<R: DeserializeOwned> Iterator for MarketDataStream<R> {
    type Item = Result<R>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return self.deferred.take().map(Err);
        }
        match self.inbound.recv_timeout(self.timeout) {
            Ok(Inbound::Next(value)) => {
                // The item already arrived; a failed grant ends the stream after it.
                if let Err(e) = self.replenish() {
                    self.stop();
                    self.deferred = Some(e);
                }
                Some(serde_json::from_value(value).map_err(MarketError::from))
            }
            Ok(Inbound::Complete) => {
                self.done = true;
                None
            }
            Ok(Inbound::Failed(e)) => {
                self.done = true;
                Some(Err(e))
            }
            Err(RecvTimeoutError::Timeout) => {
                self.stop();
                Some(Err(MarketError::Timeout(self.timeout)))
            }
            Err(RecvTimeoutError::Disconnected) => {
                self.done = true;
                Some(Err(MarketError::Closed))
            }
        }
    }
}

impl<R> Drop for MarketDataStream<R> {
    fn drop(&mut self) {
        self.stop();
    }
}
