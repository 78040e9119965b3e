//! Per-connection frame handling.
//!
//! Each accepted socket gets:
//! - the calling thread, which reads frames, dispatches requests through the
//!   `MarketDataController`, and routes `requestN`/`cancel` to live streams;
//! - a writer thread draining a bounded frame queue into the socket, so a slow
//!   client blocks producers instead of growing memory;
//! - one thread per in-flight request-stream call, emitting at most as many
//!   `next` frames as the client has granted.
//!
//! The first frame must be `setup` with the configured MIME type; anything else
//! is answered with a connection-level `error` frame and the socket is closed.
//! When the client goes away every stream of that connection is cancelled.
use std::collections::HashMap;
use std::io::Read;
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, Sender, TryRecvError, bounded, unbounded};
use log::{debug, error, info, warn};
use market_common::codec::{FrameReader, write_frame};
use market_common::frame::CONNECTION_STREAM_ID;
use market_common::{ErrorKind, Frame, InteractionMode, MarketError, Result};
use serde_json::Value;

use crate::config::ServerConfig;
use crate::controller::{MarketDataController, Reply};
use crate::repository::MarketDataFeed;

/// Control messages delivered to a running request-stream call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamSignal {
    /// The client can take `n` more items.
    Demand(u32),
    /// The client is no longer interested.
    Cancel,
}

/// Serve one client connection until it closes.
pub fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    controller: Arc<MarketDataController>,
    config: &ServerConfig,
) -> Result<()> {
    let write_half = stream.try_clone()?;
    let (out_tx, out_rx) = bounded::<Frame>(config.queue_capacity.max(1));
    let writer = thread::spawn(move || write_loop(write_half, out_rx, addr));

    let result = {
        let mut session = Session::new(addr, controller, out_tx);
        session.run(FrameReader::new(&stream), &config.data_mime_type)
    };

    if writer.join().is_err() {
        error!("Writer thread for {} panicked", addr);
    }
    let _ = stream.shutdown(Shutdown::Both);
    result
}

fn write_loop(mut stream: TcpStream, frames: Receiver<Frame>, addr: SocketAddr) {
    for frame in frames.iter() {
        if let Err(e) = write_frame(&mut stream, &frame) {
            warn!("Failed to write frame to {}: {}", addr, e);
            break;
        }
    }
    debug!("Writer for {} stopped", addr);
}

/// Reader-side state of one connection.
struct Session {
    addr: SocketAddr,
    controller: Arc<MarketDataController>,
    out: Sender<Frame>,
    streams: HashMap<u32, Sender<StreamSignal>>,
    finished_tx: Sender<u32>,
    finished_rx: Receiver<u32>,
}

impl Session {
    fn new(addr: SocketAddr, controller: Arc<MarketDataController>, out: Sender<Frame>) -> Self {
        let (finished_tx, finished_rx) = unbounded();
        Self {
            addr,
            controller,
            out,
            streams: HashMap::new(),
            finished_tx,
            finished_rx,
        }
    }

    fn run<R: Read>(&mut self, mut reader: FrameReader<R>, mime_type: &str) -> Result<()> {
        match reader.read_frame()? {
            Some(Frame::Setup {
                version,
                data_mime_type,
            }) => {
                if data_mime_type != mime_type {
                    warn!(
                        "Rejecting {}: data MIME type {} (expected {})",
                        self.addr, data_mime_type, mime_type
                    );
                    return self.send(Frame::error(
                        CONNECTION_STREAM_ID,
                        ErrorKind::Rejected,
                        format!("unsupported data MIME type {}, expected {}", data_mime_type, mime_type),
                    ));
                }
                info!(
                    "Session with {} set up (protocol {}, {})",
                    self.addr, version, data_mime_type
                );
            }
            Some(_) => {
                warn!("Rejecting {}: first frame was not setup", self.addr);
                return self.send(Frame::error(
                    CONNECTION_STREAM_ID,
                    ErrorKind::Rejected,
                    "expected setup frame",
                ));
            }
            None => return Ok(()),
        }

        loop {
            let frame = match reader.read_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    info!("Client {} closed connection", self.addr);
                    return Ok(());
                }
                Err(MarketError::SerdeJson(e)) => {
                    warn!("Malformed frame from {}: {}", self.addr, e);
                    self.send(Frame::error(
                        CONNECTION_STREAM_ID,
                        ErrorKind::Protocol,
                        format!("malformed frame: {}", e),
                    ))?;
                    continue;
                }
                Err(e) => return Err(e),
            };
            self.reap_finished();
            self.handle_frame(frame)?;
        }
    }

    fn handle_frame(&mut self, frame: Frame) -> Result<()> {
        match frame {
            Frame::Request {
                stream_id,
                route,
                mode,
                initial_n,
                data,
            } => self.handle_request(stream_id, &route, mode, initial_n, data),
            Frame::RequestN { stream_id, n } => {
                self.signal(stream_id, StreamSignal::Demand(n));
                Ok(())
            }
            Frame::Cancel { stream_id } => {
                if let Some(tx) = self.streams.remove(&stream_id) {
                    debug!("Stream {} cancelled by {}", stream_id, self.addr);
                    let _ = tx.send(StreamSignal::Cancel);
                }
                Ok(())
            }
            other => {
                warn!("Unexpected frame from {}: {:?}", self.addr, other);
                self.send(Frame::error(
                    other.stream_id().unwrap_or(CONNECTION_STREAM_ID),
                    ErrorKind::Protocol,
                    "unexpected frame",
                ))
            }
        }
    }

    fn handle_request(
        &mut self,
        stream_id: u32,
        route: &str,
        mode: InteractionMode,
        initial_n: u32,
        data: Value,
    ) -> Result<()> {
        // Fire-and-forget never occupies its stream id and never gets a reply.
        if mode != InteractionMode::FireAndForget
            && (stream_id == CONNECTION_STREAM_ID || self.streams.contains_key(&stream_id))
        {
            return self.send(Frame::error(
                stream_id,
                ErrorKind::Protocol,
                format!("stream id {} is not available", stream_id),
            ));
        }

        match self.controller.dispatch(route, mode, data) {
            Ok(Reply::Single(record)) => {
                if let Some(record) = record {
                    self.send(Frame::Next {
                        stream_id,
                        data: serde_json::to_value(record)?,
                    })?;
                }
                self.send(Frame::Complete { stream_id })
            }
            Ok(Reply::Stream(feed)) => {
                self.start_stream(stream_id, feed, initial_n);
                Ok(())
            }
            Ok(Reply::Accepted) => Ok(()),
            Err(e) if mode == InteractionMode::FireAndForget => {
                warn!("Dropped {} from {}: {}", route, self.addr, e);
                Ok(())
            }
            Err(e) => {
                warn!("{} for {} failed: {}", route, self.addr, e);
                self.send(Frame::error(stream_id, e.kind(), e.to_string()))
            }
        }
    }

    fn start_stream(&mut self, stream_id: u32, feed: MarketDataFeed, initial_n: u32) {
        let (signal_tx, signal_rx) = unbounded();
        self.streams.insert(stream_id, signal_tx);

        let out = self.out.clone();
        let finished = self.finished_tx.clone();
        let addr = self.addr;
        thread::spawn(move || {
            if let Err(e) = run_stream(stream_id, feed, initial_n, &signal_rx, &out) {
                debug!("Stream {} for {} stopped: {}", stream_id, addr, e);
            }
            let _ = finished.send(stream_id);
        });
    }

    fn signal(&mut self, stream_id: u32, signal: StreamSignal) {
        if let Some(tx) = self.streams.get(&stream_id) {
            if tx.send(signal).is_err() {
                self.streams.remove(&stream_id);
            }
        }
    }

    fn reap_finished(&mut self) {
        for stream_id in self.finished_rx.try_iter() {
            self.streams.remove(&stream_id);
        }
    }

    fn send(&self, frame: Frame) -> Result<()> {
        self.out
            .send(frame)
            .map_err(|e| MarketError::ChannelSend(e.to_string()))
    }
}

/// Emit `feed` as `next` frames followed by `complete`, honoring demand.
///
/// Returns early without `complete` when the call is cancelled or its signal
/// channel disconnects. An exhausted feed completes even if no demand was granted.
pub fn run_stream(
    stream_id: u32,
    mut feed: MarketDataFeed,
    initial_n: u32,
    signals: &Receiver<StreamSignal>,
    out: &Sender<Frame>,
) -> Result<()> {
    let mut demand = u64::from(initial_n);
    let mut pending = feed.next();

    while let Some(record) = pending {
        loop {
            let signal = if demand == 0 {
                match signals.recv() {
                    Ok(signal) => signal,
                    Err(_) => return Ok(()),
                }
            } else {
                match signals.try_recv() {
                    Ok(signal) => signal,
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => return Ok(()),
                }
            };
            match signal {
                StreamSignal::Demand(n) => demand += u64::from(n),
                StreamSignal::Cancel => return Ok(()),
            }
        }

        out.send(Frame::Next {
            stream_id,
            data: serde_json::to_value(&record)?,
        })
        .map_err(|e| MarketError::ChannelSend(e.to_string()))?;
        demand -= 1;
        pending = feed.next();
    }

    out.send(Frame::Complete { stream_id })
        .map_err(|e| MarketError::ChannelSend(e.to_string()))
}
