//! One open TCP session to the market data server.
//!
//! A `Session` writes frames from any caller thread (serialized by a mutex) and
//! runs a background reader thread that routes inbound frames to the call that
//! owns their stream id. When the socket closes, every pending call is failed
//! with `MarketError::Closed`, or `MarketError::Rejected` if the server refused
//! the setup.
use std::collections::HashMap;
use std::io;
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use crossbeam_channel::{Receiver, Sender, unbounded};
use log::{debug, error, info, warn};
use market_common::codec::{FrameReader, write_frame};
use market_common::frame::CONNECTION_STREAM_ID;
use market_common::{ErrorKind, Frame, MarketError, Result};
use serde_json::Value;

use crate::config::ClientConfig;

/// Event delivered to a pending call.
#[derive(Debug)]
pub enum Inbound {
    /// One response item.
    Next(Value),
    /// The call finished successfully.
    Complete,
    /// The call, or the whole session, failed.
    Failed(MarketError),
}

#[derive(Default)]
struct Calls {
    closed: bool,
    rejection: Option<String>,
    pending: HashMap<u32, Sender<Inbound>>,
}

impl Calls {
    fn closed_error(&self) -> MarketError {
        match &self.rejection {
            Some(message) => MarketError::Rejected(message.clone()),
            None => MarketError::Closed,
        }
    }
}

/// State shared between callers and the reader thread.
struct Shared {
    calls: Mutex<Calls>,
}

impl Shared {
    fn deliver(&self, stream_id: u32, event: Inbound, terminal: bool) {
        let Ok(mut calls) = self.calls.lock() else {
            return;
        };
        let delivered = if terminal {
            calls
                .pending
                .remove(&stream_id)
                .map(|tx| tx.send(event).is_ok())
        } else {
            calls
                .pending
                .get(&stream_id)
                .map(|tx| tx.send(event).is_ok())
        };
        match delivered {
            Some(true) => {}
            Some(false) => {
                calls.pending.remove(&stream_id);
            }
            None => debug!("Dropping frame for unknown stream {}", stream_id),
        }
    }

    fn close(&self, rejection: Option<String>) {
        let Ok(mut calls) = self.calls.lock() else {
            return;
        };
        calls.closed = true;
        if rejection.is_some() {
            calls.rejection = rejection;
        }
        let pending: Vec<_> = calls.pending.drain().collect();
        for (_, tx) in pending {
            let _ = tx.send(Inbound::Failed(calls.closed_error()));
        }
    }
}

/// Live connection with multiplexed calls.
pub struct Session {
    stream: TcpStream,
    writer: Mutex<TcpStream>,
    shared: Arc<Shared>,
    next_id: AtomicU32,
}

impl Session {
    /// Connect to the configured server, send the setup frame and start the reader.
    pub fn open(config: &ClientConfig) -> Result<Self> {
        let stream = connect(config)?;
        stream.set_nodelay(true)?;
        let peer = stream.peer_addr()?;

        let mut writer = stream.try_clone()?;
        write_frame(&mut writer, &Frame::setup(&config.data_mime_type))?;

        let shared = Arc::new(Shared {
            calls: Mutex::new(Calls::default()),
        });
        let reader = stream.try_clone()?;
        let reader_shared = Arc::clone(&shared);
        thread::spawn(move || read_loop(reader, reader_shared, peer));

        info!("Connected to {} ({})", peer, config.data_mime_type);
        Ok(Self {
            stream,
            writer: Mutex::new(writer),
            shared,
            next_id: AtomicU32::new(1),
        })
    }

    /// `false` once the reader has observed the end of the connection.
    pub fn is_open(&self) -> bool {
        self.shared
            .calls
            .lock()
            .map(|calls| !calls.closed)
            .unwrap_or(false)
    }

    /// Message from a setup rejection, if the server sent one.
    pub fn rejection(&self) -> Option<String> {
        self.shared
            .calls
            .lock()
            .ok()
            .and_then(|calls| calls.rejection.clone())
    }

    /// Fresh stream id; client ids are odd.
    pub fn next_stream_id(&self) -> u32 {
        self.next_id.fetch_add(2, Ordering::Relaxed)
    }

    /// Allocate a stream id and a channel that receives its inbound events.
    pub fn register(&self) -> Result<(u32, Receiver<Inbound>)> {
        let mut calls = self.shared.calls.lock()?;
        if calls.closed {
            return Err(calls.closed_error());
        }
        let stream_id = self.next_stream_id();
        let (tx, rx) = unbounded();
        calls.pending.insert(stream_id, tx);
        Ok((stream_id, rx))
    }

    /// Forget a call; later frames for it are discarded.
    pub fn unregister(&self, stream_id: u32) {
        if let Ok(mut calls) = self.shared.calls.lock() {
            calls.pending.remove(&stream_id);
        }
    }

    /// Write one frame.
    pub fn send(&self, frame: &Frame) -> Result<()> {
        let mut writer = self.writer.lock()?;
        write_frame(&mut *writer, frame)
    }

    /// Close the socket; the reader thread then fails every pending call.
    pub(crate) fn shutdown(&self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Try every resolved address, each bounded by the per-call timeout.
fn connect(config: &ClientConfig) -> Result<TcpStream> {
    let mut last_error = None;
    for addr in config.server_addr().to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, config.request_timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                debug!("Connect to {} failed: {}", addr, e);
                last_error = Some(e);
            }
        }
    }
    Err(last_error
        .unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                format!("{} resolved to no addresses", config.server_addr()),
            )
        })
        .into())
}

fn read_loop(stream: TcpStream, shared: Arc<Shared>, peer: SocketAddr) {
    let mut reader = FrameReader::new(stream);
    let mut rejection = None;

    loop {
        let frame = match reader.read_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                info!("Server {} closed connection", peer);
                break;
            }
            Err(MarketError::SerdeJson(e)) => {
                warn!("Skipping malformed frame from {}: {}", peer, e);
                continue;
            }
            Err(e) => {
                warn!("Connection to {} lost: {}", peer, e);
                break;
            }
        };

        match frame {
            Frame::Next { stream_id, data } => shared.deliver(stream_id, Inbound::Next(data), false),
            Frame::Complete { stream_id } => shared.deliver(stream_id, Inbound::Complete, true),
            Frame::Error {
                stream_id: CONNECTION_STREAM_ID,
                kind: ErrorKind::Rejected,
                message,
            } => {
                error!("Server {} rejected the connection: {}", peer, message);
                rejection = Some(message);
                break;
            }
            Frame::Error {
                stream_id: CONNECTION_STREAM_ID,
                kind,
                message,
            } => warn!("Server {} reported {}: {}", peer, kind, message),
            Frame::Error {
                stream_id,
                kind,
                message,
            } => shared.deliver(
                stream_id,
                Inbound::Failed(MarketError::Remote { kind, message }),
                true,
            ),
            other => warn!("Unexpected frame from {}: {:?}", peer, other),
        }
    }

    shared.close(rejection);
    debug!("Reader for {} stopped", peer);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::time::{Duration, Instant};

    #[test]
    fn connect_gives_up_within_request_timeout() {
        // TEST-NET-1 is never routed; the attempt either times out or fails fast.
        let config = ClientConfig {
            host: "192.0.2.1".into(),
            port: 9999,
            request_timeout: Duration::from_millis(300),
            ..ClientConfig::default()
        };
        let started = Instant::now();
        assert!(Session::open(&config).is_err());
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn open_then_shutdown_closes_session() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let config = ClientConfig {
            host: "127.0.0.1".into(),
            port: listener.local_addr().unwrap().port(),
            ..ClientConfig::default()
        };
        let session = Session::open(&config).unwrap();
        let (_server_side, _) = listener.accept().unwrap();
        assert!(session.is_open());

        session.shutdown();
        let deadline = Instant::now() + Duration::from_secs(3);
        while session.is_open() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(20));
        }
        assert!(!session.is_open());
    }
}
