//! TCP accept loop for the market data server.
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::thread;

use log::{error, info, warn};
use market_common::Result;

use crate::config::ServerConfig;
use crate::connection::handle_connection;
use crate::controller::MarketDataController;
use crate::repository::MarketDataRepository;

/// Listening server that serves the market data routes.
///
/// The repository is injected at construction and shared by every connection.
pub struct MarketDataServer {
    listener: TcpListener,
    controller: Arc<MarketDataController>,
    config: Arc<ServerConfig>,
}

impl MarketDataServer {
    /// Bind the listening socket described by `config`.
    pub fn bind(config: ServerConfig, repository: Arc<MarketDataRepository>) -> Result<Self> {
        let listener = TcpListener::bind(config.bind_addr())?;
        Ok(Self {
            listener,
            controller: Arc::new(MarketDataController::new(repository)),
            config: Arc::new(config),
        })
    }

    /// Address actually bound (useful when the configured port is `0`).
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Blocking loop that accepts connections and serves each on its own thread.
    ///
    /// A failing connection is logged and does not affect the others.
    pub fn run(self) -> Result<()> {
        info!("Market data server is started on {}", self.listener.local_addr()?);

        for stream in self.listener.incoming() {
            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    error!("TCP connection error: {}", e);
                    continue;
                }
            };
            let addr = match stream.peer_addr() {
                Ok(addr) => addr,
                Err(e) => {
                    warn!("Dropping connection without peer address: {}", e);
                    continue;
                }
            };
            info!("New TCP connection from: {}", addr);

            let controller = Arc::clone(&self.controller);
            let config = Arc::clone(&self.config);
            thread::spawn(move || {
                if let Err(e) = handle_connection(stream, addr, controller, &config) {
                    warn!("Connection handler error for {}: {}", addr, e);
                }
                info!("Connection from {} finished", addr);
            });
        }
        Ok(())
    }
}
