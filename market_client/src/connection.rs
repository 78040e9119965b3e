//! Connection manager: one outbound session, re-established on demand.
//!
//! Callers ask for a session with [`ConnectionManager::session`]. While one is open
//! it is shared; once it has dropped, the next caller runs a connect cycle under
//! the manager's lock, so concurrent callers wait for that cycle instead of
//! starting their own. A cycle tries once and then retries with the configured
//! fixed delay. When the budget is spent, or the server rejects the setup, the
//! manager is `Failed` and refuses every call until [`ConnectionManager::reset`].
use std::sync::{Arc, Mutex};
use std::thread;

use log::{info, warn};
use market_common::{MarketError, Result};

use crate::config::ClientConfig;
use crate::reconnect::{ConnectionEvent, ConnectionState, ReconnectPolicy};
use crate::session::Session;

#[derive(Debug, Clone)]
enum Failure {
    Exhausted { attempts: u32, reason: String },
    Rejected(String),
}

impl Failure {
    fn to_error(&self) -> MarketError {
        match self {
            Failure::Exhausted { attempts, reason } => MarketError::ConnectionFailed {
                attempts: *attempts,
                reason: reason.clone(),
            },
            Failure::Rejected(message) => MarketError::Rejected(message.clone()),
        }
    }
}

struct Inner {
    state: ConnectionState,
    session: Option<Arc<Session>>,
    failure: Option<Failure>,
}

impl Inner {
    fn apply(&mut self, event: ConnectionEvent) {
        let next = self.state.on(event);
        if next != self.state {
            info!("Connection {} -> {}", self.state, next);
        }
        self.state = next;
    }
}

/// Owner of the client's single connection.
pub struct ConnectionManager {
    config: ClientConfig,
    inner: Mutex<Inner>,
}

impl ConnectionManager {
    /// Create a manager; nothing is connected until the first call.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                state: ConnectionState::Disconnected,
                session: None,
                failure: None,
            }),
        }
    }

    /// Settings this manager connects with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Current state, refreshed against the live session.
    pub fn state(&self) -> Result<ConnectionState> {
        let mut inner = self.inner.lock()?;
        self.observe_session(&mut inner);
        Ok(inner.state)
    }

    /// Leave the `Failed` state so the next call connects again.
    pub fn reset(&self) -> Result<()> {
        let mut inner = self.inner.lock()?;
        inner.apply(ConnectionEvent::Reset);
        if inner.state == ConnectionState::Disconnected {
            inner.failure = None;
        }
        Ok(())
    }

    /// The open session, connecting first if needed.
    pub fn session(&self) -> Result<Arc<Session>> {
        let mut inner = self.inner.lock()?;
        self.observe_session(&mut inner);

        if let Some(session) = &inner.session {
            return Ok(Arc::clone(session));
        }
        if let Some(failure) = &inner.failure {
            return Err(failure.to_error());
        }

        inner.apply(ConnectionEvent::Connect);
        let mut policy =
            ReconnectPolicy::new(self.config.reconnect_attempts, self.config.reconnect_delay);
        let server = self.config.server_addr();
        loop {
            match Session::open(&self.config) {
                Ok(session) => {
                    let session = Arc::new(session);
                    inner.session = Some(Arc::clone(&session));
                    inner.apply(ConnectionEvent::Established);
                    return Ok(session);
                }
                Err(e) => match policy.next_delay() {
                    Some(delay) => {
                        warn!(
                            "Connect to {} failed ({}); retry {} of {} in {:?}",
                            server,
                            e,
                            policy.retries(),
                            self.config.reconnect_attempts,
                            delay
                        );
                        thread::sleep(delay);
                    }
                    None => {
                        let failure = Failure::Exhausted {
                            attempts: policy.retries() + 1,
                            reason: e.to_string(),
                        };
                        warn!("Giving up on {}: {}", server, e);
                        inner.apply(ConnectionEvent::Exhausted);
                        inner.failure = Some(failure.clone());
                        return Err(failure.to_error());
                    }
                },
            }
        }
    }

    /// Drop a dead session and move the state machine accordingly.
    fn observe_session(&self, inner: &mut Inner) {
        let Some(session) = &inner.session else {
            return;
        };
        if session.is_open() {
            return;
        }
        let rejection = session.rejection();
        inner.session = None;
        inner.apply(ConnectionEvent::Dropped);
        if let Some(message) = rejection {
            inner.apply(ConnectionEvent::Connect);
            inner.apply(ConnectionEvent::Exhausted);
            inner.failure = Some(Failure::Rejected(message));
        }
    }
}
