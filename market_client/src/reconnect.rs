//! Connection state machine and fixed-delay reconnect policy.
//!
//! States and triggers:
//!
//! ```text
//! Disconnected --Connect--> Connecting --Established--> Connected
//!                           Connecting --Exhausted----> Failed
//! Connected ----Dropped---> Disconnected
//! Failed -------Reset-----> Disconnected
//! ```
//!
//! Any other event leaves the state unchanged.
use std::time::Duration;

use strum_macros::Display;

/// Lifecycle of the client's single connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ConnectionState {
    /// No session; the next call will connect.
    Disconnected,
    /// A connect cycle is in progress.
    Connecting,
    /// A session is open.
    Connected,
    /// Retries were exhausted or the server refused the setup.
    Failed,
}

/// Transition triggers for [`ConnectionState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// A caller needs a session.
    Connect,
    /// The TCP connection and setup succeeded.
    Established,
    /// The session was lost.
    Dropped,
    /// No attempts are left, or the server refused the setup.
    Exhausted,
    /// The caller explicitly allows connecting again.
    Reset,
}

impl ConnectionState {
    /// State after `event`.
    #[must_use]
    pub fn on(self, event: ConnectionEvent) -> Self {
        use ConnectionEvent as E;
        use ConnectionState as S;
        match (self, event) {
            (S::Disconnected, E::Connect) => S::Connecting,
            (S::Connecting, E::Established) => S::Connected,
            (S::Connecting, E::Exhausted) => S::Failed,
            (S::Connected, E::Dropped) => S::Disconnected,
            (S::Failed, E::Reset) => S::Disconnected,
            (state, _) => state,
        }
    }
}

/// Fixed-delay retry budget for one connect cycle.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    max_retries: u32,
    delay: Duration,
    retries: u32,
}

impl ReconnectPolicy {
    /// Allow `max_retries` retries, `delay` apart.
    #[must_use]
    pub const fn new(max_retries: u32, delay: Duration) -> Self {
        Self {
            max_retries,
            delay,
            retries: 0,
        }
    }

    /// Delay before the next retry, or `None` when the budget is spent.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.retries >= self.max_retries {
            return None;
        }
        self.retries += 1;
        Some(self.delay)
    }

    /// Retries used so far.
    #[must_use]
    pub const fn retries(&self) -> u32 {
        self.retries
    }

    /// Restore the full budget after a successful connect.
    pub fn reset(&mut self) {
        self.retries = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_and_drop() {
        let state = ConnectionState::Disconnected
            .on(ConnectionEvent::Connect)
            .on(ConnectionEvent::Established);
        assert_eq!(state, ConnectionState::Connected);
        assert_eq!(
            state.on(ConnectionEvent::Dropped),
            ConnectionState::Disconnected
        );
    }

    #[test]
    fn failed_is_sticky_until_reset() {
        let failed = ConnectionState::Connecting.on(ConnectionEvent::Exhausted);
        assert_eq!(failed, ConnectionState::Failed);
        assert_eq!(failed.on(ConnectionEvent::Connect), ConnectionState::Failed);
        assert_eq!(
            failed.on(ConnectionEvent::Established),
            ConnectionState::Failed
        );
        assert_eq!(
            failed.on(ConnectionEvent::Reset),
            ConnectionState::Disconnected
        );
    }

    #[test]
    fn irrelevant_events_are_ignored() {
        assert_eq!(
            ConnectionState::Connected.on(ConnectionEvent::Connect),
            ConnectionState::Connected
        );
        assert_eq!(
            ConnectionState::Disconnected.on(ConnectionEvent::Dropped),
            ConnectionState::Disconnected
        );
    }

    #[test]
    fn policy_gives_fixed_delays_then_stops() {
        let mut policy = ReconnectPolicy::new(2, Duration::from_secs(2));
        assert_eq!(policy.next_delay(), Some(Duration::from_secs(2)));
        assert_eq!(policy.next_delay(), Some(Duration::from_secs(2)));
        assert_eq!(policy.next_delay(), None);
        assert_eq!(policy.retries(), 2);

        policy.reset();
        assert_eq!(policy.next_delay(), Some(Duration::from_secs(2)));
    }

    #[test]
    fn zero_retries_never_waits() {
        let mut policy = ReconnectPolicy::new(0, Duration::from_secs(2));
        assert_eq!(policy.next_delay(), None);
    }
}
