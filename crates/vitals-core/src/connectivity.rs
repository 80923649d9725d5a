//! Two-state connectivity model.
//!
//! The network signal drives `Disconnected <-> Connected`. The broker
//! session is tracked as a separate flag that can only be up while the
//! network is. Publishing is allowed only when both are up.

use serde::Serialize;
use tracing::{debug, info, warn};

/// Network-level state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectivityState {
    #[default]
    Disconnected,
    Connected,
}

/// An observed edge of the network signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    ToConnected,
    ToDisconnected,
}

/// Tracks network and broker-session state.
///
/// # Example
///
/// ```
/// use vitals_core::{ConnectivityMonitor, Transition};
///
/// let mut monitor = ConnectivityMonitor::new();
/// assert_eq!(monitor.observe(true), Some(Transition::ToConnected));
/// assert_eq!(monitor.observe(true), None);
///
/// monitor.observe_transport(true);
/// assert!(monitor.is_online());
///
/// assert_eq!(monitor.observe(false), Some(Transition::ToDisconnected));
/// assert!(!monitor.is_transport_up());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConnectivityMonitor {
    state: ConnectivityState,
    transport_up: bool,
    connects: u64,
    disconnects: u64,
}

impl ConnectivityMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ConnectivityState {
        self.state
    }

    pub fn is_network_up(&self) -> bool {
        self.state == ConnectivityState::Connected
    }

    pub fn is_transport_up(&self) -> bool {
        self.transport_up
    }

    /// Network up and broker session established.
    pub fn is_online(&self) -> bool {
        self.is_network_up() && self.transport_up
    }

    /// Number of `ToConnected` transitions seen.
    pub fn connects(&self) -> u64 {
        self.connects
    }

    /// Number of `ToDisconnected` transitions seen.
    pub fn disconnects(&self) -> u64 {
        self.disconnects
    }

    /// Feed the latest network signal. Returns the edge, if any.
    pub fn observe(&mut self, network_up: bool) -> Option<Transition> {
        match (self.state, network_up) {
            (ConnectivityState::Disconnected, true) => {
                self.state = ConnectivityState::Connected;
                self.connects += 1;
                info!("Network connected");
                Some(Transition::ToConnected)
            }
            (ConnectivityState::Connected, false) => {
                self.state = ConnectivityState::Disconnected;
                self.disconnects += 1;
                if self.transport_up {
                    debug!("Broker session dropped with network");
                }
                self.transport_up = false;
                warn!("Network disconnected");
                Some(Transition::ToDisconnected)
            }
            _ => None,
        }
    }

    /// Feed the publisher's session flag. Returns true when the flag
    /// changed. The flag stays down while the network is down.
    pub fn observe_transport(&mut self, session_up: bool) -> bool {
        let up = session_up && self.is_network_up();
        let changed = up != self.transport_up;
        self.transport_up = up;
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_disconnected() {
        let monitor = ConnectivityMonitor::new();
        assert_eq!(monitor.state(), ConnectivityState::Disconnected);
        assert!(!monitor.is_online());
    }

    #[test]
    fn test_repeated_signal_is_not_a_transition() {
        let mut monitor = ConnectivityMonitor::new();
        assert_eq!(monitor.observe(false), None);
        assert_eq!(monitor.observe(true), Some(Transition::ToConnected));
        assert_eq!(monitor.observe(true), None);
        assert_eq!(monitor.observe(false), Some(Transition::ToDisconnected));
        assert_eq!(monitor.observe(false), None);
        assert_eq!(monitor.connects(), 1);
        assert_eq!(monitor.disconnects(), 1);
    }

    #[test]
    fn test_transport_cannot_be_up_without_network() {
        let mut monitor = ConnectivityMonitor::new();
        assert!(!monitor.observe_transport(true));
        assert!(!monitor.is_transport_up());

        monitor.observe(true);
        assert!(monitor.observe_transport(true));
        assert!(monitor.is_online());
        assert!(!monitor.observe_transport(true));
    }

    #[test]
    fn test_network_loss_clears_transport() {
        let mut monitor = ConnectivityMonitor::new();
        monitor.observe(true);
        monitor.observe_transport(true);

        monitor.observe(false);
        assert!(!monitor.is_online());
        assert!(!monitor.is_transport_up());

        monitor.observe(true);
        assert!(!monitor.is_online(), "session must be re-established");
    }
}
