//! P2P configuration.

use std::net::SocketAddr;
use std::time::Duration;

use ln_wire::BitcoinNet;

/// Default peer port.
pub const DEFAULT_PORT: u16 = 10011;

/// Default dial deadline.
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(10);

/// Default handshake timeout.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// First delay after a failed accept.
pub const DEFAULT_ACCEPT_BACKOFF_MIN: Duration = Duration::from_millis(5);

/// Ceiling for the accept backoff.
pub const DEFAULT_ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Default capacity of the new-peer and done-peer queues.
pub const DEFAULT_PEER_QUEUE_CAPACITY: usize = 100;

/// Configuration for the peer server.
#[derive(Debug, Clone)]
pub struct P2pConfig {
    /// Addresses to accept inbound connections on. May be empty.
    pub listen_addrs: Vec<SocketAddr>,

    /// Network whose frame magic peers must use.
    pub network: BitcoinNet,

    /// Deadline for an outbound dial, including the handshake.
    pub dial_timeout: Duration,

    /// Timeout for completing the identity exchange.
    pub handshake_timeout: Duration,

    /// Delay after the first of a run of accept failures.
    pub accept_backoff_min: Duration,

    /// Upper bound for the doubling accept backoff.
    pub accept_backoff_max: Duration,

    /// Capacity of the new-peer and done-peer queues. Senders block when full.
    pub peer_queue_capacity: usize,
}

impl Default for P2pConfig {
    fn default() -> Self {
        Self {
            listen_addrs: vec![SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT))],
            network: BitcoinNet::default(),
            dial_timeout: DEFAULT_DIAL_TIMEOUT,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            accept_backoff_min: DEFAULT_ACCEPT_BACKOFF_MIN,
            accept_backoff_max: DEFAULT_ACCEPT_BACKOFF_MAX,
            peer_queue_capacity: DEFAULT_PEER_QUEUE_CAPACITY,
        }
    }
}

impl P2pConfig {
    /// Create a new configuration listening on the given addresses.
    pub fn new(listen_addrs: Vec<SocketAddr>) -> Self {
        Self {
            listen_addrs,
            ..Default::default()
        }
    }

    /// Set the network.
    pub fn with_network(mut self, network: BitcoinNet) -> Self {
        self.network = network;
        self
    }

    /// Set the dial timeout.
    pub fn with_dial_timeout(mut self, timeout: Duration) -> Self {
        self.dial_timeout = timeout;
        self
    }

    /// Set the handshake timeout.
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Set the accept backoff bounds.
    pub fn with_accept_backoff(mut self, min: Duration, max: Duration) -> Self {
        self.accept_backoff_min = min;
        self.accept_backoff_max = max.max(min);
        self
    }

    /// Set the new-peer/done-peer queue capacity. Zero is raised to one.
    pub fn with_peer_queue_capacity(mut self, capacity: usize) -> Self {
        self.peer_queue_capacity = capacity.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = P2pConfig::default();
        assert_eq!(config.listen_addrs.len(), 1);
        assert_eq!(config.listen_addrs[0].port(), DEFAULT_PORT);
        assert_eq!(config.dial_timeout, DEFAULT_DIAL_TIMEOUT);
        assert_eq!(config.peer_queue_capacity, DEFAULT_PEER_QUEUE_CAPACITY);
        assert_eq!(config.network, BitcoinNet::TestNet3);
    }

    #[test]
    fn test_config_builder() {
        let config = P2pConfig::new(vec!["127.0.0.1:9999".parse().unwrap()])
            .with_network(BitcoinNet::SimNet)
            .with_dial_timeout(Duration::from_secs(2))
            .with_accept_backoff(Duration::from_millis(50), Duration::from_millis(10))
            .with_peer_queue_capacity(0);

        assert_eq!(config.listen_addrs[0].port(), 9999);
        assert_eq!(config.network, BitcoinNet::SimNet);
        assert_eq!(config.dial_timeout, Duration::from_secs(2));
        assert_eq!(config.accept_backoff_max, Duration::from_millis(50));
        assert_eq!(config.peer_queue_capacity, 1);
    }

    #[test]
    fn test_no_listeners() {
        let config = P2pConfig::new(Vec::new());
        assert!(config.listen_addrs.is_empty());
    }
}
