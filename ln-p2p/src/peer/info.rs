//! Peer identification.

use std::fmt;

/// Locally assigned identifier for a peer session. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(pub u64);

impl PeerId {
    /// Create a new peer ID from a counter value.
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer-{}", self.0)
    }
}

/// Direction of the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionDirection {
    /// We initiated the connection.
    Outbound,
    /// Peer connected to us.
    Inbound,
}

impl fmt::Display for ConnectionDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionDirection::Outbound => write!(f, "outbound"),
            ConnectionDirection::Inbound => write!(f, "inbound"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peer_id_display() {
        assert_eq!(PeerId::new(42).to_string(), "peer-42");
    }

    #[test]
    fn test_direction_display() {
        assert_eq!(ConnectionDirection::Inbound.to_string(), "inbound");
        assert_eq!(ConnectionDirection::Outbound.to_string(), "outbound");
    }
}
