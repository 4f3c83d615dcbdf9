//! Inbound connection accept loop.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::peer::ConnectionDirection;
use crate::server::Shared;
use crate::transport::{BoxConnection, Listener};

/// Doubling delay between consecutive accept failures.
#[derive(Debug)]
pub(crate) struct Backoff {
    min: Duration,
    max: Duration,
    current: Option<Duration>,
}

impl Backoff {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            max: max.max(min),
            current: None,
        }
    }

    /// Delay before the next attempt.
    pub fn next_delay(&mut self) -> Duration {
        let delay = match self.current {
            None => self.min,
            Some(current) => current.saturating_mul(2).min(self.max),
        };
        self.current = Some(delay);
        delay
    }

    pub fn reset(&mut self) {
        self.current = None;
    }
}

/// Accept connections until shutdown.
///
/// Each accepted connection is identified in its own task, then becomes a
/// started session that this side registers with the peer manager, doing the
/// `add_peer` step on the session's behalf. Only listener errors back off;
/// failed handshakes do not. Accept errors never end the loop. The listener
/// is dropped, and so closed, when the loop returns.
pub(crate) async fn accept_loop(shared: Arc<Shared>, mut listener: Box<dyn Listener>) {
    let local = listener
        .local_addr()
        .map(|a| a.to_string())
        .unwrap_or_default();
    let mut backoff = Backoff::new(
        shared.config.accept_backoff_min,
        shared.config.accept_backoff_max,
    );

    while !shared.is_shutting_down() {
        let accepted = tokio::select! {
            _ = shared.quit.cancelled() => break,
            result = listener.accept() => result,
        };

        match accepted {
            Ok((conn, addr)) => {
                backoff.reset();
                tracing::trace!(listener = %local, addr = %addr, "Accepted connection");
                shared
                    .tracker
                    .spawn(handshake_inbound(shared.clone(), conn, addr));
            }
            Err(e) => {
                let delay = backoff.next_delay();
                tracing::warn!(
                    listener = %local,
                    error = %e,
                    retry_ms = delay.as_millis() as u64,
                    "Error accepting connection"
                );
                tokio::select! {
                    _ = shared.quit.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }

    tracing::info!(listener = %local, "Inbound listener shutting down");
}

/// Identify an accepted connection and register its session.
async fn handshake_inbound(shared: Arc<Shared>, conn: BoxConnection, addr: SocketAddr) {
    let handshake = shared.transport.handshake(&shared.identity, conn, addr);
    let result = tokio::select! {
        _ = shared.quit.cancelled() => return,
        result = handshake => result,
    };

    match result {
        Ok((conn, remote)) => {
            let peer = shared.new_peer(conn, remote, ConnectionDirection::Inbound);
            tracing::debug!(peer = %peer.id(), addr = %peer.addr(), "Accepted inbound connection");
            peer.start();
            let _ = shared.enqueue_peer(peer, None).await;
        }
        Err(e) => {
            tracing::debug!(addr = %addr, error = %e, "Inbound handshake failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_to_cap() {
        let mut backoff = Backoff::new(Duration::from_millis(5), Duration::from_millis(30));
        let delays: Vec<u64> = (0..5).map(|_| backoff.next_delay().as_millis() as u64).collect();
        assert_eq!(delays, vec![5, 10, 20, 30, 30]);
    }

    #[test]
    fn test_backoff_reset() {
        let mut backoff = Backoff::new(Duration::from_millis(5), Duration::from_secs(1));
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_millis(5));
    }

    #[test]
    fn test_backoff_max_below_min() {
        let mut backoff = Backoff::new(Duration::from_millis(50), Duration::from_millis(10));
        assert_eq!(backoff.next_delay(), Duration::from_millis(50));
        assert_eq!(backoff.next_delay(), Duration::from_millis(50));
    }
}
