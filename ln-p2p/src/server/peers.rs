//! Peer manager: the only owner of the peer set.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::error::P2pError;
use crate::peer::{Peer, PeerId};
use crate::server::{NewPeer, PeerRegistry, Shared};

pub(crate) async fn peer_manager(
    shared: Arc<Shared>,
    mut new_peers: mpsc::Receiver<NewPeer>,
    mut done_peers: mpsc::Receiver<PeerId>,
    registry: watch::Sender<PeerRegistry>,
) {
    let mut peers: HashMap<PeerId, Peer> = HashMap::new();

    loop {
        tokio::select! {
            _ = shared.quit.cancelled() => break,
            Some(new_peer) = new_peers.recv() => add_peer(&shared, &mut peers, new_peer, &registry),
            Some(id) = done_peers.recv() => {
                if remove_peer(&mut peers, id) {
                    publish(&peers, &registry);
                }
            }
        }
    }

    // Sessions still queued are never registered.
    new_peers.close();
    while let Ok(NewPeer { peer, reply }) = new_peers.try_recv() {
        peer.stop();
        if let Some(reply) = reply {
            let _ = reply.send(Err(P2pError::Shutdown));
        }
    }

    tracing::debug!(peers = peers.len(), "Peer manager stopping peers");
    for peer in peers.values() {
        peer.stop();
    }
}

/// Register a peer, then answer its reply slot so a caller that sees `Ok`
/// also sees the peer in the registry.
fn add_peer(
    shared: &Shared,
    peers: &mut HashMap<PeerId, Peer>,
    new_peer: NewPeer,
    registry: &watch::Sender<PeerRegistry>,
) {
    let NewPeer { peer, reply } = new_peer;

    if shared.is_shutting_down() {
        tracing::debug!(peer = %peer.id(), "Ignoring new peer during shutdown");
        peer.stop();
        if let Some(reply) = reply {
            let _ = reply.send(Err(P2pError::Shutdown));
        }
        return;
    }

    // Its done notification may already have been consumed.
    if peer.is_finished() {
        tracing::debug!(peer = %peer.id(), "Peer session ended before registration");
        if let Some(reply) = reply {
            let _ = reply.send(Err(P2pError::HandshakeFailed(
                "connection closed before registration".into(),
            )));
        }
        return;
    }

    tracing::info!(
        peer = %peer.id(),
        addr = %peer.addr(),
        direction = %peer.direction(),
        "Peer connected"
    );
    peers.insert(peer.id(), peer);
    publish(peers, registry);

    if let Some(reply) = reply {
        let _ = reply.send(Ok(()));
    }
}

/// Unknown ids are ignored. Returns whether a peer was removed.
fn remove_peer(peers: &mut HashMap<PeerId, Peer>, id: PeerId) -> bool {
    match peers.remove(&id) {
        Some(peer) => {
            peer.stop();
            tracing::info!(peer = %id, addr = %peer.addr(), "Peer disconnected");
            true
        }
        None => {
            tracing::trace!(peer = %id, "Done notification for unknown peer");
            false
        }
    }
}

fn publish(peers: &HashMap<PeerId, Peer>, registry: &watch::Sender<PeerRegistry>) {
    registry.send_replace(peers.values().map(|p| p.addr().to_string()).collect());
}
