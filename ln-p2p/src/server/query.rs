//! Query handler.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::address::LightningAddress;
use crate::error::P2pError;
use crate::server::{outbound, ConnectReply, PeerRegistry, Shared};

/// Requests served by the query handler.
pub(crate) enum Query {
    /// Connect to a remote node unless already connected.
    ConnectPeer {
        addr: LightningAddress,
        reply: ConnectReply,
    },
}

impl Query {
    fn reject(self, error: P2pError) {
        match self {
            Query::ConnectPeer { reply, .. } => {
                let _ = reply.send(Err(error));
            }
        }
    }
}

pub(crate) async fn query_handler(
    shared: Arc<Shared>,
    mut queries: mpsc::Receiver<Query>,
    registry: watch::Receiver<PeerRegistry>,
) {
    loop {
        tokio::select! {
            _ = shared.quit.cancelled() => break,
            Some(query) = queries.recv() => handle_query(&shared, &registry, query),
        }
    }

    queries.close();
    while let Ok(query) = queries.try_recv() {
        query.reject(P2pError::Shutdown);
    }
    tracing::debug!("Query handler exiting");
}

fn handle_query(shared: &Arc<Shared>, registry: &watch::Receiver<PeerRegistry>, query: Query) {
    match query {
        Query::ConnectPeer { addr, reply } => {
            let target = addr.to_string();
            if registry.borrow().contains(&target) {
                tracing::debug!(addr = %target, "Already connected to peer");
                let _ = reply.send(Err(P2pError::AlreadyConnected { addr: target }));
                return;
            }

            // Dials run detached so slow peers don't hold up other queries.
            tokio::spawn(outbound::dial_peer(shared.clone(), addr, reply));
        }
    }
}
