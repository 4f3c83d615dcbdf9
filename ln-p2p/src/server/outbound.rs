//! Outbound dial task.

use std::sync::Arc;

use tokio::time::timeout;

use crate::address::LightningAddress;
use crate::error::{P2pError, P2pResult};
use crate::peer::ConnectionDirection;
use crate::server::{ConnectReply, Shared};
use crate::transport::BoxConnection;

/// Dial `addr` and hand the resulting session to the peer manager.
///
/// Exactly one value reaches `reply`: the dial error here, or the
/// registration outcome from the peer manager.
pub(crate) async fn dial_peer(shared: Arc<Shared>, addr: LightningAddress, reply: ConnectReply) {
    let conn = match dial(&shared, &addr).await {
        Ok(conn) => conn,
        Err(e) => {
            tracing::debug!(addr = %addr, error = %e, "Dial failed");
            let _ = reply.send(Err(e));
            return;
        }
    };

    let peer = shared.new_peer(conn, addr, ConnectionDirection::Outbound);
    tracing::debug!(peer = %peer.id(), addr = %peer.addr(), "Outbound connection established");
    peer.start();

    let _ = shared.enqueue_peer(peer, Some(reply)).await;
}

/// Authenticated dial under the configured deadline.
async fn dial(shared: &Shared, addr: &LightningAddress) -> P2pResult<BoxConnection> {
    let remote_id = addr.remote_id();
    let dial = shared
        .transport
        .dial(&shared.identity, addr.net_addr, &remote_id);

    timeout(shared.config.dial_timeout, dial)
        .await
        .map_err(|_| P2pError::ConnectionTimeout {
            addr: addr.net_addr,
        })?
}
