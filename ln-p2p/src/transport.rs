//! Transport collaborator.
//!
//! The server never touches sockets directly. It asks a [`Transport`] for
//! listeners and dialed connections, and receives plain byte streams whose
//! remote identity the transport has already checked. Inbound connections
//! are identified in two steps: [`Listener::accept`] returns the raw stream
//! at once, and [`Transport::handshake`] runs later in its own task so a slow
//! client never holds up the listener.
//!
//! [`TcpTransport`] is the development transport: it exchanges 33-byte
//! compressed identity keys in cleartext right after the TCP connect. It
//! authenticates nothing cryptographically and does not encrypt.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use secp256k1::PublicKey;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

use crate::address::{LightningAddress, RemoteId};
use crate::config::DEFAULT_HANDSHAKE_TIMEOUT;
use crate::error::{P2pError, P2pResult};
use crate::identity::NodeIdentity;

/// A reliable byte stream to a remote node.
pub trait Connection: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> Connection for T {}

/// Owned, type-erased connection.
pub type BoxConnection = Box<dyn Connection>;

/// Connection factory.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Bind a listener on `addr` accepting connections as `identity`.
    async fn listen(
        &self,
        identity: &NodeIdentity,
        addr: SocketAddr,
    ) -> P2pResult<Box<dyn Listener>>;

    /// Connect to `addr` and check that the node there is `remote_id`.
    async fn dial(
        &self,
        identity: &NodeIdentity,
        addr: SocketAddr,
        remote_id: &RemoteId,
    ) -> P2pResult<BoxConnection>;

    /// Identify the remote end of a connection accepted from `addr`.
    async fn handshake(
        &self,
        identity: &NodeIdentity,
        conn: BoxConnection,
        addr: SocketAddr,
    ) -> P2pResult<(BoxConnection, LightningAddress)>;
}

/// Source of inbound connections. Dropping it closes it.
#[async_trait]
pub trait Listener: Send + 'static {
    /// Wait for the next inbound connection, not yet identified. Must be
    /// cancel safe.
    async fn accept(&mut self) -> P2pResult<(BoxConnection, SocketAddr)>;

    /// Address the listener is bound to.
    fn local_addr(&self) -> P2pResult<SocketAddr>;
}

/// Development transport over plain TCP.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    handshake_timeout: Duration,
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new(DEFAULT_HANDSHAKE_TIMEOUT)
    }
}

impl TcpTransport {
    pub fn new(handshake_timeout: Duration) -> Self {
        Self { handshake_timeout }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn listen(
        &self,
        identity: &NodeIdentity,
        addr: SocketAddr,
    ) -> P2pResult<Box<dyn Listener>> {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(
            addr = %listener.local_addr()?,
            pubkey = %identity.public_key(),
            "Listening for inbound connections"
        );

        Ok(Box::new(TcpIdentityListener { listener }))
    }

    async fn dial(
        &self,
        identity: &NodeIdentity,
        addr: SocketAddr,
        remote_id: &RemoteId,
    ) -> P2pResult<BoxConnection> {
        tracing::debug!(addr = %addr, "Connecting to peer");

        let mut stream = TcpStream::connect(addr).await?;
        if let Err(e) = stream.set_nodelay(true) {
            tracing::warn!(addr = %addr, error = %e, "Failed to set TCP_NODELAY");
        }

        let remote_key = timeout(
            self.handshake_timeout,
            exchange_identity(&mut stream, &identity.public_key()),
        )
        .await
        .map_err(|_| P2pError::HandshakeTimeout)??;

        if !remote_id.matches(&remote_key) {
            return Err(P2pError::HandshakeFailed(format!(
                "expected identity {}, got {}",
                hex::encode(remote_id.to_bytes()),
                remote_key
            )));
        }

        tracing::debug!(addr = %addr, remote = %remote_key, "Identity exchange complete");
        Ok(Box::new(stream))
    }

    async fn handshake(
        &self,
        identity: &NodeIdentity,
        mut conn: BoxConnection,
        addr: SocketAddr,
    ) -> P2pResult<(BoxConnection, LightningAddress)> {
        let remote_key = timeout(
            self.handshake_timeout,
            exchange_identity(&mut conn, &identity.public_key()),
        )
        .await
        .map_err(|_| P2pError::HandshakeTimeout)??;

        tracing::debug!(addr = %addr, remote = %remote_key, "Identified inbound connection");
        Ok((conn, LightningAddress::from_pubkey(remote_key, addr)))
    }
}

struct TcpIdentityListener {
    listener: TcpListener,
}

#[async_trait]
impl Listener for TcpIdentityListener {
    async fn accept(&mut self) -> P2pResult<(BoxConnection, SocketAddr)> {
        let (stream, addr) = self.listener.accept().await?;
        if let Err(e) = stream.set_nodelay(true) {
            tracing::warn!(addr = %addr, error = %e, "Failed to set TCP_NODELAY");
        }
        Ok((Box::new(stream), addr))
    }

    fn local_addr(&self) -> P2pResult<SocketAddr> {
        self.listener.local_addr().map_err(P2pError::Io)
    }
}

/// Send our compressed key and read the remote's.
async fn exchange_identity<S>(stream: &mut S, local_key: &PublicKey) -> P2pResult<PublicKey>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream.write_all(&local_key.serialize()).await?;
    stream.flush().await?;

    let mut remote = [0u8; 33];
    stream.read_exact(&mut remote).await?;
    PublicKey::from_slice(&remote)
        .map_err(|e| P2pError::HandshakeFailed(format!("invalid remote identity: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ln_wire::crypto::pubkey_hash;

    #[tokio::test]
    async fn test_exchange_identity() {
        let a = NodeIdentity::generate();
        let b = NodeIdentity::generate();
        let (key_a, key_b) = (a.public_key(), b.public_key());
        let (mut left, mut right) = tokio::io::duplex(64);

        let (ra, rb) = tokio::join!(
            exchange_identity(&mut left, &key_a),
            exchange_identity(&mut right, &key_b),
        );
        assert_eq!(ra.unwrap(), b.public_key());
        assert_eq!(rb.unwrap(), a.public_key());
    }

    #[tokio::test]
    async fn test_exchange_rejects_garbage() {
        let a = NodeIdentity::generate();
        let (mut left, mut right) = tokio::io::duplex(64);

        let peer = tokio::spawn(async move {
            right.write_all(&[0x07; 33]).await.unwrap();
            let mut buf = [0u8; 33];
            right.read_exact(&mut buf).await.unwrap();
        });

        let result = exchange_identity(&mut left, &a.public_key()).await;
        assert!(matches!(result, Err(P2pError::HandshakeFailed(_))));
        peer.await.unwrap();
    }

    #[tokio::test]
    async fn test_tcp_dial_checks_identity() {
        let transport = TcpTransport::new(Duration::from_secs(2));
        let server = NodeIdentity::generate();
        let client = NodeIdentity::generate();
        let server_hash = pubkey_hash(&server.public_key());

        let mut listener = transport
            .listen(&server, "127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();

        let inbound = transport.clone();
        let accept = tokio::spawn(async move {
            let (conn, addr) = listener.accept().await.unwrap();
            let (_conn, remote) = inbound.handshake(&server, conn, addr).await.unwrap();
            remote
        });

        let by_hash = RemoteId::PubKeyHash(server_hash);
        let _conn = transport.dial(&client, addr, &by_hash).await.unwrap();

        let remote = accept.await.unwrap();
        assert_eq!(remote.pub_key, Some(client.public_key()));
    }

    #[tokio::test]
    async fn test_tcp_dial_wrong_identity() {
        let transport = TcpTransport::default();
        let server = NodeIdentity::generate();
        let client = NodeIdentity::generate();

        let mut listener = transport
            .listen(&server, "127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();
        let inbound = transport.clone();
        let accept = tokio::spawn(async move {
            let (conn, addr) = listener.accept().await?;
            inbound.handshake(&server, conn, addr).await.map(|_| ())
        });

        let wrong = RemoteId::PublicKey(NodeIdentity::generate().public_key());
        let result = transport.dial(&client, addr, &wrong).await;
        assert!(matches!(result, Err(P2pError::HandshakeFailed(_))));
        let _ = accept.await;
    }

    #[tokio::test]
    async fn test_accept_returns_before_identity() {
        let transport = TcpTransport::new(Duration::from_millis(100));
        let server = NodeIdentity::generate();

        let mut listener = transport
            .listen(&server, "127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();

        // A client that connects and never sends its key.
        let _silent = TcpStream::connect(addr).await.unwrap();
        let (conn, from) = timeout(Duration::from_secs(1), listener.accept())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(from.ip(), addr.ip());

        let result = transport.handshake(&server, conn, from).await;
        assert!(matches!(result, Err(P2pError::HandshakeTimeout)));
    }
}
