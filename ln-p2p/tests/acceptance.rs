//! Acceptance tests for the peer server over real TCP.
//!
//! These tests verify:
//! 1. Connect - one node dials another and registers the session
//! 2. Duplicates - a second connect to the same node is refused without dialing
//! 3. Identity - dialing with the wrong expected identity fails
//! 4. Shutdown - stop is idempotent and every task exits
//! 5. Slow clients - an unidentified connection does not hold up others
//! 6. Framing - messages written by a session arrive intact

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::time::timeout;
use tokio_util::codec::Framed;

use ln_p2p::{
    LightningAddress, MemoryWallet, NodeIdentity, P2pConfig, P2pError, RemoteId, Server,
    TcpTransport, Transport,
};
use ln_wire::{BitcoinNet, ChannelId, HtlcAddReject, HtlcKey, Message, MessageCodec};

const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Test configuration with port 0 (OS assigns port).
fn test_config(listen: bool) -> P2pConfig {
    let listen_addrs = if listen {
        vec!["127.0.0.1:0".parse().unwrap()]
    } else {
        Vec::new()
    };
    P2pConfig::new(listen_addrs)
        .with_network(BitcoinNet::SimNet)
        .with_dial_timeout(Duration::from_secs(3))
        .with_handshake_timeout(Duration::from_secs(2))
}

async fn create_server(listen: bool) -> (Server, Arc<MemoryWallet>) {
    let config = test_config(listen);
    let wallet = Arc::new(MemoryWallet::generate());
    let identity = NodeIdentity::from_wallet(wallet.as_ref()).unwrap();
    let transport = Arc::new(TcpTransport::new(config.handshake_timeout));
    let server = Server::new(config, identity, transport, wallet.clone())
        .await
        .unwrap();
    (server, wallet)
}

async fn shut_down(server: &Server) {
    server.stop().unwrap();
    timeout(TEST_TIMEOUT, server.wait_for_shutdown())
        .await
        .expect("server tasks did not exit");
}

#[tokio::test]
async fn test_connect_and_duplicate() {
    let (a, _) = create_server(true).await;
    let (b, _) = create_server(false).await;
    a.start();
    b.start();

    let target = a.local_address(0).unwrap();
    timeout(TEST_TIMEOUT, b.connect_to_peer(target.clone()))
        .await
        .unwrap()
        .unwrap();

    let second = timeout(TEST_TIMEOUT, b.connect_to_peer(target)).await.unwrap();
    assert!(matches!(second, Err(P2pError::AlreadyConnected { .. })));

    shut_down(&b).await;
    shut_down(&a).await;
}

#[tokio::test]
async fn test_connect_by_pubkey_hash() {
    let (a, _) = create_server(true).await;
    let (b, _) = create_server(false).await;
    a.start();
    b.start();

    let target = LightningAddress::from_pubkey_hash(a.identity().pubkey_hash(), a.listen_addrs()[0]);
    timeout(TEST_TIMEOUT, b.connect_to_peer(target))
        .await
        .unwrap()
        .unwrap();

    // Same rendering as the full-key address.
    let full = a.local_address(0).unwrap();
    let second = timeout(TEST_TIMEOUT, b.connect_to_peer(full)).await.unwrap();
    assert!(matches!(second, Err(P2pError::AlreadyConnected { .. })));

    shut_down(&b).await;
    shut_down(&a).await;
}

#[tokio::test]
async fn test_connect_wrong_identity() {
    let (a, _) = create_server(true).await;
    let (b, _) = create_server(false).await;
    a.start();
    b.start();

    let impostor = NodeIdentity::generate().public_key();
    let target = LightningAddress::from_pubkey(impostor, a.listen_addrs()[0]);
    let result = timeout(TEST_TIMEOUT, b.connect_to_peer(target)).await.unwrap();
    assert!(matches!(result, Err(P2pError::HandshakeFailed(_))));

    shut_down(&b).await;
    shut_down(&a).await;
}

#[tokio::test]
async fn test_silent_client_does_not_stall_listener() {
    let (a, _) = create_server(true).await;
    let (b, _) = create_server(false).await;
    a.start();
    b.start();

    // Holds a connection open without ever sending its identity.
    let _silent = tokio::net::TcpStream::connect(a.listen_addrs()[0]).await.unwrap();

    // Well inside the 2s handshake timeout the silent client is allowed.
    let target = a.local_address(0).unwrap();
    timeout(Duration::from_secs(1), b.connect_to_peer(target))
        .await
        .expect("listener stalled behind a silent client")
        .unwrap();

    shut_down(&b).await;
    shut_down(&a).await;
}

#[tokio::test]
async fn test_connect_refused() {
    let (b, _) = create_server(false).await;
    b.start();

    // Bind then drop to get a port nobody listens on.
    let port = {
        let socket = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        socket.local_addr().unwrap()
    };
    let target = LightningAddress::from_pubkey(NodeIdentity::generate().public_key(), port);
    let result = timeout(TEST_TIMEOUT, b.connect_to_peer(target)).await.unwrap();
    assert!(matches!(result, Err(P2pError::Io(_))));

    shut_down(&b).await;
}

#[tokio::test]
async fn test_stop_idempotent() {
    let (a, wallet) = create_server(true).await;
    a.start();

    shut_down(&a).await;
    assert!(a.stop().is_ok());
    assert_eq!(wallet.stop_count(), 1);

    let result = a.connect_to_peer(a.local_address(0).unwrap()).await;
    assert!(matches!(result, Err(P2pError::Shutdown)));
}

#[tokio::test]
async fn test_session_frames_messages() {
    let (a, _) = create_server(true).await;
    a.start();

    // Dial the node directly and attach a session to our end.
    let client = NodeIdentity::generate();
    let transport = TcpTransport::new(Duration::from_secs(2));
    let remote = RemoteId::PublicKey(a.identity().public_key());
    let conn = transport
        .dial(&client, a.listen_addrs()[0], &remote)
        .await
        .unwrap();
    let mut framed = Framed::new(conn, MessageCodec::new(BitcoinNet::SimNet));

    let reject = Message::from(HtlcAddReject {
        channel_id: ChannelId::new(42),
        htlc_key: HtlcKey::new(7),
    });
    framed.send(reject).await.unwrap();

    // The node keeps the session open after a valid message.
    let next = timeout(Duration::from_millis(200), framed.next()).await;
    assert!(next.is_err(), "session closed unexpectedly");

    // Wrong network magic ends the session.
    let mut wrong_net = Framed::new(framed.into_inner(), MessageCodec::new(BitcoinNet::MainNet));
    wrong_net
        .send(Message::from(HtlcAddReject::default()))
        .await
        .unwrap();
    let closed = timeout(TEST_TIMEOUT, wrong_net.next()).await.unwrap();
    assert!(!matches!(closed, Some(Ok(_))));

    shut_down(&a).await;
}
