//! Acceptance tests for ln-node.
//!
//! Two nodes on loopback: one started with the other in its connect list.

use std::io::Write;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::timeout;

use ln_node::config::NodeConfig;
use ln_node::node::Node;
use ln_p2p::P2pError;
use ln_wire::BitcoinNet;

const TEST_TIMEOUT: Duration = Duration::from_secs(5);

fn node_config() -> NodeConfig {
    NodeConfig {
        listen_addrs: vec!["127.0.0.1:0".parse().unwrap()],
        network: BitcoinNet::SimNet,
        dial_timeout: Duration::from_secs(2),
        ..NodeConfig::default()
    }
}

#[tokio::test]
async fn test_node_connects_on_startup() {
    let listener = Node::new(node_config()).await.unwrap();
    let target = listener.server().local_address(0).unwrap();

    let dialer = Node::new(NodeConfig {
        connect: vec![target.clone()],
        ..node_config()
    })
    .await
    .unwrap();

    let listener_server = listener.server().clone();
    let (stop_a, stopped_a) = oneshot::channel::<()>();
    let (stop_b, stopped_b) = oneshot::channel::<()>();

    let run_a = tokio::spawn(async move {
        listener
            .run_until(async {
                let _ = stopped_a.await;
            })
            .await
    });
    let dialer_server = dialer.server().clone();
    let run_b = tokio::spawn(async move {
        dialer
            .run_until(async {
                let _ = stopped_b.await;
            })
            .await
    });

    // The startup dial registers the peer on both sides.
    timeout(TEST_TIMEOUT, async {
        while dialer_server.connected_peers() != vec![target.to_string()]
            || listener_server.connected_peers().len() != 1
        {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap();

    let duplicate = dialer_server.connect_to_peer(target.clone()).await;
    assert!(matches!(duplicate, Err(P2pError::AlreadyConnected { .. })));

    stop_b.send(()).unwrap();
    stop_a.send(()).unwrap();
    timeout(TEST_TIMEOUT, run_b).await.unwrap().unwrap().unwrap();
    timeout(TEST_TIMEOUT, run_a).await.unwrap().unwrap().unwrap();
}

#[tokio::test]
async fn test_node_identity_from_key_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "{}", "02".repeat(32)).unwrap();

    let node = Node::new(NodeConfig {
        identity_key_file: Some(file.path().to_path_buf()),
        ..node_config()
    })
    .await
    .unwrap();

    let secret = secp256k1::SecretKey::from_slice(&[2u8; 32]).unwrap();
    let expected = ln_p2p::NodeIdentity::new(secret);
    assert_eq!(node.server().identity().public_key(), expected.public_key());

    timeout(TEST_TIMEOUT, node.run_until(async {}))
        .await
        .unwrap()
        .unwrap();
    assert!(node.server().is_shutting_down());
}

#[tokio::test]
async fn test_node_bad_key_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = Node::new(NodeConfig {
        identity_key_file: Some(dir.path().join("missing.key")),
        ..node_config()
    })
    .await;
    assert!(result.is_err());
}
