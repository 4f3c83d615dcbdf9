//! Node orchestrator.
//!
//! Loads the identity, runs the peer server, dials the configured peers and
//! shuts everything down on a signal.

use std::future::Future;
use std::sync::Arc;

use ln_p2p::{MemoryWallet, NodeIdentity, Server, TcpTransport, Wallet};
use ln_wire::PROTOCOL_VERSION;

use crate::config::NodeConfig;
use crate::shutdown::wait_for_shutdown_signal;
use crate::wallet::KeyFileWallet;

/// The main node structure.
pub struct Node {
    config: NodeConfig,
    server: Arc<Server>,
}

impl Node {
    /// Load the identity and bind the listeners.
    pub async fn new(config: NodeConfig) -> anyhow::Result<Self> {
        let wallet: Arc<dyn Wallet> = match &config.identity_key_file {
            Some(path) => {
                tracing::info!("Identity key file: {}", path.display());
                Arc::new(KeyFileWallet::load(path)?)
            }
            None => {
                tracing::warn!("No identity key file given, using an ephemeral identity");
                Arc::new(MemoryWallet::generate())
            }
        };
        let identity = NodeIdentity::from_wallet(wallet.as_ref())?;

        let p2p_config = config.p2p_config();
        let transport = Arc::new(TcpTransport::new(p2p_config.handshake_timeout));
        let server = Server::new(p2p_config, identity, transport, wallet).await?;

        Ok(Self {
            config,
            server: Arc::new(server),
        })
    }

    pub fn server(&self) -> &Arc<Server> {
        &self.server
    }

    /// Run until SIGINT or SIGTERM.
    pub async fn run(&self) -> anyhow::Result<()> {
        self.run_until(async {
            if let Err(e) = wait_for_shutdown_signal().await {
                tracing::error!(error = %e, "Failed to install signal handlers");
            }
        })
        .await
    }

    /// Run until `shutdown` completes.
    pub async fn run_until(&self, shutdown: impl Future<Output = ()>) -> anyhow::Result<()> {
        tracing::info!("Starting lightning node...");
        tracing::info!("  Protocol version: {}", PROTOCOL_VERSION);
        tracing::info!("  Network: {}", self.config.network);
        for addr in self.server.listen_addrs() {
            tracing::info!("  Listening on: {}", addr);
        }
        if let Some(addr) = self.server.local_address(0) {
            tracing::info!("  Node address: {}", addr);
        }

        self.server.start();

        for target in &self.config.connect {
            let server = self.server.clone();
            let target = target.clone();
            tokio::spawn(async move {
                match server.connect_to_peer(target.clone()).await {
                    Ok(()) => tracing::info!(addr = %target, "Connected to peer"),
                    Err(e) => tracing::warn!(addr = %target, error = %e, "Failed to connect to peer"),
                }
            });
        }

        shutdown.await;

        tracing::info!("Shutting down node...");
        self.server.stop()?;
        self.server.wait_for_shutdown().await;
        tracing::info!("Node stopped");

        Ok(())
    }
}
