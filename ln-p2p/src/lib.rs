//! Peer connection management for the lightning peer protocol.
//!
//! This crate provides:
//!
//! - The [`Server`]: listeners, the peer set and the connect-to-peer request path
//! - Peer sessions that speak the `ln-wire` frame protocol
//! - The transport and wallet collaborator traits, with a TCP development transport
//!
//! # Architecture
//!
//! Every long-lived piece runs in its own tokio task and talks to the others
//! over channels. The peer set is owned by a single task; there are no locks
//! around it.
//!
//! ```text
//! Server::start()
//! ├── Accept loop per listener
//! ├── Peer manager (owns the peer set)
//! ├── Query handler (connect requests)
//! ├── Dial task per outstanding connect
//! └── Session task per peer
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use ln_p2p::{MemoryWallet, NodeIdentity, P2pConfig, Server, TcpTransport};
//!
//! let wallet = Arc::new(MemoryWallet::generate());
//! let identity = NodeIdentity::from_wallet(wallet.as_ref())?;
//! let config = P2pConfig::new(vec!["0.0.0.0:10011".parse().unwrap()]);
//!
//! let server = Server::new(config, identity, Arc::new(TcpTransport::default()), wallet).await?;
//! server.start();
//! server.connect_to_peer("<pubkey hex>@10.0.0.2:10011".parse()?).await?;
//! ```

pub mod address;
pub mod config;
pub mod error;
pub mod identity;
pub mod peer;
pub mod server;
pub mod transport;

// Re-export main types
pub use address::{LightningAddress, RemoteId};
pub use config::P2pConfig;
pub use error::{P2pError, P2pResult};
pub use identity::{MemoryWallet, NodeIdentity, Wallet};
pub use peer::{ConnectionDirection, Peer, PeerCommand, PeerId};
pub use server::Server;
pub use transport::{BoxConnection, Connection, Listener, TcpTransport, Transport};
