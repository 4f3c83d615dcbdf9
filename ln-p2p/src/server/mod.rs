//! Peer server.
//!
//! The server owns the listeners and the peer set. The peer set lives inside
//! a single task, the peer manager, and every registration or removal is a
//! message on one of its queues. Nothing else holds the map.
//!
//! ```text
//! Server::start()
//! ├── Accept loop (one per listener) ──┐
//! ├── Query handler ── dial task ──────┼──> new-peer queue ──┐
//! │                                    │                     ├─> Peer manager
//! └── Peer sessions ───────────────────┴──> done-peer queue ─┘
//! ```
//!
//! The peer manager publishes the remote-address renderings of registered
//! peers on a `watch` channel; the query handler reads that snapshot for
//! duplicate detection.

mod inbound;
mod outbound;
mod peers;
mod query;

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::address::LightningAddress;
use crate::config::P2pConfig;
use crate::error::{P2pError, P2pResult};
use crate::identity::{NodeIdentity, Wallet};
use crate::peer::session::SessionContext;
use crate::peer::{ConnectionDirection, Peer, PeerId};
use crate::transport::{BoxConnection, Listener, Transport};

use query::Query;

/// Reply slot for a connect request.
pub(crate) type ConnectReply = oneshot::Sender<P2pResult<()>>;

/// Remote-address renderings of registered peers.
pub(crate) type PeerRegistry = HashSet<String>;

/// A session to be registered by the peer manager.
pub(crate) struct NewPeer {
    pub peer: Peer,
    /// Set for dialed peers; answered once the peer is registered.
    pub reply: Option<ConnectReply>,
}

/// State shared by the server handle and its tasks.
pub(crate) struct Shared {
    pub config: P2pConfig,
    pub identity: NodeIdentity,
    pub transport: Arc<dyn Transport>,
    pub shutdown: AtomicBool,
    pub quit: CancellationToken,
    pub tracker: TaskTracker,
    pub new_peer_tx: mpsc::Sender<NewPeer>,
    pub done_peer_tx: mpsc::Sender<PeerId>,
    next_peer_id: AtomicU64,
}

impl Shared {
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Wrap a connection in a new, unstarted session.
    pub fn new_peer(
        &self,
        conn: BoxConnection,
        addr: LightningAddress,
        direction: ConnectionDirection,
    ) -> Peer {
        let id = PeerId::new(self.next_peer_id.fetch_add(1, Ordering::Relaxed));
        let ctx = SessionContext {
            network: self.config.network,
            done_tx: self.done_peer_tx.clone(),
            tracker: self.tracker.clone(),
        };
        Peer::new(id, conn, addr, direction, self.quit.child_token(), ctx)
    }

    /// Hand a peer to the peer manager, waiting for queue space.
    ///
    /// If the server shuts down first the peer is stopped and the reply slot,
    /// if any, receives [`P2pError::Shutdown`].
    pub async fn enqueue_peer(&self, peer: Peer, reply: Option<ConnectReply>) -> P2pResult<()> {
        let permit = tokio::select! {
            _ = self.quit.cancelled() => None,
            permit = self.new_peer_tx.reserve() => permit.ok(),
        };

        match permit {
            Some(permit) => {
                permit.send(NewPeer { peer, reply });
                Ok(())
            }
            None => {
                tracing::debug!(peer = %peer.id(), "Dropping new peer during shutdown");
                peer.stop();
                if let Some(reply) = reply {
                    let _ = reply.send(Err(P2pError::Shutdown));
                }
                Err(P2pError::Shutdown)
            }
        }
    }
}

/// Queue receivers, handed to the workers on start.
struct Workers {
    new_peer_rx: mpsc::Receiver<NewPeer>,
    done_peer_rx: mpsc::Receiver<PeerId>,
    query_rx: mpsc::Receiver<Query>,
    registry_tx: watch::Sender<PeerRegistry>,
}

/// Peer connection server.
///
/// Lifecycle: created, started once, stopped once. `start` after `stop` and
/// repeated calls to either are no-ops.
pub struct Server {
    shared: Arc<Shared>,
    wallet: Arc<dyn Wallet>,
    started: AtomicBool,
    listen_addrs: Vec<SocketAddr>,
    /// Listeners not yet handed to an accept loop.
    listeners: Mutex<Vec<Box<dyn Listener>>>,
    workers: Mutex<Option<Workers>>,
    query_tx: mpsc::Sender<Query>,
    registry_rx: watch::Receiver<PeerRegistry>,
}

impl Server {
    /// Bind every configured listen address and build the server.
    pub async fn new(
        config: P2pConfig,
        identity: NodeIdentity,
        transport: Arc<dyn Transport>,
        wallet: Arc<dyn Wallet>,
    ) -> P2pResult<Self> {
        let mut listeners = Vec::with_capacity(config.listen_addrs.len());
        for addr in &config.listen_addrs {
            listeners.push(transport.listen(&identity, *addr).await?);
        }
        Self::with_listeners(config, identity, transport, wallet, listeners)
    }

    /// Build the server around already bound listeners.
    pub fn with_listeners(
        config: P2pConfig,
        identity: NodeIdentity,
        transport: Arc<dyn Transport>,
        wallet: Arc<dyn Wallet>,
        listeners: Vec<Box<dyn Listener>>,
    ) -> P2pResult<Self> {
        let listen_addrs = listeners
            .iter()
            .map(|l| l.local_addr())
            .collect::<P2pResult<Vec<_>>>()?;

        // The field is public; a zero set without the builder would panic here.
        let capacity = config.peer_queue_capacity.max(1);
        let (new_peer_tx, new_peer_rx) = mpsc::channel(capacity);
        let (done_peer_tx, done_peer_rx) = mpsc::channel(capacity);
        // Capacity one: a request is accepted only once the handler has
        // taken the previous one.
        let (query_tx, query_rx) = mpsc::channel(1);
        let (registry_tx, registry_rx) = watch::channel(PeerRegistry::new());

        let shared = Arc::new(Shared {
            config,
            identity,
            transport,
            shutdown: AtomicBool::new(false),
            quit: CancellationToken::new(),
            tracker: TaskTracker::new(),
            new_peer_tx,
            done_peer_tx,
            next_peer_id: AtomicU64::new(1),
        });

        Ok(Self {
            shared,
            wallet,
            started: AtomicBool::new(false),
            listen_addrs,
            listeners: Mutex::new(listeners),
            workers: Mutex::new(Some(Workers {
                new_peer_rx,
                done_peer_rx,
                query_rx,
                registry_tx,
            })),
            query_tx,
            registry_rx,
        })
    }

    /// Addresses the listeners are bound to.
    pub fn listen_addrs(&self) -> &[SocketAddr] {
        &self.listen_addrs
    }

    pub fn identity(&self) -> &NodeIdentity {
        &self.shared.identity
    }

    /// This node's address on the given listener.
    pub fn local_address(&self, listener: usize) -> Option<LightningAddress> {
        self.listen_addrs
            .get(listener)
            .map(|addr| LightningAddress::from_pubkey(self.shared.identity.public_key(), *addr))
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shared.is_shutting_down()
    }

    /// Address renderings of the registered peers, sorted.
    pub fn connected_peers(&self) -> Vec<String> {
        let mut peers: Vec<String> = self.registry_rx.borrow().iter().cloned().collect();
        peers.sort();
        peers
    }

    /// Launch the accept loops, the peer manager and the query handler.
    pub fn start(&self) {
        if self.shared.is_shutting_down() || self.started.swap(true, Ordering::SeqCst) {
            return;
        }

        let Some(workers) = lock(&self.workers).take() else {
            return;
        };
        let listeners = std::mem::take(&mut *lock(&self.listeners));
        let listener_count = listeners.len();

        for listener in listeners {
            self.shared
                .tracker
                .spawn(inbound::accept_loop(self.shared.clone(), listener));
        }

        self.shared.tracker.spawn(peers::peer_manager(
            self.shared.clone(),
            workers.new_peer_rx,
            workers.done_peer_rx,
            workers.registry_tx,
        ));
        self.shared.tracker.spawn(query::query_handler(
            self.shared.clone(),
            workers.query_rx,
            self.registry_rx.clone(),
        ));

        tracing::info!(
            listeners = listener_count,
            network = %self.shared.config.network,
            "Server started"
        );
    }

    /// Close the listeners, stop the wallet and signal every task to exit.
    ///
    /// Safe to call before `start` and more than once; only the first call
    /// has any effect.
    pub fn stop(&self) -> P2pResult<()> {
        if self.shared.shutdown.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        tracing::info!("Server shutting down");

        // Listeners owned by accept loops close when their loop exits.
        drop(std::mem::take(&mut *lock(&self.listeners)));
        // Never started: dropping the receivers fails any queued request.
        drop(lock(&self.workers).take());

        self.wallet.stop();

        self.shared.quit.cancel();
        self.shared.tracker.close();
        Ok(())
    }

    /// Wait until every task has exited. Returns only after `stop`.
    pub async fn wait_for_shutdown(&self) {
        self.shared.tracker.wait().await;
        tracing::info!("Server stopped");
    }

    /// Wrap a connection in a new session. Register it with [`Server::add_peer`].
    pub fn new_peer(
        &self,
        conn: BoxConnection,
        addr: LightningAddress,
        direction: ConnectionDirection,
    ) -> Peer {
        self.shared.new_peer(conn, addr, direction)
    }

    /// Queue a session for registration.
    ///
    /// Blocks while the new-peer queue is full. During shutdown the peer is
    /// stopped instead.
    pub async fn add_peer(&self, peer: Peer) -> P2pResult<()> {
        self.shared.enqueue_peer(peer, None).await
    }

    /// Connect to a remote node and register the session.
    ///
    /// Returns once the peer is registered, or with the dial error, or with
    /// [`P2pError::AlreadyConnected`] if a registered peer has the same
    /// address rendering, in which case no dial is made.
    pub async fn connect_to_peer(&self, addr: LightningAddress) -> P2pResult<()> {
        let (reply, response) = oneshot::channel();

        let permit = tokio::select! {
            _ = self.shared.quit.cancelled() => return Err(P2pError::Shutdown),
            permit = self.query_tx.reserve() => permit.map_err(|_| P2pError::Shutdown)?,
        };
        permit.send(Query::ConnectPeer { addr, reply });

        response.await.unwrap_or(Err(P2pError::Shutdown))
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.shared.quit.cancel();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
