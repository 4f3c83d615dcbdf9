//! Per-peer session task.
//!
//! A [`Peer`] owns one connection. Once started, a task frames the stream
//! with [`MessageCodec`], validates and logs inbound messages, and writes the
//! messages queued through [`Peer::send`]. The task ends on stop, on a
//! disconnect command, on EOF, or on the first framing error. When it ends on
//! its own it reports the peer id on the done-peer queue so the server can
//! drop the session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use futures::{SinkExt, StreamExt};
use ln_wire::{BitcoinNet, Message, MessageCodec};
use tokio::sync::mpsc;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::address::LightningAddress;
use crate::error::{P2pError, P2pResult};
use crate::peer::info::{ConnectionDirection, PeerId};
use crate::transport::BoxConnection;

/// Outbound queue depth per peer.
const COMMAND_QUEUE_CAPACITY: usize = 32;

/// Commands accepted by a running session.
#[derive(Debug)]
pub enum PeerCommand {
    /// Write a message to the peer.
    Send(Message),
    /// Close the connection.
    Disconnect,
}

/// Server-side plumbing a session is wired into.
#[derive(Clone)]
pub(crate) struct SessionContext {
    pub network: BitcoinNet,
    pub done_tx: mpsc::Sender<PeerId>,
    pub tracker: TaskTracker,
}

/// State consumed when the session starts.
struct Pending {
    conn: BoxConnection,
    commands: mpsc::Receiver<PeerCommand>,
    ctx: SessionContext,
}

/// A session with one remote node.
pub struct Peer {
    id: PeerId,
    addr: LightningAddress,
    direction: ConnectionDirection,
    quit: CancellationToken,
    /// Set by the session task before it reports itself done.
    finished: Arc<AtomicBool>,
    command_tx: mpsc::Sender<PeerCommand>,
    pending: Mutex<Option<Pending>>,
}

impl Peer {
    pub(crate) fn new(
        id: PeerId,
        conn: BoxConnection,
        addr: LightningAddress,
        direction: ConnectionDirection,
        quit: CancellationToken,
        ctx: SessionContext,
    ) -> Self {
        let (command_tx, commands) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
        Self {
            id,
            addr,
            direction,
            quit,
            finished: Arc::new(AtomicBool::new(false)),
            command_tx,
            pending: Mutex::new(Some(Pending {
                conn,
                commands,
                ctx,
            })),
        }
    }

    pub fn id(&self) -> PeerId {
        self.id
    }

    /// Remote address; its rendering is what duplicate detection compares.
    pub fn addr(&self) -> &LightningAddress {
        &self.addr
    }

    pub fn direction(&self) -> ConnectionDirection {
        self.direction
    }

    /// Spawn the session task. Returns `false` if it was already started.
    pub fn start(&self) -> bool {
        let pending = self
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        let Some(pending) = pending else {
            return false;
        };

        tracing::debug!(
            peer = %self.id,
            addr = %self.addr,
            direction = %self.direction,
            "Starting peer session"
        );

        let tracker = pending.ctx.tracker.clone();
        tracker.spawn(run_session(
            self.id,
            pending,
            self.quit.clone(),
            self.finished.clone(),
        ));
        true
    }

    /// Signal the session task to exit. Idempotent.
    pub fn stop(&self) {
        if !self.quit.is_cancelled() {
            tracing::debug!(peer = %self.id, "Stopping peer");
            self.quit.cancel();
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.quit.is_cancelled()
    }

    /// Whether the session task has exited.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    /// Queue a message for the peer. Messages queued before `start` are sent
    /// once the session runs.
    pub async fn send(&self, message: impl Into<Message>) -> P2pResult<()> {
        self.command(PeerCommand::Send(message.into())).await
    }

    /// Ask the session to close the connection.
    pub async fn disconnect(&self) -> P2pResult<()> {
        self.command(PeerCommand::Disconnect).await
    }

    async fn command(&self, command: PeerCommand) -> P2pResult<()> {
        self.command_tx
            .send(command)
            .await
            .map_err(|e| P2pError::ChannelSend(format!("{}: {}", self.id, e)))
    }
}

async fn run_session(
    id: PeerId,
    pending: Pending,
    quit: CancellationToken,
    finished: Arc<AtomicBool>,
) {
    let Pending {
        conn,
        mut commands,
        ctx,
    } = pending;
    let mut framed = Framed::new(conn, MessageCodec::new(ctx.network));

    let reason = loop {
        tokio::select! {
            _ = quit.cancelled() => break "stopped",

            command = commands.recv() => match command {
                Some(PeerCommand::Send(message)) => {
                    tracing::trace!(peer = %id, command = %message.command(), "Sending message");
                    if let Err(e) = framed.send(message).await {
                        tracing::warn!(peer = %id, error = %e, "Failed to send message");
                        break "write failed";
                    }
                }
                Some(PeerCommand::Disconnect) | None => break "disconnect requested",
            },

            frame = framed.next() => match frame {
                Some(Ok(message)) => handle_message(id, &message),
                Some(Err(e)) => {
                    tracing::warn!(peer = %id, error = %e, "Protocol error");
                    break "protocol error";
                }
                None => break "connection closed",
            },
        }
    };

    tracing::debug!(peer = %id, reason, "Peer session ended");
    finished.store(true, Ordering::SeqCst);

    if quit.is_cancelled() {
        return;
    }
    tokio::select! {
        _ = quit.cancelled() => {}
        result = ctx.done_tx.send(id) => {
            if result.is_err() {
                tracing::debug!(peer = %id, "Server gone, done notification dropped");
            }
        }
    }
}

fn handle_message(id: PeerId, message: &Message) {
    if let Err(e) = message.validate() {
        tracing::warn!(peer = %id, command = %message.command(), error = %e, "Invalid message");
        return;
    }
    tracing::debug!(peer = %id, command = %message.command(), "Received message");
    tracing::trace!(peer = %id, "{}", message);
}
