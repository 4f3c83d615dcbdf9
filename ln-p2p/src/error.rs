//! P2P error types.

use std::io;
use std::net::SocketAddr;

use ln_wire::WireError;
use thiserror::Error;

/// P2P-specific errors.
#[derive(Debug, Error)]
pub enum P2pError {
    /// I/O error during network operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Failed to encode or decode a wire message.
    #[error("Wire error: {0}")]
    Wire(#[from] WireError),

    /// Identity exchange failed or the remote identity did not match.
    #[error("Handshake failed: {0}")]
    HandshakeFailed(String),

    /// Handshake timed out.
    #[error("Handshake timeout")]
    HandshakeTimeout,

    /// Dial did not complete before its deadline.
    #[error("Connection timeout to {addr}")]
    ConnectionTimeout { addr: SocketAddr },

    /// A peer with the same lightning address is already registered.
    #[error("Already connected to peer: {addr}")]
    AlreadyConnected { addr: String },

    /// Channel send error.
    #[error("Channel send error: {0}")]
    ChannelSend(String),

    /// The wallet could not supply the node identity key.
    #[error("Identity error: {0}")]
    Identity(String),

    /// Invalid peer address.
    #[error("Invalid peer address: {0}")]
    InvalidAddress(String),

    /// Server is shutting down.
    #[error("Server shutting down")]
    Shutdown,
}

/// Result type for P2P operations.
pub type P2pResult<T> = Result<T, P2pError>;
