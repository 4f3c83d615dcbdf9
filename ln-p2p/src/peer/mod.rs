//! Peer sessions.
//!
//! This module provides:
//! - Peer identification
//! - The per-peer read/write loop

pub mod info;
pub mod session;

pub use info::{ConnectionDirection, PeerId};
pub use session::{Peer, PeerCommand};
