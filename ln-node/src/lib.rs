//! Lightning peer node library.
//!
//! Composes the `ln-p2p` server with a command line, an identity key file and
//! signal handling. Used by the `ln-node` binary and by its tests.

pub mod cli;
pub mod config;
pub mod node;
pub mod shutdown;
pub mod wallet;
