//! Wire codec error types.

use std::io;
use thiserror::Error;

use crate::messages::Command;

/// Errors produced while encoding, decoding or validating wire messages.
#[derive(Debug, Error)]
pub enum WireError {
    /// Underlying stream read or write failed (includes truncated input).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A length-prefixed field declared more bytes than it may hold.
    #[error("{field} too long: {len} bytes (max: {max})")]
    FieldTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    /// A key or signature failed secp256k1 parsing.
    #[error("invalid secp256k1 encoding: {0}")]
    Secp256k1(#[from] secp256k1::Error),

    /// Frame carried an opcode outside the known command set.
    #[error("unknown command: {0}")]
    UnknownCommand(u32),

    /// Frame payload exceeds the bound for its command.
    #[error("payload too large for {command}: {size} bytes (max: {max})")]
    PayloadTooLarge {
        command: Command,
        size: usize,
        max: usize,
    },

    /// Frame was sent for a different network.
    #[error("invalid network magic: expected {expected:#010x}, got {actual:#010x}")]
    InvalidMagic { expected: u32, actual: u32 },

    /// Network name did not match any known network.
    #[error("unknown network: {0}")]
    UnknownNetwork(String),

    /// Message decoder left payload bytes unread.
    #[error("{remaining} trailing bytes after {command} payload")]
    TrailingBytes { command: Command, remaining: usize },

    /// Message is well-formed but semantically invalid.
    #[error("invalid {command} message: {reason}")]
    Invalid { command: Command, reason: String },
}

impl WireError {
    /// Shorthand for a validation failure.
    pub fn invalid(command: Command, reason: impl Into<String>) -> Self {
        WireError::Invalid {
            command,
            reason: reason.into(),
        }
    }
}

/// Result type for wire operations.
pub type WireResult<T> = Result<T, WireError>;
