//! # ln-wire
//!
//! Binary wire format for the lightning peer protocol.
//!
//! This crate provides:
//! - The element codec: how each primitive field kind is laid out on the wire
//! - The message set (funding, close, HTLC) with per-command payload bounds
//! - A network-tagged frame codec for use with `tokio_util::codec::Framed`
//! - Hash helpers for deriving pubkey hashes from node identity keys

#![deny(unsafe_code)]

pub mod crypto;
pub mod element;
pub mod error;
pub mod framing;
pub mod messages;
pub mod network;
pub mod primitives;

/// Protocol version passed to every encode/decode call.
pub const PROTOCOL_VERSION: u32 = 1;

pub use element::{read_element, Element};
pub use error::{WireError, WireResult};
pub use framing::MessageCodec;
pub use messages::{
    CloseComplete, CloseRequest, Command, FundingRequest, FundingResponse, HtlcAddAccept,
    HtlcAddReject, HtlcAddRequest, HtlcSettleRequest, Message, WireMessage,
};
pub use network::BitcoinNet;
pub use primitives::{ChannelId, HtlcKey, PkScript, RedemptionHash, ReservationId, ShaHash};

// Re-exported so dependents name one version of the curve types.
pub use secp256k1;
