//! Wire messages.
//!
//! Every message type implements [`WireMessage`]; [`Message`] is the closed
//! set of all of them, routed by [`Command`].

pub mod close;
pub mod funding;
pub mod htlc;

use std::fmt;
use std::io::{Read, Write};

use crate::error::{WireError, WireResult};

pub use close::{CloseComplete, CloseRequest};
pub use funding::{FundingRequest, FundingResponse};
pub use htlc::{HtlcAddAccept, HtlcAddReject, HtlcAddRequest, HtlcSettleRequest};

/// Message opcodes. Numeric values are part of the wire protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Command {
    FundingRequest = 200,
    FundingResponse = 210,
    CloseRequest = 300,
    CloseComplete = 310,
    HtlcAddRequest = 1000,
    HtlcAddAccept = 1010,
    HtlcAddReject = 1020,
    HtlcSettleRequest = 1100,
}

impl Command {
    /// Every known command.
    pub const ALL: [Command; 8] = [
        Command::FundingRequest,
        Command::FundingResponse,
        Command::CloseRequest,
        Command::CloseComplete,
        Command::HtlcAddRequest,
        Command::HtlcAddAccept,
        Command::HtlcAddReject,
        Command::HtlcSettleRequest,
    ];

    /// Numeric opcode.
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Short human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            Command::FundingRequest => "fundingrequest",
            Command::FundingResponse => "fundingresponse",
            Command::CloseRequest => "closerequest",
            Command::CloseComplete => "closecomplete",
            Command::HtlcAddRequest => "htlcaddrequest",
            Command::HtlcAddAccept => "htlcaddaccept",
            Command::HtlcAddReject => "htlcaddreject",
            Command::HtlcSettleRequest => "htlcsettlerequest",
        }
    }

    /// Upper bound on the payload size of this command's message.
    pub fn max_payload_length(self, _pver: u32) -> u32 {
        match self {
            Command::FundingRequest => FundingRequest::MAX_PAYLOAD,
            Command::FundingResponse => FundingResponse::MAX_PAYLOAD,
            Command::CloseRequest => CloseRequest::MAX_PAYLOAD,
            Command::CloseComplete => CloseComplete::MAX_PAYLOAD,
            Command::HtlcAddRequest => HtlcAddRequest::MAX_PAYLOAD,
            Command::HtlcAddAccept => HtlcAddAccept::MAX_PAYLOAD,
            Command::HtlcAddReject => HtlcAddReject::MAX_PAYLOAD,
            Command::HtlcSettleRequest => HtlcSettleRequest::MAX_PAYLOAD,
        }
    }
}

impl TryFrom<u32> for Command {
    type Error = WireError;

    fn try_from(code: u32) -> WireResult<Self> {
        Command::ALL
            .into_iter()
            .find(|c| c.code() == code)
            .ok_or(WireError::UnknownCommand(code))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Contract shared by every wire message.
///
/// `decode` and `encode` handle the payload only; framing (magic, opcode,
/// length) belongs to [`crate::framing`].
pub trait WireMessage: fmt::Display + Sized {
    /// Opcode of this message type.
    const COMMAND: Command;

    /// Worst-case encoded payload size.
    const MAX_PAYLOAD: u32;

    /// Read exactly this message's fields from `r`.
    fn decode<R: Read + ?Sized>(r: &mut R, pver: u32) -> WireResult<Self>;

    /// Write this message's fields to `w`. Partial output is not rolled back
    /// on error.
    fn encode<W: Write + ?Sized>(&self, w: &mut W, pver: u32) -> WireResult<()>;

    /// Semantic checks beyond what decoding already enforces.
    fn validate(&self) -> WireResult<()>;

    fn command(&self) -> Command {
        Self::COMMAND
    }

    fn max_payload_length(&self, _pver: u32) -> u32 {
        Self::MAX_PAYLOAD
    }
}

/// Any protocol message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    FundingRequest(FundingRequest),
    FundingResponse(FundingResponse),
    CloseRequest(CloseRequest),
    CloseComplete(CloseComplete),
    HtlcAddRequest(HtlcAddRequest),
    HtlcAddAccept(HtlcAddAccept),
    HtlcAddReject(HtlcAddReject),
    HtlcSettleRequest(HtlcSettleRequest),
}

/// Apply `$body` to the inner message of every variant.
macro_rules! each_variant {
    ($msg:expr, $inner:ident => $body:expr) => {
        match $msg {
            Message::FundingRequest($inner) => $body,
            Message::FundingResponse($inner) => $body,
            Message::CloseRequest($inner) => $body,
            Message::CloseComplete($inner) => $body,
            Message::HtlcAddRequest($inner) => $body,
            Message::HtlcAddAccept($inner) => $body,
            Message::HtlcAddReject($inner) => $body,
            Message::HtlcSettleRequest($inner) => $body,
        }
    };
}

impl Message {
    /// Decode the payload of a message whose opcode is already known.
    pub fn decode_payload<R: Read + ?Sized>(
        command: Command,
        r: &mut R,
        pver: u32,
    ) -> WireResult<Self> {
        Ok(match command {
            Command::FundingRequest => FundingRequest::decode(r, pver)?.into(),
            Command::FundingResponse => FundingResponse::decode(r, pver)?.into(),
            Command::CloseRequest => CloseRequest::decode(r, pver)?.into(),
            Command::CloseComplete => CloseComplete::decode(r, pver)?.into(),
            Command::HtlcAddRequest => HtlcAddRequest::decode(r, pver)?.into(),
            Command::HtlcAddAccept => HtlcAddAccept::decode(r, pver)?.into(),
            Command::HtlcAddReject => HtlcAddReject::decode(r, pver)?.into(),
            Command::HtlcSettleRequest => HtlcSettleRequest::decode(r, pver)?.into(),
        })
    }

    /// Encode the payload (no frame header).
    pub fn encode<W: Write + ?Sized>(&self, w: &mut W, pver: u32) -> WireResult<()> {
        each_variant!(self, m => m.encode(w, pver))
    }

    pub fn command(&self) -> Command {
        each_variant!(self, m => m.command())
    }

    pub fn name(&self) -> &'static str {
        self.command().name()
    }

    pub fn max_payload_length(&self, pver: u32) -> u32 {
        each_variant!(self, m => m.max_payload_length(pver))
    }

    pub fn validate(&self) -> WireResult<()> {
        each_variant!(self, m => m.validate())
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        each_variant!(self, m => fmt::Display::fmt(m, f))
    }
}

macro_rules! impl_from_variant {
    ($($variant:ident),+) => {$(
        impl From<$variant> for Message {
            fn from(msg: $variant) -> Self {
                Message::$variant(msg)
            }
        }
    )+};
}

impl_from_variant!(
    FundingRequest,
    FundingResponse,
    CloseRequest,
    CloseComplete,
    HtlcAddRequest,
    HtlcAddAccept,
    HtlcAddReject,
    HtlcSettleRequest
);
