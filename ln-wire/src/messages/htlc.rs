//! HTLC add/accept/reject/settle messages.

use std::fmt;
use std::io::{Read, Write};

use crate::element::read_element;
use crate::error::{WireError, WireResult};
use crate::messages::{Command, WireMessage};
use crate::primitives::{ChannelId, HtlcKey, RedemptionHash};
use crate::write_elements;

/// Offer a new HTLC on a channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HtlcAddRequest {
    pub channel_id: ChannelId,
    pub htlc_key: HtlcKey,
    /// Absolute block height after which the HTLC can be timed out.
    pub expiry: u32,
    /// Amount in satoshis.
    pub amount: u64,
    pub redemption_hash: RedemptionHash,
}

impl WireMessage for HtlcAddRequest {
    const COMMAND: Command = Command::HtlcAddRequest;
    // 8 + 8 + 4 + 8 + 20
    const MAX_PAYLOAD: u32 = 48;

    fn decode<R: Read + ?Sized>(r: &mut R, _pver: u32) -> WireResult<Self> {
        Ok(Self {
            channel_id: read_element(r)?,
            htlc_key: read_element(r)?,
            expiry: read_element(r)?,
            amount: read_element(r)?,
            redemption_hash: read_element(r)?,
        })
    }

    fn encode<W: Write + ?Sized>(&self, w: &mut W, _pver: u32) -> WireResult<()> {
        write_elements!(
            w,
            self.channel_id,
            self.htlc_key,
            self.expiry,
            self.amount,
            self.redemption_hash,
        );
        Ok(())
    }

    fn validate(&self) -> WireResult<()> {
        if self.amount == 0 {
            return Err(WireError::invalid(Self::COMMAND, "zero amount"));
        }
        Ok(())
    }
}

impl fmt::Display for HtlcAddRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "HtlcAddRequest {{")?;
        writeln!(f, "    ChannelID: {}", self.channel_id)?;
        writeln!(f, "    HTLCKey: {}", self.htlc_key)?;
        writeln!(f, "    Expiry: {}", self.expiry)?;
        writeln!(f, "    Amount: {}", self.amount)?;
        writeln!(f, "    RedemptionHash: {}", self.redemption_hash)?;
        writeln!(f, "}}")
    }
}

/// Accept a previously offered HTLC.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HtlcAddAccept {
    pub channel_id: ChannelId,
    pub htlc_key: HtlcKey,
}

impl WireMessage for HtlcAddAccept {
    const COMMAND: Command = Command::HtlcAddAccept;
    const MAX_PAYLOAD: u32 = 16;

    fn decode<R: Read + ?Sized>(r: &mut R, _pver: u32) -> WireResult<Self> {
        Ok(Self {
            channel_id: read_element(r)?,
            htlc_key: read_element(r)?,
        })
    }

    fn encode<W: Write + ?Sized>(&self, w: &mut W, _pver: u32) -> WireResult<()> {
        write_elements!(w, self.channel_id, self.htlc_key);
        Ok(())
    }

    /// Always succeeds: both fields are plain identifiers and any value
    /// decodes to a well-formed message.
    fn validate(&self) -> WireResult<()> {
        Ok(())
    }
}

impl fmt::Display for HtlcAddAccept {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "HtlcAddAccept {{")?;
        writeln!(f, "    ChannelID: {}", self.channel_id)?;
        writeln!(f, "    HTLCKey: {}", self.htlc_key)?;
        writeln!(f, "}}")
    }
}

/// Reject a previously offered HTLC.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HtlcAddReject {
    pub channel_id: ChannelId,
    pub htlc_key: HtlcKey,
}

impl WireMessage for HtlcAddReject {
    const COMMAND: Command = Command::HtlcAddReject;
    const MAX_PAYLOAD: u32 = 16;

    fn decode<R: Read + ?Sized>(r: &mut R, _pver: u32) -> WireResult<Self> {
        Ok(Self {
            channel_id: read_element(r)?,
            htlc_key: read_element(r)?,
        })
    }

    fn encode<W: Write + ?Sized>(&self, w: &mut W, _pver: u32) -> WireResult<()> {
        write_elements!(w, self.channel_id, self.htlc_key);
        Ok(())
    }

    /// Always succeeds, see [`HtlcAddAccept::validate`].
    fn validate(&self) -> WireResult<()> {
        Ok(())
    }
}

impl fmt::Display for HtlcAddReject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "HtlcAddReject {{")?;
        writeln!(f, "    ChannelID: {}", self.channel_id)?;
        writeln!(f, "    HTLCKey: {}", self.htlc_key)?;
        writeln!(f, "}}")
    }
}

/// Settle an HTLC by revealing the redemption preimage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HtlcSettleRequest {
    pub channel_id: ChannelId,
    pub htlc_key: HtlcKey,
    pub redemption_proof: RedemptionHash,
}

impl WireMessage for HtlcSettleRequest {
    const COMMAND: Command = Command::HtlcSettleRequest;
    // 8 + 8 + 20
    const MAX_PAYLOAD: u32 = 36;

    fn decode<R: Read + ?Sized>(r: &mut R, _pver: u32) -> WireResult<Self> {
        Ok(Self {
            channel_id: read_element(r)?,
            htlc_key: read_element(r)?,
            redemption_proof: read_element(r)?,
        })
    }

    fn encode<W: Write + ?Sized>(&self, w: &mut W, _pver: u32) -> WireResult<()> {
        write_elements!(w, self.channel_id, self.htlc_key, self.redemption_proof);
        Ok(())
    }

    /// Always succeeds. Whether the proof hashes to the offered redemption
    /// hash is a channel-state question, not a wire one.
    fn validate(&self) -> WireResult<()> {
        Ok(())
    }
}

impl fmt::Display for HtlcSettleRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "HtlcSettleRequest {{")?;
        writeln!(f, "    ChannelID: {}", self.channel_id)?;
        writeln!(f, "    HTLCKey: {}", self.htlc_key)?;
        writeln!(f, "    RedemptionProof: {}", self.redemption_proof)?;
        writeln!(f, "}}")
    }
}
