//! Channel funding negotiation messages.

use std::fmt;
use std::io::{Read, Write};

use secp256k1::PublicKey;

use crate::element::read_element;
use crate::error::{WireError, WireResult};
use crate::messages::{Command, WireMessage};
use crate::primitives::{PkScript, RedemptionHash, ReservationId};
use crate::write_elements;

/// Open a channel reservation with the counterparty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundingRequest {
    pub reservation_id: ReservationId,
    pub channel_type: u8,
    /// Requester's contribution in satoshis.
    pub funding_amount: u64,
    pub min_fee_per_kb: u64,
    pub lock_time: u32,
    pub channel_derivation_point: PublicKey,
    pub commitment_key: PublicKey,
    pub revocation_hash: RedemptionHash,
    pub delivery_pk_script: PkScript,
}

impl WireMessage for FundingRequest {
    const COMMAND: Command = Command::FundingRequest;
    // 8 + 1 + 8 + 8 + 4 + 33 + 33 + 20 + (1 + 25)
    const MAX_PAYLOAD: u32 = 141;

    fn decode<R: Read + ?Sized>(r: &mut R, _pver: u32) -> WireResult<Self> {
        Ok(Self {
            reservation_id: read_element(r)?,
            channel_type: read_element(r)?,
            funding_amount: read_element(r)?,
            min_fee_per_kb: read_element(r)?,
            lock_time: read_element(r)?,
            channel_derivation_point: read_element(r)?,
            commitment_key: read_element(r)?,
            revocation_hash: read_element(r)?,
            delivery_pk_script: read_element(r)?,
        })
    }

    fn encode<W: Write + ?Sized>(&self, w: &mut W, _pver: u32) -> WireResult<()> {
        write_elements!(
            w,
            self.reservation_id,
            self.channel_type,
            self.funding_amount,
            self.min_fee_per_kb,
            self.lock_time,
            self.channel_derivation_point,
            self.commitment_key,
            self.revocation_hash,
            self.delivery_pk_script,
        );
        Ok(())
    }

    fn validate(&self) -> WireResult<()> {
        validate_funding(Self::COMMAND, self.funding_amount, &self.delivery_pk_script)
    }
}

impl fmt::Display for FundingRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "FundingRequest {{")?;
        writeln!(f, "    ReservationID: {}", self.reservation_id)?;
        writeln!(f, "    ChannelType: {}", self.channel_type)?;
        writeln!(f, "    FundingAmount: {}", self.funding_amount)?;
        writeln!(f, "    MinFeePerKb: {}", self.min_fee_per_kb)?;
        writeln!(f, "    LockTime: {}", self.lock_time)?;
        writeln!(f, "    ChannelDerivationPoint: {}", self.channel_derivation_point)?;
        writeln!(f, "    CommitmentKey: {}", self.commitment_key)?;
        writeln!(f, "    RevocationHash: {}", self.revocation_hash)?;
        writeln!(f, "    DeliveryPkScript: {}", self.delivery_pk_script)?;
        writeln!(f, "}}")
    }
}

/// Counterparty's contribution to a channel reservation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundingResponse {
    pub reservation_id: ReservationId,
    pub channel_type: u8,
    /// Responder's contribution in satoshis.
    pub funding_amount: u64,
    pub lock_time: u32,
    pub channel_derivation_point: PublicKey,
    pub commitment_key: PublicKey,
    pub revocation_hash: RedemptionHash,
    pub delivery_pk_script: PkScript,
}

impl WireMessage for FundingResponse {
    const COMMAND: Command = Command::FundingResponse;
    // 8 + 1 + 8 + 4 + 33 + 33 + 20 + (1 + 25)
    const MAX_PAYLOAD: u32 = 133;

    fn decode<R: Read + ?Sized>(r: &mut R, _pver: u32) -> WireResult<Self> {
        Ok(Self {
            reservation_id: read_element(r)?,
            channel_type: read_element(r)?,
            funding_amount: read_element(r)?,
            lock_time: read_element(r)?,
            channel_derivation_point: read_element(r)?,
            commitment_key: read_element(r)?,
            revocation_hash: read_element(r)?,
            delivery_pk_script: read_element(r)?,
        })
    }

    fn encode<W: Write + ?Sized>(&self, w: &mut W, _pver: u32) -> WireResult<()> {
        write_elements!(
            w,
            self.reservation_id,
            self.channel_type,
            self.funding_amount,
            self.lock_time,
            self.channel_derivation_point,
            self.commitment_key,
            self.revocation_hash,
            self.delivery_pk_script,
        );
        Ok(())
    }

    fn validate(&self) -> WireResult<()> {
        validate_funding(Self::COMMAND, self.funding_amount, &self.delivery_pk_script)
    }
}

impl fmt::Display for FundingResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "FundingResponse {{")?;
        writeln!(f, "    ReservationID: {}", self.reservation_id)?;
        writeln!(f, "    ChannelType: {}", self.channel_type)?;
        writeln!(f, "    FundingAmount: {}", self.funding_amount)?;
        writeln!(f, "    LockTime: {}", self.lock_time)?;
        writeln!(f, "    ChannelDerivationPoint: {}", self.channel_derivation_point)?;
        writeln!(f, "    CommitmentKey: {}", self.commitment_key)?;
        writeln!(f, "    RevocationHash: {}", self.revocation_hash)?;
        writeln!(f, "    DeliveryPkScript: {}", self.delivery_pk_script)?;
        writeln!(f, "}}")
    }
}

fn validate_funding(command: Command, amount: u64, script: &PkScript) -> WireResult<()> {
    if amount == 0 {
        return Err(WireError::invalid(command, "zero funding amount"));
    }
    if script.is_empty() {
        return Err(WireError::invalid(command, "empty delivery script"));
    }
    Ok(())
}
