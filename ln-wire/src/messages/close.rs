//! Cooperative channel close messages.

use std::fmt;
use std::io::{Read, Write};

use secp256k1::ecdsa::Signature;

use crate::element::read_element;
use crate::error::{WireError, WireResult};
use crate::messages::{Command, WireMessage};
use crate::primitives::{ReservationId, ShaHash};
use crate::write_elements;

/// Hex of a DER signature, or the empty string when absent.
fn signature_hex(sig: Option<&Signature>) -> String {
    sig.map(|s| hex::encode(&*s.serialize_der()))
        .unwrap_or_default()
}

/// Ask the counterparty to cooperatively close a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseRequest {
    pub reservation_id: ReservationId,
    /// Requester's signature over the close transaction.
    pub requester_close_sig: Signature,
    /// Close transaction fee in satoshis.
    pub fee: u64,
}

impl WireMessage for CloseRequest {
    const COMMAND: Command = Command::CloseRequest;
    // 8 + (1 + 73) + 8
    const MAX_PAYLOAD: u32 = 90;

    fn decode<R: Read + ?Sized>(r: &mut R, _pver: u32) -> WireResult<Self> {
        Ok(Self {
            reservation_id: read_element(r)?,
            requester_close_sig: read_element(r)?,
            fee: read_element(r)?,
        })
    }

    fn encode<W: Write + ?Sized>(&self, w: &mut W, _pver: u32) -> WireResult<()> {
        write_elements!(w, self.reservation_id, self.requester_close_sig, self.fee);
        Ok(())
    }

    /// Always succeeds. The signature was already parsed as strict DER during
    /// decode, and fee policy is not a wire concern.
    fn validate(&self) -> WireResult<()> {
        Ok(())
    }
}

impl fmt::Display for CloseRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "CloseRequest {{")?;
        writeln!(f, "    ReservationID: {}", self.reservation_id)?;
        writeln!(
            f,
            "    RequesterCloseSig: {}",
            signature_hex(Some(&self.requester_close_sig))
        )?;
        writeln!(f, "    Fee: {}", self.fee)?;
        writeln!(f, "}}")
    }
}

/// Counterparty's answer to a [`CloseRequest`].
///
/// Both the signature and the close txid may still be unknown while the
/// message is being assembled. An absent signature encodes as a zero length
/// byte and an absent hash as 32 zero bytes; decode maps both back to `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloseComplete {
    pub reservation_id: ReservationId,
    pub responder_close_sig: Option<Signature>,
    /// Txid of the close transaction. `Some` of the all-zero hash cannot be
    /// told apart from `None` on the wire, so encode and validate reject it.
    pub close_sha_hash: Option<ShaHash>,
}

impl CloseComplete {
    fn check_close_hash(&self) -> WireResult<()> {
        match self.close_sha_hash {
            Some(hash) if hash.is_zero() => Err(WireError::invalid(
                Self::COMMAND,
                "close hash is all zeros; use None for an unknown hash",
            )),
            _ => Ok(()),
        }
    }
}

impl WireMessage for CloseComplete {
    const COMMAND: Command = Command::CloseComplete;
    // 8 + (1 + 73) + 32
    const MAX_PAYLOAD: u32 = 114;

    fn decode<R: Read + ?Sized>(r: &mut R, _pver: u32) -> WireResult<Self> {
        Ok(Self {
            reservation_id: read_element(r)?,
            responder_close_sig: read_element(r)?,
            close_sha_hash: read_element(r)?,
        })
    }

    fn encode<W: Write + ?Sized>(&self, w: &mut W, _pver: u32) -> WireResult<()> {
        self.check_close_hash()?;
        write_elements!(
            w,
            self.reservation_id,
            self.responder_close_sig,
            self.close_sha_hash,
        );
        Ok(())
    }

    /// Absent fields are legal mid-negotiation; only a zero close hash is
    /// rejected.
    fn validate(&self) -> WireResult<()> {
        self.check_close_hash()
    }
}

impl fmt::Display for CloseComplete {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hash = self
            .close_sha_hash
            .map(|h| h.to_string())
            .unwrap_or_default();

        writeln!(f, "CloseComplete {{")?;
        writeln!(f, "    ReservationID: {}", self.reservation_id)?;
        writeln!(
            f,
            "    ResponderCloseSig: {}",
            signature_hex(self.responder_close_sig.as_ref())
        )?;
        writeln!(f, "    CloseShaHash: {}", hash)?;
        writeln!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PROTOCOL_VERSION;
    use secp256k1::{Message, Secp256k1, SecretKey};
    use std::io::Cursor;

    fn test_signature() -> Signature {
        let secret = SecretKey::from_slice(&[3u8; 32]).unwrap();
        Secp256k1::new().sign_ecdsa(&Message::from_digest([9u8; 32]), &secret)
    }

    fn encode<M: WireMessage>(msg: &M) -> Vec<u8> {
        let mut buf = Vec::new();
        msg.encode(&mut buf, PROTOCOL_VERSION).unwrap();
        buf
    }

    #[test]
    fn test_incomplete_close_complete_encodes() {
        let msg = CloseComplete {
            reservation_id: ReservationId::new(1),
            responder_close_sig: None,
            close_sha_hash: None,
        };

        let bytes = encode(&msg);
        let mut expected = 1u64.to_be_bytes().to_vec();
        expected.push(0);
        expected.extend_from_slice(&[0u8; 32]);
        assert_eq!(bytes, expected);
        assert_eq!(encode(&msg), bytes);

        let decoded = CloseComplete::decode(&mut Cursor::new(bytes), PROTOCOL_VERSION).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_incomplete_close_complete_display() {
        let msg = CloseComplete {
            reservation_id: ReservationId::new(1),
            ..Default::default()
        };
        let rendered = msg.to_string();
        assert!(rendered.contains("    ReservationID: 1\n"));
        assert!(rendered.contains("    ResponderCloseSig: \n"));
        assert!(rendered.contains("    CloseShaHash: \n"));
    }

    #[test]
    fn test_complete_close_complete_roundtrip() {
        let msg = CloseComplete {
            reservation_id: ReservationId::new(77),
            responder_close_sig: Some(test_signature()),
            close_sha_hash: Some(ShaHash([0x11; 32])),
        };
        let bytes = encode(&msg);
        assert!(bytes.len() as u32 <= msg.max_payload_length(PROTOCOL_VERSION));

        let decoded = CloseComplete::decode(&mut Cursor::new(bytes), PROTOCOL_VERSION).unwrap();
        assert_eq!(decoded, msg);
        assert!(decoded.to_string().contains(&"11".repeat(32)));
    }

    #[test]
    fn test_close_complete_rejects_zero_hash() {
        let msg = CloseComplete {
            reservation_id: ReservationId::new(1),
            responder_close_sig: None,
            close_sha_hash: Some(ShaHash([0u8; 32])),
        };

        assert!(matches!(msg.validate(), Err(WireError::Invalid { .. })));
        let mut buf = Vec::new();
        let result = msg.encode(&mut buf, PROTOCOL_VERSION);
        assert!(matches!(result, Err(WireError::Invalid { .. })));
        assert!(buf.is_empty());

        // Zero bytes on the wire always decode to an unknown hash.
        let incomplete = CloseComplete {
            close_sha_hash: None,
            ..msg
        };
        assert!(incomplete.validate().is_ok());
        let decoded =
            CloseComplete::decode(&mut Cursor::new(encode(&incomplete)), PROTOCOL_VERSION).unwrap();
        assert_eq!(decoded, incomplete);
    }

    #[test]
    fn test_close_request_roundtrip() {
        let msg = CloseRequest {
            reservation_id: ReservationId::new(5),
            requester_close_sig: test_signature(),
            fee: 1_000,
        };
        let bytes = encode(&msg);
        assert!(bytes.len() as u32 <= msg.max_payload_length(PROTOCOL_VERSION));

        let decoded = CloseRequest::decode(&mut Cursor::new(bytes), PROTOCOL_VERSION).unwrap();
        assert_eq!(decoded, msg);
        assert!(decoded.validate().is_ok());
    }

    #[test]
    fn test_close_complete_rejects_oversized_signature_length() {
        let mut bytes = 1u64.to_be_bytes().to_vec();
        bytes.push(200);
        bytes.extend_from_slice(&[0u8; 32]);
        let result = CloseComplete::decode(&mut Cursor::new(bytes), PROTOCOL_VERSION);
        assert!(matches!(
            result,
            Err(crate::WireError::FieldTooLong { len: 200, .. })
        ));
    }
}
