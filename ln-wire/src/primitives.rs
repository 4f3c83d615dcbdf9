//! Protocol identifiers and fixed-size field types.

use std::fmt;

/// Maximum length of a DER signature on the wire (72 bytes DER + sighash slack).
pub const MAX_SIGNATURE_SIZE: usize = 73;

/// Maximum length of a delivery script (P2PKH).
pub const MAX_PK_SCRIPT_SIZE: usize = 25;

macro_rules! u64_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);

        impl $name {
            /// Wrap a raw identifier.
            pub const fn new(id: u64) -> Self {
                Self(id)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

u64_identifier!(
    /// Identifies a funded channel.
    ChannelId
);

u64_identifier!(
    /// Identifies an in-progress channel reservation (funding or close negotiation).
    ReservationId
);

u64_identifier!(
    /// Identifies an in-flight HTLC, scoped to its channel.
    HtlcKey
);

/// A 32-byte double-SHA256 hash, such as a transaction id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ShaHash(pub [u8; 32]);

impl ShaHash {
    /// Length in bytes.
    pub const LEN: usize = 32;

    /// Whether every byte is zero. Zero is the wire encoding of "no hash".
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl From<[u8; 32]> for ShaHash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// Rendered byte-reversed, as Bitcoin tooling displays txids.
impl fmt::Display for ShaHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut reversed = self.0;
        reversed.reverse();
        write!(f, "{}", hex::encode(reversed))
    }
}

/// A 20-byte hash: HTLC redemption hash, preimage slot or revocation hash.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RedemptionHash(pub [u8; 20]);

impl RedemptionHash {
    /// Length in bytes.
    pub const LEN: usize = 20;
}

impl From<[u8; 20]> for RedemptionHash {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for RedemptionHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// An output script, at most [`MAX_PK_SCRIPT_SIZE`] bytes on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PkScript(pub Vec<u8>);

impl PkScript {
    /// Script length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the script is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Build a standard pay-to-pubkey-hash script.
    pub fn p2pkh(pubkey_hash: &[u8; 20]) -> Self {
        // OP_DUP OP_HASH160 <20> OP_EQUALVERIFY OP_CHECKSIG
        let mut script = Vec::with_capacity(MAX_PK_SCRIPT_SIZE);
        script.extend_from_slice(&[0x76, 0xa9, 0x14]);
        script.extend_from_slice(pubkey_hash);
        script.extend_from_slice(&[0x88, 0xac]);
        Self(script)
    }
}

impl fmt::Display for PkScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_display() {
        assert_eq!(ChannelId::new(42).to_string(), "42");
        assert_eq!(HtlcKey::from(7).to_string(), "7");
    }

    #[test]
    fn test_sha_hash_display_reversed() {
        let mut bytes = [0u8; 32];
        bytes[0] = 0xab;
        let rendered = ShaHash(bytes).to_string();
        assert_eq!(rendered.len(), 64);
        assert!(rendered.ends_with("ab"));
    }

    #[test]
    fn test_p2pkh_script_fits() {
        let script = PkScript::p2pkh(&[9u8; 20]);
        assert_eq!(script.len(), MAX_PK_SCRIPT_SIZE);
        assert_eq!(script.0[0], 0x76);
    }
}
