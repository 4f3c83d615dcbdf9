//! Lightning network addresses.

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use ln_wire::crypto::pubkey_hash;
use secp256k1::PublicKey;

use crate::error::P2pError;

/// Identifier a dialer uses to authenticate the remote node: the compressed
/// public key when known, otherwise the 20-byte pubkey hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteId {
    PublicKey(PublicKey),
    PubKeyHash([u8; 20]),
}

impl RemoteId {
    /// Raw identifier bytes: 33 for a key, 20 for a hash.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            RemoteId::PublicKey(pk) => pk.serialize().to_vec(),
            RemoteId::PubKeyHash(hash) => hash.to_vec(),
        }
    }

    /// Whether `key` is the identity this id names.
    pub fn matches(&self, key: &PublicKey) -> bool {
        match self {
            RemoteId::PublicKey(pk) => pk == key,
            RemoteId::PubKeyHash(hash) => pubkey_hash(key) == *hash,
        }
    }
}

/// Where and who a remote node is.
///
/// Renders as `<hex pubkey hash>@<ip:port>`. Two addresses naming the same
/// node at the same socket render identically whether or not the full key is
/// known, which is what duplicate detection relies on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LightningAddress {
    pub pub_key: Option<PublicKey>,
    pub pubkey_hash: [u8; 20],
    pub net_addr: SocketAddr,
}

impl LightningAddress {
    pub fn from_pubkey(pub_key: PublicKey, net_addr: SocketAddr) -> Self {
        Self {
            pubkey_hash: pubkey_hash(&pub_key),
            pub_key: Some(pub_key),
            net_addr,
        }
    }

    pub fn from_pubkey_hash(pubkey_hash: [u8; 20], net_addr: SocketAddr) -> Self {
        Self {
            pub_key: None,
            pubkey_hash,
            net_addr,
        }
    }

    /// Identifier to authenticate this node with when dialing.
    pub fn remote_id(&self) -> RemoteId {
        match self.pub_key {
            Some(pk) => RemoteId::PublicKey(pk),
            None => RemoteId::PubKeyHash(self.pubkey_hash),
        }
    }
}

impl fmt::Display for LightningAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", hex::encode(self.pubkey_hash), self.net_addr)
    }
}

impl FromStr for LightningAddress {
    type Err = P2pError;

    /// Parse `<hex pubkey or pubkey hash>@<ip:port>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| P2pError::InvalidAddress(format!("{s}: {reason}"));

        let (id, host) = s
            .split_once('@')
            .ok_or_else(|| invalid("expected <id>@<ip:port>"))?;
        let net_addr: SocketAddr = host.parse().map_err(|_| invalid("bad socket address"))?;
        let bytes = hex::decode(id).map_err(|_| invalid("id is not hex"))?;

        match bytes.len() {
            33 => {
                let pk = PublicKey::from_slice(&bytes).map_err(|_| invalid("bad public key"))?;
                Ok(Self::from_pubkey(pk, net_addr))
            }
            20 => {
                let mut hash = [0u8; 20];
                hash.copy_from_slice(&bytes);
                Ok(Self::from_pubkey_hash(hash, net_addr))
            }
            _ => Err(invalid("id must be a 33-byte key or a 20-byte hash")),
        }
    }
}
