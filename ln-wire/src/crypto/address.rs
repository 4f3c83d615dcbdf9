//! Node identity address derivation.
//!
//! A node that has not yet revealed its public key can be addressed by the
//! hash160 of its compressed key, the same 20 bytes a P2PKH script commits to.

use secp256k1::PublicKey;

use super::hashing::hash160;

/// Derive the 20-byte pubkey hash of a compressed public key.
pub fn pubkey_hash(public_key: &PublicKey) -> [u8; 20] {
    hash160(&public_key.serialize())
}
