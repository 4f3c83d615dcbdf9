//! Cryptographic helpers for node identities.
//!
//! Keys and signatures are secp256k1; this module only adds the hashing
//! needed to derive a pubkey hash from a compressed key.

mod address;
mod hashing;

pub use address::pubkey_hash;
pub use hashing::{hash160, sha256};
