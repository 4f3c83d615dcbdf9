//! Node identity and the wallet collaborator it is loaded from.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use ln_wire::crypto::pubkey_hash;
use secp256k1::{PublicKey, Secp256k1, SecretKey};

use crate::error::P2pResult;

/// Wallet collaborator consumed by the server.
///
/// The server only needs the long-term identity key at construction time and
/// a way to stop the wallet when the server stops.
pub trait Wallet: Send + Sync {
    /// Long-term node identity key.
    fn identity_key(&self) -> P2pResult<SecretKey>;

    /// Stop the wallet. Called once by `Server::stop`.
    fn stop(&self);
}

/// The node's long-term identity. Immutable once loaded.
#[derive(Clone)]
pub struct NodeIdentity {
    secret: SecretKey,
    public: PublicKey,
}

impl NodeIdentity {
    /// Build an identity from a secret key.
    pub fn new(secret: SecretKey) -> Self {
        let public = PublicKey::from_secret_key(&Secp256k1::signing_only(), &secret);
        Self { secret, public }
    }

    /// Load the identity key from the wallet.
    pub fn from_wallet(wallet: &dyn Wallet) -> P2pResult<Self> {
        let identity = Self::new(wallet.identity_key()?);
        tracing::info!(
            pubkey = %identity.public,
            pkh = %hex::encode(identity.pubkey_hash()),
            "Loaded node identity"
        );
        Ok(identity)
    }

    /// Generate a fresh random identity.
    pub fn generate() -> Self {
        Self::new(SecretKey::new(&mut rand::thread_rng()))
    }

    pub fn public_key(&self) -> PublicKey {
        self.public
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.secret
    }

    /// HASH160 of the compressed public key.
    pub fn pubkey_hash(&self) -> [u8; 20] {
        pubkey_hash(&self.public)
    }
}

impl fmt::Debug for NodeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeIdentity")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

/// Wallet holding a single in-memory identity key.
pub struct MemoryWallet {
    secret: SecretKey,
    stops: AtomicUsize,
}

impl MemoryWallet {
    pub fn new(secret: SecretKey) -> Self {
        Self {
            secret,
            stops: AtomicUsize::new(0),
        }
    }

    /// Wallet with a freshly generated key.
    pub fn generate() -> Self {
        Self::new(SecretKey::new(&mut rand::thread_rng()))
    }

    /// Number of times `stop` has been called.
    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl Wallet for MemoryWallet {
    fn identity_key(&self) -> P2pResult<SecretKey> {
        Ok(self.secret)
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}
