//! Identity key file wallet.
//!
//! The key file holds the 32-byte secp256k1 secret key as hex, the same
//! format the keygen tool prints. Surrounding whitespace is ignored.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use ln_p2p::{P2pResult, Wallet};
use secp256k1::SecretKey;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeyFileError {
    #[error("failed to read key file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("key file {path} is not valid hex: {source}")]
    Hex {
        path: PathBuf,
        #[source]
        source: hex::FromHexError,
    },

    #[error("key file {path} does not hold a valid secret key: {source}")]
    Key {
        path: PathBuf,
        #[source]
        source: secp256k1::Error,
    },
}

/// Wallet whose identity key is loaded once from a file.
pub struct KeyFileWallet {
    path: PathBuf,
    secret: SecretKey,
    stopped: AtomicBool,
}

impl KeyFileWallet {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, KeyFileError> {
        let path = path.as_ref().to_path_buf();
        let contents = std::fs::read_to_string(&path).map_err(|source| KeyFileError::Read {
            path: path.clone(),
            source,
        })?;
        let bytes = hex::decode(contents.trim()).map_err(|source| KeyFileError::Hex {
            path: path.clone(),
            source,
        })?;
        let secret = SecretKey::from_slice(&bytes).map_err(|source| KeyFileError::Key {
            path: path.clone(),
            source,
        })?;

        Ok(Self {
            path,
            secret,
            stopped: AtomicBool::new(false),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

impl Wallet for KeyFileWallet {
    fn identity_key(&self) -> P2pResult<SecretKey> {
        Ok(self.secret)
    }

    fn stop(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            tracing::debug!(path = %self.path.display(), "Key file wallet stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SECRET_HEX: &str = "0101010101010101010101010101010101010101010101010101010101010101";

    fn key_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_hex_key() {
        let file = key_file(&format!("{}\n", SECRET_HEX));
        let wallet = KeyFileWallet::load(file.path()).unwrap();

        let expected = SecretKey::from_slice(&[1u8; 32]).unwrap();
        assert_eq!(wallet.identity_key().unwrap(), expected);
        assert_eq!(wallet.path(), file.path());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = KeyFileWallet::load(dir.path().join("absent.key"));
        assert!(matches!(result, Err(KeyFileError::Read { .. })));
    }

    #[test]
    fn test_bad_hex() {
        let file = key_file("not hex at all");
        assert!(matches!(
            KeyFileWallet::load(file.path()),
            Err(KeyFileError::Hex { .. })
        ));
    }

    #[test]
    fn test_bad_key_length() {
        let file = key_file("0102");
        assert!(matches!(
            KeyFileWallet::load(file.path()),
            Err(KeyFileError::Key { .. })
        ));
    }

    #[test]
    fn test_stop() {
        let file = key_file(SECRET_HEX);
        let wallet = KeyFileWallet::load(file.path()).unwrap();
        assert!(!wallet.is_stopped());
        wallet.stop();
        wallet.stop();
        assert!(wallet.is_stopped());
    }
}
