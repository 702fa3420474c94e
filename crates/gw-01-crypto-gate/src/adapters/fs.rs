//! # File-Backed Root Key Store
//!
//! Stores the root key record as a single flat file:
//! `[32-byte secret][8-byte big-endian created_at]`. Written atomically via
//! a temp file rename so a crash mid-write never leaves a truncated key.

use crate::ports::outbound::{RootKeyRecord, RootKeyStore};
use shared_crypto::{CryptoError, SecretKey};
use std::fs;
use std::path::PathBuf;

const RECORD_LEN: usize = 32 + 8;

/// Root key store backed by a flat file.
pub struct FsRootKeyStore {
    path: PathBuf,
}

impl FsRootKeyStore {
    /// Store rooted at `path`; parent directories are created on first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RootKeyStore for FsRootKeyStore {
    fn load(&self) -> Result<Option<RootKeyRecord>, CryptoError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CryptoError::KeyStorage(e.to_string())),
        };
        if bytes.len() != RECORD_LEN {
            return Err(CryptoError::KeyStorage(format!(
                "root key file corrupt: {} bytes, expected {RECORD_LEN}",
                bytes.len()
            )));
        }
        let secret = SecretKey::from_slice(&bytes[..32])?;
        let mut ts = [0u8; 8];
        ts.copy_from_slice(&bytes[32..]);
        Ok(Some(RootKeyRecord {
            secret,
            created_at: u64::from_be_bytes(ts),
        }))
    }

    fn store(&self, record: &RootKeyRecord) -> Result<(), CryptoError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| CryptoError::KeyStorage(e.to_string()))?;
        }
        let mut bytes = Vec::with_capacity(RECORD_LEN);
        bytes.extend_from_slice(record.secret.as_bytes());
        bytes.extend_from_slice(&record.created_at.to_be_bytes());

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, &bytes).map_err(|e| CryptoError::KeyStorage(e.to_string()))?;
        fs::rename(&tmp, &self.path).map_err(|e| CryptoError::KeyStorage(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsRootKeyStore::new(dir.path().join("root_key.bin"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_store_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsRootKeyStore::new(dir.path().join("keys/root_key.bin"));

        let record = RootKeyRecord {
            secret: SecretKey::from_bytes([5u8; 32]),
            created_at: 1_700_000_000,
        };
        store.store(&record).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.secret.as_bytes(), record.secret.as_bytes());
        assert_eq!(loaded.created_at, 1_700_000_000);
    }

    #[test]
    fn test_corrupt_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("root_key.bin");
        fs::write(&path, b"short").unwrap();

        let store = FsRootKeyStore::new(&path);
        assert!(matches!(store.load(), Err(CryptoError::KeyStorage(_))));
    }
}
