//! In-memory root key store for tests and bench rigs.

use crate::ports::outbound::{RootKeyRecord, RootKeyStore};
use parking_lot::Mutex;
use shared_crypto::{CryptoError, SecretKey};

/// Volatile root key store.
#[derive(Default)]
pub struct MemoryRootKeyStore {
    record: Mutex<Option<(SecretKey, u64)>>,
}

impl MemoryRootKeyStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RootKeyStore for MemoryRootKeyStore {
    fn load(&self) -> Result<Option<RootKeyRecord>, CryptoError> {
        Ok(self.record.lock().as_ref().map(|(secret, created_at)| {
            RootKeyRecord {
                secret: secret.clone(),
                created_at: *created_at,
            }
        }))
    }

    fn store(&self, record: &RootKeyRecord) -> Result<(), CryptoError> {
        *self.record.lock() = Some((record.secret.clone(), record.created_at));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let store = MemoryRootKeyStore::new();
        assert!(store.load().unwrap().is_none());

        store
            .store(&RootKeyRecord {
                secret: SecretKey::from_bytes([1u8; 32]),
                created_at: 42,
            })
            .unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.created_at, 42);
    }
}
