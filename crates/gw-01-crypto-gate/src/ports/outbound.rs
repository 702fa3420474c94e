//! # Outbound Ports (Driven Ports / SPI)
//!
//! The storage dependency this subsystem needs: durable persistence of the
//! root key record across gateway restarts.

use shared_crypto::{CryptoError, SecretKey};

/// The persisted root key together with its provisioning time.
pub struct RootKeyRecord {
    /// Root key material.
    pub secret: SecretKey,
    /// Unix timestamp (seconds) when the root key was created.
    pub created_at: u64,
}

/// Durable storage for the root key record.
///
/// Touched only at provisioning time, never on the per-command path, so the
/// interface is synchronous.
pub trait RootKeyStore: Send + Sync {
    /// Load the stored record, `None` if no root key exists yet.
    fn load(&self) -> Result<Option<RootKeyRecord>, CryptoError>;

    /// Persist the record, replacing any previous one.
    fn store(&self, record: &RootKeyRecord) -> Result<(), CryptoError>;
}
