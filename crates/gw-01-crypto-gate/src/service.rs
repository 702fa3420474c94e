//! # Crypto Gate Service
//!
//! Wires the gate domain to its storage port. Owns provisioning: load the
//! root key (creating one on first boot), derive the initial session key,
//! and hand out a running [`CryptoGate`].

use crate::domain::gate::CryptoGate;
use crate::domain::keys::KeyHierarchy;
use crate::ports::outbound::{RootKeyRecord, RootKeyStore};
use shared_crypto::{CryptoError, SecretKey};
use shared_types::{current_timestamp, GatewayConfig};
use std::sync::Arc;

/// Provisioning and lifecycle service for the crypto gate.
pub struct CryptoGateService<S: RootKeyStore> {
    store: S,
    config: GatewayConfig,
    gate: Arc<CryptoGate>,
}

impl<S: RootKeyStore> CryptoGateService<S> {
    /// Provision the hierarchy from `store` and start the gate.
    ///
    /// Idempotent across restarts: an existing root key is reused, otherwise
    /// a fresh one is generated and persisted before any key is derived.
    pub fn provision(store: S, config: GatewayConfig) -> Result<Self, CryptoError> {
        let keys = Self::provision_hierarchy(&store, &config)?;
        let gate = Arc::new(CryptoGate::new(
            keys,
            config.nonce_ledger_capacity,
            config.replay_tolerance_seconds,
        ));
        Ok(Self { store, config, gate })
    }

    /// The running gate.
    #[must_use]
    pub fn gate(&self) -> Arc<CryptoGate> {
        Arc::clone(&self.gate)
    }

    /// Re-derive a fresh hierarchy after revocation (operator recovery path).
    ///
    /// Generates a new root key; the compromised one is overwritten in the
    /// store and never used again.
    pub fn reprovision(&self) -> Result<(), CryptoError> {
        let record = RootKeyRecord {
            secret: SecretKey::generate(),
            created_at: current_timestamp(),
        };
        self.store.store(&record)?;
        let keys = KeyHierarchy::new(record.secret, record.created_at, &self.config)?;
        self.gate.reprovision(keys);
        tracing::info!("key hierarchy reprovisioned with fresh root");
        Ok(())
    }

    fn provision_hierarchy(store: &S, config: &GatewayConfig) -> Result<KeyHierarchy, CryptoError> {
        let record = match store.load()? {
            Some(record) => {
                tracing::info!("root key loaded from store");
                record
            }
            None => {
                let record = RootKeyRecord {
                    secret: SecretKey::generate(),
                    created_at: current_timestamp(),
                };
                store.store(&record)?;
                tracing::info!("root key generated and persisted");
                record
            }
        };
        KeyHierarchy::new(record.secret, record.created_at, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryRootKeyStore;
    use shared_types::{Command, CommandType, SourceId};

    fn command() -> Command {
        Command::new(CommandType::Land, SourceId::new("gcs-1"), vec![])
    }

    #[test]
    fn test_provision_creates_root_on_first_boot() {
        let store = MemoryRootKeyStore::new();
        let service = CryptoGateService::provision(store, GatewayConfig::default()).unwrap();
        assert_eq!(service.gate().key_status().len(), 1);
    }

    #[test]
    fn test_provision_reuses_stored_root() {
        let store = MemoryRootKeyStore::new();
        let record = RootKeyRecord {
            secret: SecretKey::from_bytes([8u8; 32]),
            created_at: current_timestamp(),
        };
        store.store(&record).unwrap();

        let service = CryptoGateService::provision(store, GatewayConfig::default()).unwrap();
        // The stored root is intact after provisioning.
        let kept = service.store.load().unwrap().unwrap();
        assert_eq!(kept.secret.as_bytes(), &[8u8; 32]);
    }

    #[test]
    fn test_reprovision_clears_revocation() {
        let service =
            CryptoGateService::provision(MemoryRootKeyStore::new(), GatewayConfig::default())
                .unwrap();
        let gate = service.gate();

        gate.revoke("suspected compromise");
        assert!(gate.seal_command(&command()).is_err());

        service.reprovision().unwrap();
        assert!(!gate.is_revoked());
        let wire = gate.seal_command(&command()).unwrap();
        assert!(gate.open_envelope(&wire.nonce, &wire.ciphertext).is_ok());
    }
}
