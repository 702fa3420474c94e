//! # Crypto Gate Subsystem (GW-01)
//!
//! Every inbound datagram enters the gateway through this crate: envelope
//! parsing, AEAD verification under the session key hierarchy, nonce
//! replay accounting, and command decoding.
//!
//! ## Architecture
//!
//! This subsystem follows hexagonal architecture:
//! - **Domain Layer** (`domain/`): key hierarchy, nonce ledger, gate pipeline
//! - **Ports Layer** (`ports/`): trait definitions for the key storage backend
//! - **Adapters Layer** (`adapters/`): file-backed and in-memory key stores
//! - **Service Layer** (`service.rs`): wires the gate to its storage port
//!
//! ## Security Notes
//!
//! - Cryptographic failure is terminal for a datagram; no detector ever sees
//!   a command that failed authentication
//! - The root key never encrypts traffic; only HKDF-derived session keys do
//! - Revocation is one-way: after `revoke` only fresh provisioning restores
//!   service

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

// Re-export public API
pub use adapters::{FsRootKeyStore, MemoryRootKeyStore};
pub use domain::gate::{split_envelope, CryptoGate, Opened, WireMessage};
pub use domain::keys::{KeyHierarchy, KeyStatus, RotationReason, SessionKeyState};
pub use domain::ledger::NonceLedger;
pub use ports::outbound::{RootKeyRecord, RootKeyStore};
pub use service::CryptoGateService;
