//! # Shared Crypto - Gateway Cryptographic Primitives
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `symmetric` | XChaCha20-Poly1305 | Command envelope encryption |
//! | `kdf` | HKDF-SHA256 | Session key derivation |
//! | `hashing` | BLAKE3 | Command digests for the replay window |
//!
//! ## Security Properties
//!
//! - **XChaCha20-Poly1305**: 192-bit nonce, constant-time ARX design, random
//!   nonces are collision-safe at gateway command rates
//! - **HKDF-SHA256**: epoch-bound session keys, root key never touches the wire
//! - **BLAKE3**: SIMD-accelerated digests, cheap enough for the per-command path

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod hashing;
pub mod kdf;
pub mod symmetric;

// Re-exports
pub use errors::CryptoError;
pub use hashing::{command_digest, digest_many, Digest};
pub use kdf::derive_session_key;
pub use symmetric::{open, seal, Nonce, SecretKey, NONCE_LEN};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
