//! Crypto error types.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Encryption failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// AEAD authentication or decryption failed
    #[error("Authentication failed")]
    AuthenticationFailed,

    /// Envelope nonce already seen in this epoch
    #[error("Replayed nonce")]
    ReplayedNonce,

    /// No session key currently able to decrypt
    #[error("No active session key")]
    NoActiveKey,

    /// Embedded timestamp too far in the past
    #[error("Stale timestamp: {skew_seconds}s behind")]
    StaleTimestamp {
        /// Observed skew in seconds
        skew_seconds: u64,
    },

    /// Embedded timestamp ahead of local clock beyond tolerance
    #[error("Timestamp in future: {skew_seconds}s ahead")]
    TimestampInFuture {
        /// Observed skew in seconds
        skew_seconds: u64,
    },

    /// Datagram shorter than the envelope header
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// Plaintext failed to decode into a command
    #[error("Undecodable payload: {0}")]
    UndecodablePayload(String),

    /// Invalid key length
    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected key length in bytes
        expected: usize,
        /// Actual key length in bytes
        actual: usize,
    },

    /// Durable key storage failed
    #[error("Key storage failed: {0}")]
    KeyStorage(String),
}
