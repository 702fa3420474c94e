//! # Error Types
//!
//! Non-cryptographic error taxonomy shared across gateway subsystems.
//! Cryptographic errors live in `shared-crypto`.

use thiserror::Error;

/// Errors raised by the detection pipeline.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DetectionError {
    /// The decrypted payload did not decode to a well-formed command.
    #[error("Malformed command: {reason}")]
    MalformedCommand {
        /// What was wrong with the payload.
        reason: String,
    },

    /// A detector timed out or faulted; its evidence is treated as absent
    /// and the decision engine degrades toward the conservative action.
    #[error("Detector '{detector}' unavailable: {reason}")]
    DetectorUnavailable {
        /// Which detector.
        detector: &'static str,
        /// Timeout or fault description.
        reason: String,
    },
}

/// Errors raised by configuration loading and validation.
///
/// All of these are fatal at startup; the gateway must not run with an
/// invalid authorization table or parameter bounds.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    /// A numeric option or parameter bound is out of range or inverted.
    #[error("Invalid bound for '{option}': {reason}")]
    InvalidBound {
        /// The offending option or parameter name.
        option: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The configuration names no root key storage location.
    #[error("Missing key material: {0}")]
    MissingKeyMaterial(String),

    /// The configuration file could not be read or parsed.
    #[error("Unparseable configuration: {0}")]
    Unparseable(String),
}
