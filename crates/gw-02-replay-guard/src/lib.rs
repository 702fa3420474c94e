//! # Replay Guard Subsystem (GW-02)
//!
//! Layered replay detection over commands that already passed the
//! cryptographic gate. Nonce reuse is handled structurally upstream; this
//! crate weighs the softer signals: timestamp skew beyond tolerance and
//! byte-identical command content resent within a short window.

pub mod domain;

// Re-export public API
pub use domain::guard::ReplayGuard;
