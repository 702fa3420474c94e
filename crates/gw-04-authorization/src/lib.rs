//! # Authorization Subsystem (GW-04)
//!
//! Determines whether a decrypted command makes sense for the vehicle's
//! current state: phase whitelisting, parameter bounds, contextual sanity,
//! and privilege for safety-critical commands.

pub mod domain;

// Re-export public API
pub use domain::gate::AuthorizationGate;
