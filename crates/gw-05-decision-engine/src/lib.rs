//! # Decision Engine Subsystem (GW-05)
//!
//! Folds the crypto verdict, the three detector outcomes, and optional
//! mission-intent risk into one graded verdict per command: Accept,
//! Constrain, Hold, Rtl, or Block.

pub mod domain;

// Re-export public API
pub use domain::engine::{DecisionEngine, DetectorOutcome, EngineInput};
