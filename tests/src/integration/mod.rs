//! End-to-end pipeline scenarios.

pub mod lifecycle;
pub mod scenarios;
