//! # Rate Monitor Subsystem (GW-03)
//!
//! Per-source command rate tracking with burst and sustained-flood
//! detection. The threshold adapts to mission phase: bulk mission upload
//! legitimately runs far hotter than manual flight.

pub mod domain;

// Re-export public API
pub use domain::monitor::RateMonitor;
