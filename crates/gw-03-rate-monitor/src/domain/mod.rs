//! Domain layer: rate computation and thresholds.

pub mod monitor;
