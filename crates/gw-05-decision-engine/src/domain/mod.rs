//! Domain layer: risk aggregation.

pub mod engine;
