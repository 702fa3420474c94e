//! Domain layer: authorization rules.

pub mod gate;
