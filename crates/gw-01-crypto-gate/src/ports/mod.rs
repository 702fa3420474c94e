//! Ports layer: trait boundary around durable key storage.

pub mod outbound;
