//! Domain layer: replay scoring logic.

pub mod guard;
