//! Domain layer: pure key and envelope logic, no I/O.

pub mod gate;
pub mod keys;
pub mod ledger;
