//! # SkyGate Test Suite
//!
//! Unified test crate containing:
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/      # End-to-end pipeline scenarios
//!     ├── scenarios.rs  # Command-path scenarios (clean, replay, flood, state)
//!     └── lifecycle.rs  # Key rotation and quarantine flows
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p skygate-tests
//! cargo test -p skygate-tests integration::scenarios
//! cargo test -p skygate-tests integration::lifecycle
//! ```

#![allow(unused_imports)]
#![allow(dead_code)]

pub mod integration;
