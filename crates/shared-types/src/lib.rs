//! # Shared Types Crate
//!
//! This crate contains all domain entities, detection/decision types, the
//! capability traits consumed by the gateway, and the validated configuration
//! surface.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-subsystem types are defined here.
//! - **Immutable Results**: `DetectionResult` and `DecisionResult` are created
//!   once per command and never mutated afterwards.
//! - **Fail Closed**: Configuration is validated once at startup; the gateway
//!   refuses to run with an invalid authorization table or parameter bounds.

pub mod audit;
pub mod command;
pub mod config;
pub mod decision;
pub mod detection;
pub mod errors;
pub mod providers;
pub mod vehicle;

pub use audit::AuditRecord;
pub use command::{Command, CommandType, Param, SourceId, MAX_COMMAND_PARAMS};
pub use config::{GatewayConfig, ParamRange};
pub use decision::{Decision, DecisionResult};
pub use detection::{CryptoVerdict, DetectionResult, RiskLevel, Severity};
pub use errors::{ConfigError, DetectionError};
pub use providers::{
    AuditSink, IntentRisk, IntentRiskProvider, NoopIntentProvider, StaticStateProvider,
    VehicleStateProvider,
};
pub use vehicle::{FlightPhase, MissionPhase, VehicleState};

use std::time::{SystemTime, UNIX_EPOCH};

/// Returns the current Unix timestamp in seconds.
///
/// This function will NOT panic. If the system clock is before `UNIX_EPOCH`
/// (which should never happen on any sane system), it returns 0.
#[must_use]
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
