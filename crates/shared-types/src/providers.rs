//! # Capability Ports
//!
//! Traits the gateway consumes but does not implement itself: vehicle state,
//! mission intent risk, and audit persistence. The runtime wires concrete
//! adapters behind these at startup.
//!
//! ## Design
//!
//! Providers are best-effort. A failing or absent provider degrades the
//! decision conservatively instead of stopping the pipeline, so every method
//! returns a `Result` the caller maps into a conservative default.

use crate::audit::AuditRecord;
use crate::command::Command;
use crate::errors::DetectionError;
use crate::vehicle::VehicleState;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Mission-context risk reported by an intent provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentRisk {
    /// Risk score in `[0.0, 1.0]`.
    pub score: f64,
    /// Short explanation for the audit record.
    pub reason: String,
}

impl IntentRisk {
    /// A risk assessment, score clamped into `[0.0, 1.0]`.
    #[must_use]
    pub fn new(score: f64, reason: impl Into<String>) -> Self {
        Self {
            score: score.clamp(0.0, 1.0),
            reason: reason.into(),
        }
    }

    /// No mission-context concern.
    #[must_use]
    pub fn none() -> Self {
        Self {
            score: 0.0,
            reason: "no intent signal".to_string(),
        }
    }
}

/// Source of the current vehicle state snapshot.
#[async_trait]
pub trait VehicleStateProvider: Send + Sync {
    /// Snapshot of the vehicle state as of now.
    async fn current_state(&self) -> Result<VehicleState, DetectionError>;
}

/// Optional mission-context risk scoring for a command.
#[async_trait]
pub trait IntentRiskProvider: Send + Sync {
    /// Score the command against the known mission context.
    async fn assess(
        &self,
        command: &Command,
        state: &VehicleState,
    ) -> Result<IntentRisk, DetectionError>;
}

/// Destination for per-command audit records.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Persist one record. Failures are logged by the caller, never fatal.
    async fn record(&self, record: &AuditRecord) -> Result<(), DetectionError>;
}

/// Fixed-state provider for tests and bench rigs.
#[derive(Debug, Clone)]
pub struct StaticStateProvider {
    state: VehicleState,
}

impl StaticStateProvider {
    #[must_use]
    pub fn new(state: VehicleState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl VehicleStateProvider for StaticStateProvider {
    async fn current_state(&self) -> Result<VehicleState, DetectionError> {
        Ok(self.state)
    }
}

/// Intent provider that reports no risk for every command.
#[derive(Debug, Clone, Default)]
pub struct NoopIntentProvider;

#[async_trait]
impl IntentRiskProvider for NoopIntentProvider {
    async fn assess(
        &self,
        _command: &Command,
        _state: &VehicleState,
    ) -> Result<IntentRisk, DetectionError> {
        Ok(IntentRisk::none())
    }
}
