//! # Decision Types
//!
//! The enforcement action chosen for one command, plus its supporting
//! evidence. Created once per command by the decision engine, consumed by the
//! gateway loop and the audit sink.

use crate::detection::Severity;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The enforcement action for one command.
///
/// Risk-proportional rather than binary: between full acceptance and a hard
/// block sit constrained execution, manual hold, and a fail-safe return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
    /// Forward the command unchanged.
    Accept,
    /// Forward with parameters clamped to configured bounds.
    Constrain,
    /// Withhold pending manual confirmation.
    Hold,
    /// Withhold and direct the vehicle to return to launch.
    Rtl,
    /// Withhold outright.
    Block,
}

impl Decision {
    /// Whether the command (possibly modified) reaches the flight controller.
    #[must_use]
    pub fn forwards(self) -> bool {
        matches!(self, Decision::Accept | Decision::Constrain)
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// The complete, immutable output of the decision engine for one command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionResult {
    /// The chosen enforcement action.
    pub decision: Decision,
    /// Highest severity among contributing evidence.
    pub severity: Severity,
    /// Confidence in the decision, in [0, 1].
    pub confidence: f64,
    /// Aggregated risk score in [0, 1].
    pub risk_score: f64,
    /// Ordered contributing reasons (crypto first, then detectors, then
    /// external risk inputs).
    pub reasons: Vec<String>,
    /// Total gateway processing time for this command.
    #[serde(with = "processing_millis")]
    pub processing_time: Duration,
}

impl DecisionResult {
    /// One-line summary for log output.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} (severity={}, risk={:.2}, confidence={:.2})",
            self.decision, self.severity, self.risk_score, self.confidence
        )
    }
}

mod processing_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        (d.as_secs_f64() * 1000.0).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let millis = f64::deserialize(d)?;
        Ok(Duration::from_secs_f64(millis.max(0.0) / 1000.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forwarding_decisions() {
        assert!(Decision::Accept.forwards());
        assert!(Decision::Constrain.forwards());
        assert!(!Decision::Hold.forwards());
        assert!(!Decision::Rtl.forwards());
        assert!(!Decision::Block.forwards());
    }

    #[test]
    fn test_summary_contains_decision() {
        let result = DecisionResult {
            decision: Decision::Hold,
            severity: Severity::High,
            confidence: 0.8,
            risk_score: 0.7,
            reasons: vec!["rate: burst detected".into()],
            processing_time: Duration::from_millis(2),
        };
        assert!(result.summary().contains("Hold"));
    }
}
