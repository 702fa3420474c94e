//! # Detection Types
//!
//! The common vocabulary produced by the three attack detectors and the
//! crypto gate, consumed by the decision engine.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Severity of a finding, ordered from least to most serious.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Informational finding.
    Low,
    /// Suspicious but plausibly benign.
    Medium,
    /// Strong evidence of an attack.
    High,
    /// Definitive or safety-threatening evidence.
    Critical,
}

impl Severity {
    /// Weight used by the decision engine's risk aggregation.
    #[must_use]
    pub fn weight(self) -> f64 {
        match self {
            Severity::Low => 0.25,
            Severity::Medium => 0.5,
            Severity::High => 0.75,
            Severity::Critical => 1.0,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Overall risk posture reported back to the key hierarchy.
///
/// Reaching `High` or `Critical` triggers an automatic session key rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    /// Normal operation.
    Low,
    /// Elevated suspicion.
    Medium,
    /// Active attack suspected.
    High,
    /// Confirmed attack or key compromise.
    Critical,
}

/// Result of one detector for one command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Whether the detector flagged this command.
    pub detected: bool,
    /// Confidence in [0, 1].
    pub confidence: f64,
    /// Severity of the finding (meaningful only when `detected`).
    pub severity: Severity,
    /// Human-readable reason, carried into the audit record.
    pub reason: String,
    /// Wall time the detector spent on this command.
    #[serde(with = "duration_millis")]
    pub latency: Duration,
}

impl DetectionResult {
    /// A clean result: nothing detected.
    #[must_use]
    pub fn clear(reason: impl Into<String>, latency: Duration) -> Self {
        Self {
            detected: false,
            confidence: 0.0,
            severity: Severity::Low,
            reason: reason.into(),
            latency,
        }
    }

    /// A positive finding with the given confidence and severity.
    #[must_use]
    pub fn flagged(
        confidence: f64,
        severity: Severity,
        reason: impl Into<String>,
        latency: Duration,
    ) -> Self {
        Self {
            detected: true,
            confidence: confidence.clamp(0.0, 1.0),
            severity,
            reason: reason.into(),
            latency,
        }
    }
}

/// Outcome of the cryptographic gate for one datagram.
///
/// Authentication, nonce, and missing-key verdicts are terminal for the
/// command. Timestamp-skew verdicts are not: the command still runs the
/// detectors, which weigh the skew as replay evidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CryptoVerdict {
    /// Authentication, uniqueness and freshness checks all passed.
    Passed,
    /// AEAD tag did not verify under any usable key (tamper or wrong key).
    AuthenticationFailed,
    /// Nonce already present in the ledger.
    ReplayedNonce,
    /// No usable session key (revoked or not provisioned).
    NoActiveKey,
    /// Embedded timestamp older than the tolerance window.
    StaleTimestamp {
        /// Seconds beyond the tolerance window.
        skew_seconds: u64,
    },
    /// Embedded timestamp ahead of local time beyond the tolerance window.
    TimestampInFuture {
        /// Seconds beyond the tolerance window.
        skew_seconds: u64,
    },
}

impl CryptoVerdict {
    /// Whether the command passed the gate.
    #[must_use]
    pub fn passed(&self) -> bool {
        matches!(self, CryptoVerdict::Passed)
    }
}

mod duration_millis {
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
