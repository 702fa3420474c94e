//! # Decision Engine
//!
//! Deterministic fold from evidence to verdict:
//!
//! 1. A hard cryptographic failure blocks outright; detectors never soften it.
//! 2. Any Critical detector finding escalates to return-to-launch when the
//!    vehicle is airborne, otherwise a block.
//! 3. Everything else is a weighted risk sum mapped through fixed thresholds.
//!
//! A detector that timed out or errored contributes a conservative penalty
//! instead of silence, and a command decided with any detector down, or
//! carrying a timestamp-skew verdict, is never forwarded untouched: the
//! floor for such commands is a constrained forward.

use shared_types::{
    CryptoVerdict, Decision, DecisionResult, DetectionResult, IntentRisk, Severity, VehicleState,
};
use std::time::Instant;

/// Risk below this is accepted untouched.
const ACCEPT_BELOW: f64 = 0.3;
/// Risk below this is forwarded with parameters clamped.
const CONSTRAIN_BELOW: f64 = 0.6;
/// Risk up to this is withheld; beyond it the vehicle is recalled.
const HOLD_UP_TO: f64 = 0.85;
/// Weight applied to mission-intent risk.
const INTENT_WEIGHT: f64 = 0.2;
/// Confidence assumed for each unavailable detector.
const UNAVAILABLE_CONFIDENCE: f64 = 0.35;

/// Outcome of one detector for a single command.
#[derive(Debug, Clone)]
pub enum DetectorOutcome {
    /// The detector ran within budget.
    Ran(DetectionResult),
    /// Timed out or errored; the name is kept for the audit trail.
    Unavailable(&'static str),
}

/// All evidence gathered for one command.
#[derive(Debug, Clone)]
pub struct EngineInput<'a> {
    /// Verdict from the cryptographic gate.
    pub crypto: &'a CryptoVerdict,
    /// Replay guard outcome.
    pub replay: DetectorOutcome,
    /// Rate monitor outcome.
    pub rate: DetectorOutcome,
    /// Authorization gate outcome.
    pub authorization: DetectorOutcome,
    /// Mission-intent risk, if a provider is wired.
    pub intent: Option<IntentRisk>,
    /// Vehicle state used for the airborne escalation rule.
    pub vehicle: &'a VehicleState,
}

/// Stateless risk aggregator.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecisionEngine;

impl DecisionEngine {
    /// Fresh engine.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Produce the verdict for one command.
    pub fn decide(&self, input: &EngineInput<'_>) -> DecisionResult {
        let started = Instant::now();

        if let Some(result) = hard_crypto_block(input.crypto, started) {
            return result;
        }

        let detectors = [
            ("replay", &input.replay),
            ("rate", &input.rate),
            ("authorization", &input.authorization),
        ];

        // Rule 2: Critical detector evidence escalates immediately.
        for (name, outcome) in &detectors {
            if let DetectorOutcome::Ran(result) = outcome {
                if result.detected && result.severity == Severity::Critical {
                    let decision = recall_or_block(input.vehicle);
                    return DecisionResult {
                        decision,
                        severity: Severity::Critical,
                        confidence: result.confidence,
                        risk_score: 1.0,
                        reasons: vec![format!("{name}: {}", result.reason)],
                        processing_time: started.elapsed(),
                    };
                }
            }
        }

        // Rule 3: weighted aggregation.
        let mut risk: f64 = 0.0;
        let mut severity = Severity::Low;
        let mut peak_confidence: f64 = 0.0;
        let mut reasons: Vec<String> = Vec::new();
        let mut degraded = false;

        for (name, outcome) in &detectors {
            match outcome {
                DetectorOutcome::Ran(result) if result.detected => {
                    risk += result.confidence * result.severity.weight();
                    severity = severity.max(result.severity);
                    peak_confidence = peak_confidence.max(result.confidence);
                    reasons.push(format!("{name}: {}", result.reason));
                }
                DetectorOutcome::Ran(_) => {}
                DetectorOutcome::Unavailable(detail) => {
                    degraded = true;
                    risk += UNAVAILABLE_CONFIDENCE * Severity::Medium.weight();
                    severity = severity.max(Severity::Medium);
                    reasons.push(format!("{name} unavailable: {detail}"));
                }
            }
        }

        if let Some(intent) = &input.intent {
            if intent.score > 0.0 {
                risk += intent.score * INTENT_WEIGHT;
                peak_confidence = peak_confidence.max(intent.score);
                reasons.push(format!("intent: {}", intent.reason));
            }
        }

        let risk = risk.clamp(0.0, 1.0);
        let mut decision = if risk < ACCEPT_BELOW {
            Decision::Accept
        } else if risk < CONSTRAIN_BELOW {
            Decision::Constrain
        } else if risk <= HOLD_UP_TO {
            Decision::Hold
        } else {
            recall_or_block(input.vehicle)
        };

        // With a detector down or a skewed clock the evidence is incomplete;
        // such commands may still fly but never untouched.
        if decision == Decision::Accept && (degraded || !input.crypto.passed()) {
            decision = Decision::Constrain;
        }

        let confidence = if reasons.is_empty() {
            1.0 - risk
        } else {
            peak_confidence
        };
        if reasons.is_empty() {
            reasons.push("no adverse evidence".to_string());
        }

        tracing::debug!(?decision, risk, "command decided");
        DecisionResult {
            decision,
            severity,
            confidence,
            risk_score: risk,
            reasons,
            processing_time: started.elapsed(),
        }
    }
}

/// Terminal crypto failures. Timestamp-skew verdicts are evidence, not
/// failures, and flow through aggregation via the replay guard.
fn hard_crypto_block(verdict: &CryptoVerdict, started: Instant) -> Option<DecisionResult> {
    let reason = match verdict {
        CryptoVerdict::AuthenticationFailed => "crypto: envelope failed authentication",
        CryptoVerdict::ReplayedNonce => "crypto: envelope nonce replayed",
        CryptoVerdict::NoActiveKey => "crypto: no usable session key",
        _ => return None,
    };
    Some(DecisionResult {
        decision: Decision::Block,
        severity: Severity::Critical,
        confidence: 1.0,
        risk_score: 1.0,
        reasons: vec![reason.to_string()],
        processing_time: started.elapsed(),
    })
}

fn recall_or_block(vehicle: &VehicleState) -> Decision {
    if vehicle.is_airborne() {
        Decision::Rtl
    } else {
        Decision::Block
    }
}
