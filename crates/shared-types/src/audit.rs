//! # Audit Records
//!
//! One record per processed command, capturing the full decision context so
//! an incident can be reconstructed after the fact.

use crate::command::{CommandType, SourceId};
use crate::decision::DecisionResult;
use crate::detection::CryptoVerdict;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single audit entry, serialized as one JSON line by the sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Unique record identifier.
    pub id: Uuid,
    /// Wall-clock time the decision was made, RFC 3339.
    pub recorded_at: String,
    /// The command class, if decryption succeeded.
    pub command_type: Option<CommandType>,
    /// The claimed source, if decryption succeeded.
    pub source: Option<SourceId>,
    /// Outcome of the cryptographic gate.
    pub crypto_verdict: CryptoVerdict,
    /// The decision and its supporting evidence.
    pub result: DecisionResult,
    /// Whether the gateway was quarantined when the command arrived.
    pub quarantined: bool,
}

impl AuditRecord {
    /// Record for a command that passed decryption.
    #[must_use]
    pub fn decided(
        command_type: CommandType,
        source: SourceId,
        crypto_verdict: CryptoVerdict,
        result: DecisionResult,
        quarantined: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            recorded_at: chrono::Utc::now().to_rfc3339(),
            command_type: Some(command_type),
            source: Some(source),
            crypto_verdict,
            result,
            quarantined,
        }
    }

    /// Record for a datagram rejected before the command could be decoded.
    #[must_use]
    pub fn rejected(crypto_verdict: CryptoVerdict, result: DecisionResult, quarantined: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            recorded_at: chrono::Utc::now().to_rfc3339(),
            command_type: None,
            source: None,
            crypto_verdict,
            result,
            quarantined,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::Decision;
    use crate::detection::Severity;
    use std::time::Duration;

    fn sample_result(decision: Decision) -> DecisionResult {
        DecisionResult {
            decision,
            severity: Severity::Low,
            confidence: 0.0,
            risk_score: 0.0,
            reasons: vec!["clean".to_string()],
            processing_time: Duration::from_millis(1),
        }
    }

    #[test]
    fn test_record_serializes_to_json_line() {
        let record = AuditRecord::decided(
            CommandType::Land,
            SourceId::new("gcs-1"),
            CryptoVerdict::Passed,
            sample_result(Decision::Accept),
            false,
        );
        let line = serde_json::to_string(&record).unwrap();
        assert!(line.contains("\"Land\""));
        assert!(!line.contains('\n'));
    }

    #[test]
    fn test_rejected_record_has_no_command() {
        let record = AuditRecord::rejected(
            CryptoVerdict::AuthenticationFailed,
            sample_result(Decision::Block),
            false,
        );
        assert!(record.command_type.is_none());
        assert!(record.source.is_none());
    }
}
