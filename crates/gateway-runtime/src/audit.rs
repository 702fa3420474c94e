//! # Audit Sinks
//!
//! One JSON line per processed command. The tracing sink rides the normal
//! log pipeline; the JSONL sink appends to a dedicated file for offline
//! incident reconstruction.

use async_trait::async_trait;
use shared_types::{AuditRecord, AuditSink, DetectionError};
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Emits audit records as structured log events.
#[derive(Debug, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, record: &AuditRecord) -> Result<(), DetectionError> {
        let line = serde_json::to_string(record).map_err(|e| DetectionError::DetectorUnavailable {
            detector: "audit",
            reason: e.to_string(),
        })?;
        tracing::info!(target: "skygate::audit", "{line}");
        Ok(())
    }
}

/// Appends one JSON line per record to a file.
pub struct JsonlAuditSink {
    file: Mutex<tokio::fs::File>,
    path: PathBuf,
}

impl JsonlAuditSink {
    /// Open (or create) the audit log at `path` for appending.
    pub async fn open(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        Ok(Self {
            file: Mutex::new(file),
            path,
        })
    }

    /// Location of the audit log.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl AuditSink for JsonlAuditSink {
    async fn record(&self, record: &AuditRecord) -> Result<(), DetectionError> {
        let mut line =
            serde_json::to_vec(record).map_err(|e| DetectionError::DetectorUnavailable {
                detector: "audit",
                reason: e.to_string(),
            })?;
        line.push(b'\n');

        let mut file = self.file.lock().await;
        file.write_all(&line)
            .await
            .map_err(|e| DetectionError::DetectorUnavailable {
                detector: "audit",
                reason: e.to_string(),
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{CryptoVerdict, Decision, DecisionResult, Severity};
    use std::time::Duration;

    fn record() -> AuditRecord {
        AuditRecord::rejected(
            CryptoVerdict::AuthenticationFailed,
            DecisionResult {
                decision: Decision::Block,
                severity: Severity::Critical,
                confidence: 1.0,
                risk_score: 1.0,
                reasons: vec!["crypto: envelope failed authentication".to_string()],
                processing_time: Duration::from_micros(80),
            },
            false,
        )
    }

    #[tokio::test]
    async fn test_jsonl_sink_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonlAuditSink::open(dir.path().join("audit.jsonl"))
            .await
            .unwrap();

        sink.record(&record()).await.unwrap();
        sink.record(&record()).await.unwrap();

        let contents = tokio::fs::read_to_string(sink.path()).await.unwrap();
        assert_eq!(contents.lines().count(), 2);
        let parsed: AuditRecord = serde_json::from_str(contents.lines().next().unwrap()).unwrap();
        assert_eq!(parsed.result.decision, Decision::Block);
    }

    #[tokio::test]
    async fn test_tracing_sink_accepts_records() {
        TracingAuditSink.record(&record()).await.unwrap();
    }
}
