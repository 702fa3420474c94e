//! # Replay Guard
//!
//! Four evidence layers, combined by maximum confidence:
//!
//! 1. Nonce reuse (fed in as the crypto verdict) is certain replay.
//! 2. A sequence number at or below the highest already accepted from the
//!    source scores 0.80: a regressed counter is a captured-and-resent
//!    command or a cloned sender. Sequence zero marks an unsequenced sender
//!    and is exempt.
//! 3. Timestamp skew beyond tolerance scales with how far out the clock is,
//!    capped below certainty since skew alone can be a drifting clock.
//! 4. A byte-identical command within the recent per-source window scores
//!    0.70: suspicious, but a legitimate retransmission looks the same.
//!
//! Per-source windows live behind one `RwLock`; the runtime serializes
//! commands per source, so each window has a single writer at a time.

use parking_lot::RwLock;
use shared_crypto::{digest_many, Digest};
use shared_types::{
    current_timestamp, Command, CryptoVerdict, DetectionResult, Severity, SourceId,
};
use std::collections::{HashMap, VecDeque};
use std::time::Instant;

/// Confidence assigned to an exact content duplicate in the window.
const CONTENT_REPLAY_CONFIDENCE: f64 = 0.70;
/// Confidence assigned to a regressed or reused per-source sequence number.
const SEQUENCE_REGRESSION_CONFIDENCE: f64 = 0.80;
/// Base confidence for skew just past tolerance.
const SKEW_BASE_CONFIDENCE: f64 = 0.5;
/// Skew confidence cap; skew never proves replay by itself.
const SKEW_MAX_CONFIDENCE: f64 = 0.85;

struct SourceWindow {
    digests: VecDeque<(Digest, u64)>,
    highest_sequence: u64,
    last_seen: u64,
}

/// Replay detector with per-source content windows.
pub struct ReplayGuard {
    windows: RwLock<HashMap<SourceId, SourceWindow>>,
    window_len: usize,
    tolerance_seconds: u64,
    max_sources: usize,
}

impl ReplayGuard {
    /// Guard retaining `window_len` digests per source, bounded to
    /// `max_sources` distinct sources.
    #[must_use]
    pub fn new(window_len: usize, tolerance_seconds: u64, max_sources: usize) -> Self {
        Self {
            windows: RwLock::new(HashMap::new()),
            window_len,
            tolerance_seconds,
            max_sources,
        }
    }

    /// Score one command for replay evidence.
    pub fn inspect(&self, command: &Command, verdict: &CryptoVerdict) -> DetectionResult {
        let started = Instant::now();
        let mut confidence: f64 = 0.0;
        let mut severity = Severity::Low;
        let mut reasons: Vec<String> = Vec::new();

        if matches!(verdict, CryptoVerdict::ReplayedNonce) {
            confidence = 1.0;
            severity = Severity::High;
            reasons.push("envelope nonce already accepted".to_string());
        }

        if let Some(skew) = skew_seconds(verdict) {
            let skew_confidence = self.skew_confidence(skew);
            if skew_confidence > confidence {
                confidence = skew_confidence;
            }
            severity = severity.max(Severity::Medium);
            reasons.push(format!(
                "timestamp {skew}s outside the {}s tolerance",
                self.tolerance_seconds
            ));
        }

        let evidence = self.window_evidence(command);
        if evidence.sequence_regressed {
            if SEQUENCE_REGRESSION_CONFIDENCE > confidence {
                confidence = SEQUENCE_REGRESSION_CONFIDENCE;
            }
            severity = severity.max(Severity::High);
            reasons.push(format!(
                "sequence {} at or below the highest already accepted",
                command.sequence
            ));
        }

        if evidence.duplicate {
            if CONTENT_REPLAY_CONFIDENCE > confidence {
                confidence = CONTENT_REPLAY_CONFIDENCE;
            }
            severity = severity.max(Severity::Medium);
            reasons.push("identical command within recent window".to_string());
        }

        if reasons.is_empty() {
            DetectionResult::clear("no replay indicators", started.elapsed())
        } else {
            tracing::debug!(
                source = %command.source,
                confidence,
                "replay evidence: {}",
                reasons.join("; ")
            );
            DetectionResult::flagged(confidence, severity, reasons.join("; "), started.elapsed())
        }
    }

    fn skew_confidence(&self, skew: u64) -> f64 {
        let tolerance = self.tolerance_seconds.max(1) as f64;
        let excess_ratio = ((skew as f64 - tolerance) / tolerance).clamp(0.0, 1.0);
        (SKEW_BASE_CONFIDENCE + excess_ratio * 0.35).min(SKEW_MAX_CONFIDENCE)
    }

    /// Record the command against its source window and report what the
    /// window already knew: a duplicate digest, a regressed sequence.
    fn window_evidence(&self, command: &Command) -> WindowEvidence {
        let digest = command_content_digest(command);
        let now = current_timestamp();
        let mut windows = self.windows.write();

        if !windows.contains_key(&command.source) && windows.len() >= self.max_sources {
            evict_stalest(&mut windows);
        }

        let window = windows
            .entry(command.source.clone())
            .or_insert_with(|| SourceWindow {
                digests: VecDeque::new(),
                highest_sequence: 0,
                last_seen: now,
            });
        window.last_seen = now;

        // Sequence zero means the sender does not use per-source counters.
        let sequence_regressed =
            command.sequence > 0 && command.sequence <= window.highest_sequence;
        if command.sequence > window.highest_sequence {
            window.highest_sequence = command.sequence;
        }

        let duplicate = window.digests.iter().any(|(d, _)| *d == digest);
        if window.digests.len() >= self.window_len {
            window.digests.pop_front();
        }
        window.digests.push_back((digest, now));

        WindowEvidence {
            duplicate,
            sequence_regressed,
        }
    }
}

struct WindowEvidence {
    duplicate: bool,
    sequence_regressed: bool,
}

/// Digest over the fields that define "the same command": type, source, and
/// parameters. Timestamp and sequence are excluded so a verbatim resend
/// hashes identically.
fn command_content_digest(command: &Command) -> Digest {
    let params = bincode::serialize(&command.params).unwrap_or_default();
    digest_many(&[
        command.command_type.to_string().as_bytes(),
        command.source.as_str().as_bytes(),
        &params,
    ])
}

fn skew_seconds(verdict: &CryptoVerdict) -> Option<u64> {
    match verdict {
        CryptoVerdict::StaleTimestamp { skew_seconds }
        | CryptoVerdict::TimestampInFuture { skew_seconds } => Some(*skew_seconds),
        _ => None,
    }
}

fn evict_stalest(windows: &mut HashMap<SourceId, SourceWindow>) {
    if let Some(stalest) = windows
        .iter()
        .min_by_key(|(_, w)| w.last_seen)
        .map(|(source, _)| source.clone())
    {
        windows.remove(&stalest);
    }
}
