//! # Command Pipeline
//!
//! Everything that happens to one datagram between the socket and the
//! forwarding decision. Cryptographic failures are terminal and skip the
//! detectors entirely; skew verdicts flow through as replay evidence.
//!
//! Commands from one source are processed in arrival order (per-source
//! async mutex held across the detector and decision phase); different
//! sources proceed in parallel.

use gw_01_crypto_gate::{split_envelope, CryptoGate};
use gw_02_replay_guard::ReplayGuard;
use gw_03_rate_monitor::RateMonitor;
use gw_04_authorization::AuthorizationGate;
use gw_05_decision_engine::{DecisionEngine, DetectorOutcome, EngineInput};
use shared_crypto::CryptoError;
use shared_types::{
    AuditRecord, Command, CommandType, CryptoVerdict, Decision, DecisionResult, DetectionResult,
    GatewayConfig, IntentRiskProvider, Param, ParamRange, Severity, SourceId,
    VehicleState, VehicleStateProvider,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex};

/// Cap on per-source state held by the pipeline and its detectors. Bounded
/// so a source flood cannot grow memory without limit; the stalest source
/// is evicted when the cap is reached.
const MAX_SOURCES: usize = 256;

/// Result of pushing one datagram through the pipeline.
pub struct PipelineOutcome {
    /// Full audit record, already decision-stamped.
    pub record: AuditRecord,
    /// Plaintext payload to forward, present only for Accept/Constrain.
    pub forward: Option<Vec<u8>>,
}

/// The wired-up per-datagram pipeline.
pub struct CommandPipeline {
    gate: Arc<CryptoGate>,
    replay: Arc<ReplayGuard>,
    rate: Arc<RateMonitor>,
    authorization: Arc<AuthorizationGate>,
    engine: DecisionEngine,
    state_provider: Arc<dyn VehicleStateProvider>,
    intent_provider: Option<Arc<dyn IntentRiskProvider>>,
    bounds: HashMap<CommandType, HashMap<String, ParamRange>>,
    detector_budget: Duration,
    quarantine: watch::Receiver<bool>,
    source_locks: parking_lot::Mutex<HashMap<SourceId, (Arc<Mutex<()>>, Instant)>>,
}

impl CommandPipeline {
    /// Assemble the pipeline from validated configuration.
    pub fn new(
        gate: Arc<CryptoGate>,
        config: &GatewayConfig,
        state_provider: Arc<dyn VehicleStateProvider>,
        intent_provider: Option<Arc<dyn IntentRiskProvider>>,
        quarantine: watch::Receiver<bool>,
    ) -> Self {
        Self {
            gate,
            replay: Arc::new(ReplayGuard::new(
                config.replay_window_per_source,
                config.replay_tolerance_seconds,
                MAX_SOURCES,
            )),
            rate: Arc::new(RateMonitor::new(
                config.dos_sustained_threshold,
                config.dos_burst_threshold,
                config.dos_normal_floor,
                MAX_SOURCES,
            )),
            authorization: Arc::new(AuthorizationGate::from_config(config)),
            engine: DecisionEngine::new(),
            state_provider,
            intent_provider,
            bounds: config.parameter_bounds.clone(),
            detector_budget: config.detector_budget(),
            quarantine,
            source_locks: parking_lot::Mutex::new(HashMap::new()),
        }
    }

    /// Process one raw datagram end to end.
    pub async fn process(&self, datagram: &[u8]) -> PipelineOutcome {
        let quarantined = *self.quarantine.borrow();

        let (nonce, ciphertext) = match split_envelope(datagram) {
            Ok(parts) => parts,
            Err(e) => {
                return rejected(CryptoVerdict::AuthenticationFailed, e.to_string(), quarantined)
            }
        };

        let opened = match self.gate.open_envelope(&nonce, ciphertext) {
            Ok(opened) => opened,
            Err(e) => return rejected(verdict_for(&e), e.to_string(), quarantined),
        };
        let command = opened.command;
        let verdict = opened.verdict;

        // Serialize per source from here on.
        let lock = self.source_lock(&command.source);
        let _ordering = lock.lock().await;

        // Quarantine: fail-safe commands skip the detectors so a recall can
        // never be withheld on rate or replay evidence; everything else is
        // blocked until the quarantine is lifted.
        if quarantined {
            if command.command_type.is_failsafe() {
                return quarantine_forward(command, verdict);
            }
            return quarantine_block(command, verdict);
        }

        let vehicle = match self.state_provider.current_state().await {
            Ok(state) => state,
            Err(e) => {
                // No state feed: assume the most restrictive posture.
                tracing::warn!(error = %e, "vehicle state unavailable, assuming grounded");
                VehicleState::grounded()
            }
        };

        let (replay, rate, authorization) = tokio::join!(
            self.run_replay(&command, verdict),
            self.run_rate(&command, vehicle),
            self.run_authorization(&command, vehicle),
        );

        let intent = match &self.intent_provider {
            Some(provider) => provider.assess(&command, &vehicle).await.ok(),
            None => None,
        };

        let result = self.engine.decide(&EngineInput {
            crypto: &verdict,
            replay,
            rate,
            authorization,
            intent,
            vehicle: &vehicle,
        });

        let forward = match result.decision {
            Decision::Accept => encode_forward(&command),
            Decision::Constrain => encode_forward(&self.clamp(&command)),
            Decision::Hold | Decision::Rtl | Decision::Block => None,
        };

        PipelineOutcome {
            record: AuditRecord::decided(
                command.command_type,
                command.source,
                verdict,
                result,
                quarantined,
            ),
            forward,
        }
    }

    async fn run_replay(&self, command: &Command, verdict: CryptoVerdict) -> DetectorOutcome {
        let guard = Arc::clone(&self.replay);
        let command = command.clone();
        run_detector(self.detector_budget, "replay guard", move || {
            guard.inspect(&command, &verdict)
        })
        .await
    }

    async fn run_rate(&self, command: &Command, vehicle: VehicleState) -> DetectorOutcome {
        let monitor = Arc::clone(&self.rate);
        let source = command.source.clone();
        run_detector(self.detector_budget, "rate monitor", move || {
            monitor.observe(&source, &vehicle)
        })
        .await
    }

    async fn run_authorization(&self, command: &Command, vehicle: VehicleState) -> DetectorOutcome {
        let gate = Arc::clone(&self.authorization);
        let command = command.clone();
        run_detector(self.detector_budget, "authorization gate", move || {
            gate.authorize(&command, &vehicle)
        })
        .await
    }

    /// Copy of the command with every bounded parameter clamped into range.
    fn clamp(&self, command: &Command) -> Command {
        let Some(ranges) = self.bounds.get(&command.command_type) else {
            return command.clone();
        };
        let mut clamped = command.clone();
        clamped.params = command
            .params
            .iter()
            .map(|param| match ranges.get(&param.name) {
                Some(range) => Param::new(param.name.clone(), range.clamp(param.value)),
                None => param.clone(),
            })
            .collect();
        clamped
    }

    fn source_lock(&self, source: &SourceId) -> Arc<Mutex<()>> {
        let mut locks = self.source_locks.lock();
        if !locks.contains_key(source) && locks.len() >= MAX_SOURCES {
            // Same stalest-eviction policy as the detector source maps.
            let stalest = locks
                .iter()
                .min_by_key(|(_, (_, last_used))| *last_used)
                .map(|(key, _)| key.clone());
            if let Some(key) = stalest {
                locks.remove(&key);
            }
        }
        let entry = locks
            .entry(source.clone())
            .or_insert_with(|| (Arc::new(Mutex::new(())), Instant::now()));
        entry.1 = Instant::now();
        Arc::clone(&entry.0)
    }
}

/// Run one sync detector off the async runtime under the wall-clock budget.
async fn run_detector<F>(budget: Duration, name: &'static str, f: F) -> DetectorOutcome
where
    F: FnOnce() -> DetectionResult + Send + 'static,
{
    match tokio::time::timeout(budget, tokio::task::spawn_blocking(f)).await {
        Ok(Ok(result)) => DetectorOutcome::Ran(result),
        Ok(Err(join_error)) => {
            tracing::error!(detector = name, error = %join_error, "detector task failed");
            DetectorOutcome::Unavailable(name)
        }
        Err(_) => {
            tracing::warn!(detector = name, "detector exceeded its budget");
            DetectorOutcome::Unavailable(name)
        }
    }
}

fn verdict_for(error: &CryptoError) -> CryptoVerdict {
    match error {
        CryptoError::ReplayedNonce => CryptoVerdict::ReplayedNonce,
        CryptoError::NoActiveKey => CryptoVerdict::NoActiveKey,
        CryptoError::StaleTimestamp { skew_seconds } => CryptoVerdict::StaleTimestamp {
            skew_seconds: *skew_seconds,
        },
        CryptoError::TimestampInFuture { skew_seconds } => CryptoVerdict::TimestampInFuture {
            skew_seconds: *skew_seconds,
        },
        _ => CryptoVerdict::AuthenticationFailed,
    }
}

fn encode_forward(command: &Command) -> Option<Vec<u8>> {
    match bincode::serialize(command) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode forward payload");
            None
        }
    }
}

fn rejected(verdict: CryptoVerdict, reason: String, quarantined: bool) -> PipelineOutcome {
    let started = Instant::now();
    PipelineOutcome {
        record: AuditRecord::rejected(
            verdict,
            DecisionResult {
                decision: Decision::Block,
                severity: Severity::Critical,
                confidence: 1.0,
                risk_score: 1.0,
                reasons: vec![reason],
                processing_time: started.elapsed(),
            },
            quarantined,
        ),
        forward: None,
    }
}

fn quarantine_forward(command: Command, verdict: CryptoVerdict) -> PipelineOutcome {
    let started = Instant::now();
    let forward = encode_forward(&command);
    PipelineOutcome {
        record: AuditRecord::decided(
            command.command_type,
            command.source,
            verdict,
            DecisionResult {
                decision: Decision::Accept,
                severity: Severity::Low,
                confidence: 1.0,
                risk_score: 0.0,
                reasons: vec![format!(
                    "quarantine: fail-safe {} forwarded without detector analysis",
                    command.command_type
                )],
                processing_time: started.elapsed(),
            },
            true,
        ),
        forward,
    }
}

fn quarantine_block(command: Command, verdict: CryptoVerdict) -> PipelineOutcome {
    let started = Instant::now();
    PipelineOutcome {
        record: AuditRecord::decided(
            command.command_type,
            command.source,
            verdict,
            DecisionResult {
                decision: Decision::Block,
                severity: Severity::High,
                confidence: 1.0,
                risk_score: 1.0,
                reasons: vec![format!(
                    "quarantine: {} is not a fail-safe command",
                    command.command_type
                )],
                processing_time: started.elapsed(),
            },
            true,
        ),
        forward: None,
    }
}
