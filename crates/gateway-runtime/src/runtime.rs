//! # Gateway Runtime
//!
//! Socket loop, worker pool, rotation timer, quarantine flag, and graceful
//! shutdown. One task per datagram, bounded by a semaphore sized to the
//! worker pool; shutdown stops intake and drains in-flight work by
//! reacquiring every permit.

use crate::pipeline::CommandPipeline;
use gw_01_crypto_gate::{
    CryptoGate, CryptoGateService, FsRootKeyStore, KeyStatus, RootKeyStore, RotationReason,
};
use anyhow::{Context, Result};
use shared_types::{AuditSink, CryptoVerdict, GatewayConfig, IntentRiskProvider, RiskLevel,
    VehicleStateProvider};
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::{watch, Semaphore};
use tracing::{error, info, warn};

/// Maintenance tick for rotation triggers and key status logging.
const MAINTENANCE_INTERVAL: std::time::Duration = std::time::Duration::from_secs(30);

/// Control surface over a running gateway.
#[derive(Clone)]
pub struct GatewayHandle {
    gate: Arc<CryptoGate>,
    quarantine: Arc<watch::Sender<bool>>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl GatewayHandle {
    /// Status of the live session keys.
    #[must_use]
    pub fn key_status(&self) -> Vec<KeyStatus> {
        self.gate.key_status()
    }

    /// Operator-requested rotation.
    pub fn rotate(&self) -> Result<()> {
        self.gate
            .rotate(RotationReason::Manual)
            .context("manual rotation failed")
    }

    /// Report an external risk level into the rotation triggers.
    pub fn report_risk(&self, risk: RiskLevel) {
        self.gate.set_risk_level(risk);
    }

    /// Destroy all session keys and enter quarantine.
    pub fn revoke(&self, reason: &str) {
        self.gate.revoke(reason);
        let _ = self.quarantine.send(true);
    }

    /// Leave quarantine after the operator has reprovisioned keys.
    pub fn exit_quarantine(&self) {
        let _ = self.quarantine.send(false);
    }

    /// Whether the gateway is quarantined.
    #[must_use]
    pub fn is_quarantined(&self) -> bool {
        *self.quarantine.subscribe().borrow()
    }

    /// Signal the socket loop to stop and drain.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}

/// The assembled gateway.
pub struct GatewayRuntime<S: RootKeyStore> {
    config: GatewayConfig,
    service: CryptoGateService<S>,
    pipeline: Arc<CommandPipeline>,
    audit: Arc<dyn AuditSink>,
    quarantine: Arc<watch::Sender<bool>>,
    shutdown_tx: Arc<watch::Sender<bool>>,
    shutdown_rx: watch::Receiver<bool>,
    semaphore: Arc<Semaphore>,
}

impl GatewayRuntime<FsRootKeyStore> {
    /// Build a gateway with the file-backed root key store and the given
    /// providers and audit sink.
    pub fn new(
        config: GatewayConfig,
        state_provider: Arc<dyn VehicleStateProvider>,
        intent_provider: Option<Arc<dyn IntentRiskProvider>>,
        audit: Arc<dyn AuditSink>,
    ) -> Result<Self> {
        let store = FsRootKeyStore::new(config.root_key_path.clone());
        Self::with_store(store, config, state_provider, intent_provider, audit)
    }
}

impl<S: RootKeyStore> GatewayRuntime<S> {
    /// Build a gateway over an arbitrary root key store.
    pub fn with_store(
        store: S,
        config: GatewayConfig,
        state_provider: Arc<dyn VehicleStateProvider>,
        intent_provider: Option<Arc<dyn IntentRiskProvider>>,
        audit: Arc<dyn AuditSink>,
    ) -> Result<Self> {
        config.validate().context("invalid configuration")?;

        let service = CryptoGateService::provision(store, config.clone())
            .context("key hierarchy provisioning failed")?;
        let (quarantine_tx, quarantine_rx) = watch::channel(false);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let pipeline = Arc::new(CommandPipeline::new(
            service.gate(),
            &config,
            state_provider,
            intent_provider,
            quarantine_rx,
        ));

        let semaphore = Arc::new(Semaphore::new(config.worker_pool_size));
        Ok(Self {
            config,
            service,
            pipeline,
            audit,
            quarantine: Arc::new(quarantine_tx),
            shutdown_tx: Arc::new(shutdown_tx),
            shutdown_rx,
            semaphore,
        })
    }

    /// The wired pipeline, for driving commands without sockets.
    #[must_use]
    pub fn pipeline(&self) -> Arc<CommandPipeline> {
        Arc::clone(&self.pipeline)
    }

    /// The crypto gate, for sealing traffic toward this gateway.
    #[must_use]
    pub fn gate(&self) -> Arc<CryptoGate> {
        self.service.gate()
    }

    /// Control handle for ops paths.
    #[must_use]
    pub fn handle(&self) -> GatewayHandle {
        GatewayHandle {
            gate: self.service.gate(),
            quarantine: Arc::clone(&self.quarantine),
            shutdown: Arc::clone(&self.shutdown_tx),
        }
    }

    /// Derive fresh keys after a revocation. The quarantine flag stays up
    /// until the operator explicitly exits it.
    pub fn reprovision(&self) -> Result<()> {
        self.service.reprovision().context("reprovisioning failed")
    }

    /// Signal the socket loop to stop and drain.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Run the gateway until shutdown is signalled.
    pub async fn run(&self) -> Result<()> {
        let socket = Arc::new(
            UdpSocket::bind(&self.config.listen_addr)
                .await
                .with_context(|| format!("cannot bind {}", self.config.listen_addr))?,
        );
        let sink = Arc::new(UdpSocket::bind("0.0.0.0:0").await?);
        sink.connect(&self.config.forward_addr)
            .await
            .with_context(|| format!("cannot reach sink {}", self.config.forward_addr))?;

        info!(
            listen = %self.config.listen_addr,
            forward = %self.config.forward_addr,
            workers = self.config.worker_pool_size,
            "gateway listening"
        );

        self.spawn_maintenance();

        let mut shutdown = self.shutdown_rx.clone();
        let mut buf = vec![0u8; 64 * 1024];
        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                received = socket.recv_from(&mut buf) => {
                    let (len, peer) = received.context("socket receive failed")?;
                    let datagram = buf[..len].to_vec();
                    tracing::trace!(%peer, len, "datagram received");
                    self.dispatch(datagram, Arc::clone(&sink)).await;
                }
            }
        }

        // Drain: every permit back means every in-flight command finished.
        let _drained = self
            .semaphore
            .acquire_many(self.config.worker_pool_size as u32)
            .await;
        info!("gateway drained and stopped");
        Ok(())
    }

    async fn dispatch(&self, datagram: Vec<u8>, sink: Arc<UdpSocket>) {
        let Ok(permit) = Arc::clone(&self.semaphore).acquire_owned().await else {
            return;
        };
        let pipeline = Arc::clone(&self.pipeline);
        let audit = Arc::clone(&self.audit);
        let quarantine = Arc::clone(&self.quarantine);

        tokio::spawn(async move {
            let outcome = pipeline.process(&datagram).await;

            // Losing all keys mid-run means a revocation happened elsewhere;
            // fall into quarantine rather than serving partial security.
            if outcome.record.crypto_verdict == CryptoVerdict::NoActiveKey {
                let _ = quarantine.send(true);
            }

            if let Some(payload) = &outcome.forward {
                if let Err(e) = sink.send(payload).await {
                    error!(error = %e, "forward to sink failed");
                }
            }
            if let Err(e) = audit.record(&outcome.record).await {
                warn!(error = %e, "audit record dropped");
            }
            drop(permit);
        });
    }

    fn spawn_maintenance(&self) {
        let gate = self.service.gate();
        let mut shutdown = self.shutdown_rx.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(MAINTENANCE_INTERVAL);
            loop {
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = ticker.tick() => {
                        match gate.maintain() {
                            Ok(Some(reason)) => info!(reason = ?reason, "timer-driven rotation"),
                            Ok(None) => {}
                            Err(e) => error!(error = %e, "maintenance failed"),
                        }
                        for status in gate.key_status() {
                            tracing::debug!(
                                id = %status.id,
                                state = ?status.state,
                                tte = status.time_to_expiry_seconds,
                                commands = status.command_count,
                                "key status"
                            );
                        }
                    }
                }
            }
        });
    }
}
