//! # SkyGate Gateway
//!
//! The main entry point for the inline command security gateway.
//!
//! ## Startup Sequence
//!
//! 1. Initialize logging (RUST_LOG respected, info default)
//! 2. Load configuration from file/env and validate (fatal on error)
//! 3. Provision the key hierarchy (root key loaded or generated)
//! 4. Bind the UDP listener and run until Ctrl+C
//! 5. Graceful shutdown: stop intake, drain in-flight commands

use anyhow::{Context, Result};
use gateway_runtime::{GatewayRuntime, JsonlAuditSink, TracingAuditSink};
use shared_types::{
    AuditSink, GatewayConfig, IntentRiskProvider, NoopIntentProvider, StaticStateProvider,
    VehicleState,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Load configuration from the first CLI argument or `SKYGATE_CONFIG`,
/// falling back to built-in defaults.
fn load_config() -> Result<GatewayConfig> {
    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("SKYGATE_CONFIG").ok());

    let config = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("cannot read config file {path}"))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("cannot parse config file {path}"))?
        }
        None => {
            warn!("no config file given, using built-in defaults");
            GatewayConfig::default()
        }
    };

    config.validate().context("configuration rejected")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(true)
        .init();

    let config = load_config()?;

    let audit: Arc<dyn AuditSink> = match &config.audit_log_path {
        Some(path) => Arc::new(
            JsonlAuditSink::open(path)
                .await
                .with_context(|| format!("cannot open audit log {path}"))?,
        ),
        None => Arc::new(TracingAuditSink),
    };

    // Stand-in providers until a telemetry feed is wired in. The gateway
    // treats an unknown vehicle as grounded, the most restrictive posture.
    let state_provider = Arc::new(StaticStateProvider::new(VehicleState::grounded()));
    let intent_provider: Arc<dyn IntentRiskProvider> = Arc::new(NoopIntentProvider);

    let runtime = GatewayRuntime::new(config, state_provider, Some(intent_provider), audit)?;
    let handle = runtime.handle();
    for status in handle.key_status() {
        info!(id = %status.id, state = ?status.state, "session key provisioned");
    }

    let signal_handle = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown requested");
            signal_handle.shutdown();
        }
    });

    info!("gateway running, press Ctrl+C to stop");
    runtime.run().await?;
    Ok(())
}
