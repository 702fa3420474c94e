//! # Gateway Configuration
//!
//! Strongly-typed configuration validated once at startup. Unknown options
//! and out-of-range values are rejected rather than silently defaulted.

use crate::command::CommandType;
use crate::errors::ConfigError;
use crate::vehicle::FlightPhase;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Inclusive numeric range for one command parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamRange {
    /// Minimum allowed value.
    pub min: f64,
    /// Maximum allowed value.
    pub max: f64,
}

impl ParamRange {
    /// Create a range; callers must keep `min <= max` (checked by
    /// [`GatewayConfig::validate`]).
    #[must_use]
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Whether `value` falls inside the range.
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Clamp `value` into the range (used by constrained forwarding).
    #[must_use]
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

/// The recognized configuration surface of the gateway.
///
/// Every field has a working default; `deny_unknown_fields` makes typos in a
/// config file a startup failure instead of a silently ignored option.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct GatewayConfig {
    /// Session key lifetime before time-based rotation (seconds).
    pub session_key_lifetime_seconds: u64,
    /// Command count before count-based rotation.
    pub max_commands_per_session: u64,
    /// Overlap window during which the previous key still decrypts (seconds).
    pub grace_period_seconds: u64,
    /// Root key lifetime (seconds). Expiry is surfaced in key status, not
    /// enforced by automatic destruction.
    pub root_key_lifetime_seconds: u64,
    /// Tolerated clock skew for embedded command timestamps (seconds).
    pub replay_tolerance_seconds: u64,
    /// Sustained command rate treated as a flood (commands/second).
    pub dos_sustained_threshold: f64,
    /// Commands within one second treated as a burst.
    pub dos_burst_threshold: u32,
    /// Rate below which the monitor never flags (commands/second).
    pub dos_normal_floor: f64,
    /// Maximum nonces remembered per session (oldest evicted first).
    pub nonce_ledger_capacity: usize,
    /// Per-flight-phase command whitelist.
    pub authorization_table: HashMap<FlightPhase, Vec<CommandType>>,
    /// Per-command-type parameter bounds.
    pub parameter_bounds: HashMap<CommandType, HashMap<String, ParamRange>>,
    /// Sliding window of recent command digests kept per source.
    pub replay_window_per_source: usize,
    /// Wall-clock budget for each detector before it is treated as
    /// unavailable (milliseconds).
    pub detector_budget_ms: u64,
    /// Maximum commands processed concurrently.
    pub worker_pool_size: usize,
    /// UDP address the gateway listens on.
    pub listen_addr: String,
    /// UDP address of the trusted sink (flight controller).
    pub forward_addr: String,
    /// Path for durable root key storage.
    pub root_key_path: String,
    /// Optional JSONL audit log path; audit records go to the structured log
    /// stream when unset.
    pub audit_log_path: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            session_key_lifetime_seconds: 1800,
            max_commands_per_session: 1000,
            grace_period_seconds: 300,
            root_key_lifetime_seconds: 31_536_000,
            replay_tolerance_seconds: 30,
            dos_sustained_threshold: 20.0,
            dos_burst_threshold: 50,
            dos_normal_floor: 5.0,
            nonce_ledger_capacity: 10_000,
            authorization_table: default_authorization_table(),
            parameter_bounds: default_parameter_bounds(),
            replay_window_per_source: 7,
            detector_budget_ms: 25,
            worker_pool_size: 8,
            listen_addr: "0.0.0.0:14560".to_string(),
            forward_addr: "127.0.0.1:14550".to_string(),
            root_key_path: "keys/root_key.bin".to_string(),
            audit_log_path: None,
        }
    }
}

impl GatewayConfig {
    /// Validate all options. Any failure here is fatal at startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session_key_lifetime_seconds == 0 {
            return Err(ConfigError::InvalidBound {
                option: "session_key_lifetime_seconds".into(),
                reason: "must be positive".into(),
            });
        }
        if self.max_commands_per_session == 0 {
            return Err(ConfigError::InvalidBound {
                option: "max_commands_per_session".into(),
                reason: "must be positive".into(),
            });
        }
        if self.grace_period_seconds == 0
            || self.grace_period_seconds >= self.session_key_lifetime_seconds
        {
            return Err(ConfigError::InvalidBound {
                option: "grace_period_seconds".into(),
                reason: "must be positive and shorter than the session lifetime".into(),
            });
        }
        if self.replay_tolerance_seconds == 0 {
            return Err(ConfigError::InvalidBound {
                option: "replay_tolerance_seconds".into(),
                reason: "must be positive".into(),
            });
        }
        if self.dos_normal_floor < 0.0 || self.dos_sustained_threshold <= self.dos_normal_floor {
            return Err(ConfigError::InvalidBound {
                option: "dos_sustained_threshold".into(),
                reason: "must exceed dos_normal_floor".into(),
            });
        }
        if f64::from(self.dos_burst_threshold) <= self.dos_sustained_threshold {
            return Err(ConfigError::InvalidBound {
                option: "dos_burst_threshold".into(),
                reason: "must exceed dos_sustained_threshold".into(),
            });
        }
        if self.nonce_ledger_capacity == 0 {
            return Err(ConfigError::InvalidBound {
                option: "nonce_ledger_capacity".into(),
                reason: "must be positive".into(),
            });
        }
        if self.replay_window_per_source == 0 || self.replay_window_per_source > 64 {
            return Err(ConfigError::InvalidBound {
                option: "replay_window_per_source".into(),
                reason: "must be in 1..=64".into(),
            });
        }
        if self.worker_pool_size == 0 {
            return Err(ConfigError::InvalidBound {
                option: "worker_pool_size".into(),
                reason: "must be positive".into(),
            });
        }
        if self.root_key_path.trim().is_empty() {
            return Err(ConfigError::MissingKeyMaterial(
                "root_key_path must name a storage location".into(),
            ));
        }
        if self.authorization_table.is_empty() {
            return Err(ConfigError::InvalidBound {
                option: "authorization_table".into(),
                reason: "must whitelist at least one phase".into(),
            });
        }
        for (cmd, bounds) in &self.parameter_bounds {
            for (name, range) in bounds {
                if !range.min.is_finite() || !range.max.is_finite() || range.min > range.max {
                    return Err(ConfigError::InvalidBound {
                        option: format!("parameter_bounds.{cmd}.{name}"),
                        reason: format!("invalid range [{}, {}]", range.min, range.max),
                    });
                }
            }
        }
        Ok(())
    }

    /// Detector budget as a [`Duration`].
    #[must_use]
    pub fn detector_budget(&self) -> Duration {
        Duration::from_millis(self.detector_budget_ms)
    }

    /// Grace period as a [`Duration`].
    #[must_use]
    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_seconds)
    }

    /// Session key lifetime as a [`Duration`].
    #[must_use]
    pub fn session_key_lifetime(&self) -> Duration {
        Duration::from_secs(self.session_key_lifetime_seconds)
    }
}

/// Default per-phase command whitelist.
///
/// Mirrors normal operating doctrine: arming and configuration on the ground,
/// navigation and mode changes in the air, and only landing-adjacent commands
/// while landing. Emergency phase accepts fail-safe commands only.
fn default_authorization_table() -> HashMap<FlightPhase, Vec<CommandType>> {
    use CommandType::*;
    let mut table = HashMap::new();
    table.insert(
        FlightPhase::Grounded,
        vec![Arm, SetMode, ParamSet, MissionUpload, TelemetryRequest],
    );
    table.insert(
        FlightPhase::ArmedGround,
        vec![Arm, Disarm, Takeoff, SetMode, TelemetryRequest],
    );
    table.insert(
        FlightPhase::TakingOff,
        vec![NavWaypoint, SetMode, ReturnToLaunch, Land, TelemetryRequest],
    );
    table.insert(
        FlightPhase::InFlight,
        vec![
            NavWaypoint,
            SetMode,
            Land,
            ReturnToLaunch,
            MissionUpload,
            TelemetryRequest,
        ],
    );
    table.insert(
        FlightPhase::Landing,
        vec![NavWaypoint, Land, ReturnToLaunch, TelemetryRequest],
    );
    table.insert(
        FlightPhase::Emergency,
        vec![ReturnToLaunch, Land, Disarm, TelemetryRequest],
    );
    table
}

/// Default per-command parameter bounds.
///
/// Altitude capped at 150 units (regulatory ceiling plus margin), velocity at
/// 25 units, coordinates at their valid geographic range.
fn default_parameter_bounds() -> HashMap<CommandType, HashMap<String, ParamRange>> {
    use CommandType::*;
    let geo: Vec<(&str, ParamRange)> = vec![
        ("altitude", ParamRange::new(0.0, 150.0)),
        ("velocity", ParamRange::new(0.0, 25.0)),
        ("latitude", ParamRange::new(-90.0, 90.0)),
        ("longitude", ParamRange::new(-180.0, 180.0)),
        ("yaw", ParamRange::new(-180.0, 180.0)),
    ];
    let to_map = |pairs: &[(&str, ParamRange)]| {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), *v))
            .collect::<HashMap<_, _>>()
    };

    let mut bounds = HashMap::new();
    bounds.insert(NavWaypoint, to_map(&geo));
    bounds.insert(MissionUpload, to_map(&geo));
    bounds.insert(
        Takeoff,
        to_map(&[("altitude", ParamRange::new(0.0, 150.0))]),
    );
    bounds.insert(
        Land,
        to_map(&[("velocity", ParamRange::new(0.0, 5.0))]),
    );
    bounds
}
