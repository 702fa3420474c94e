//! # Command Entities
//!
//! The structured command as it exists after decryption and decoding.
//! A `Command` is immutable once decoded; the gateway never mutates it in
//! place (constrained forwarding produces a clamped copy).

use serde::{Deserialize, Serialize};

/// Maximum number of numeric parameters a command may carry.
pub const MAX_COMMAND_PARAMS: usize = 7;

/// The enumerated command vocabulary understood by the gateway.
///
/// These map to the command classes of the underlying wire protocol; the
/// gateway treats the protocol-level encoding as opaque and only sees the
/// decoded class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandType {
    /// Arm the motors.
    Arm,
    /// Disarm the motors.
    Disarm,
    /// Begin takeoff to a target altitude.
    Takeoff,
    /// Land at the current position.
    Land,
    /// Return to the launch point.
    ReturnToLaunch,
    /// Change the flight mode.
    SetMode,
    /// Navigate to a waypoint.
    NavWaypoint,
    /// Upload a mission item.
    MissionUpload,
    /// Set a vehicle parameter.
    ParamSet,
    /// Request a telemetry stream.
    TelemetryRequest,
}

impl CommandType {
    /// Commands that can alter the vehicle's safety posture.
    ///
    /// These require the sender to carry the authorization flag; issuing them
    /// without it is treated as a privilege-escalation attempt.
    #[must_use]
    pub fn is_critical(self) -> bool {
        matches!(
            self,
            CommandType::Arm | CommandType::Disarm | CommandType::SetMode | CommandType::ParamSet
        )
    }

    /// Commands that remain forwardable while the gateway is quarantined.
    ///
    /// After key revocation only commands that move the vehicle toward a safe
    /// state may pass: return, land, and disarm. While quarantined these skip
    /// detector analysis so a recall cannot be withheld.
    #[must_use]
    pub fn is_failsafe(self) -> bool {
        matches!(
            self,
            CommandType::ReturnToLaunch | CommandType::Land | CommandType::Disarm
        )
    }
}

impl std::fmt::Display for CommandType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Identity of a command source (ground station, companion computer, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceId(pub String);

impl SourceId {
    /// Create a source identity from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identity as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named numeric parameter (altitude, velocity, latitude, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    /// Parameter name, matched against the configured bounds table.
    pub name: String,
    /// Parameter value.
    pub value: f64,
}

impl Param {
    /// Create a named parameter.
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// A decoded command as seen by the detectors and the decision engine.
///
/// Produced exactly once per datagram by the crypto gate; immutable afterward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// The command class.
    pub command_type: CommandType,
    /// Identity of the sender.
    pub source: SourceId,
    /// Numeric parameters, at most [`MAX_COMMAND_PARAMS`].
    pub params: Vec<Param>,
    /// Sender-side Unix timestamp in seconds.
    pub timestamp: u64,
    /// Per-source counter, expected to increase with each command. The
    /// replay guard flags a value at or below the highest already seen;
    /// zero marks a sender that does not use sequencing.
    pub sequence: u64,
    /// Whether the sender presented the authorization flag for critical
    /// commands. Set by the decoding layer from the authenticated envelope.
    pub authenticated_source: bool,
}

impl Command {
    /// Build a command with the current wall-clock timestamp.
    #[must_use]
    pub fn new(command_type: CommandType, source: SourceId, params: Vec<Param>) -> Self {
        Self {
            command_type,
            source,
            params,
            timestamp: crate::current_timestamp(),
            sequence: 0,
            authenticated_source: false,
        }
    }

    /// Mark the command as carrying the critical-command authorization flag.
    #[must_use]
    pub fn authenticated(mut self) -> Self {
        self.authenticated_source = true;
        self
    }

    /// Set the per-source sequence number.
    #[must_use]
    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    /// Look up a parameter by name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<f64> {
        self.params.iter().find(|p| p.name == name).map(|p| p.value)
    }

    /// Structural validity check performed at decode time.
    ///
    /// Rejects oversized parameter lists and non-finite values before any
    /// detector sees the command.
    pub fn validate_shape(&self) -> Result<(), crate::errors::DetectionError> {
        if self.params.len() > MAX_COMMAND_PARAMS {
            return Err(crate::errors::DetectionError::MalformedCommand {
                reason: format!(
                    "too many parameters: {} (max {})",
                    self.params.len(),
                    MAX_COMMAND_PARAMS
                ),
            });
        }
        if let Some(p) = self.params.iter().find(|p| !p.value.is_finite()) {
            return Err(crate::errors::DetectionError::MalformedCommand {
                reason: format!("non-finite value for parameter '{}'", p.name),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_command() -> Command {
        Command {
            command_type: CommandType::NavWaypoint,
            source: SourceId::new("gcs-1"),
            params: vec![Param::new("altitude", 50.0), Param::new("velocity", 10.0)],
            timestamp: 1_700_000_000,
            sequence: 7,
            authenticated_source: true,
        }
    }

    #[test]
    fn test_critical_command_classification() {
        assert!(CommandType::Arm.is_critical());
        assert!(CommandType::Disarm.is_critical());
        assert!(CommandType::SetMode.is_critical());
        assert!(CommandType::ParamSet.is_critical());
        assert!(!CommandType::NavWaypoint.is_critical());
        assert!(!CommandType::TelemetryRequest.is_critical());
    }

    #[test]
    fn test_failsafe_command_classification() {
        assert!(CommandType::ReturnToLaunch.is_failsafe());
        assert!(CommandType::Land.is_failsafe());
        assert!(CommandType::Disarm.is_failsafe());
        assert!(!CommandType::Takeoff.is_failsafe());
        assert!(!CommandType::Arm.is_failsafe());
    }

    #[test]
    fn test_param_lookup() {
        let cmd = sample_command();
        assert_eq!(cmd.param("altitude"), Some(50.0));
        assert_eq!(cmd.param("latitude"), None);
    }

    #[test]
    fn test_validate_shape_rejects_oversized_params() {
        let mut cmd = sample_command();
        cmd.params = (0..8).map(|i| Param::new(format!("p{i}"), 0.0)).collect();
        assert!(cmd.validate_shape().is_err());
    }

    #[test]
    fn test_validate_shape_rejects_non_finite() {
        let mut cmd = sample_command();
        cmd.params = vec![Param::new("altitude", f64::NAN)];
        assert!(cmd.validate_shape().is_err());
    }

    #[test]
    fn test_validate_shape_accepts_well_formed() {
        assert!(sample_command().validate_shape().is_ok());
    }
}
