//! # Authorization Gate
//!
//! Ordered rule set over a decrypted command and the current vehicle state.
//! The first Critical finding short-circuits: a disarm at altitude needs no
//! further analysis. Lesser findings accumulate so the audit record names
//! every violated rule.
//!
//! Rule order: airborne safety invariants, phase whitelist, parameter
//! bounds, contextual sanity, privilege.

use shared_types::{
    Command, CommandType, DetectionResult, FlightPhase, GatewayConfig, MissionPhase, ParamRange,
    Severity, VehicleState,
};
use std::collections::{HashMap, HashSet};
use std::time::Instant;

/// Confidence for hard state violations (disarm in flight, privilege abuse).
const CRITICAL_CONFIDENCE: f64 = 0.95;
/// Confidence for context violations and off-whitelist commands.
const CONTEXT_CONFIDENCE: f64 = 0.85;
/// Confidence for out-of-bound parameters.
const BOUNDS_CONFIDENCE: f64 = 0.80;

/// Phase whitelist plus parameter bounds checker.
pub struct AuthorizationGate {
    table: HashMap<FlightPhase, HashSet<CommandType>>,
    bounds: HashMap<CommandType, HashMap<String, ParamRange>>,
}

impl AuthorizationGate {
    /// Build the gate from validated configuration.
    #[must_use]
    pub fn from_config(config: &GatewayConfig) -> Self {
        let table = config
            .authorization_table
            .iter()
            .map(|(phase, commands)| (*phase, commands.iter().copied().collect()))
            .collect();
        Self {
            table,
            bounds: config.parameter_bounds.clone(),
        }
    }

    /// Score one command against the vehicle state.
    pub fn authorize(&self, command: &Command, vehicle: &VehicleState) -> DetectionResult {
        let started = Instant::now();
        let mut confidence: f64 = 0.0;
        let mut severity = Severity::Low;
        let mut reasons: Vec<String> = Vec::new();

        // Airborne safety invariants come first and are terminal.
        if let Some(reason) = airborne_violation(command, vehicle) {
            return DetectionResult::flagged(
                CRITICAL_CONFIDENCE,
                Severity::Critical,
                reason,
                started.elapsed(),
            );
        }

        if !self.is_whitelisted(command.command_type, vehicle.phase) {
            confidence = confidence.max(CONTEXT_CONFIDENCE);
            severity = severity.max(Severity::High);
            reasons.push(format!(
                "{} not permitted while {:?}",
                command.command_type, vehicle.phase
            ));
        }

        for violation in self.bound_violations(command) {
            confidence = confidence.max(BOUNDS_CONFIDENCE);
            severity = severity.max(Severity::High);
            reasons.push(violation);
        }

        if let Some(reason) = context_violation(command, vehicle) {
            confidence = confidence.max(CONTEXT_CONFIDENCE);
            severity = severity.max(Severity::High);
            reasons.push(reason);
        }

        if command.command_type.is_critical() && !command.authenticated_source {
            // Privilege escalation attempt: critical command without the
            // authorization flag.
            return DetectionResult::flagged(
                CRITICAL_CONFIDENCE,
                Severity::Critical,
                format!(
                    "{} issued without critical-command authorization",
                    command.command_type
                ),
                started.elapsed(),
            );
        }

        if reasons.is_empty() {
            DetectionResult::clear("authorized for current state", started.elapsed())
        } else {
            tracing::debug!(
                command = %command.command_type,
                phase = ?vehicle.phase,
                "authorization violations: {}",
                reasons.join("; ")
            );
            DetectionResult::flagged(confidence, severity, reasons.join("; "), started.elapsed())
        }
    }

    fn is_whitelisted(&self, command: CommandType, phase: FlightPhase) -> bool {
        self.table
            .get(&phase)
            .map(|allowed| allowed.contains(&command))
            .unwrap_or(false)
    }

    fn bound_violations(&self, command: &Command) -> Vec<String> {
        let Some(ranges) = self.bounds.get(&command.command_type) else {
            return Vec::new();
        };
        command
            .params
            .iter()
            .filter_map(|param| {
                let range = ranges.get(&param.name)?;
                (!range.contains(param.value)).then(|| {
                    format!(
                        "{}={} outside [{}, {}]",
                        param.name, param.value, range.min, range.max
                    )
                })
            })
            .collect()
    }
}

fn airborne_violation(command: &Command, vehicle: &VehicleState) -> Option<String> {
    if !vehicle.is_airborne() {
        return None;
    }
    match command.command_type {
        CommandType::Disarm => Some(format!(
            "disarm at {:.0}m altitude would cut motors in flight",
            vehicle.altitude
        )),
        CommandType::Takeoff => Some("takeoff commanded while already airborne".to_string()),
        CommandType::Arm => Some("arm commanded while airborne".to_string()),
        _ => None,
    }
}

fn context_violation(command: &Command, vehicle: &VehicleState) -> Option<String> {
    match command.command_type {
        CommandType::SetMode if vehicle.phase == FlightPhase::Landing => {
            Some("mode change during landing sequence".to_string())
        }
        CommandType::MissionUpload if vehicle.mission == MissionPhase::Active => {
            Some("mission upload while a mission is executing".to_string())
        }
        _ => None,
    }
}
