//! # Vehicle State Snapshot
//!
//! The externally maintained view of the vehicle that detectors read.
//! The gateway never mutates vehicle state; a telemetry collaborator owns it
//! and publishes snapshots through [`crate::providers::VehicleStateProvider`].

use serde::{Deserialize, Serialize};

/// Flight phase of the vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlightPhase {
    /// Disarmed on the ground.
    Grounded,
    /// Armed, still on the ground.
    ArmedGround,
    /// Climbing to the initial altitude.
    TakingOff,
    /// Airborne and operating normally.
    InFlight,
    /// Descending to land.
    Landing,
    /// Emergency handling in progress.
    Emergency,
}

/// Mission phase, used by the rate monitor to raise thresholds during
/// phases that legitimately burst (mission upload).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissionPhase {
    /// No mission activity.
    Idle,
    /// Mission items being uploaded; command rate legitimately spikes.
    MissionUpload,
    /// Mission executing.
    Active,
}

/// Read-only snapshot of vehicle state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VehicleState {
    /// Current flight phase.
    pub phase: FlightPhase,
    /// Whether motors are armed.
    pub armed: bool,
    /// Altitude above launch, in the protocol's altitude units.
    pub altitude: f64,
    /// Ground speed in the protocol's velocity units.
    pub velocity: f64,
    /// Remaining battery fraction in [0, 1].
    pub battery: f64,
    /// Current mission phase.
    pub mission: MissionPhase,
}

impl VehicleState {
    /// Whether the vehicle is off the ground.
    ///
    /// Airborne vehicles fail safe via return-to-launch rather than a hard
    /// block, since blocking alone leaves an unresponsive aircraft in the air.
    #[must_use]
    pub fn is_airborne(&self) -> bool {
        matches!(
            self.phase,
            FlightPhase::TakingOff | FlightPhase::InFlight | FlightPhase::Landing
        )
    }

    /// A disarmed, grounded vehicle with full battery.
    #[must_use]
    pub fn grounded() -> Self {
        Self {
            phase: FlightPhase::Grounded,
            armed: false,
            altitude: 0.0,
            velocity: 0.0,
            battery: 1.0,
            mission: MissionPhase::Idle,
        }
    }

    /// An armed vehicle in normal flight.
    #[must_use]
    pub fn in_flight(altitude: f64, velocity: f64) -> Self {
        Self {
            phase: FlightPhase::InFlight,
            armed: true,
            altitude,
            velocity,
            battery: 0.8,
            mission: MissionPhase::Active,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_airborne_phases() {
        assert!(VehicleState::in_flight(50.0, 10.0).is_airborne());
        assert!(!VehicleState::grounded().is_airborne());

        let mut state = VehicleState::grounded();
        state.phase = FlightPhase::Landing;
        assert!(state.is_airborne());

        state.phase = FlightPhase::ArmedGround;
        assert!(!state.is_airborne());
    }
}
