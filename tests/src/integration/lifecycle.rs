//! # Key Lifecycle and Quarantine
//!
//! End-to-end rotation, revocation, and recovery flows, driven through the
//! same pipeline the socket loop uses.

#[cfg(test)]
mod tests {
    use gateway_runtime::{GatewayRuntime, TracingAuditSink};
    use gw_01_crypto_gate::adapters::MemoryRootKeyStore;
    use gw_01_crypto_gate::{RotationReason, SessionKeyState};
    use shared_types::{
        Command, CommandType, CryptoVerdict, Decision, GatewayConfig, Param, SourceId,
        StaticStateProvider, VehicleState,
    };
    use std::sync::Arc;

    fn gateway(state: VehicleState) -> GatewayRuntime<MemoryRootKeyStore> {
        GatewayRuntime::with_store(
            MemoryRootKeyStore::new(),
            GatewayConfig::default(),
            Arc::new(StaticStateProvider::new(state)),
            None,
            Arc::new(TracingAuditSink),
        )
        .unwrap()
    }

    fn nav(sequence: u64, altitude: f64) -> Command {
        Command::new(
            CommandType::NavWaypoint,
            SourceId::new("gcs-1"),
            vec![Param::new("altitude", altitude)],
        )
        .with_sequence(sequence)
    }

    // A datagram sealed before a manual rotation still decrypts during the
    // grace window and flows through to an accept.
    #[tokio::test]
    async fn test_rotation_keeps_inflight_traffic_alive() {
        let gateway = gateway(VehicleState::in_flight(50.0, 10.0));
        let datagram = gateway.gate().seal_command(&nav(1, 60.0)).unwrap().to_bytes();

        gateway.handle().rotate().unwrap();

        let outcome = gateway.pipeline().process(&datagram).await;
        assert_eq!(outcome.record.crypto_verdict, CryptoVerdict::Passed);
        assert_eq!(outcome.record.result.decision, Decision::Accept);
    }

    // Enough seal/open traffic trips the per-session command ceiling without
    // anyone asking for a rotation. Both the fresh active key and the demoted
    // grace key are visible in the status afterward.
    #[test]
    fn test_command_volume_rotates_automatically() {
        let gateway = gateway(VehicleState::in_flight(50.0, 10.0));
        let gate = gateway.gate();
        let grace_window = GatewayConfig::default().grace_period_seconds;

        // Each cycle counts the key twice (seal and open), so 510 cycles
        // comfortably pass the default 1000-command ceiling.
        for i in 0..510u64 {
            let wire = gate.seal_command(&nav(i, 40.0 + i as f64)).unwrap();
            gate.open_envelope(&wire.nonce, &wire.ciphertext).unwrap();
        }

        let status = gate.key_status();
        assert_eq!(status.len(), 2);
        assert_eq!(status[0].state, SessionKeyState::Active);
        assert!(status[0].epoch > status[1].epoch);
        assert_eq!(status[1].state, SessionKeyState::Grace);
        assert!(status[1].time_to_expiry_seconds <= grace_window);
    }

    #[test]
    fn test_manual_rotation_changes_epoch() {
        let gateway = gateway(VehicleState::grounded());
        let gate = gateway.gate();
        let before = gate.key_status()[0].epoch;

        gate.rotate(RotationReason::Manual).unwrap();

        let status = gate.key_status();
        assert_eq!(status[0].epoch, before + 1);
        assert_eq!(status[1].state, SessionKeyState::Grace);
    }

    // Revocation destroys the keys and raises quarantine: traffic sealed
    // before the revoke comes back as a missing-key block.
    #[tokio::test]
    async fn test_revoke_blocks_all_traffic() {
        let gateway = gateway(VehicleState::in_flight(50.0, 10.0));
        let datagram = gateway.gate().seal_command(&nav(1, 60.0)).unwrap().to_bytes();

        gateway.handle().revoke("suspected key compromise");
        assert!(gateway.handle().is_quarantined());

        let outcome = gateway.pipeline().process(&datagram).await;
        assert_eq!(outcome.record.crypto_verdict, CryptoVerdict::NoActiveKey);
        assert_eq!(outcome.record.result.decision, Decision::Block);
        assert!(outcome.forward.is_none());
    }

    // Reprovisioning restores decryption under a fresh root, but quarantine
    // stays up: only fail-safe commands pass until the operator clears it.
    #[tokio::test]
    async fn test_reprovision_allows_failsafe_only_until_cleared() {
        let gateway = gateway(VehicleState::in_flight(50.0, 10.0));
        let handle = gateway.handle();

        handle.revoke("suspected key compromise");
        gateway.reprovision().unwrap();
        assert!(handle.is_quarantined());

        let rtl = Command::new(
            CommandType::ReturnToLaunch,
            SourceId::new("gcs-1"),
            vec![],
        );
        let datagram = gateway.gate().seal_command(&rtl).unwrap().to_bytes();
        let outcome = gateway.pipeline().process(&datagram).await;
        assert_eq!(outcome.record.result.decision, Decision::Accept);
        assert!(outcome.forward.is_some());
        assert!(outcome.record.quarantined);

        let datagram = gateway.gate().seal_command(&nav(2, 60.0)).unwrap().to_bytes();
        let outcome = gateway.pipeline().process(&datagram).await;
        assert_eq!(outcome.record.result.decision, Decision::Block);
        assert!(outcome
            .record
            .result
            .reasons
            .iter()
            .any(|r| r.contains("quarantine")));

        handle.exit_quarantine();
        let datagram = gateway.gate().seal_command(&nav(3, 60.0)).unwrap().to_bytes();
        let outcome = gateway.pipeline().process(&datagram).await;
        assert_eq!(outcome.record.result.decision, Decision::Accept);
        assert!(!outcome.record.quarantined);
    }

    // An operator hammering return-to-launch during a quarantine must never
    // trip the rate limiter: fail-safe traffic skips the detectors entirely
    // and every retransmission still reaches the vehicle.
    #[tokio::test]
    async fn test_quarantined_rtl_flood_still_forwarded() {
        let gateway = gateway(VehicleState::in_flight(50.0, 10.0));
        let handle = gateway.handle();

        handle.revoke("suspected key compromise");
        gateway.reprovision().unwrap();
        assert!(handle.is_quarantined());

        let rtl = Command::new(
            CommandType::ReturnToLaunch,
            SourceId::new("gcs-1"),
            vec![],
        );
        let mut last = None;
        for _ in 0..60 {
            let datagram = gateway.gate().seal_command(&rtl).unwrap().to_bytes();
            last = Some(gateway.pipeline().process(&datagram).await);
        }

        let outcome = last.unwrap();
        assert_eq!(outcome.record.result.decision, Decision::Accept);
        assert!(outcome.forward.is_some());
        assert!(outcome.record.quarantined);
    }

    // A high risk report forces a rotation at the next maintenance pass and
    // the trigger does not re-fire once acted on.
    #[test]
    fn test_risk_report_forces_rotation_once() {
        let gateway = gateway(VehicleState::grounded());
        let gate = gateway.gate();

        gateway.handle().report_risk(shared_types::RiskLevel::High);
        assert_eq!(
            gate.maintain().unwrap(),
            Some(RotationReason::RiskEscalation)
        );
        assert_eq!(gate.maintain().unwrap(), None);
    }
}
