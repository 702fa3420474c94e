//! # Command-Path Scenarios
//!
//! Each scenario drives a sealed datagram through the full pipeline the way
//! the socket loop would: envelope bytes in, decision and audit record out.

#[cfg(test)]
mod tests {
    use gateway_runtime::{GatewayRuntime, TracingAuditSink};
    use gw_01_crypto_gate::adapters::MemoryRootKeyStore;
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

    fn arm() -> Command {
        Command::new(CommandType::Arm, SourceId::new("gcs-1"), vec![]).authenticated()
    }

    fn nav(sequence: u64, altitude: f64) -> Command {
        Command::new(
            CommandType::NavWaypoint,
            SourceId::new("gcs-1"),
            vec![Param::new("altitude", altitude)],
        )
        .with_sequence(sequence)
    }

    // Scenario A: a clean arm command on the ground is accepted; replaying
    // the identical datagram is blocked on nonce reuse.
    #[tokio::test]
    async fn test_clean_arm_accepted_then_replay_blocked() {
        let gateway = gateway(VehicleState::grounded());
        let datagram = gateway.gate().seal_command(&arm()).unwrap().to_bytes();

        let first = gateway.pipeline().process(&datagram).await;
        assert_eq!(first.record.result.decision, Decision::Accept);
        assert!(first.forward.is_some());
        let forwarded: Command = bincode::deserialize(&first.forward.unwrap()).unwrap();
        assert_eq!(forwarded.command_type, CommandType::Arm);

        let replayed = gateway.pipeline().process(&datagram).await;
        assert_eq!(replayed.record.crypto_verdict, CryptoVerdict::ReplayedNonce);
        assert_eq!(replayed.record.result.decision, Decision::Block);
        assert!(replayed.forward.is_none());
    }

    // Scenario B: a one-source burst of 60 commands inside a second trips
    // the rate monitor hard enough that forwarding stops.
    #[tokio::test]
    async fn test_command_flood_escalates() {
        let gateway = gateway(VehicleState::in_flight(50.0, 10.0));
        let pipeline = gateway.pipeline();

        let mut last = None;
        for i in 0..60u64 {
            let datagram = gateway
                .gate()
                .seal_command(&nav(i, 30.0 + i as f64 / 10.0))
                .unwrap()
                .to_bytes();
            last = Some(pipeline.process(&datagram).await);
        }

        let last = last.unwrap();
        assert!(
            matches!(
                last.record.result.decision,
                Decision::Hold | Decision::Rtl
            ),
            "expected escalation, got {:?}",
            last.record.result.decision
        );
        assert!(last.record.result.confidence >= 0.9);
        assert!(last.forward.is_none());
        assert!(last
            .record
            .result
            .reasons
            .iter()
            .any(|r| r.contains("burst") || r.contains("sustained")));
    }

    // Scenario C: disarm at altitude is a critical state violation and
    // recalls the airborne vehicle instead of merely dropping the command.
    #[tokio::test]
    async fn test_disarm_in_flight_recalls_vehicle() {
        let gateway = gateway(VehicleState::in_flight(80.0, 12.0));

        let disarm =
            Command::new(CommandType::Disarm, SourceId::new("gcs-1"), vec![]).authenticated();
        let datagram = gateway.gate().seal_command(&disarm).unwrap().to_bytes();

        let outcome = gateway.pipeline().process(&datagram).await;
        assert_eq!(outcome.record.result.decision, Decision::Rtl);
        assert!(outcome.forward.is_none());
        assert!(outcome
            .record
            .result
            .reasons
            .iter()
            .any(|r| r.contains("disarm")));
    }

    // An out-of-bound waypoint altitude is withheld, and the bound that
    // tripped is named in the audit reasons.
    #[tokio::test]
    async fn test_overlimit_altitude_withheld() {
        let gateway = gateway(VehicleState::in_flight(50.0, 10.0));
        let datagram = gateway
            .gate()
            .seal_command(&nav(1, 500.0))
            .unwrap()
            .to_bytes();

        let outcome = gateway.pipeline().process(&datagram).await;
        assert_eq!(outcome.record.result.decision, Decision::Hold);
        assert!(outcome.forward.is_none());
        assert!(outcome
            .record
            .result
            .reasons
            .iter()
            .any(|r| r.contains("altitude")));
    }

    // Garbage datagrams never produce anything but an authenticated-failure
    // block, and never reach the detectors.
    #[tokio::test]
    async fn test_garbage_datagram_blocked() {
        let gateway = gateway(VehicleState::grounded());

        let outcome = gateway.pipeline().process(&[0xAB; 64]).await;
        assert_eq!(
            outcome.record.crypto_verdict,
            CryptoVerdict::AuthenticationFailed
        );
        assert_eq!(outcome.record.result.decision, Decision::Block);
        assert!(outcome.record.command_type.is_none());
    }

    // A bit-flipped ciphertext fails the AEAD tag.
    #[tokio::test]
    async fn test_tampered_datagram_blocked() {
        let gateway = gateway(VehicleState::grounded());
        let mut datagram = gateway.gate().seal_command(&arm()).unwrap().to_bytes();
        let last = datagram.len() - 1;
        datagram[last] ^= 0x01;

        let outcome = gateway.pipeline().process(&datagram).await;
        assert_eq!(
            outcome.record.crypto_verdict,
            CryptoVerdict::AuthenticationFailed
        );
        assert_eq!(outcome.record.result.decision, Decision::Block);
    }

    // A stale embedded timestamp is not a hard failure: the command decodes,
    // the replay guard weighs the skew, and the result is a constrained
    // forward rather than a block.
    #[tokio::test]
    async fn test_stale_timestamp_degrades_not_blocks() {
        let gateway = gateway(VehicleState::in_flight(50.0, 10.0));
        let mut command = nav(1, 40.0);
        command.timestamp -= 600;
        let datagram = gateway.gate().seal_command(&command).unwrap().to_bytes();

        let outcome = gateway.pipeline().process(&datagram).await;
        assert!(matches!(
            outcome.record.crypto_verdict,
            CryptoVerdict::StaleTimestamp { .. }
        ));
        assert_eq!(outcome.record.result.decision, Decision::Constrain);
        assert!(outcome.forward.is_some());
    }
}
