//! # Crypto Gate
//!
//! The per-datagram decryption pipeline. Order matters:
//!
//! 1. AEAD verify under active then grace key
//! 2. Nonce ledger check-and-insert
//! 3. Command decode and shape validation
//! 4. Timestamp freshness
//!
//! Only an authenticated nonce is ever recorded in the ledger, so an attacker
//! cannot poison it with garbage datagrams. Timestamp skew is not terminal
//! here: the decoded command is surfaced together with its skew verdict so
//! downstream replay analysis can weigh it instead of silently dropping it.

use crate::domain::keys::{KeyHierarchy, RotationReason};
use crate::domain::ledger::NonceLedger;
use parking_lot::Mutex;
use shared_crypto::{open, seal, CryptoError, Nonce, SecretKey, NONCE_LEN};
use shared_types::{current_timestamp, Command, CryptoVerdict};

/// One sealed datagram: `[24-byte nonce][ciphertext]`.
#[derive(Debug, Clone)]
pub struct WireMessage {
    /// Envelope nonce, in the clear.
    pub nonce: Nonce,
    /// AEAD ciphertext with embedded tag.
    pub ciphertext: Vec<u8>,
}

impl WireMessage {
    /// Flatten into the on-wire byte layout.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(NONCE_LEN + self.ciphertext.len());
        out.extend_from_slice(self.nonce.as_bytes());
        out.extend_from_slice(&self.ciphertext);
        out
    }
}

/// Split a raw datagram into nonce and ciphertext.
///
/// # Errors
///
/// Returns `CryptoError::MalformedEnvelope` if the datagram is shorter than
/// the nonce header plus a minimal AEAD tag.
pub fn split_envelope(datagram: &[u8]) -> Result<(Nonce, &[u8]), CryptoError> {
    if datagram.len() <= NONCE_LEN {
        return Err(CryptoError::MalformedEnvelope(format!(
            "datagram of {} bytes cannot hold nonce and ciphertext",
            datagram.len()
        )));
    }
    let nonce = Nonce::from_slice(&datagram[..NONCE_LEN])?;
    Ok((nonce, &datagram[NONCE_LEN..]))
}

/// A successfully authenticated and decoded command.
#[derive(Debug, Clone)]
pub struct Opened {
    /// The decoded command.
    pub command: Command,
    /// `Passed`, or a timestamp-skew verdict the replay detector consumes.
    pub verdict: CryptoVerdict,
}

/// The gate owning the key hierarchy and nonce ledger.
pub struct CryptoGate {
    keys: Mutex<KeyHierarchy>,
    ledger: NonceLedger,
    replay_tolerance_seconds: u64,
}

impl CryptoGate {
    /// Wire the gate to a provisioned key hierarchy.
    #[must_use]
    pub fn new(keys: KeyHierarchy, ledger_capacity: usize, replay_tolerance_seconds: u64) -> Self {
        Self {
            keys: Mutex::new(keys),
            ledger: NonceLedger::new(ledger_capacity),
            replay_tolerance_seconds,
        }
    }

    /// Seal a command under the active session key.
    pub fn seal_command(&self, command: &Command) -> Result<WireMessage, CryptoError> {
        let payload = bincode::serialize(command)
            .map_err(|e| CryptoError::UndecodablePayload(e.to_string()))?;

        let key = self.keys.lock().current_key()?;
        let (ciphertext, nonce) = seal(&key, &payload)?;
        self.count_use();
        Ok(WireMessage { nonce, ciphertext })
    }

    /// Run the full open pipeline on one envelope.
    pub fn open_envelope(&self, nonce: &Nonce, ciphertext: &[u8]) -> Result<Opened, CryptoError> {
        let plaintext = self.try_decrypt(nonce, ciphertext)?;

        // Recorded only after authentication succeeded; first writer wins.
        if !self.ledger.check_and_insert(nonce) {
            return Err(CryptoError::ReplayedNonce);
        }

        let command: Command = bincode::deserialize(&plaintext)
            .map_err(|e| CryptoError::UndecodablePayload(e.to_string()))?;
        command
            .validate_shape()
            .map_err(|e| CryptoError::UndecodablePayload(e.to_string()))?;

        self.count_use();
        Ok(Opened {
            verdict: self.freshness_verdict(command.timestamp),
            command,
        })
    }

    fn try_decrypt(&self, nonce: &Nonce, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let keys = self.keys.lock().decrypt_keys();
        if keys.is_empty() {
            return Err(CryptoError::NoActiveKey);
        }
        for key in &keys {
            if let Ok(plaintext) = open(key, ciphertext, nonce) {
                return Ok(plaintext);
            }
        }
        Err(CryptoError::AuthenticationFailed)
    }

    fn freshness_verdict(&self, command_timestamp: u64) -> CryptoVerdict {
        let now = current_timestamp();
        if command_timestamp > now {
            let skew = command_timestamp - now;
            if skew > self.replay_tolerance_seconds {
                return CryptoVerdict::TimestampInFuture { skew_seconds: skew };
            }
        } else {
            let skew = now - command_timestamp;
            if skew > self.replay_tolerance_seconds {
                return CryptoVerdict::StaleTimestamp { skew_seconds: skew };
            }
        }
        CryptoVerdict::Passed
    }

    fn count_use(&self) {
        let mut keys = self.keys.lock();
        keys.record_use();
        match keys.maintain() {
            Ok(Some(reason)) => tracing::info!(reason = ?reason, "session key rotated"),
            Ok(None) => {}
            Err(e) => tracing::error!(error = %e, "rotation failed"),
        }
    }

    /// Rotate the session key on demand.
    pub fn rotate(&self, reason: RotationReason) -> Result<(), CryptoError> {
        self.keys.lock().rotate(reason)
    }

    /// Revoke all key material; the gate refuses traffic afterward.
    pub fn revoke(&self, reason: &str) {
        self.keys.lock().revoke(reason);
    }

    /// Whether the hierarchy has been revoked.
    #[must_use]
    pub fn is_revoked(&self) -> bool {
        self.keys.lock().is_revoked()
    }

    /// Feed an external risk level into the rotation triggers.
    pub fn set_risk_level(&self, risk: shared_types::RiskLevel) {
        self.keys.lock().set_risk_level(risk);
    }

    /// Snapshot of session key states.
    #[must_use]
    pub fn key_status(&self) -> Vec<crate::domain::keys::KeyStatus> {
        self.keys.lock().status()
    }

    /// Run maintenance triggers (timer path).
    pub fn maintain(&self) -> Result<Option<RotationReason>, CryptoError> {
        self.keys.lock().maintain()
    }

    /// Replace the hierarchy with freshly provisioned keys and forget all
    /// retained nonces. Clears a revocation.
    pub fn reprovision(&self, keys: KeyHierarchy) {
        *self.keys.lock() = keys;
        self.ledger.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{CommandType, GatewayConfig, Param, SourceId};

    fn gate() -> CryptoGate {
        let config = GatewayConfig::default();
        let keys = KeyHierarchy::new(SecretKey::from_bytes([3u8; 32]), current_timestamp(), &config)
            .unwrap();
        CryptoGate::new(keys, config.nonce_ledger_capacity, config.replay_tolerance_seconds)
    }

    fn nav_command() -> Command {
        Command::new(
            CommandType::NavWaypoint,
            SourceId::new("gcs-1"),
            vec![Param::new("altitude", 50.0)],
        )
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let gate = gate();
        let command = nav_command();
        let wire = gate.seal_command(&command).unwrap();

        let opened = gate.open_envelope(&wire.nonce, &wire.ciphertext).unwrap();
        assert_eq!(opened.command, command);
        assert_eq!(opened.verdict, CryptoVerdict::Passed);
    }

    #[test]
    fn test_replayed_envelope_rejected() {
        let gate = gate();
        let wire = gate.seal_command(&nav_command()).unwrap();

        gate.open_envelope(&wire.nonce, &wire.ciphertext).unwrap();
        assert!(matches!(
            gate.open_envelope(&wire.nonce, &wire.ciphertext),
            Err(CryptoError::ReplayedNonce)
        ));
    }

    #[test]
    fn test_tampered_ciphertext_rejected_without_ledger_entry() {
        let gate = gate();
        let wire = gate.seal_command(&nav_command()).unwrap();

        let mut tampered = wire.ciphertext.clone();
        tampered[0] ^= 0xFF;
        assert!(matches!(
            gate.open_envelope(&wire.nonce, &tampered),
            Err(CryptoError::AuthenticationFailed)
        ));

        // Failed authentication must not burn the nonce.
        assert!(gate.open_envelope(&wire.nonce, &wire.ciphertext).is_ok());
    }

    #[test]
    fn test_stale_timestamp_still_decodes() {
        let gate = gate();
        let mut command = nav_command();
        command.timestamp = current_timestamp() - 120;
        let wire = gate.seal_command(&command).unwrap();

        let opened = gate.open_envelope(&wire.nonce, &wire.ciphertext).unwrap();
        assert!(matches!(
            opened.verdict,
            CryptoVerdict::StaleTimestamp { skew_seconds } if skew_seconds >= 90
        ));
        assert_eq!(opened.command.command_type, CommandType::NavWaypoint);
    }

    #[test]
    fn test_future_timestamp_flagged() {
        let gate = gate();
        let mut command = nav_command();
        command.timestamp = current_timestamp() + 120;
        let wire = gate.seal_command(&command).unwrap();

        let opened = gate.open_envelope(&wire.nonce, &wire.ciphertext).unwrap();
        assert!(matches!(
            opened.verdict,
            CryptoVerdict::TimestampInFuture { .. }
        ));
    }

    #[test]
    fn test_open_during_grace_window() {
        let gate = gate();
        let wire = gate.seal_command(&nav_command()).unwrap();

        gate.rotate(RotationReason::Manual).unwrap();
        // Sealed under the pre-rotation key, opened under grace.
        assert!(gate.open_envelope(&wire.nonce, &wire.ciphertext).is_ok());
    }

    #[test]
    fn test_revoked_gate_refuses_traffic() {
        let gate = gate();
        let wire = gate.seal_command(&nav_command()).unwrap();

        gate.revoke("test");
        assert!(matches!(
            gate.open_envelope(&wire.nonce, &wire.ciphertext),
            Err(CryptoError::NoActiveKey)
        ));
        assert!(gate.seal_command(&nav_command()).is_err());
    }

    #[test]
    fn test_short_datagram_rejected() {
        assert!(split_envelope(&[0u8; 10]).is_err());
        assert!(split_envelope(&[0u8; NONCE_LEN]).is_err());
    }

    #[test]
    fn test_split_envelope_roundtrip() {
        let gate = gate();
        let wire = gate.seal_command(&nav_command()).unwrap();
        let bytes = wire.to_bytes();

        let (nonce, ciphertext) = split_envelope(&bytes).unwrap();
        assert_eq!(nonce.as_bytes(), wire.nonce.as_bytes());
        assert_eq!(ciphertext, wire.ciphertext.as_slice());
    }

    #[test]
    fn test_garbage_plaintext_is_undecodable() {
        let gate = gate();
        // Seal raw bytes that are not a bincode Command.
        let active = gate.keys.lock().current_key().unwrap();
        let (ciphertext, nonce) = seal(&active, b"\xff\xff\xff\xff").unwrap();
        assert!(matches!(
            gate.open_envelope(&nonce, &ciphertext),
            Err(CryptoError::UndecodablePayload(_))
        ));
    }
}
