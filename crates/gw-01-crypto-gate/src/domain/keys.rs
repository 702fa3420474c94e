//! # Session Key Hierarchy
//!
//! Two-level key hierarchy: a long-lived root key (provisioned out of band,
//! persisted by the storage port) and short-lived session keys derived from
//! it with HKDF. Session keys rotate on age, usage count, reported risk, or
//! operator request, with a grace window so in-flight traffic sealed under
//! the previous key still decrypts.
//!
//! ## State machine
//!
//! ```text
//! Provisioning -> Active -> Grace -> Expired
//!                       \-> Revoked    (terminal, also from Grace)
//! ```
//!
//! Rotation activates the new key before demoting the old one, so there is
//! never a window with zero usable keys.

use serde::Serialize;
use shared_crypto::{derive_session_key, CryptoError, SecretKey};
use shared_types::current_timestamp;
use shared_types::GatewayConfig;
use shared_types::RiskLevel;
use uuid::Uuid;

/// Lifecycle state of one session key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionKeyState {
    /// Derived but not yet serving traffic.
    Provisioning,
    /// The key sealing and opening current traffic.
    Active,
    /// Demoted key still accepted for decryption until its grace deadline.
    Grace,
    /// Past its grace deadline; never used again.
    Expired,
    /// Destroyed in response to suspected compromise; terminal.
    Revoked,
}

/// Why a rotation happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RotationReason {
    /// Session key age reached its configured lifetime.
    Scheduled,
    /// Command counter reached the per-session maximum.
    CommandCount,
    /// An external risk report demanded early rotation.
    RiskEscalation,
    /// Operator-requested rotation.
    Manual,
}

/// Point-in-time view of one session key, for ops queries and logs.
#[derive(Debug, Clone, Serialize)]
pub struct KeyStatus {
    /// Key identifier.
    pub id: Uuid,
    /// Derivation epoch.
    pub epoch: u64,
    /// Current lifecycle state.
    pub state: SessionKeyState,
    /// Seconds until this key stops being usable, zero if already unusable.
    pub time_to_expiry_seconds: u64,
    /// Commands processed under this key.
    pub command_count: u64,
    /// Hierarchy-wide risk level at the time of the query.
    pub risk_level: RiskLevel,
}

struct SessionKey {
    id: Uuid,
    epoch: u64,
    state: SessionKeyState,
    expires_at: u64,
    command_count: u64,
    material: SecretKey,
}

impl SessionKey {
    fn status(&self, now: u64, risk: RiskLevel) -> KeyStatus {
        KeyStatus {
            id: self.id,
            epoch: self.epoch,
            state: self.state,
            time_to_expiry_seconds: self.expires_at.saturating_sub(now),
            command_count: self.command_count,
            risk_level: risk,
        }
    }
}

/// The root plus session key hierarchy.
///
/// Not internally synchronized; callers wrap it in a lock.
pub struct KeyHierarchy {
    root: SecretKey,
    root_expires_at: u64,
    active: Option<SessionKey>,
    grace: Option<SessionKey>,
    next_epoch: u64,
    risk: RiskLevel,
    revoked: bool,
    session_lifetime_seconds: u64,
    grace_period_seconds: u64,
    max_commands: u64,
}

impl KeyHierarchy {
    /// Build the hierarchy from a loaded root key and derive the first
    /// active session key.
    pub fn new(
        root: SecretKey,
        root_created_at: u64,
        config: &GatewayConfig,
    ) -> Result<Self, CryptoError> {
        let mut hierarchy = Self {
            root,
            root_expires_at: root_created_at.saturating_add(config.root_key_lifetime_seconds),
            active: None,
            grace: None,
            next_epoch: 0,
            risk: RiskLevel::Low,
            revoked: false,
            session_lifetime_seconds: config.session_key_lifetime_seconds,
            grace_period_seconds: config.grace_period_seconds,
            max_commands: config.max_commands_per_session,
        };
        hierarchy.activate_new_key(current_timestamp())?;
        Ok(hierarchy)
    }

    /// Material of the active key, for sealing outbound traffic.
    pub fn current_key(&self) -> Result<SecretKey, CryptoError> {
        if self.revoked {
            return Err(CryptoError::NoActiveKey);
        }
        self.active
            .as_ref()
            .map(|k| k.material.clone())
            .ok_or(CryptoError::NoActiveKey)
    }

    /// Keys usable for decryption, active first.
    ///
    /// Lazily expires a grace key past its deadline. Never returns expired or
    /// revoked material.
    pub fn decrypt_keys(&mut self) -> Vec<SecretKey> {
        if self.revoked {
            return Vec::new();
        }
        let now = current_timestamp();
        if let Some(grace) = &self.grace {
            if now >= grace.expires_at {
                tracing::debug!(epoch = grace.epoch, "grace key expired");
                self.grace = None;
            }
        }
        let mut keys = Vec::with_capacity(2);
        if let Some(active) = &self.active {
            keys.push(active.material.clone());
        }
        if let Some(grace) = &self.grace {
            keys.push(grace.material.clone());
        }
        keys
    }

    /// Count one command against the active key.
    pub fn record_use(&mut self) {
        if let Some(active) = &mut self.active {
            active.command_count += 1;
        }
    }

    /// Rotate if any automatic trigger fires; returns the applied reason.
    ///
    /// Called after each processed command and from the periodic timer.
    pub fn maintain(&mut self) -> Result<Option<RotationReason>, CryptoError> {
        let Some(reason) = self.due_rotation(current_timestamp()) else {
            return Ok(None);
        };
        self.rotate(reason)?;
        Ok(Some(reason))
    }

    /// Derive a fresh active key and demote the current one to grace.
    pub fn rotate(&mut self, reason: RotationReason) -> Result<(), CryptoError> {
        if self.revoked {
            return Err(CryptoError::NoActiveKey);
        }
        let now = current_timestamp();
        let previous = self.activate_new_key(now)?;
        if let Some(mut old) = previous {
            old.state = SessionKeyState::Grace;
            old.expires_at = now.saturating_add(self.grace_period_seconds);
            tracing::info!(
                old_epoch = old.epoch,
                reason = ?reason,
                "session key demoted to grace"
            );
            self.grace = Some(old);
        }
        if reason == RotationReason::RiskEscalation {
            self.risk = RiskLevel::Low;
        }
        Ok(())
    }

    /// Destroy all session keys. Terminal until fresh provisioning.
    pub fn revoke(&mut self, reason: &str) {
        tracing::warn!(reason, "key hierarchy revoked");
        self.active = None;
        self.grace = None;
        self.revoked = true;
    }

    /// Whether the hierarchy has been revoked.
    #[must_use]
    pub fn is_revoked(&self) -> bool {
        self.revoked
    }

    /// Accept an external risk report; High or Critical forces rotation at
    /// the next maintenance check.
    pub fn set_risk_level(&mut self, risk: RiskLevel) {
        if risk > self.risk {
            self.risk = risk;
        }
    }

    /// Status of every live session key, active first.
    #[must_use]
    pub fn status(&self) -> Vec<KeyStatus> {
        let now = current_timestamp();
        self.active
            .iter()
            .chain(self.grace.iter())
            .map(|k| k.status(now, self.risk))
            .collect()
    }

    /// Seconds until the root key reaches its provisioned lifetime.
    #[must_use]
    pub fn root_time_to_expiry(&self) -> u64 {
        self.root_expires_at.saturating_sub(current_timestamp())
    }

    fn due_rotation(&self, now: u64) -> Option<RotationReason> {
        let active = self.active.as_ref()?;
        if self.revoked {
            return None;
        }
        if self.risk >= RiskLevel::High {
            return Some(RotationReason::RiskEscalation);
        }
        if active.command_count >= self.max_commands {
            return Some(RotationReason::CommandCount);
        }
        if now >= active.expires_at {
            return Some(RotationReason::Scheduled);
        }
        None
    }

    /// Derive and install a new active key, returning the displaced one.
    fn activate_new_key(&mut self, now: u64) -> Result<Option<SessionKey>, CryptoError> {
        let epoch = self.next_epoch;
        let mut salt = [0u8; 32];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut salt);
        let material = derive_session_key(&self.root, &salt, &epoch.to_be_bytes())?;

        let key = SessionKey {
            id: Uuid::new_v4(),
            epoch,
            state: SessionKeyState::Active,
            expires_at: now.saturating_add(self.session_lifetime_seconds),
            command_count: 0,
            material,
        };
        tracing::info!(epoch, id = %key.id, "session key activated");
        self.next_epoch += 1;
        Ok(self.active.replace(key))
    }

    #[cfg(test)]
    fn backdate_active(&mut self, seconds: u64) {
        if let Some(active) = &mut self.active {
            active.expires_at = active.expires_at.saturating_sub(seconds);
        }
    }

    #[cfg(test)]
    fn backdate_grace(&mut self, seconds: u64) {
        if let Some(grace) = &mut self.grace {
            grace.expires_at = grace.expires_at.saturating_sub(seconds);
        }
    }
}
