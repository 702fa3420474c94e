//! # Session Key Derivation
//!
//! HKDF-SHA256 expansion of the long-lived root key into short-lived session
//! keys. The root key itself never encrypts traffic; compromise of a session
//! key exposes at most one epoch.
//!
//! ## Design
//!
//! Each rotation supplies a fresh random salt and an info string binding the
//! key to its epoch counter, so no two rotations can yield the same key from
//! the same root.

use crate::symmetric::SecretKey;
use crate::CryptoError;
use hkdf::Hkdf;
use sha2::Sha256;

/// Derive a session key from the root key under `salt` and `info`.
///
/// # Errors
///
/// Returns `CryptoError::EncryptionFailed` if HKDF expansion fails, which
/// cannot happen for a 32-byte output but is propagated rather than asserted.
pub fn derive_session_key(
    root: &SecretKey,
    salt: &[u8],
    info: &[u8],
) -> Result<SecretKey, CryptoError> {
    let hk = Hkdf::<Sha256>::new(Some(salt), root.as_bytes());

    let mut okm = [0u8; 32];
    hk.expand(info, &mut okm)
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    Ok(SecretKey::from_bytes(okm))
}
