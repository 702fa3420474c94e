//! # BLAKE3 Hashing
//!
//! Fast digests for the per-source replay window. Cheap enough to compute on
//! every command without showing up in the latency budget.

/// BLAKE3 digest output (256-bit).
pub type Digest = [u8; 32];

/// Digest the replay-relevant content of a command.
///
/// The caller passes the canonical serialized form of the fields that define
/// "the same command": type, source, and parameters. Timestamp and sequence
/// stay out so a byte-identical resend hashes identically.
pub fn command_digest(canonical: &[u8]) -> Digest {
    *blake3::hash(canonical).as_bytes()
}

/// Digest multiple input segments as one message.
pub fn digest_many(inputs: &[&[u8]]) -> Digest {
    let mut hasher = blake3::Hasher::new();
    for input in inputs {
        hasher.update(input);
    }
    *hasher.finalize().as_bytes()
}
