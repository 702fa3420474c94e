//! # Nonce Ledger
//!
//! Bounded first-writer-wins dedup set over envelope nonces. A nonce that
//! was ever accepted within the retained window can never be accepted again,
//! regardless of which session key (active or grace) decrypted it.
//!
//! ## Design
//!
//! `HashSet` for membership plus `VecDeque` for FIFO eviction, both behind a
//! single mutex so check-and-insert is one atomic step. Two datagrams racing
//! with the same nonce resolve deterministically: exactly one wins.

use parking_lot::Mutex;
use shared_crypto::{Nonce, NONCE_LEN};
use std::collections::{HashSet, VecDeque};

struct LedgerInner {
    seen: HashSet<[u8; NONCE_LEN]>,
    order: VecDeque<[u8; NONCE_LEN]>,
}

/// Bounded nonce dedup ledger.
pub struct NonceLedger {
    inner: Mutex<LedgerInner>,
    capacity: usize,
}

impl NonceLedger {
    /// Create a ledger retaining at most `capacity` nonces.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(LedgerInner {
                seen: HashSet::with_capacity(capacity),
                order: VecDeque::with_capacity(capacity),
            }),
            capacity,
        }
    }

    /// Atomically record the nonce if unseen.
    ///
    /// Returns `true` if the nonce is fresh (now recorded), `false` if it was
    /// already present. Evicts the oldest entry when full.
    pub fn check_and_insert(&self, nonce: &Nonce) -> bool {
        let raw = *nonce.as_bytes();
        let mut inner = self.inner.lock();

        if inner.seen.contains(&raw) {
            return false;
        }
        if inner.order.len() >= self.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                inner.seen.remove(&oldest);
            }
        }
        inner.seen.insert(raw);
        inner.order.push_back(raw);
        true
    }

    /// Number of nonces currently retained.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().order.len()
    }

    /// Whether the ledger is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all retained nonces.
    ///
    /// Called only when every key epoch that produced the retained nonces has
    /// retired; clearing earlier would reopen the replay window.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.seen.clear();
        inner.order.clear();
    }
}
