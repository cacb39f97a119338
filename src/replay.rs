//! Replay protection for response nonces.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::warn;

use crate::errors::{Error, Result};
use crate::nonce::Nonce;

/// Number of nonces remembered by default.
pub const DEFAULT_CAPACITY: usize = 20;

/// A bounded set of nonces already accepted, evicting the oldest first.
#[derive(Clone, Debug)]
pub struct NonceReplayCache {
    capacity: usize,
    nonces: VecDeque<Nonce>,
}

impl NonceReplayCache {
    /// Creates a cache holding up to [`DEFAULT_CAPACITY`] nonces.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a cache holding up to `capacity` nonces. A capacity of zero is
    /// raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        NonceReplayCache {
            capacity,
            nonces: VecDeque::with_capacity(capacity),
        }
    }

    /// Maximum number of nonces remembered.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of nonces currently remembered.
    pub fn len(&self) -> usize {
        self.nonces.len()
    }

    /// Returns `true` if no nonce has been recorded.
    pub fn is_empty(&self) -> bool {
        self.nonces.is_empty()
    }

    /// Whether `nonce` has been recorded and not yet evicted.
    pub fn contains(&self, nonce: &Nonce) -> bool {
        self.nonces.contains(nonce)
    }

    /// Records `nonce`, evicting the oldest entry when full. Recording a
    /// nonce already present does nothing.
    pub fn offer(&mut self, nonce: Nonce) {
        if self.contains(&nonce) {
            return;
        }
        if self.nonces.len() == self.capacity {
            self.nonces.pop_front();
        }
        self.nonces.push_back(nonce);
    }

    /// Records `nonce` and returns `true` if it was not present yet.
    pub fn check_and_insert(&mut self, nonce: &Nonce) -> bool {
        if self.contains(nonce) {
            return false;
        }
        self.offer(nonce.clone());
        true
    }
}

impl Default for NonceReplayCache {
    fn default() -> Self {
        Self::new()
    }
}

/// A [`NonceReplayCache`] shared between transactions.
///
/// Clones share the same cache. The check and the insertion happen under one
/// lock, so two transactions can never both accept the same nonce.
#[derive(Clone, Debug, Default)]
pub struct SharedReplayCache(Arc<Mutex<NonceReplayCache>>);

impl SharedReplayCache {
    /// Creates a shared cache holding up to [`DEFAULT_CAPACITY`] nonces.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a shared cache holding up to `capacity` nonces.
    pub fn with_capacity(capacity: usize) -> Self {
        SharedReplayCache(Arc::new(Mutex::new(NonceReplayCache::with_capacity(
            capacity,
        ))))
    }

    /// Number of recorded nonces.
    pub fn len(&self) -> usize {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no nonce has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `nonce` has been recorded.
    pub fn contains(&self, nonce: &Nonce) -> bool {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(nonce)
    }

    /// Records `nonce`, failing with [`Error::Replay`] if it was seen before.
    pub fn check_and_insert(&self, nonce: &Nonce) -> Result<()> {
        let mut cache = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        if cache.check_and_insert(nonce) {
            Ok(())
        } else {
            warn!(?nonce, "replayed response nonce");
            Err(Error::Replay)
        }
    }
}
