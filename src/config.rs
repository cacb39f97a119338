//! Per-transaction configuration.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::algorithms::{CipherAlgorithm, DigestAlgorithm};
use crate::nonce::NONCE_LEN;

/// Algorithms and checks a [`Transaction`](crate::Transaction) uses.
///
/// The algorithms should be chosen from the CA's advertised capabilities.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct TransactionConfig {
    /// Signature and message digest algorithm; also derives enrollment
    /// transaction ids.
    pub digest: DigestAlgorithm,
    /// Content-encryption algorithm of request envelopes.
    pub cipher: CipherAlgorithm,
    /// Length of generated sender nonces in bytes.
    pub nonce_len: usize,
    /// Verify the signature and `messageDigest` of responses.
    pub verify_signatures: bool,
}

impl TransactionConfig {
    /// Sets the digest algorithm.
    pub fn with_digest(mut self, digest: DigestAlgorithm) -> Self {
        self.digest = digest;
        self
    }

    /// Sets the content-encryption algorithm.
    pub fn with_cipher(mut self, cipher: CipherAlgorithm) -> Self {
        self.cipher = cipher;
        self
    }

    /// Sets the sender nonce length.
    pub fn with_nonce_len(mut self, nonce_len: usize) -> Self {
        self.nonce_len = nonce_len;
        self
    }

    /// Enables or disables response signature verification.
    pub fn with_verify_signatures(mut self, verify: bool) -> Self {
        self.verify_signatures = verify;
        self
    }
}

impl Default for TransactionConfig {
    fn default() -> Self {
        TransactionConfig {
            digest: DigestAlgorithm::default(),
            cipher: CipherAlgorithm::default(),
            nonce_len: NONCE_LEN,
            verify_signatures: true,
        }
    }
}
