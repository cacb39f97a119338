//! Transaction identifiers.

use core::fmt;

use der::{asn1::PrintableStringRef, Encode};
use rand_core::CryptoRngCore;
use spki::SubjectPublicKeyInfoOwned;

use crate::algorithms::DigestAlgorithm;
use crate::errors::{Error, Result};

/// The `transactionID` correlating every message of one transaction.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct TransactionId(String);

impl TransactionId {
    /// Wraps an id received from a peer. The id must be a non-empty
    /// PrintableString.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() || PrintableStringRef::new(&id).is_err() {
            return Err(Error::InvalidTransactionId);
        }
        Ok(TransactionId(id))
    }

    /// Derives the id of an enrollment from the requester's public key: the
    /// hex encoded digest of its DER `SubjectPublicKeyInfo`.
    ///
    /// Deriving the id from the key lets a client resume polling for the same
    /// request after a restart.
    pub fn from_public_key(
        public_key: &SubjectPublicKeyInfoOwned,
        digest: DigestAlgorithm,
    ) -> Result<Self> {
        let der = public_key.to_der()?;
        Ok(TransactionId(hex::encode(digest.digest(&der))))
    }

    /// Generates a random id for non-enrollment operations.
    pub fn generate<R: CryptoRngCore>(rng: &mut R) -> Self {
        let mut bytes = [0u8; 16];
        rng.fill_bytes(&mut bytes);
        TransactionId(hex::encode(bytes))
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TransactionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
