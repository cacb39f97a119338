//! Error types.

use const_oid::ObjectIdentifier;

use crate::status::{FailInfo, MessageType};
use crate::transaction::State;
use crate::transaction_id::TransactionId;
use crate::transport::TransportError;

/// Alias for [`core::result::Result`] with the `scep` crate's [`Error`] type.
pub type Result<T> = core::result::Result<T, Error>;

/// Error types
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// DER encoding or decoding failed.
    #[error("ASN.1 error: {0}")]
    Asn1(#[from] der::Error),

    /// A subject public key could not be parsed or encoded.
    #[error("public key error: {0}")]
    PublicKey(#[from] spki::Error),

    /// The RSA primitive failed.
    #[error("RSA error: {0}")]
    Rsa(#[from] rsa::Error),

    /// Building a certificate or certification request failed.
    #[error("certificate builder error: {0}")]
    Builder(#[from] x509_cert::builder::Error),

    /// A CMS structure carried a content type other than the expected one.
    #[error("unexpected content type {0}")]
    UnexpectedContentType(ObjectIdentifier),

    /// A CMS structure carried an unsupported version.
    #[error("unexpected {0} version")]
    UnexpectedVersion(&'static str),

    /// A pkiMessage must be signed by exactly one signer.
    #[error("expected exactly one signer, found {0}")]
    SignerCount(usize),

    /// A pkcsPkiEnvelope must be addressed to exactly one recipient.
    #[error("expected exactly one key transport recipient, found {0}")]
    RecipientCount(usize),

    /// The signer info carries no signed attributes.
    #[error("signer info carries no signed attributes")]
    MissingSignedAttributes,

    /// A required attribute is absent.
    #[error("missing attribute {0}")]
    MissingAttribute(ObjectIdentifier),

    /// An attribute is present but its value is malformed.
    #[error("invalid value for attribute {0}")]
    InvalidAttribute(ObjectIdentifier),

    /// A protocol code could not be parsed.
    #[error("invalid {kind} code {value:?}")]
    InvalidCode {
        /// Which code set was being parsed.
        kind: &'static str,
        /// The rejected input.
        value: String,
    },

    /// A transaction id must be a non-empty PrintableString.
    #[error("invalid transaction id")]
    InvalidTransactionId,

    /// The message carries no encapsulated content where an envelope is required.
    #[error("message carries no pkcsPkiEnvelope")]
    MissingEnvelope,

    /// An algorithm identifier names an algorithm this crate does not implement.
    #[error("unsupported algorithm {0}")]
    UnsupportedAlgorithm(ObjectIdentifier),

    /// An algorithm name could not be parsed.
    #[error("unknown algorithm name {0:?}")]
    UnknownAlgorithmName(String),

    /// Symmetric key or IV of the wrong length.
    #[error("invalid key or IV length")]
    InvalidKeyLength,

    /// The certificate of the signer is not among the embedded certificates.
    #[error("signer certificate not found")]
    UnknownSigner,

    /// A private key does not match the certificate it is paired with.
    #[error("private key does not match certificate")]
    KeyMismatch,

    /// Content decryption failed.
    #[error("decryption error")]
    Decryption,

    /// Signature verification failed.
    #[error("verification error")]
    Verification,

    /// The messageDigest attribute does not match the signed content.
    #[error("message digest mismatch")]
    DigestMismatch,

    /// A combined `*WithRSAEncryption` signature algorithm names a different
    /// hash than the signer info digest algorithm.
    #[error("signature algorithm {0} does not match the digest algorithm")]
    SignatureAlgorithmMismatch(ObjectIdentifier),

    /// The response carries a different transaction id than the request.
    #[error("transaction id mismatch: expected {expected}, found {found}")]
    TransactionIdMismatch {
        /// The id of the request.
        expected: TransactionId,
        /// The id echoed by the response.
        found: TransactionId,
    },

    /// The response does not echo the request's sender nonce.
    #[error("recipient nonce does not match sender nonce")]
    NonceMismatch,

    /// The response is signed by neither the recipient certificate nor a
    /// certificate it issued.
    #[error("response signed by an unexpected certificate")]
    UnexpectedSigner,

    /// The response sender nonce has been seen before.
    #[error("response nonce has already been used")]
    Replay,

    /// The message type is not valid at this point of the exchange.
    #[error("unexpected message type {0}")]
    UnexpectedMessageType(MessageType),

    /// A response was PENDING for an operation which cannot be deferred.
    #[error("unexpected PENDING status for {0}")]
    UnexpectedPending(MessageType),

    /// The operation is not permitted in the current transaction state.
    #[error("illegal transaction state {0:?}")]
    IllegalState(State),

    /// The CA answered FAILURE.
    #[error("operation failed: {0}")]
    OperationFailed(FailInfo),

    /// The transport could not deliver the request.
    #[error("transport error: {0}")]
    Transport(#[source] TransportError),
}

/// Coarse classification of [`Error`] values.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// Structural or encoding problem in a message.
    MalformedMessage,
    /// A cryptographic primitive failed.
    CryptoFailure,
    /// Transaction id, nonce or replay check failed.
    ExchangeIntegrity,
    /// An accessor or operation was called in the wrong state.
    IllegalState,
    /// The request was not delivered.
    Transport,
    /// The CA rejected the request.
    OperationFailed,
}

impl Error {
    /// Returns the [`ErrorKind`] of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Asn1(_)
            | Error::UnexpectedContentType(_)
            | Error::UnexpectedVersion(_)
            | Error::SignerCount(_)
            | Error::RecipientCount(_)
            | Error::MissingSignedAttributes
            | Error::MissingAttribute(_)
            | Error::InvalidAttribute(_)
            | Error::InvalidCode { .. }
            | Error::InvalidTransactionId
            | Error::MissingEnvelope
            | Error::UnknownSigner
            | Error::UnexpectedMessageType(_)
            | Error::UnexpectedPending(_) => ErrorKind::MalformedMessage,
            Error::PublicKey(_)
            | Error::Rsa(_)
            | Error::Builder(_)
            | Error::UnsupportedAlgorithm(_)
            | Error::UnknownAlgorithmName(_)
            | Error::InvalidKeyLength
            | Error::KeyMismatch
            | Error::Decryption
            | Error::Verification
            | Error::DigestMismatch
            | Error::SignatureAlgorithmMismatch(_) => ErrorKind::CryptoFailure,
            Error::TransactionIdMismatch { .. }
            | Error::NonceMismatch
            | Error::UnexpectedSigner
            | Error::Replay => ErrorKind::ExchangeIntegrity,
            Error::IllegalState(_) => ErrorKind::IllegalState,
            Error::OperationFailed(_) => ErrorKind::OperationFailed,
            Error::Transport(_) => ErrorKind::Transport,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        assert_eq!(Error::Replay.kind(), ErrorKind::ExchangeIntegrity);
        assert_eq!(Error::SignerCount(2).kind(), ErrorKind::MalformedMessage);
        assert_eq!(Error::Decryption.kind(), ErrorKind::CryptoFailure);
        assert_eq!(
            Error::IllegalState(State::New).kind(),
            ErrorKind::IllegalState
        );
        assert_eq!(
            Error::OperationFailed(FailInfo::BadCertId).kind(),
            ErrorKind::OperationFailed
        );
        assert_eq!(
            Error::Transport("connection refused".into()).kind(),
            ErrorKind::Transport
        );
    }

    #[test]
    fn display() {
        assert_eq!(
            Error::SignerCount(2).to_string(),
            "expected exactly one signer, found 2"
        );
        assert_eq!(
            Error::OperationFailed(FailInfo::BadRequest).to_string(),
            "operation failed: badRequest"
        );
    }
}
