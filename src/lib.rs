#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![doc(html_logo_url = "https://raw.githubusercontent.com/RustCrypto/meta/master/logo_small.png")]
#![warn(missing_docs)]

//! SCEP (Simple Certificate Enrollment Protocol) message engine.
//!
//! This crate builds, signs, envelopes, parses and verifies SCEP
//! pkiMessages, and drives the client side of a SCEP transaction:
//! enrollment (`PKCSReq`), polling (`GetCertInitial`), certificate
//! retrieval (`GetCert`) and CRL retrieval (`GetCRL`).
//!
//! Messages are CMS `SignedData` structures whose encapsulated content is a
//! CMS `EnvelopedData` (the pkcsPkiEnvelope) and whose signed attributes carry
//! the SCEP attributes. Keys are RSA; signatures are PKCS#1 v1.5 and the
//! content-encryption key is transported with PKCS#1 v1.5 encryption.
//!
//! HTTP is out of scope: a [`Transport`] hands encoded requests to the CA and
//! returns its encoded answers.
//!
//! # Usage
//!
//! ## Enrollment
//!
//! The CA below is a [`Responder`] answering in process.
//!
//! ```
//! use core::str::FromStr;
//! use std::time::Duration;
//!
//! use scep::{
//!     operation::PkiOperation, transport::TransportError, CertStore, Identity, Responder,
//!     SharedReplayCache, State, Transaction, Transport,
//! };
//! use scep::rsa::RsaPrivateKey;
//! use scep::x509_cert::{name::Name, serial_number::SerialNumber};
//!
//! struct InProcess(Responder);
//!
//! impl Transport for InProcess {
//!     fn send(&mut self, request: &[u8]) -> Result<Vec<u8>, TransportError> {
//!         let mut rng = scep::rand_core::OsRng;
//!         let request = self.0.decode_request(request)?;
//!         let PkiOperation::PkcsReq(csr) = &request.operation else {
//!             return Err("unsupported".into());
//!         };
//!         let issued = self.0.identity().issue(
//!             csr,
//!             SerialNumber::from(2u32),
//!             Duration::from_secs(3600),
//!         )?;
//!         Ok(self.0.success(&mut rng, &request, &CertStore::with_certificates(vec![issued]))?)
//!     }
//! }
//!
//! let mut rng = scep::rand_core::OsRng;
//! let ca_key = RsaPrivateKey::new(&mut rng, 1024).expect("failed to generate a key");
//! let ca = Identity::self_signed(ca_key, Name::from_str("CN=ca").unwrap()).unwrap();
//!
//! let key = RsaPrivateKey::new(&mut rng, 1024).expect("failed to generate a key");
//! let subject = Name::from_str("CN=example.org").unwrap();
//! let requester = Identity::self_signed(key.clone(), subject.clone()).unwrap();
//!
//! let recipient = ca.certificate().clone();
//! let mut transaction = Transaction::new(
//!     InProcess(Responder::new(ca)),
//!     requester,
//!     recipient,
//!     SharedReplayCache::new(),
//! );
//!
//! let PkiOperation::PkcsReq(csr) = PkiOperation::pkcs_req(&key, subject.clone(), Some("secret")).unwrap() else {
//!     unreachable!()
//! };
//! assert_eq!(transaction.enroll(csr).unwrap(), State::Issued);
//! assert_eq!(transaction.certificates().unwrap()[0].tbs_certificate.subject, subject);
//! ```
//!
//! ## Pending enrollments
//!
//! When the CA answers PENDING the transaction holds a [`PollTask`];
//! [`Transaction::poll`] sends the `GetCertInitial` request for it until the
//! CA answers SUCCESS or FAILURE.
//!
//! ## Replay protection
//!
//! Transactions created with clones of one [`SharedReplayCache`] reject any
//! response whose sender nonce another of them has already accepted.

pub use cms;
pub use der;
pub use rand_core;
pub use rsa;
pub use x509_cert;

pub mod algorithms;
pub mod attributes;
pub mod config;
pub mod degenerate;
pub mod envelope;
pub mod errors;
pub mod identity;
pub mod message;
pub mod nonce;
pub mod operation;
pub mod replay;
pub mod responder;
pub mod status;
pub mod transaction;
pub mod transaction_id;
pub mod transport;

pub use crate::{
    algorithms::{CipherAlgorithm, DigestAlgorithm},
    config::TransactionConfig,
    degenerate::CertStore,
    errors::{Error, ErrorKind, Result},
    identity::Identity,
    message::{MessageDecoder, MessageEncoder, PkiMessage},
    nonce::Nonce,
    replay::{NonceReplayCache, SharedReplayCache},
    responder::{Responder, ScepRequest},
    status::{FailInfo, MessageType, PkiStatus},
    transaction::{PollTask, State, Transaction},
    transaction_id::TransactionId,
    transport::Transport,
};

/// CMS content types.
pub(crate) mod oid {
    use const_oid::ObjectIdentifier;

    /// `id-data`
    pub const ID_DATA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.1");

    /// `id-signedData`
    pub const ID_SIGNED_DATA: ObjectIdentifier =
        ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.2");

    /// `id-envelopedData`
    pub const ID_ENVELOPED_DATA: ObjectIdentifier =
        ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.3");
}
