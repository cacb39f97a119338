//! The CA side of a SCEP exchange.

use rand_core::CryptoRngCore;
use tracing::debug;
use x509_cert::Certificate;

use crate::algorithms::{CipherAlgorithm, DigestAlgorithm};
use crate::degenerate::CertStore;
use crate::errors::{Error, Result};
use crate::identity::Identity;
use crate::message::{MessageDecoder, MessageEncoder, PkiMessage};
use crate::nonce::Nonce;
use crate::operation::PkiOperation;
use crate::status::FailInfo;

/// A decoded request together with its operation and signer.
#[derive(Clone, Debug)]
pub struct ScepRequest {
    /// The request message.
    pub message: PkiMessage,
    /// The operation carried in its envelope.
    pub operation: PkiOperation,
    /// The certificate that signed it. Responses are enveloped to this
    /// certificate.
    pub signer: Certificate,
}

/// Decodes requests addressed to a CA or RA identity and encodes its
/// `CertRep` answers.
///
/// Every answer echoes the request's transaction id, carries the request's
/// sender nonce as its recipient nonce and a fresh sender nonce of its own.
#[derive(Clone, Debug)]
pub struct Responder {
    identity: Identity,
    digest: DigestAlgorithm,
    cipher: CipherAlgorithm,
}

impl Responder {
    /// Creates a responder answering as `identity`.
    pub fn new(identity: Identity) -> Self {
        Responder {
            identity,
            digest: DigestAlgorithm::default(),
            cipher: CipherAlgorithm::default(),
        }
    }

    /// Sets the digest algorithm of responses.
    pub fn with_digest(mut self, digest: DigestAlgorithm) -> Self {
        self.digest = digest;
        self
    }

    /// Sets the content-encryption algorithm of SUCCESS responses.
    pub fn with_cipher(mut self, cipher: CipherAlgorithm) -> Self {
        self.cipher = cipher;
        self
    }

    /// The identity answering requests.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Decodes and verifies a request.
    pub fn decode_request(&self, bytes: &[u8]) -> Result<ScepRequest> {
        let (message, signer) = MessageDecoder::new(self.identity.private_key()).decode_signed(bytes)?;
        if !message.is_request() {
            return Err(Error::UnexpectedMessageType(message.message_type()));
        }
        let operation = message.operation()?;
        debug!(
            transaction_id = %message.transaction_id(),
            message_type = %message.message_type(),
            "accepted request"
        );
        Ok(ScepRequest {
            message,
            operation,
            signer,
        })
    }

    /// Answers `request` with SUCCESS, delivering `store`.
    pub fn success<R: CryptoRngCore>(
        &self,
        rng: &mut R,
        request: &ScepRequest,
        store: &CertStore,
    ) -> Result<Vec<u8>> {
        let response = PkiMessage::success(
            request.message.transaction_id().clone(),
            Nonce::generate(rng),
            request.message.sender_nonce().clone(),
            store,
        )?;
        self.encode(rng, request, &response)
    }

    /// Answers `request` with PENDING.
    pub fn pending<R: CryptoRngCore>(&self, rng: &mut R, request: &ScepRequest) -> Result<Vec<u8>> {
        let response = PkiMessage::pending(
            request.message.transaction_id().clone(),
            Nonce::generate(rng),
            request.message.sender_nonce().clone(),
        );
        self.encode(rng, request, &response)
    }

    /// Answers `request` with FAILURE for `fail_info`.
    pub fn failure<R: CryptoRngCore>(
        &self,
        rng: &mut R,
        request: &ScepRequest,
        fail_info: FailInfo,
    ) -> Result<Vec<u8>> {
        let response = PkiMessage::failure(
            request.message.transaction_id().clone(),
            Nonce::generate(rng),
            request.message.sender_nonce().clone(),
            fail_info,
        );
        self.encode(rng, request, &response)
    }

    fn encode<R: CryptoRngCore>(
        &self,
        rng: &mut R,
        request: &ScepRequest,
        response: &PkiMessage,
    ) -> Result<Vec<u8>> {
        MessageEncoder::new(&self.identity, &request.signer)
            .with_digest(self.digest)
            .with_cipher(self.cipher)
            .encode(rng, response)
    }
}
