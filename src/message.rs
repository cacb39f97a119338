//! The pkiMessage: a CMS `SignedData` whose encapsulated content is the
//! pkcsPkiEnvelope and whose signed attributes carry the SCEP attributes.
//!
//! ```text
//! ContentInfo(signedData)
//!   SignedData (version 1)
//!     digestAlgorithms     { digest }
//!     encapContentInfo     id-data, OCTET STRING { ContentInfo(envelopedData) }
//!     certificates         { signer certificate }
//!     signerInfos          { exactly one SignerInfo }
//!       signedAttrs        transactionID, messageType, senderNonce,
//!                          [recipientNonce], [pkiStatus], [failInfo],
//!                          contentType, messageDigest, signingTime
//! ```
//!
//! The envelope is absent from PENDING and FAILURE responses.

mod decoder;
mod encoder;

pub use self::{decoder::MessageDecoder, encoder::MessageEncoder};

use crate::attributes::MessageAttributes;
use crate::degenerate::CertStore;
use crate::errors::{Error, Result};
use crate::nonce::Nonce;
use crate::operation::PkiOperation;
use crate::status::{FailInfo, MessageType, PkiStatus};
use crate::transaction_id::TransactionId;

/// A decoded pkiMessage: its attributes and the decrypted envelope payload.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PkiMessage {
    /// The SCEP attributes.
    pub attributes: MessageAttributes,
    /// Plaintext of the pkcsPkiEnvelope, present on requests and SUCCESS
    /// responses.
    pub message_data: Option<Vec<u8>>,
}

impl PkiMessage {
    /// A request carrying `operation`.
    pub fn request(
        transaction_id: TransactionId,
        sender_nonce: Nonce,
        operation: &PkiOperation,
    ) -> Result<Self> {
        Ok(PkiMessage {
            attributes: MessageAttributes::request(
                transaction_id,
                operation.message_type(),
                sender_nonce,
            ),
            message_data: Some(operation.to_der()?),
        })
    }

    /// A SUCCESS `CertRep` carrying `store`.
    pub fn success(
        transaction_id: TransactionId,
        sender_nonce: Nonce,
        recipient_nonce: Nonce,
        store: &CertStore,
    ) -> Result<Self> {
        Ok(PkiMessage {
            attributes: cert_rep(
                transaction_id,
                sender_nonce,
                recipient_nonce,
                PkiStatus::Success,
                None,
            ),
            message_data: Some(store.to_der()?),
        })
    }

    /// A PENDING `CertRep`.
    pub fn pending(transaction_id: TransactionId, sender_nonce: Nonce, recipient_nonce: Nonce) -> Self {
        PkiMessage {
            attributes: cert_rep(
                transaction_id,
                sender_nonce,
                recipient_nonce,
                PkiStatus::Pending,
                None,
            ),
            message_data: None,
        }
    }

    /// A FAILURE `CertRep` giving `fail_info` as the reason.
    pub fn failure(
        transaction_id: TransactionId,
        sender_nonce: Nonce,
        recipient_nonce: Nonce,
        fail_info: FailInfo,
    ) -> Self {
        PkiMessage {
            attributes: cert_rep(
                transaction_id,
                sender_nonce,
                recipient_nonce,
                PkiStatus::Failure,
                Some(fail_info),
            ),
            message_data: None,
        }
    }

    /// Whether this message is a request, i.e. carries no `pkiStatus`.
    pub fn is_request(&self) -> bool {
        self.attributes.is_request()
    }

    /// The `transactionID` attribute.
    pub fn transaction_id(&self) -> &TransactionId {
        &self.attributes.transaction_id
    }

    /// The `messageType` attribute.
    pub fn message_type(&self) -> MessageType {
        self.attributes.message_type
    }

    /// The `senderNonce` attribute.
    pub fn sender_nonce(&self) -> &Nonce {
        &self.attributes.sender_nonce
    }

    /// The `recipientNonce` attribute.
    pub fn recipient_nonce(&self) -> Option<&Nonce> {
        self.attributes.recipient_nonce.as_ref()
    }

    /// The `pkiStatus` attribute.
    pub fn pki_status(&self) -> Option<PkiStatus> {
        self.attributes.pki_status
    }

    /// The `failInfo` attribute.
    pub fn fail_info(&self) -> Option<FailInfo> {
        self.attributes.fail_info
    }

    /// Decodes the operation carried by a request.
    pub fn operation(&self) -> Result<PkiOperation> {
        let data = self.message_data.as_deref().ok_or(Error::MissingEnvelope)?;
        PkiOperation::from_der(self.message_type(), data)
    }

    /// Decodes the certificates and CRLs carried by a SUCCESS response.
    pub fn cert_store(&self) -> Result<CertStore> {
        let data = self.message_data.as_deref().ok_or(Error::MissingEnvelope)?;
        CertStore::from_der(data)
    }
}

fn cert_rep(
    transaction_id: TransactionId,
    sender_nonce: Nonce,
    recipient_nonce: Nonce,
    status: PkiStatus,
    fail_info: Option<FailInfo>,
) -> MessageAttributes {
    MessageAttributes {
        transaction_id,
        message_type: MessageType::CertRep,
        sender_nonce,
        recipient_nonce: Some(recipient_nonce),
        pki_status: Some(status),
        fail_info,
    }
}
