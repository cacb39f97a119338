use cms::{
    cert::CertificateChoices,
    content_info::{CmsVersion, ContentInfo},
    signed_data::{SignedData, SignerIdentifier, SignerInfo},
};
use der::{asn1::OctetString, Decode, Encode};
use rsa::RsaPrivateKey;
use tracing::{debug, warn};
use x509_cert::{attr::Attributes, Certificate};

use super::PkiMessage;
use crate::algorithms::{hash, DigestAlgorithm};
use crate::attributes::{self, MessageAttributes};
use crate::envelope::PkcsPkiEnvelope;
use crate::errors::{Error, Result};
use crate::identity;
use crate::oid;
use crate::status::PkiStatus;

/// Parses, verifies and decrypts pkiMessages addressed to the holder of
/// `private_key`.
#[derive(Clone, Debug)]
pub struct MessageDecoder<'a> {
    private_key: &'a RsaPrivateKey,
    verify_signatures: bool,
}

impl<'a> MessageDecoder<'a> {
    /// Creates a decoder which verifies signatures.
    pub fn new(private_key: &'a RsaPrivateKey) -> Self {
        MessageDecoder {
            private_key,
            verify_signatures: true,
        }
    }

    /// Enables or disables verification of the signer signature and the
    /// `messageDigest` attribute.
    pub fn verify_signatures(mut self, verify: bool) -> Self {
        self.verify_signatures = verify;
        self
    }

    /// Decodes a DER `ContentInfo(signedData)`.
    pub fn decode(&self, bytes: &[u8]) -> Result<PkiMessage> {
        self.decode_signed(bytes).map(|(message, _)| message)
    }

    /// Decodes a DER `ContentInfo(signedData)` and also returns the
    /// certificate of its signer.
    pub fn decode_signed(&self, bytes: &[u8]) -> Result<(PkiMessage, Certificate)> {
        let content_info = ContentInfo::from_der(bytes)?;
        if content_info.content_type != oid::ID_SIGNED_DATA {
            return Err(Error::UnexpectedContentType(content_info.content_type));
        }
        let signed_data = SignedData::from_der(&content_info.content.to_der()?)?;
        if signed_data.version != CmsVersion::V1 {
            return Err(Error::UnexpectedVersion("SignedData"));
        }

        let signers = &signed_data.signer_infos.0;
        if signers.len() != 1 {
            warn!(signers = signers.len(), "rejecting pkiMessage");
            return Err(Error::SignerCount(signers.len()));
        }
        let signer_info = signers.iter().next().ok_or(Error::SignerCount(0))?;
        let signed_attrs = signer_info
            .signed_attrs
            .as_ref()
            .ok_or(Error::MissingSignedAttributes)?;

        let attributes = MessageAttributes::decode(signed_attrs)?;
        if let Some(content_type) = attributes::decode_content_type(signed_attrs)? {
            if content_type != signed_data.encap_content_info.econtent_type {
                return Err(Error::UnexpectedContentType(content_type));
            }
        }

        let content = match &signed_data.encap_content_info.econtent {
            Some(econtent) => Some(OctetString::from_der(&econtent.to_der()?)?),
            None => None,
        };
        let content = content.as_ref().map(OctetString::as_bytes);

        let signer = find_signer(&signed_data, &signer_info.sid)?;
        if self.verify_signatures {
            verify(signer_info, signed_attrs, content.unwrap_or(&[]), &signer)?;
        }

        // PENDING and FAILURE responses carry no envelope
        let message_data = if attributes.is_request()
            || attributes.pki_status == Some(PkiStatus::Success)
        {
            let envelope = PkcsPkiEnvelope::from_der(content.ok_or(Error::MissingEnvelope)?)?;
            Some(envelope.decrypt(self.private_key)?)
        } else {
            None
        };

        debug!(
            message_type = %attributes.message_type,
            transaction_id = %attributes.transaction_id,
            status = ?attributes.pki_status,
            "decoded pkiMessage"
        );
        Ok((
            PkiMessage {
                attributes,
                message_data,
            },
            signer,
        ))
    }
}

fn find_signer(signed_data: &SignedData, sid: &SignerIdentifier) -> Result<Certificate> {
    let id = match sid {
        SignerIdentifier::IssuerAndSerialNumber(id) => id,
        SignerIdentifier::SubjectKeyIdentifier(_) => return Err(Error::UnknownSigner),
    };
    signed_data
        .certificates
        .iter()
        .flat_map(|set| set.0.iter())
        .find_map(|choice| match choice {
            CertificateChoices::Certificate(cert)
                if cert.tbs_certificate.issuer == id.issuer
                    && cert.tbs_certificate.serial_number == id.serial_number =>
            {
                Some(cert.clone())
            }
            _ => None,
        })
        .ok_or(Error::UnknownSigner)
}

fn verify(
    signer_info: &SignerInfo,
    signed_attrs: &Attributes,
    content: &[u8],
    signer: &Certificate,
) -> Result<()> {
    let digest = DigestAlgorithm::from_oid(signer_info.digest_alg.oid)?;
    hash::check_signature_algorithm(&signer_info.signature_algorithm, digest)?;

    if attributes::decode_message_digest(signed_attrs)? != digest.digest(content) {
        warn!("messageDigest does not match the encapsulated content");
        return Err(Error::DigestMismatch);
    }

    let public_key = identity::rsa_public_key(signer)?;
    digest
        .verify(
            &public_key,
            &signed_attrs.to_der()?,
            signer_info.signature.as_bytes(),
        )
        .map_err(|err| {
            warn!("signer signature does not verify");
            err
        })
}
