use std::time::SystemTime;

use cms::{
    cert::CertificateChoices,
    content_info::{CmsVersion, ContentInfo},
    signed_data::{
        CertificateSet, EncapsulatedContentInfo, SignedData, SignerIdentifier, SignerInfo,
        SignerInfos,
    },
};
use der::{
    asn1::{Any, OctetString, SetOfVec},
    Encode,
};
use rand_core::CryptoRngCore;
use tracing::debug;
use x509_cert::Certificate;

use super::PkiMessage;
use crate::algorithms::{hash, CipherAlgorithm, DigestAlgorithm};
use crate::attributes;
use crate::envelope::PkcsPkiEnvelope;
use crate::errors::Result;
use crate::identity::Identity;
use crate::oid;

/// Signs pkiMessages as `signer` and envelopes their payload to `recipient`.
#[derive(Clone, Debug)]
pub struct MessageEncoder<'a> {
    signer: &'a Identity,
    recipient: &'a Certificate,
    digest: DigestAlgorithm,
    cipher: CipherAlgorithm,
}

impl<'a> MessageEncoder<'a> {
    /// Creates an encoder with the default digest and cipher.
    pub fn new(signer: &'a Identity, recipient: &'a Certificate) -> Self {
        MessageEncoder {
            signer,
            recipient,
            digest: DigestAlgorithm::default(),
            cipher: CipherAlgorithm::default(),
        }
    }

    /// Sets the signature and message digest algorithm.
    pub fn with_digest(mut self, digest: DigestAlgorithm) -> Self {
        self.digest = digest;
        self
    }

    /// Sets the content-encryption algorithm of the envelope.
    pub fn with_cipher(mut self, cipher: CipherAlgorithm) -> Self {
        self.cipher = cipher;
        self
    }

    /// Encodes `message` as a DER `ContentInfo(signedData)`.
    pub fn encode<R: CryptoRngCore>(&self, rng: &mut R, message: &PkiMessage) -> Result<Vec<u8>> {
        let econtent = match &message.message_data {
            Some(data) => {
                let envelope = PkcsPkiEnvelope::encrypt(rng, data, self.recipient, self.cipher)?;
                Some(OctetString::new(envelope.to_der()?)?)
            }
            None => None,
        };
        let content = econtent.as_ref().map(OctetString::as_bytes).unwrap_or(&[]);

        let mut signed_attrs = message.attributes.encode()?;
        signed_attrs.push(attributes::content_type(oid::ID_DATA)?);
        signed_attrs.push(attributes::message_digest(&self.digest.digest(content))?);
        signed_attrs.push(attributes::signing_time(SystemTime::now())?);
        let signed_attrs = SetOfVec::try_from(signed_attrs)?;

        let signature = self
            .digest
            .sign(self.signer.private_key(), &signed_attrs.to_der()?)?;

        let signer_info = SignerInfo {
            version: CmsVersion::V1,
            sid: SignerIdentifier::IssuerAndSerialNumber(self.signer.issuer_and_serial_number()),
            digest_alg: self.digest.algorithm_identifier(),
            signed_attrs: Some(signed_attrs),
            signature_algorithm: hash::signature_algorithm_identifier(),
            signature: OctetString::new(signature)?,
            unsigned_attrs: None,
        };

        let signed_data = SignedData {
            version: CmsVersion::V1,
            digest_algorithms: SetOfVec::try_from(vec![self.digest.algorithm_identifier()])?,
            encap_content_info: EncapsulatedContentInfo {
                econtent_type: oid::ID_DATA,
                econtent: econtent.as_ref().map(|o| Any::encode_from(o)).transpose()?,
            },
            certificates: Some(CertificateSet(SetOfVec::try_from(vec![
                CertificateChoices::Certificate(self.signer.certificate().clone()),
            ])?)),
            crls: None,
            signer_infos: SignerInfos(SetOfVec::try_from(vec![signer_info])?),
        };

        let content_info = ContentInfo {
            content_type: oid::ID_SIGNED_DATA,
            content: Any::encode_from(&signed_data)?,
        };
        let der = content_info.to_der()?;
        debug!(
            message_type = %message.message_type(),
            transaction_id = %message.transaction_id(),
            status = ?message.pki_status(),
            len = der.len(),
            "encoded pkiMessage"
        );
        Ok(der)
    }
}
