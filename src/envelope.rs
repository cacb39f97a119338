//! The pkcsPkiEnvelope: a CMS `EnvelopedData` carrying the operation payload.
//!
//! The payload is encrypted with a fresh symmetric key, and that key is
//! wrapped with RSAES-PKCS1-v1_5 to the single recipient's certificate.

use cms::{
    cert::IssuerAndSerialNumber,
    content_info::{CmsVersion, ContentInfo},
    enveloped_data::{
        EncryptedContentInfo, EnvelopedData, KeyTransRecipientInfo, RecipientIdentifier,
        RecipientInfo, RecipientInfos,
    },
};
use der::{
    asn1::{Any, OctetString},
    Decode, Encode,
};
use rand_core::CryptoRngCore;
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey};
use tracing::trace;
use x509_cert::Certificate;
use zeroize::Zeroizing;

use crate::algorithms::{self, CipherAlgorithm};
use crate::errors::{Error, Result};
use crate::identity;
use crate::oid;

/// An encrypted operation payload addressed to one recipient.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PkcsPkiEnvelope {
    inner: EnvelopedData,
}

impl PkcsPkiEnvelope {
    /// Encrypts `payload` to the RSA key of `recipient`.
    pub fn encrypt<R: CryptoRngCore>(
        rng: &mut R,
        payload: &[u8],
        recipient: &Certificate,
        cipher: CipherAlgorithm,
    ) -> Result<Self> {
        let public_key = identity::rsa_public_key(recipient)?;

        let key = cipher.generate_key(rng);
        let iv = cipher.generate_iv(rng);
        let encrypted_content = cipher.encrypt(&key, &iv, payload)?;
        let encrypted_key = public_key.encrypt(rng, Pkcs1v15Encrypt, &key)?;
        trace!(
            cipher = %cipher,
            payload_len = payload.len(),
            "encrypted pkcsPkiEnvelope"
        );

        let recipient_info = KeyTransRecipientInfo {
            version: CmsVersion::V0,
            rid: RecipientIdentifier::IssuerAndSerialNumber(identity::issuer_and_serial_number(
                recipient,
            )),
            key_enc_alg: recipient
                .tbs_certificate
                .subject_public_key_info
                .algorithm
                .clone(),
            enc_key: OctetString::new(encrypted_key)?,
        };

        Ok(PkcsPkiEnvelope {
            inner: EnvelopedData {
                version: CmsVersion::V0,
                originator_info: None,
                recip_infos: RecipientInfos::try_from(vec![RecipientInfo::Ktri(recipient_info)])?,
                encrypted_content: EncryptedContentInfo {
                    content_type: oid::ID_DATA,
                    content_enc_alg: cipher.algorithm_identifier(&iv)?,
                    encrypted_content: Some(OctetString::new(encrypted_content)?),
                },
                unprotected_attrs: None,
            },
        })
    }

    /// Decrypts the payload with the recipient's private key.
    pub fn decrypt(&self, private_key: &RsaPrivateKey) -> Result<Vec<u8>> {
        let recipient = self.key_transport()?;
        if recipient.key_enc_alg.oid != algorithms::oid::RSA_ENCRYPTION {
            return Err(Error::UnsupportedAlgorithm(recipient.key_enc_alg.oid));
        }

        let (cipher, iv) = self.cipher_and_iv()?;
        let key = Zeroizing::new(
            private_key
                .decrypt(Pkcs1v15Encrypt, recipient.enc_key.as_bytes())
                .map_err(|_| Error::Decryption)?,
        );
        if key.len() != cipher.key_len() {
            return Err(Error::Decryption);
        }

        let ciphertext = self
            .inner
            .encrypted_content
            .encrypted_content
            .as_ref()
            .ok_or(Error::MissingEnvelope)?;
        cipher.decrypt(&key, &iv, ciphertext.as_bytes())
    }

    /// The content-encryption algorithm of this envelope.
    pub fn cipher(&self) -> Result<CipherAlgorithm> {
        self.cipher_and_iv().map(|(cipher, _)| cipher)
    }

    /// Issuer and serial number of the recipient certificate.
    pub fn recipient(&self) -> Result<&IssuerAndSerialNumber> {
        match &self.key_transport()?.rid {
            RecipientIdentifier::IssuerAndSerialNumber(id) => Ok(id),
            RecipientIdentifier::SubjectKeyIdentifier(_) => Err(Error::RecipientCount(0)),
        }
    }

    /// Encodes the envelope as a DER `ContentInfo`.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        let content_info = ContentInfo {
            content_type: oid::ID_ENVELOPED_DATA,
            content: Any::encode_from(&self.inner)?,
        };
        Ok(content_info.to_der()?)
    }

    /// Decodes an envelope from a DER `ContentInfo`.
    pub fn from_der(bytes: &[u8]) -> Result<Self> {
        let content_info = ContentInfo::from_der(bytes)?;
        if content_info.content_type != oid::ID_ENVELOPED_DATA {
            return Err(Error::UnexpectedContentType(content_info.content_type));
        }
        let inner = EnvelopedData::from_der(&content_info.content.to_der()?)?;
        if !matches!(inner.version, CmsVersion::V0 | CmsVersion::V2) {
            return Err(Error::UnexpectedVersion("EnvelopedData"));
        }
        Ok(PkcsPkiEnvelope { inner })
    }

    fn key_transport(&self) -> Result<&KeyTransRecipientInfo> {
        let recipients = &self.inner.recip_infos.0;
        if recipients.len() != 1 {
            return Err(Error::RecipientCount(recipients.len()));
        }
        match recipients.iter().next() {
            Some(RecipientInfo::Ktri(ktri)) => Ok(ktri),
            _ => Err(Error::RecipientCount(0)),
        }
    }

    fn cipher_and_iv(&self) -> Result<(CipherAlgorithm, Vec<u8>)> {
        CipherAlgorithm::from_algorithm_identifier(&self.inner.encrypted_content.content_enc_alg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Identity;
    use core::str::FromStr;
    use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};
    use x509_cert::name::Name;

    fn identity(rng: &mut ChaCha8Rng, cn: &str) -> Identity {
        let key = RsaPrivateKey::new(rng, 1024).unwrap();
        Identity::self_signed(key, Name::from_str(cn).unwrap()).unwrap()
    }

    #[test]
    fn encrypt_decrypt() {
        let mut rng = ChaCha8Rng::from_seed([42; 32]);
        let ca = identity(&mut rng, "CN=ca");

        for cipher in [
            CipherAlgorithm::Des,
            CipherAlgorithm::DesEde3,
            CipherAlgorithm::Aes128,
        ] {
            let envelope =
                PkcsPkiEnvelope::encrypt(&mut rng, b"payload", ca.certificate(), cipher).unwrap();
            assert_eq!(envelope.cipher().unwrap(), cipher);

            let decoded = PkcsPkiEnvelope::from_der(&envelope.to_der().unwrap()).unwrap();
            assert_eq!(decoded, envelope);
            assert_eq!(decoded.decrypt(ca.private_key()).unwrap(), b"payload");
            assert_eq!(
                decoded.recipient().unwrap(),
                &ca.issuer_and_serial_number()
            );
        }
    }

    #[test]
    fn wrong_key() {
        let mut rng = ChaCha8Rng::from_seed([42; 32]);
        let ca = identity(&mut rng, "CN=ca");
        let other = identity(&mut rng, "CN=other");

        let envelope =
            PkcsPkiEnvelope::encrypt(&mut rng, b"payload", ca.certificate(), CipherAlgorithm::Des)
                .unwrap();
        assert!(matches!(
            envelope.decrypt(other.private_key()),
            Err(Error::Decryption)
        ));
    }

    #[test]
    fn wrong_content_type() {
        let content_info = ContentInfo {
            content_type: oid::ID_DATA,
            content: Any::encode_from(&OctetString::new(vec![1, 2, 3]).unwrap()).unwrap(),
        };
        assert!(matches!(
            PkcsPkiEnvelope::from_der(&content_info.to_der().unwrap()),
            Err(Error::UnexpectedContentType(oid::ID_DATA))
        ));
    }
}
