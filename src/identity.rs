//! Signing identities.

use std::time::Duration;

use cms::cert::IssuerAndSerialNumber;
use der::Encode;
use pkcs8::DecodePublicKey;
use rsa::{pkcs1v15, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use spki::SubjectPublicKeyInfoOwned;
use x509_cert::{
    builder::{Builder, CertificateBuilder, Profile},
    name::Name,
    request::CertReq,
    serial_number::SerialNumber,
    time::Validity,
    Certificate,
};

use crate::algorithms::{oid, DigestAlgorithm};
use crate::errors::{Error, Result};

/// Validity of a self-signed requester certificate.
const SELF_SIGNED_VALIDITY: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// An RSA private key together with the certificate that binds it.
///
/// A requester without a CA-issued certificate signs its first request with a
/// [self-signed](Identity::self_signed) one.
#[derive(Clone, Debug)]
pub struct Identity {
    certificate: Certificate,
    private_key: RsaPrivateKey,
}

impl Identity {
    /// Pairs `private_key` with `certificate`, checking that they match.
    pub fn new(certificate: Certificate, private_key: RsaPrivateKey) -> Result<Self> {
        if rsa_public_key(&certificate)? != private_key.to_public_key() {
            return Err(Error::KeyMismatch);
        }
        Ok(Identity {
            certificate,
            private_key,
        })
    }

    /// Issues a self-signed certificate for `subject` over `private_key`.
    pub fn self_signed(private_key: RsaPrivateKey, subject: Name) -> Result<Self> {
        let spki = SubjectPublicKeyInfoOwned::from_key(private_key.to_public_key())?;
        let serial_number = serial_from_key(&spki)?;
        let signer = pkcs1v15::SigningKey::<Sha256>::new(private_key.clone());
        let profile = Profile::Leaf {
            issuer: subject.clone(),
            enable_key_agreement: false,
            enable_key_encipherment: true,
        };
        let certificate = CertificateBuilder::new(
            profile,
            serial_number,
            Validity::from_now(SELF_SIGNED_VALIDITY)?,
            subject,
            spki,
            &signer,
        )?
        .build::<pkcs1v15::Signature>()?;

        Ok(Identity {
            certificate,
            private_key,
        })
    }

    /// Issues an end-entity certificate for the subject and key of `csr`.
    ///
    /// This is what a CA does when it answers a PKCSReq with SUCCESS. The
    /// request signature is not checked here.
    pub fn issue(
        &self,
        csr: &CertReq,
        serial_number: SerialNumber,
        validity: Duration,
    ) -> Result<Certificate> {
        let signer = pkcs1v15::SigningKey::<Sha256>::new(self.private_key.clone());
        let profile = Profile::Leaf {
            issuer: self.certificate.tbs_certificate.subject.clone(),
            enable_key_agreement: false,
            enable_key_encipherment: true,
        };
        let certificate = CertificateBuilder::new(
            profile,
            serial_number,
            Validity::from_now(validity)?,
            csr.info.subject.clone(),
            csr.info.public_key.clone(),
            &signer,
        )?
        .build::<pkcs1v15::Signature>()?;
        Ok(certificate)
    }

    /// The certificate of this identity.
    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    /// The private key of this identity.
    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private_key
    }

    /// The public key of this identity.
    pub fn public_key(&self) -> RsaPublicKey {
        self.private_key.to_public_key()
    }

    /// Issuer and serial number of the certificate, used to address this
    /// identity as signer or recipient.
    pub fn issuer_and_serial_number(&self) -> IssuerAndSerialNumber {
        issuer_and_serial_number(&self.certificate)
    }
}

pub(crate) fn issuer_and_serial_number(certificate: &Certificate) -> IssuerAndSerialNumber {
    IssuerAndSerialNumber {
        issuer: certificate.tbs_certificate.issuer.clone(),
        serial_number: certificate.tbs_certificate.serial_number.clone(),
    }
}

/// Extracts the RSA public key of `certificate`.
pub(crate) fn rsa_public_key(certificate: &Certificate) -> Result<RsaPublicKey> {
    let spki = &certificate.tbs_certificate.subject_public_key_info;
    if spki.algorithm.oid != oid::RSA_ENCRYPTION {
        return Err(Error::UnsupportedAlgorithm(spki.algorithm.oid));
    }
    Ok(RsaPublicKey::from_public_key_der(&spki.to_der()?)?)
}

/// Checks that `certificate` names `issuer` as its issuer and carries a
/// signature made with the key of `issuer`.
pub(crate) fn verify_issued_by(certificate: &Certificate, issuer: &Certificate) -> Result<()> {
    if certificate.tbs_certificate.issuer != issuer.tbs_certificate.subject {
        return Err(Error::Verification);
    }
    let digest = DigestAlgorithm::from_signature_oid(certificate.signature_algorithm.oid)?;
    digest.verify(
        &rsa_public_key(issuer)?,
        &certificate.tbs_certificate.to_der()?,
        certificate.signature.raw_bytes(),
    )
}

/// Positive serial number taken from the key digest, stable for a given key.
fn serial_from_key(spki: &SubjectPublicKeyInfoOwned) -> Result<SerialNumber> {
    let mut bytes = DigestAlgorithm::Sha1.digest(&spki.to_der()?);
    bytes.truncate(8);
    bytes[0] = (bytes[0] & 0x7f) | 0x40;
    Ok(SerialNumber::new(&bytes)?)
}
