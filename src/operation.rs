//! Operation payloads carried inside the pkcsPkiEnvelope.

use cms::cert::IssuerAndSerialNumber;
use const_oid::AssociatedOid;
use der::{asn1::PrintableString, Decode, Encode, Sequence};
use rsa::{pkcs1v15, RsaPrivateKey};
use sha2::Sha256;
use x509_cert::{
    builder::{Builder, RequestBuilder},
    ext::pkix::name::DirectoryString,
    name::Name,
    request::{attributes::ChallengePassword, CertReq},
    serial_number::SerialNumber,
};

use crate::errors::{Error, Result};
use crate::status::MessageType;

/// Payload of a GetCertInitial poll.
///
/// ```text
/// IssuerAndSubject ::= SEQUENCE {
///     issuer     Name,
///     subject    Name }
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct IssuerAndSubject {
    /// Name of the CA the request was sent to.
    pub issuer: Name,
    /// Subject of the pending request.
    pub subject: Name,
}

/// A SCEP request operation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PkiOperation {
    /// Enroll a PKCS#10 certification request.
    PkcsReq(CertReq),
    /// Poll for the certificate of a pending enrollment.
    GetCertInitial(IssuerAndSubject),
    /// Fetch a certificate by issuer and serial number.
    GetCert(IssuerAndSerialNumber),
    /// Fetch the CRL covering a certificate.
    GetCrl(IssuerAndSerialNumber),
}

impl PkiOperation {
    /// Builds a PKCSReq for `subject` over `private_key`, signed with
    /// SHA-256 and carrying an optional challenge password.
    pub fn pkcs_req(
        private_key: &RsaPrivateKey,
        subject: Name,
        challenge_password: Option<&str>,
    ) -> Result<Self> {
        let signer = pkcs1v15::SigningKey::<Sha256>::new(private_key.clone());
        let mut builder = RequestBuilder::new(subject, &signer)?;
        if let Some(password) = challenge_password {
            builder.add_attribute(&ChallengePassword(directory_string(password)))?;
        }
        Ok(PkiOperation::PkcsReq(
            builder.build::<pkcs1v15::Signature>()?,
        ))
    }

    /// Builds a GetCert for the certificate `serial_number` issued by `issuer`.
    pub fn get_cert(issuer: Name, serial_number: SerialNumber) -> Self {
        PkiOperation::GetCert(IssuerAndSerialNumber {
            issuer,
            serial_number,
        })
    }

    /// Builds a GetCRL for the certificate `serial_number` issued by `issuer`.
    pub fn get_crl(issuer: Name, serial_number: SerialNumber) -> Self {
        PkiOperation::GetCrl(IssuerAndSerialNumber {
            issuer,
            serial_number,
        })
    }

    /// Builds a GetCertInitial poll.
    pub fn get_cert_initial(issuer: Name, subject: Name) -> Self {
        PkiOperation::GetCertInitial(IssuerAndSubject { issuer, subject })
    }

    /// The `messageType` of a request carrying this operation.
    pub fn message_type(&self) -> MessageType {
        match self {
            PkiOperation::PkcsReq(_) => MessageType::PkcsReq,
            PkiOperation::GetCertInitial(_) => MessageType::GetCertInitial,
            PkiOperation::GetCert(_) => MessageType::GetCert,
            PkiOperation::GetCrl(_) => MessageType::GetCrl,
        }
    }

    /// Whether the CA may answer PENDING.
    pub fn is_delayable(&self) -> bool {
        matches!(
            self,
            PkiOperation::PkcsReq(_) | PkiOperation::GetCertInitial(_)
        )
    }

    /// DER encoding of the payload.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        let der = match self {
            PkiOperation::PkcsReq(csr) => csr.to_der()?,
            PkiOperation::GetCertInitial(ias) => ias.to_der()?,
            PkiOperation::GetCert(iasn) | PkiOperation::GetCrl(iasn) => iasn.to_der()?,
        };
        Ok(der)
    }

    /// Decodes the payload of a request of type `message_type`.
    pub fn from_der(message_type: MessageType, bytes: &[u8]) -> Result<Self> {
        Ok(match message_type {
            MessageType::PkcsReq => PkiOperation::PkcsReq(CertReq::from_der(bytes)?),
            MessageType::GetCertInitial => {
                PkiOperation::GetCertInitial(IssuerAndSubject::from_der(bytes)?)
            }
            MessageType::GetCert => PkiOperation::GetCert(IssuerAndSerialNumber::from_der(bytes)?),
            MessageType::GetCrl => PkiOperation::GetCrl(IssuerAndSerialNumber::from_der(bytes)?),
            MessageType::CertRep => return Err(Error::UnexpectedMessageType(message_type)),
        })
    }

    /// The challenge password of a PKCSReq, if any.
    pub fn challenge_password(&self) -> Option<String> {
        let csr = match self {
            PkiOperation::PkcsReq(csr) => csr,
            _ => return None,
        };
        let attr = csr
            .info
            .attributes
            .iter()
            .find(|attr| attr.oid == ChallengePassword::OID)?;
        let value = attr.values.iter().next()?;
        DirectoryString::from_der(&value.to_der().ok()?)
            .ok()
            .map(|s| match s {
                DirectoryString::PrintableString(s) => s.to_string(),
                DirectoryString::TeletexString(s) => s.to_string(),
                DirectoryString::Utf8String(s) => s,
            })
    }
}

/// PrintableString when the password allows it, UTF8String otherwise.
fn directory_string(password: &str) -> DirectoryString {
    match PrintableString::new(password) {
        Ok(s) => DirectoryString::PrintableString(s),
        Err(_) => DirectoryString::Utf8String(password.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::str::FromStr;
    use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};

    #[test]
    fn message_types() {
        let issuer = Name::from_str("CN=ca").unwrap();
        let subject = Name::from_str("CN=example.org").unwrap();
        let serial = SerialNumber::from(7u32);

        let ops = [
            (
                PkiOperation::get_cert_initial(issuer.clone(), subject),
                MessageType::GetCertInitial,
                true,
            ),
            (
                PkiOperation::get_cert(issuer.clone(), serial.clone()),
                MessageType::GetCert,
                false,
            ),
            (PkiOperation::get_crl(issuer, serial), MessageType::GetCrl, false),
        ];
        for (op, message_type, delayable) in ops {
            assert_eq!(op.message_type(), message_type);
            assert_eq!(op.is_delayable(), delayable);
            let der = op.to_der().unwrap();
            assert_eq!(PkiOperation::from_der(message_type, &der).unwrap(), op);
        }
    }

    #[test]
    fn pkcs_req() {
        let mut rng = ChaCha8Rng::from_seed([42; 32]);
        let key = RsaPrivateKey::new(&mut rng, 1024).unwrap();
        let op = PkiOperation::pkcs_req(
            &key,
            Name::from_str("CN=example.org").unwrap(),
            Some("secret"),
        )
        .unwrap();

        assert_eq!(op.message_type(), MessageType::PkcsReq);
        assert!(op.is_delayable());
        assert_eq!(op.challenge_password().as_deref(), Some("secret"));

        let decoded = PkiOperation::from_der(MessageType::PkcsReq, &op.to_der().unwrap()).unwrap();
        assert_eq!(decoded, op);
    }

    #[test]
    fn cert_rep_is_not_an_operation() {
        assert!(matches!(
            PkiOperation::from_der(MessageType::CertRep, &[]),
            Err(Error::UnexpectedMessageType(MessageType::CertRep))
        ));
    }
}
