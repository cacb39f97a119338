//! Degenerate certificates-only `SignedData`.
//!
//! A SUCCESS response carries the issued certificates or the requested CRL in
//! a `SignedData` with no signers and no encapsulated content.

use cms::{
    cert::CertificateChoices,
    content_info::{CmsVersion, ContentInfo},
    revocation::{RevocationInfoChoice, RevocationInfoChoices},
    signed_data::{CertificateSet, EncapsulatedContentInfo, SignedData, SignerInfos},
};
use der::{
    asn1::{Any, SetOfVec},
    Decode, Encode,
};
use x509_cert::{crl::CertificateList, Certificate};

use crate::errors::{Error, Result};
use crate::oid;

/// Certificates and CRLs returned by a CA.
///
/// Order follows the DER ordering of the underlying SET OF, not the order in
/// which the CA listed them.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CertStore {
    /// Certificates, typically the issued certificate and its chain.
    pub certificates: Vec<Certificate>,
    /// Certificate revocation lists.
    pub crls: Vec<CertificateList>,
}

impl CertStore {
    /// A store holding `certificates` only.
    pub fn with_certificates(certificates: Vec<Certificate>) -> Self {
        CertStore {
            certificates,
            crls: Vec::new(),
        }
    }

    /// A store holding `crls` only.
    pub fn with_crls(crls: Vec<CertificateList>) -> Self {
        CertStore {
            certificates: Vec::new(),
            crls,
        }
    }

    /// Returns `true` if the store holds neither certificates nor CRLs.
    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty() && self.crls.is_empty()
    }

    /// Parses a degenerate `ContentInfo(signedData)`. Other certificate and
    /// revocation formats are skipped.
    pub fn from_der(bytes: &[u8]) -> Result<Self> {
        let content_info = ContentInfo::from_der(bytes)?;
        if content_info.content_type != oid::ID_SIGNED_DATA {
            return Err(Error::UnexpectedContentType(content_info.content_type));
        }
        let signed_data = SignedData::from_der(&content_info.content.to_der()?)?;

        let certificates = signed_data
            .certificates
            .map(|set| {
                set.0
                    .iter()
                    .filter_map(|choice| match choice {
                        CertificateChoices::Certificate(cert) => Some(cert.clone()),
                        CertificateChoices::Other(_) => None,
                    })
                    .collect()
            })
            .unwrap_or_default();
        let crls = signed_data
            .crls
            .map(|set| {
                set.0
                    .iter()
                    .filter_map(|choice| match choice {
                        RevocationInfoChoice::Crl(crl) => Some(crl.clone()),
                        RevocationInfoChoice::Other(_) => None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(CertStore { certificates, crls })
    }

    /// Encodes the store as a degenerate `ContentInfo(signedData)`.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        let certificates = if self.certificates.is_empty() {
            None
        } else {
            Some(CertificateSet(SetOfVec::try_from(
                self.certificates
                    .iter()
                    .cloned()
                    .map(CertificateChoices::Certificate)
                    .collect::<Vec<_>>(),
            )?))
        };
        let crls = if self.crls.is_empty() {
            None
        } else {
            Some(RevocationInfoChoices(SetOfVec::try_from(
                self.crls
                    .iter()
                    .cloned()
                    .map(RevocationInfoChoice::Crl)
                    .collect::<Vec<_>>(),
            )?))
        };

        let signed_data = SignedData {
            version: CmsVersion::V1,
            digest_algorithms: SetOfVec::new(),
            encap_content_info: EncapsulatedContentInfo {
                econtent_type: oid::ID_DATA,
                econtent: None,
            },
            certificates,
            crls,
            signer_infos: SignerInfos(SetOfVec::new()),
        };
        let content_info = ContentInfo {
            content_type: oid::ID_SIGNED_DATA,
            content: Any::encode_from(&signed_data)?,
        };
        Ok(content_info.to_der()?)
    }
}
