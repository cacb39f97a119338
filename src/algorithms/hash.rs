use core::fmt;
use core::str::FromStr;

use const_oid::ObjectIdentifier;
use der::asn1::{Any, AnyRef};
use digest::Digest;
use md5::Md5;
use rsa::{Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use sha1::Sha1;
use sha2::{Sha256, Sha512};
use spki::AlgorithmIdentifierOwned;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::oid;
use crate::errors::{Error, Result};

/// Message digest used for the `messageDigest` attribute, the signer
/// signature and key-derived transaction ids.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DigestAlgorithm {
    /// MD5, still the only digest some legacy SCEP servers accept.
    Md5,
    /// SHA-1
    Sha1,
    /// SHA-256
    #[default]
    Sha256,
    /// SHA-512
    Sha512,
}

impl DigestAlgorithm {
    /// Object identifier of this digest.
    pub const fn oid(self) -> ObjectIdentifier {
        match self {
            DigestAlgorithm::Md5 => oid::MD5,
            DigestAlgorithm::Sha1 => oid::SHA1,
            DigestAlgorithm::Sha256 => oid::SHA256,
            DigestAlgorithm::Sha512 => oid::SHA512,
        }
    }

    /// Looks up a digest by object identifier.
    pub fn from_oid(oid: ObjectIdentifier) -> Result<Self> {
        match oid {
            oid::MD5 => Ok(DigestAlgorithm::Md5),
            oid::SHA1 => Ok(DigestAlgorithm::Sha1),
            oid::SHA256 => Ok(DigestAlgorithm::Sha256),
            oid::SHA512 => Ok(DigestAlgorithm::Sha512),
            _ => Err(Error::UnsupportedAlgorithm(oid)),
        }
    }

    /// Looks up the digest of a combined `*WithRSAEncryption` signature
    /// algorithm.
    pub fn from_signature_oid(oid: ObjectIdentifier) -> Result<Self> {
        match oid {
            oid::MD5_WITH_RSA_ENCRYPTION => Ok(DigestAlgorithm::Md5),
            oid::SHA1_WITH_RSA_ENCRYPTION => Ok(DigestAlgorithm::Sha1),
            oid::SHA256_WITH_RSA_ENCRYPTION => Ok(DigestAlgorithm::Sha256),
            oid::SHA512_WITH_RSA_ENCRYPTION => Ok(DigestAlgorithm::Sha512),
            _ => Err(Error::UnsupportedAlgorithm(oid)),
        }
    }

    /// Name used in CA capability lists.
    pub const fn name(self) -> &'static str {
        match self {
            DigestAlgorithm::Md5 => "MD5",
            DigestAlgorithm::Sha1 => "SHA-1",
            DigestAlgorithm::Sha256 => "SHA-256",
            DigestAlgorithm::Sha512 => "SHA-512",
        }
    }

    /// Algorithm identifier with NULL parameters.
    pub fn algorithm_identifier(self) -> AlgorithmIdentifierOwned {
        AlgorithmIdentifierOwned {
            oid: self.oid(),
            parameters: Some(Any::from(AnyRef::NULL)),
        }
    }

    /// Hashes `msg`.
    pub fn digest(self, msg: &[u8]) -> Vec<u8> {
        match self {
            DigestAlgorithm::Md5 => Md5::digest(msg).to_vec(),
            DigestAlgorithm::Sha1 => Sha1::digest(msg).to_vec(),
            DigestAlgorithm::Sha256 => Sha256::digest(msg).to_vec(),
            DigestAlgorithm::Sha512 => Sha512::digest(msg).to_vec(),
        }
    }

    /// Hashes `msg` and signs the digest with RSASSA-PKCS1-v1_5.
    pub fn sign(self, key: &RsaPrivateKey, msg: &[u8]) -> Result<Vec<u8>> {
        let hashed = self.digest(msg);
        Ok(key.sign(self.padding(), &hashed)?)
    }

    /// Hashes `msg` and verifies an RSASSA-PKCS1-v1_5 signature over it.
    pub fn verify(self, key: &RsaPublicKey, msg: &[u8], sig: &[u8]) -> Result<()> {
        let hashed = self.digest(msg);
        key.verify(self.padding(), &hashed, sig)
            .map_err(|_| Error::Verification)
    }

    fn padding(self) -> Pkcs1v15Sign {
        match self {
            DigestAlgorithm::Md5 => Pkcs1v15Sign::new::<Md5>(),
            DigestAlgorithm::Sha1 => Pkcs1v15Sign::new::<Sha1>(),
            DigestAlgorithm::Sha256 => Pkcs1v15Sign::new::<Sha256>(),
            DigestAlgorithm::Sha512 => Pkcs1v15Sign::new::<Sha512>(),
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().replace('-', "").as_str() {
            "MD5" => Ok(DigestAlgorithm::Md5),
            "SHA1" => Ok(DigestAlgorithm::Sha1),
            "SHA256" => Ok(DigestAlgorithm::Sha256),
            "SHA512" => Ok(DigestAlgorithm::Sha512),
            _ => Err(Error::UnknownAlgorithmName(s.into())),
        }
    }
}

/// Signature algorithm identifier placed in the signer info.
pub(crate) fn signature_algorithm_identifier() -> AlgorithmIdentifierOwned {
    AlgorithmIdentifierOwned {
        oid: oid::RSA_ENCRYPTION,
        parameters: Some(Any::from(AnyRef::NULL)),
    }
}

/// Accepts `rsaEncryption` as well as the combined `*WithRSAEncryption`
/// identifiers some servers emit, as long as the latter name `digest`.
pub(crate) fn check_signature_algorithm(
    alg: &AlgorithmIdentifierOwned,
    digest: DigestAlgorithm,
) -> Result<()> {
    if alg.oid == oid::RSA_ENCRYPTION {
        return Ok(());
    }
    if DigestAlgorithm::from_signature_oid(alg.oid)? != digest {
        return Err(Error::SignatureAlgorithmMismatch(alg.oid));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;
    use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};

    #[test]
    fn digests() {
        assert_eq!(
            DigestAlgorithm::Md5.digest(b"abc"),
            hex!("900150983cd24fb0d6963f7d28e17f72")
        );
        assert_eq!(
            DigestAlgorithm::Sha1.digest(b"abc"),
            hex!("a9993e364706816aba3e25717850c26c9cd0d89d")
        );
        assert_eq!(
            DigestAlgorithm::Sha256.digest(b"abc"),
            hex!("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
        );
        assert_eq!(DigestAlgorithm::Sha512.digest(b"abc").len(), 64);
    }

    #[test]
    fn oids_and_names() {
        for alg in [
            DigestAlgorithm::Md5,
            DigestAlgorithm::Sha1,
            DigestAlgorithm::Sha256,
            DigestAlgorithm::Sha512,
        ] {
            assert_eq!(DigestAlgorithm::from_oid(alg.oid()).unwrap(), alg);
            assert_eq!(alg.name().parse::<DigestAlgorithm>().unwrap(), alg);
        }
        assert_eq!("sha256".parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::Sha256);
        assert!("SHA-384".parse::<DigestAlgorithm>().is_err());
        assert!(DigestAlgorithm::from_oid(oid::DES_CBC).is_err());
    }

    #[test]
    fn sign_verify() {
        let mut rng = ChaCha8Rng::from_seed([42; 32]);
        let key = RsaPrivateKey::new(&mut rng, 1024).unwrap();
        let public = key.to_public_key();

        for alg in [DigestAlgorithm::Md5, DigestAlgorithm::Sha1, DigestAlgorithm::Sha256] {
            let sig = alg.sign(&key, b"signed attributes").unwrap();
            assert!(alg.verify(&public, b"signed attributes", &sig).is_ok());
            assert!(matches!(
                alg.verify(&public, b"other attributes", &sig),
                Err(Error::Verification)
            ));
        }
    }
    #[test]
    fn signature_algorithms() {
        let with_rsa = |oid| AlgorithmIdentifierOwned {
            oid,
            parameters: Some(Any::from(AnyRef::NULL)),
        };

        assert!(
            check_signature_algorithm(&signature_algorithm_identifier(), DigestAlgorithm::Md5)
                .is_ok()
        );
        assert!(check_signature_algorithm(
            &with_rsa(oid::SHA256_WITH_RSA_ENCRYPTION),
            DigestAlgorithm::Sha256
        )
        .is_ok());
        assert!(matches!(
            check_signature_algorithm(
                &with_rsa(oid::SHA1_WITH_RSA_ENCRYPTION),
                DigestAlgorithm::Sha256
            ),
            Err(Error::SignatureAlgorithmMismatch(oid::SHA1_WITH_RSA_ENCRYPTION))
        ));
        assert!(matches!(
            check_signature_algorithm(&with_rsa(oid::SHA256), DigestAlgorithm::Sha256),
            Err(Error::UnsupportedAlgorithm(_))
        ));
        assert_eq!(
            DigestAlgorithm::from_signature_oid(oid::SHA512_WITH_RSA_ENCRYPTION).unwrap(),
            DigestAlgorithm::Sha512
        );
    }
}
