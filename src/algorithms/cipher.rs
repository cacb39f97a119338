use core::fmt;
use core::str::FromStr;

use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use const_oid::ObjectIdentifier;
use der::{asn1::Any, Tag, Tagged};
use rand_core::CryptoRngCore;
use spki::AlgorithmIdentifierOwned;
use zeroize::Zeroizing;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::oid;
use crate::errors::{Error, Result};

/// Content-encryption algorithm of a pkcsPkiEnvelope. All modes are CBC with
/// PKCS#7 padding.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CipherAlgorithm {
    /// Single DES, the SCEP baseline every CA understands.
    Des,
    /// Triple DES (EDE, three keys).
    #[default]
    DesEde3,
    /// AES with a 128 bit key.
    Aes128,
}

impl CipherAlgorithm {
    /// Object identifier of this cipher in CBC mode.
    pub const fn oid(self) -> ObjectIdentifier {
        match self {
            CipherAlgorithm::Des => oid::DES_CBC,
            CipherAlgorithm::DesEde3 => oid::DES_EDE3_CBC,
            CipherAlgorithm::Aes128 => oid::AES128_CBC,
        }
    }

    /// Looks up a cipher by object identifier.
    pub fn from_oid(oid: ObjectIdentifier) -> Result<Self> {
        match oid {
            oid::DES_CBC => Ok(CipherAlgorithm::Des),
            oid::DES_EDE3_CBC => Ok(CipherAlgorithm::DesEde3),
            oid::AES128_CBC => Ok(CipherAlgorithm::Aes128),
            _ => Err(Error::UnsupportedAlgorithm(oid)),
        }
    }

    /// Name used in CA capability lists.
    pub const fn name(self) -> &'static str {
        match self {
            CipherAlgorithm::Des => "DES",
            CipherAlgorithm::DesEde3 => "DES3",
            CipherAlgorithm::Aes128 => "AES",
        }
    }

    /// Key length in bytes.
    pub const fn key_len(self) -> usize {
        match self {
            CipherAlgorithm::Des => 8,
            CipherAlgorithm::DesEde3 => 24,
            CipherAlgorithm::Aes128 => 16,
        }
    }

    /// IV length in bytes, equal to the block size.
    pub const fn iv_len(self) -> usize {
        match self {
            CipherAlgorithm::Des | CipherAlgorithm::DesEde3 => 8,
            CipherAlgorithm::Aes128 => 16,
        }
    }

    /// Generates a fresh content-encryption key. DES keys carry odd parity.
    pub fn generate_key<R: CryptoRngCore>(self, rng: &mut R) -> Zeroizing<Vec<u8>> {
        let mut key = Zeroizing::new(vec![0u8; self.key_len()]);
        rng.fill_bytes(&mut key);
        if matches!(self, CipherAlgorithm::Des | CipherAlgorithm::DesEde3) {
            for b in key.iter_mut() {
                *b = with_odd_parity(*b);
            }
        }
        key
    }

    /// Generates a fresh IV.
    pub fn generate_iv<R: CryptoRngCore>(self, rng: &mut R) -> Vec<u8> {
        let mut iv = vec![0u8; self.iv_len()];
        rng.fill_bytes(&mut iv);
        iv
    }

    /// Algorithm identifier carrying `iv` as an OCTET STRING parameter.
    pub fn algorithm_identifier(self, iv: &[u8]) -> Result<AlgorithmIdentifierOwned> {
        Ok(AlgorithmIdentifierOwned {
            oid: self.oid(),
            parameters: Some(Any::new(Tag::OctetString, iv)?),
        })
    }

    /// Recovers the cipher and IV from a content-encryption algorithm identifier.
    pub fn from_algorithm_identifier(alg: &AlgorithmIdentifierOwned) -> Result<(Self, Vec<u8>)> {
        let cipher = Self::from_oid(alg.oid)?;
        let params = alg.parameters.as_ref().ok_or(Error::InvalidKeyLength)?;
        if params.tag() != Tag::OctetString || params.value().len() != cipher.iv_len() {
            return Err(Error::InvalidKeyLength);
        }
        Ok((cipher, params.value().to_vec()))
    }

    /// Encrypts `msg` in CBC mode with PKCS#7 padding.
    pub fn encrypt(self, key: &[u8], iv: &[u8], msg: &[u8]) -> Result<Vec<u8>> {
        let ciphertext = match self {
            CipherAlgorithm::Des => cbc::Encryptor::<des::Des>::new_from_slices(key, iv)
                .map_err(|_| Error::InvalidKeyLength)?
                .encrypt_padded_vec_mut::<Pkcs7>(msg),
            CipherAlgorithm::DesEde3 => cbc::Encryptor::<des::TdesEde3>::new_from_slices(key, iv)
                .map_err(|_| Error::InvalidKeyLength)?
                .encrypt_padded_vec_mut::<Pkcs7>(msg),
            CipherAlgorithm::Aes128 => cbc::Encryptor::<aes::Aes128>::new_from_slices(key, iv)
                .map_err(|_| Error::InvalidKeyLength)?
                .encrypt_padded_vec_mut::<Pkcs7>(msg),
        };
        Ok(ciphertext)
    }

    /// Decrypts `ciphertext` and strips the PKCS#7 padding.
    pub fn decrypt(self, key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
        let plaintext = match self {
            CipherAlgorithm::Des => cbc::Decryptor::<des::Des>::new_from_slices(key, iv)
                .map_err(|_| Error::InvalidKeyLength)?
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
            CipherAlgorithm::DesEde3 => cbc::Decryptor::<des::TdesEde3>::new_from_slices(key, iv)
                .map_err(|_| Error::InvalidKeyLength)?
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
            CipherAlgorithm::Aes128 => cbc::Decryptor::<aes::Aes128>::new_from_slices(key, iv)
                .map_err(|_| Error::InvalidKeyLength)?
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
        };
        plaintext.map_err(|_| Error::Decryption)
    }
}

impl fmt::Display for CipherAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CipherAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().replace('-', "").as_str() {
            "DES" => Ok(CipherAlgorithm::Des),
            "DES3" | "3DES" | "DESEDE" | "TRIPLEDES" => Ok(CipherAlgorithm::DesEde3),
            "AES" | "AES128" => Ok(CipherAlgorithm::Aes128),
            _ => Err(Error::UnknownAlgorithmName(s.into())),
        }
    }
}

/// Sets the low bit of a DES key byte so the byte has an odd number of ones.
fn with_odd_parity(b: u8) -> u8 {
    let high = b & 0xfe;
    high | ((high.count_ones() + 1) & 1) as u8
}
