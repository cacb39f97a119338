//! Anti-replay nonces.

use core::fmt;
use core::hash::{Hash, Hasher};

use rand_core::CryptoRngCore;
use subtle::ConstantTimeEq;

/// Length of a generated nonce in bytes.
pub const NONCE_LEN: usize = 16;

/// A `senderNonce` or `recipientNonce` value.
///
/// Equality is evaluated in constant time.
#[derive(Clone)]
pub struct Nonce(Vec<u8>);

impl Nonce {
    /// Wraps raw nonce bytes received from a peer.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Nonce(bytes.into())
    }

    /// Generates a fresh [`NONCE_LEN`] byte nonce.
    pub fn generate<R: CryptoRngCore>(rng: &mut R) -> Self {
        Self::generate_with_len(rng, NONCE_LEN)
    }

    /// Generates a fresh nonce of `len` bytes.
    pub fn generate_with_len<R: CryptoRngCore>(rng: &mut R, len: usize) -> Self {
        let mut bytes = vec![0u8; len];
        rng.fill_bytes(&mut bytes);
        Nonce(bytes)
    }

    /// Raw bytes of this nonce.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for Nonce {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl PartialEq for Nonce {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for Nonce {}

impl Hash for Nonce {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state)
    }
}

impl fmt::Debug for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Nonce({})", hex::encode(&self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;
    use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};

    #[test]
    fn generate() {
        let mut rng = ChaCha8Rng::from_seed([42; 32]);
        let a = Nonce::generate(&mut rng);
        let b = Nonce::generate(&mut rng);
        assert_eq!(a.as_bytes().len(), NONCE_LEN);
        assert_ne!(a, b);
        assert_eq!(Nonce::generate_with_len(&mut rng, 8).as_bytes().len(), 8);
    }

    #[test]
    fn equality() {
        let a = Nonce::new(hex!("000102030405060708090a0b0c0d0e0f"));
        assert_eq!(a, a.clone());
        assert_ne!(a, Nonce::new(hex!("000102030405060708090a0b0c0d0e")));
        assert_ne!(a, Nonce::new(hex!("000102030405060708090a0b0c0d0e0e")));
        assert_eq!(format!("{:?}", Nonce::new([0xde, 0xad])), "Nonce(dead)");
    }
}
