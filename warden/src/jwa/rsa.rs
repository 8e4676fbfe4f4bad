//! RSA public keys

use serde::{Deserialize, Serialize};

use super::Algorithm;
use crate::{b64, error, jws};

const MIN_MODULUS_BYTES: usize = 2048 / 8;
const MAX_MODULUS_BYTES: usize = 8192 / 8;

/// RSA public key components
#[derive(Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PublicKeyDto", into = "PublicKeyDto")]
#[must_use]
pub struct PublicKey {
    modulus: Vec<u8>,
    exponent: Vec<u8>,
}

impl PublicKey {
    /// The public key's modulus, big-endian
    #[must_use]
    pub fn modulus(&self) -> &[u8] {
        &self.modulus
    }

    /// The public key's exponent, big-endian
    #[must_use]
    pub fn exponent(&self) -> &[u8] {
        &self.exponent
    }

    /// The size of the modulus in bits
    #[must_use]
    pub fn bits(&self) -> usize {
        self.modulus.len() * 8
    }

    /// Constructs a public key from the big-endian modulus and exponent
    ///
    /// # Errors
    ///
    /// The modulus must be between 2048 and 8192 bits, and the exponent must
    /// not be empty.
    pub fn from_components(
        modulus: impl Into<Vec<u8>>,
        exponent: impl Into<Vec<u8>>,
    ) -> Result<Self, error::KeyRejected> {
        let mut modulus = modulus.into();
        let exponent = exponent.into();

        let leading_zeros = modulus.iter().take_while(|&&b| b == 0).count();
        modulus.drain(..leading_zeros);

        if !(MIN_MODULUS_BYTES..=MAX_MODULUS_BYTES).contains(&modulus.len()) {
            return Err(error::KeyRejected::new(format!(
                "key modulus must be between 2048 and 8192 bits, got {}",
                modulus.len() * 8
            )));
        }

        if exponent.iter().all(|&b| b == 0) {
            return Err(error::KeyRejected::new("key exponent must be non-zero"));
        }

        Ok(Self { modulus, exponent })
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublicKey")
            .field("bits", &self.bits())
            .field("exponent", &b64::encode(&self.exponent))
            .finish_non_exhaustive()
    }
}

impl jws::Verifier for PublicKey {
    type Algorithm = Algorithm;
    type Error = error::SignatureMismatch;

    fn verify(&self, alg: Algorithm, signed: &[u8], signature: &[u8]) -> Result<(), Self::Error> {
        ring::signature::RsaPublicKeyComponents {
            n: self.modulus.as_slice(),
            e: self.exponent.as_slice(),
        }
        .verify(alg.verification_params(), signed, signature)
        .map_err(|_| error::SignatureMismatch)
    }
}

#[derive(Clone, Serialize, Deserialize)]
struct PublicKeyDto {
    n: String,
    e: String,
}

impl TryFrom<PublicKeyDto> for PublicKey {
    type Error = error::KeyRejected;

    fn try_from(dto: PublicKeyDto) -> Result<Self, Self::Error> {
        let modulus = b64::decode_lenient(&dto.n).map_err(error::KeyRejected::new)?;
        let exponent = b64::decode_lenient(&dto.e).map_err(error::KeyRejected::new)?;
        Self::from_components(modulus, exponent)
    }
}

impl From<PublicKey> for PublicKeyDto {
    fn from(key: PublicKey) -> Self {
        Self {
            n: b64::encode(&key.modulus),
            e: b64::encode(&key.exponent),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_modulus() {
        let err = PublicKey::from_components(vec![0xAB; 128], vec![1, 0, 1]);
        assert!(err.is_err());
    }

    #[test]
    fn strips_leading_zero_from_modulus() {
        let mut modulus = vec![0u8];
        modulus.extend(std::iter::repeat(0xC3).take(256));

        let key = PublicKey::from_components(modulus, vec![1, 0, 1]).unwrap();
        assert_eq!(key.bits(), 2048);
    }

    #[test]
    fn rejects_zero_exponent() {
        assert!(PublicKey::from_components(vec![0xC3; 256], vec![0]).is_err());
        assert!(PublicKey::from_components(vec![0xC3; 256], Vec::new()).is_err());
    }

    #[test]
    fn debug_omits_modulus() {
        let key = PublicKey::from_components(vec![0xC3; 256], vec![1, 0, 1]).unwrap();
        let debug = format!("{:?}", key);
        assert!(debug.contains("bits: 2048"));
        assert!(debug.contains("AQAB"));
    }
}
