//! Implementations of the JSON Web Keys (JWK) standard
//!
//! The specifications for JSON Web Keys can be found in [RFC7517][].
//! Only RSA public keys (`"kty": "RSA"`) are modelled.
//!
//! [RFC7517]: https://tools.ietf.org/html/rfc7517

use aliri_braid::braid;
use serde::{Deserialize, Serialize};

use crate::{error, jwa, jws::Verifier};

/// An identifier for a JWK
#[braid(serde, ref_doc = "A borrowed reference to JWK identifier ([`KeyId`])")]
pub struct KeyId;

/// An identified JSON Web Key
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "JwkDto", into = "JwkDto")]
#[must_use]
pub struct Jwk {
    key_id: Option<KeyId>,
    usage: Option<jwa::Usage>,
    algorithm: Option<jwa::Algorithm>,
    key: jwa::rsa::PublicKey,
}

impl Jwk {
    /// The key ID
    #[must_use]
    pub fn key_id(&self) -> Option<&KeyIdRef> {
        self.key_id.as_deref()
    }

    /// The intended usage of the key
    #[must_use]
    pub fn usage(&self) -> Option<jwa::Usage> {
        self.usage
    }

    /// The algorithm this key is pinned to, if any
    #[must_use]
    pub fn algorithm(&self) -> Option<jwa::Algorithm> {
        self.algorithm
    }

    /// The RSA public key material
    pub fn public_key(&self) -> &jwa::rsa::PublicKey {
        &self.key
    }

    /// Whether the key could verify a signature made with `alg`
    #[must_use]
    pub fn is_compatible(&self, alg: jwa::Algorithm) -> bool {
        self.algorithm.map_or(true, |a| a == alg) && self.usage != Some(jwa::Usage::Encryption)
    }
}

impl Verifier for Jwk {
    type Algorithm = jwa::Algorithm;
    type Error = error::JwkVerifyError;

    /// Refuses up front when the key is declared for encryption or pinned
    /// to a different algorithm, before any RSA work is done
    fn verify(
        &self,
        alg: jwa::Algorithm,
        signed: &[u8],
        signature: &[u8],
    ) -> Result<(), Self::Error> {
        if let Some(usage) = self.usage.filter(|&u| u != jwa::Usage::Signing) {
            return Err(error::UsageMismatch::new(usage).into());
        }

        if let Some(pinned) = self.algorithm.filter(|&a| a != alg) {
            return Err(error::IncompatibleAlgorithm::new(pinned, alg).into());
        }

        Ok(self.key.verify(alg, signed, signature)?)
    }
}

#[derive(Clone, Serialize, Deserialize)]
struct JwkDto {
    #[serde(rename = "kid", default, skip_serializing_if = "Option::is_none")]
    key_id: Option<KeyId>,

    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    usage: Option<jwa::Usage>,

    #[serde(rename = "alg", default, skip_serializing_if = "Option::is_none")]
    algorithm: Option<jwa::Algorithm>,

    #[serde(flatten)]
    key: KeyMaterial,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "kty")]
enum KeyMaterial {
    #[serde(rename = "RSA")]
    Rsa(jwa::rsa::PublicKey),
}

impl From<JwkDto> for Jwk {
    fn from(dto: JwkDto) -> Self {
        let KeyMaterial::Rsa(key) = dto.key;
        Self {
            key_id: dto.key_id,
            usage: dto.usage,
            algorithm: dto.algorithm,
            key,
        }
    }
}

impl From<Jwk> for JwkDto {
    fn from(jwk: Jwk) -> Self {
        Self {
            key_id: jwk.key_id,
            usage: jwk.usage,
            algorithm: jwk.algorithm,
            key: KeyMaterial::Rsa(jwk.key),
        }
    }
}

#[cfg(test)]
mod tests {
    use color_eyre::Result;

    use super::*;
    use crate::test_util;

    #[test]
    fn decodes_auth0_style_key() -> Result<()> {
        let json = serde_json::json!({
            "kty": "RSA",
            "use": "sig",
            "n": test_util::PRIMARY_MODULUS,
            "e": "AQAB",
            "kid": "abc123",
            "x5t": "ignored",
            "x5c": ["ignored"],
            "alg": "RS256",
        });

        let jwk: Jwk = serde_json::from_value(json)?;
        assert_eq!(jwk.key_id().map(KeyIdRef::as_str), Some("abc123"));
        assert_eq!(jwk.algorithm(), Some(jwa::Algorithm::RS256));
        assert_eq!(jwk.usage(), Some(jwa::Usage::Signing));
        assert_eq!(jwk.public_key().bits(), 2048);
        Ok(())
    }

    #[test]
    fn rejects_non_rsa_key_type() {
        let json = serde_json::json!({
            "kty": "EC",
            "crv": "P-256",
            "x": "f83OJ3D2xF1Bg8vub9tLe1gHMzV76e8Tus9uPHvRVEU",
            "y": "x_FEzRu9m36HLN_tue659LNpXW6pCyStikYjKIWI5a0",
        });

        assert!(serde_json::from_value::<Jwk>(json).is_err());
    }

    #[test]
    fn pinned_algorithm_limits_compatibility() -> Result<()> {
        let jwk: Jwk = serde_json::from_value(serde_json::json!({
            "kty": "RSA",
            "alg": "RS256",
            "n": test_util::PRIMARY_MODULUS,
            "e": "AQAB",
        }))?;

        assert!(jwk.is_compatible(jwa::Algorithm::RS256));
        assert!(!jwk.is_compatible(jwa::Algorithm::PS256));

        let err = jwk
            .verify(jwa::Algorithm::PS256, b"data", &[0; 256])
            .unwrap_err();
        assert!(err.is_incompatible_alg());
        Ok(())
    }

    #[test]
    fn encryption_keys_cannot_verify() -> Result<()> {
        let jwk: Jwk = serde_json::from_value(serde_json::json!({
            "kty": "RSA",
            "use": "enc",
            "n": test_util::PRIMARY_MODULUS,
            "e": "AQAB",
        }))?;

        let err = jwk
            .verify(jwa::Algorithm::RS256, b"data", &[0; 256])
            .unwrap_err();
        assert!(err.is_usage_mismatch());
        Ok(())
    }
}
