//! Fixed RSA keys and a token signer for tests
//!
//! The key material under `data/rsa` exists only to exercise verification
//! and must never be trusted outside of tests.

use std::fmt;

use ring::{rand::SystemRandom, signature::RsaKeyPair};

use crate::{b64, jwa, jwt::Jwt};

/// Key ID of the primary test key
pub const PRIMARY_KEY_ID: &str = "warden-primary";

/// Key ID of the secondary (rotated-in) test key
pub const SECONDARY_KEY_ID: &str = "warden-secondary";

/// Base64url modulus of the primary test key
pub const PRIMARY_MODULUS: &str = concat!(
    "vXqZ9TCszFQv2bjDZX7-G_fGTpp8zFqAsjccIop1kgNIWznm_W7r0272IHxy49eSxxv-dIDyGaaXfBnk",
    "Vg9z-5Qew2MaEkcUgu_ocsneR7ljQ32Os9ix7wfL0zQegGnFb-X3rYONyfhIaghhQFayBEYRwJKdPzZi",
    "3hAiQf68Dke-iTKntM9eVegWBA6Ry7YyEyL3lh50_6Ebz1-pnqjhlScNxuOPvhHCvu-wuqeYtWlEhjIZ",
    "On8483elF45JLXYgnOzG4kZkF6jm0-9MqZG85Ke2s57a_aU2X8mOkIMdR-wJa0C6yO6MyqtAaZwi9pe8",
    "KiVrzyJUyYADRnK13mw4Pw",
);

/// A key set holding both the primary and secondary public keys
pub const JWKS: &str = include_str!("../data/rsa/jwks.json");

/// A key set holding only the primary public key
pub const JWKS_PRIMARY: &str = include_str!("../data/rsa/jwks-primary.json");

const PRIMARY_PK8: &[u8] = include_bytes!("../data/rsa/primary.pk8");
const SECONDARY_PK8: &[u8] = include_bytes!("../data/rsa/secondary.pk8");
const ROGUE_PK8: &[u8] = include_bytes!("../data/rsa/rogue.pk8");

/// All test keys are 2048-bit
const SIGNATURE_LEN: usize = 2048 / 8;

/// Mints signed tokens with one of the fixed test keys
pub struct TestSigner {
    key_pair: RsaKeyPair,
    kid: Option<String>,
    alg: jwa::Algorithm,
}

impl fmt::Debug for TestSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestSigner")
            .field("kid", &self.kid)
            .field("alg", &self.alg)
            .finish_non_exhaustive()
    }
}

impl TestSigner {
    fn from_pkcs8(der: &[u8], kid: &str) -> Self {
        Self {
            key_pair: RsaKeyPair::from_pkcs8(der).expect("test key is valid PKCS#8"),
            kid: Some(kid.to_owned()),
            alg: jwa::Algorithm::RS256,
        }
    }

    /// Signs with the primary key, published in both [`JWKS`] and [`JWKS_PRIMARY`]
    #[must_use]
    pub fn primary() -> Self {
        Self::from_pkcs8(PRIMARY_PK8, PRIMARY_KEY_ID)
    }

    /// Signs with the secondary key, published only in [`JWKS`]
    #[must_use]
    pub fn secondary() -> Self {
        Self::from_pkcs8(SECONDARY_PK8, SECONDARY_KEY_ID)
    }

    /// Signs with an unpublished key while claiming the primary key ID
    #[must_use]
    pub fn rogue() -> Self {
        Self::from_pkcs8(ROGUE_PK8, PRIMARY_KEY_ID)
    }

    /// Overrides the `kid` placed in the header; `None` omits it
    #[must_use]
    pub fn with_key_id(self, kid: Option<&str>) -> Self {
        Self {
            kid: kid.map(str::to_owned),
            ..self
        }
    }

    /// Overrides the RSA algorithm used to sign
    #[must_use]
    pub fn with_algorithm(self, alg: jwa::Algorithm) -> Self {
        Self { alg, ..self }
    }

    /// Signs the given claims under a `JWT` header naming this signer's
    /// algorithm and key ID
    #[must_use]
    pub fn sign_json(&self, claims: &serde_json::Value) -> Jwt {
        let mut header = serde_json::json!({
            "alg": self.alg.as_str(),
            "typ": "JWT",
        });
        if let Some(kid) = &self.kid {
            header["kid"] = serde_json::Value::String(kid.clone());
        }

        let header = serde_json::to_vec(&header).expect("header serializes");
        let payload = serde_json::to_vec(claims).expect("claims serialize");
        self.sign_raw(&header, &payload)
    }

    /// Signs arbitrary header and payload bytes without inspecting them
    #[must_use]
    pub fn sign_raw(&self, header: &[u8], payload: &[u8]) -> Jwt {
        let message = format!("{}.{}", b64::encode(header), b64::encode(payload));

        let mut signature = vec![0; SIGNATURE_LEN];
        self.key_pair
            .sign(
                self.alg.signing_params(),
                &SystemRandom::new(),
                message.as_bytes(),
                &mut signature,
            )
            .expect("test key signs");

        Jwt::new(format!("{}.{}", message, b64::encode(&signature)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Jwks;

    #[test]
    fn primary_modulus_matches_jwks() {
        let jwks: Jwks = serde_json::from_str(JWKS_PRIMARY).unwrap();
        let published = jwks.keys()[0].public_key().modulus();
        assert_eq!(published, b64::decode_lenient(PRIMARY_MODULUS).unwrap());
    }

    #[test]
    fn signer_omits_kid_on_request() {
        let token = TestSigner::primary()
            .with_key_id(None)
            .sign_json(&serde_json::json!({}));
        let header = token.as_str().split('.').next().unwrap();
        let header: serde_json::Value =
            serde_json::from_slice(&b64::decode_segment(header).unwrap()).unwrap();
        assert!(header.get("kid").is_none());
        assert_eq!(header["alg"], "RS256");
    }
}
