//! JOSE primitives for verifying RSA-signed access tokens
//!
//! This crate covers the subset of the JOSE standards needed to verify
//! bearer tokens issued by an OAuth2/OIDC authority:
//!
//! * JSON Web Signature (JWS): [RFC7515][], verification only
//! * JSON Web Key (JWK): [RFC7517][], RSA public keys
//! * JSON Web Algorithms (JWA): [RFC7518][], the `RS*` and `PS*` families
//! * JSON Web Token (JWT): [RFC7519][], registered claim validation
//!
//! [RFC7515]: https://tools.ietf.org/html/rfc7515
//! [RFC7517]: https://tools.ietf.org/html/rfc7517
//! [RFC7518]: https://tools.ietf.org/html/rfc7518
//! [RFC7519]: https://tools.ietf.org/html/rfc7519
//!
//! # Example
//!
//! ```
//! use warden::{
//!     jwa, jwt,
//!     jwt::{ClaimSet, JoseHeader},
//!     Jwks, JwtRef,
//! };
//! use warden_clock::{TestClock, UnixTime};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let keys: Jwks = serde_json::from_str(concat!(
//!     r#"{"keys":[{"kty":"RSA","kid":"warden-primary","use":"sig","alg":"RS256","#,
//!     r#""e":"AQAB","n":""#,
//!     "vXqZ9TCszFQv2bjDZX7-G_fGTpp8zFqAsjccIop1kgNIWznm_W7r0272IHxy49eSxxv-dIDyGaaXfBnk",
//!     "Vg9z-5Qew2MaEkcUgu_ocsneR7ljQ32Os9ix7wfL0zQegGnFb-X3rYONyfhIaghhQFayBEYRwJKdPzZi",
//!     "3hAiQf68Dke-iTKntM9eVegWBA6Ry7YyEyL3lh50_6Ebz1-pnqjhlScNxuOPvhHCvu-wuqeYtWlEhjIZ",
//!     "On8483elF45JLXYgnOzG4kZkF6jm0-9MqZG85Ke2s57a_aU2X8mOkIMdR-wJa0C6yO6MyqtAaZwi9pe8",
//!     "KiVrzyJUyYADRnK13mw4Pw",
//!     r#""}]}"#,
//! ))?;
//!
//! let token = JwtRef::from_str(concat!(
//!     "eyJhbGciOiJSUzI1NiIsImtpZCI6IndhcmRlbi1wcmltYXJ5IiwidHlwIjoiSldUIn0.",
//!     "eyJpc3MiOiJodHRwczovL2lzc3Vlci5leGFtcGxlLyIsImF1ZCI6Im15LWFwaSIsInN1YiI6ImF1dGgw",
//!     "fGRvYyIsImV4cCI6MjAwMCwiaWF0Ijo5MDB9.",
//!     "eMiDAGWtpmv4gRpHXIMpnrn-N6GdWE_ebEsQje4M1Kt1BA3b-mS_sHOCvYd8CVfOtSpR63d-wf3pMz7_",
//!     "1ZaKpaIpidrd1owuaRMLT51aJjdo2cEvkV1a17gA5r2UAnxu2JYJFE6UIeTRoR9rPUDIMqA_uhhe0zFS",
//!     "8dLsYJLTcKX2WqztR8qLF8OlG_iIvujWE23D2eRvsl-CfRJmKq_GotGYf4Pp3kS0rlZ461kQ1IhoeCU0",
//!     "IPxI7yE5tJvN2N7J_e1vN_Qxe7_tzDacFdl7ns5XIKhVEIZO4Qx5ksXARC7WgHOoAdShPXZ4yPrBSlcK",
//!     "v8THRLC7q981R-BsVg46LQ",
//! ));
//!
//! let validator = jwt::ClaimsValidator::default()
//!     .approve_algorithm(jwa::Algorithm::RS256)
//!     .trust_issuer(jwt::Issuer::from_static("https://issuer.example/"))
//!     .allow_audience(jwt::Audience::from_static("my-api"));
//!
//! let decomposed: jwt::Decomposed = token.decompose()?;
//! let kid = decomposed.untrusted_header().kid().ok_or("missing kid")?;
//! let key = keys
//!     .get_key_by_id(kid, decomposed.alg())
//!     .ok_or("no matching key")?;
//!
//! let clock = TestClock::new(UnixTime(1_000));
//! let validated: jwt::Validated = decomposed.verify(key, &validator, &clock)?;
//! assert_eq!(
//!     validated.claims().sub().map(|s| s.as_str()),
//!     Some("auth0|doc")
//! );
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unused_must_use
)]

mod b64;
pub mod error;
pub mod jwa;
pub mod jwk;
mod jwks;
pub mod jws;
pub mod jwt;

#[cfg(any(test, feature = "test-util"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-util")))]
pub mod test_util;

#[doc(inline)]
pub use jwk::Jwk;
#[doc(inline)]
pub use jwks::Jwks;
#[doc(inline)]
pub use jwt::{Jwt, JwtRef};
