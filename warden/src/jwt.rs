//! Compact JSON Web Tokens ([RFC7519][])
//!
//! A signed token is three base64url segments joined by `.`: a JSON header
//! naming the algorithm and key, a JSON claim set, and the signature over
//! the first two segments as they appear on the wire.
//!
//! Verification is two-phase. [`JwtRef::decompose`] splits and decodes the
//! token so the header can pick a key; [`Decomposed::verify`] checks the
//! signature, then the claims. Nothing from the payload is handed out
//! before both pass.
//!
//! [RFC7519]: https://tools.ietf.org/html/rfc7519

use std::{fmt, time::Duration};

use aliri_braid::braid;
use serde::{Deserialize, Serialize};
use warden_clock::{Clock, DurationSecs, UnixTime};

use crate::{b64, error, jwa, jwk, jws};

const REDACTED: &str = "***JWT***";

/// A JWT whose signature and registered claims have been checked
///
/// Only [`Decomposed::verify`] produces one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Validated<C = RegisteredClaims, H = BasicHeaders> {
    header: H,
    claims: C,
    payload: Vec<u8>,
}

impl<C, H> Validated<C, H> {
    /// The verified header
    pub fn headers(&self) -> &H {
        &self.header
    }

    /// The verified claims
    pub fn claims(&self) -> &C {
        &self.claims
    }

    /// The verified payload as decoded JSON bytes
    ///
    /// Lets callers read claims beyond `C` without widening it.
    #[must_use]
    pub fn raw_payload(&self) -> &[u8] {
        &self.payload
    }

    /// Splits into header and claims
    pub fn into_parts(self) -> (H, C) {
        (self.header, self.claims)
    }
}

/// A JWT split into its parts, signature not yet checked
#[derive(Clone, Debug, PartialEq, Eq)]
#[must_use]
pub struct Decomposed<'a, H = BasicHeaders> {
    header: H,
    signed: &'a str,
    payload: Vec<u8>,
    signature: Vec<u8>,
}

impl<'a, H: JoseHeader> Decomposed<'a, H> {
    /// Checks the signature with `key`, then the claims with `validator`
    ///
    /// The header algorithm must be approved before the key is consulted.
    ///
    /// # Errors
    ///
    /// Fails on an unapproved algorithm, a bad signature, a payload that
    /// does not decode as `C`, or a claim check.
    pub fn verify<C, V, K>(
        self,
        key: &V,
        validator: &ClaimsValidator,
        clock: &K,
    ) -> Result<Validated<C, H>, error::JwtVerifyError>
    where
        C: for<'de> Deserialize<'de> + ClaimSet,
        V: jws::Verifier<Algorithm = jwa::Algorithm> + ?Sized,
        error::JwtVerifyError: From<V::Error>,
        K: Clock + ?Sized,
    {
        let alg = self.header.alg();
        validator.check_algorithm(alg)?;
        key.verify(alg, self.signed.as_bytes(), &self.signature)?;

        let claims: C =
            serde_json::from_slice(&self.payload).map_err(error::MalformedJwt::payload)?;
        validator.check(alg, &claims, clock)?;

        Ok(Validated {
            header: self.header,
            claims,
            payload: self.payload,
        })
    }
}

impl<'a, H> Decomposed<'a, H> {
    /// The header, for choosing a key only
    ///
    /// Unauthenticated until [`verify`](Self::verify) succeeds.
    pub fn untrusted_header(&self) -> &H {
        &self.header
    }
}

impl<'a, H: JoseHeader> JoseHeader for Decomposed<'a, H> {
    fn alg(&self) -> jwa::Algorithm {
        self.header.alg()
    }

    fn kid(&self) -> Option<&jwk::KeyIdRef> {
        self.header.kid()
    }
}

impl JwtRef {
    /// Splits the token and decodes each part
    ///
    /// # Errors
    ///
    /// Fails unless there are exactly three base64url segments, the first
    /// two non-empty, and the header decodes as `H`.
    pub fn decompose<H>(&self) -> Result<Decomposed<H>, error::JwtVerifyError>
    where
        H: for<'de> Deserialize<'de>,
    {
        let raw = self.as_str();
        let (signed, signature) = raw.rsplit_once('.').ok_or_else(error::MalformedJwt::shape)?;
        let (header, payload) = signed.split_once('.').ok_or_else(error::MalformedJwt::shape)?;
        if header.is_empty() || payload.is_empty() || payload.contains('.') {
            return Err(error::MalformedJwt::shape().into());
        }

        let header = b64::decode_segment(header).map_err(error::MalformedJwt::header)?;
        let payload = b64::decode_segment(payload).map_err(error::MalformedJwt::payload)?;
        let signature = b64::decode_segment(signature).map_err(error::MalformedJwt::signature)?;

        Ok(Decomposed {
            header: serde_json::from_slice(&header).map_err(error::MalformedJwt::header)?,
            signed,
            payload,
            signature,
        })
    }
}

/// The JOSE header fields that select a verification key
pub trait JoseHeader {
    /// `alg`: the signing algorithm
    fn alg(&self) -> jwa::Algorithm;

    /// `kid`: the identifier of the signing key, if given
    fn kid(&self) -> Option<&jwk::KeyIdRef>;
}

/// The registered claims a [`ClaimsValidator`] inspects
pub trait ClaimSet {
    /// `iss`
    fn iss(&self) -> Option<&IssuerRef>;

    /// `sub`
    fn sub(&self) -> Option<&SubjectRef>;

    /// `aud`, empty when absent
    fn aud(&self) -> &Audiences;

    /// `exp`: the token is void after this instant
    fn exp(&self) -> Option<UnixTime>;

    /// `nbf`: the token is void before this instant
    fn nbf(&self) -> Option<UnixTime>;

    /// `iat`
    fn iat(&self) -> Option<UnixTime>;
}

/// An intended recipient of a token (`aud`)
#[braid(serde, ref_doc = "A borrowed [`Audience`]")]
pub struct Audience;

/// The party that minted a token (`iss`)
#[braid(serde, ref_doc = "A borrowed [`Issuer`]")]
pub struct Issuer;

/// The principal a token speaks for (`sub`)
#[braid(serde, ref_doc = "A borrowed [`Subject`]")]
pub struct Subject;

/// A compact-serialized JSON Web Token
///
/// Formats as `***JWT***` so bearer credentials stay out of logs. The
/// alternate form (`{:#}`) writes the token in full, and `{:#?}` writes it
/// with the signature cut.
#[braid(
    serde,
    debug = "owned",
    display = "owned",
    ord = "omit",
    ref_doc = "A borrowed [`Jwt`], redacted when formatted"
)]
#[must_use]
pub struct Jwt;

/// ```
/// # use warden::jwt::JwtRef;
/// let token = JwtRef::from_str("eyJhbGciOiJSUzI1NiJ9.e30.c2lnbmF0dXJl");
///
/// assert_eq!(format!("{:?}", token), "***JWT***");
/// assert_eq!(format!("{:#?}", token), "\"eyJhbGciOiJSUzI1NiJ9.e30.…\"");
/// ```
impl fmt::Debug for JwtRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if !f.alternate() {
            return f.write_str(REDACTED);
        }

        match self.0.rsplit_once('.') {
            Some((signed, _)) => write!(f, "\"{signed}.…\""),
            None => f.write_str("\"…\""),
        }
    }
}

/// ```
/// # use warden::jwt::JwtRef;
/// let token = JwtRef::from_str("eyJhbGciOiJSUzI1NiJ9.e30.c2lnbmF0dXJl");
///
/// assert_eq!(format!("{}", token), "***JWT***");
/// assert_eq!(format!("{:#}", token), "eyJhbGciOiJSUzI1NiJ9.e30.c2lnbmF0dXJl");
/// ```
impl fmt::Display for JwtRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(if f.alternate() { &self.0 } else { REDACTED })
    }
}

/// The `aud` claim: one audience or an array of them
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "AudienceRepr", into = "AudienceRepr")]
#[must_use]
pub struct Audiences(Vec<Audience>);

impl Audiences {
    /// No audiences
    pub const fn empty() -> Self {
        Self(Vec::new())
    }

    /// Whether the claim is absent or empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `aud` is among the audiences
    #[must_use]
    pub fn contains(&self, aud: &AudienceRef) -> bool {
        self.iter().any(|a| a == aud)
    }

    /// The audiences, in claim order
    pub fn iter(&self) -> impl Iterator<Item = &AudienceRef> + '_ {
        self.0.iter().map(|a| &**a)
    }
}

impl From<Audience> for Audiences {
    fn from(aud: Audience) -> Self {
        Self(vec![aud])
    }
}

impl From<Vec<Audience>> for Audiences {
    fn from(auds: Vec<Audience>) -> Self {
        Self(auds)
    }
}

/// Wire shape of `aud`; a lone audience is written as a bare string
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum AudienceRepr {
    Single(Audience),
    List(Vec<Audience>),
}

impl From<AudienceRepr> for Audiences {
    fn from(repr: AudienceRepr) -> Self {
        match repr {
            AudienceRepr::Single(aud) => Self(vec![aud]),
            AudienceRepr::List(auds) => Self(auds),
        }
    }
}

impl From<Audiences> for AudienceRepr {
    fn from(Audiences(mut auds): Audiences) -> Self {
        if auds.len() == 1 {
            Self::Single(auds.remove(0))
        } else {
            Self::List(auds)
        }
    }
}

/// Checks a token's algorithm and registered claims
///
/// Checks run algorithm, issuer, audience, `exp`, `nbf`, `iat`, and the
/// first failure is returned. `exp` is always required. The defaults
/// approve no algorithm and allow no clock skew.
#[derive(Clone, Debug, Default)]
#[must_use]
pub struct ClaimsValidator {
    algorithms: Vec<jwa::Algorithm>,
    issuer: Option<Issuer>,
    audiences: Vec<Audience>,
    leeway: DurationSecs,
}

impl ClaimsValidator {
    /// Accepts tokens signed with `alg`
    pub fn approve_algorithm(mut self, alg: jwa::Algorithm) -> Self {
        self.algorithms.push(alg);
        self
    }

    /// Requires `iss` to equal `issuer` exactly
    pub fn trust_issuer(mut self, issuer: Issuer) -> Self {
        self.issuer = Some(issuer);
        self
    }

    /// Accepts tokens whose `aud` names `audience`
    ///
    /// Once any audience is allowed, `aud` becomes required.
    pub fn allow_audience(mut self, audience: Audience) -> Self {
        self.audiences.push(audience);
        self
    }

    /// Tolerates clock skew of up to `leeway` around `exp`, `nbf`, and `iat`
    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway.into();
        self
    }

    /// The tolerated clock skew
    #[must_use]
    pub fn leeway(&self) -> DurationSecs {
        self.leeway
    }

    /// Whether `alg` is approved
    #[must_use]
    pub fn is_approved(&self, alg: jwa::Algorithm) -> bool {
        self.algorithms.contains(&alg)
    }

    fn check_algorithm(&self, alg: jwa::Algorithm) -> Result<(), error::ClaimsRejected> {
        if self.is_approved(alg) {
            Ok(())
        } else {
            Err(error::ClaimsRejected::InvalidAlgorithm)
        }
    }

    /// Checks `alg` and `claims` against the time on `clock`
    ///
    /// # Errors
    ///
    /// Returns the first check that fails.
    pub fn check<C, K>(
        &self,
        alg: jwa::Algorithm,
        claims: &C,
        clock: &K,
    ) -> Result<(), error::ClaimsRejected>
    where
        C: ClaimSet + ?Sized,
        K: Clock + ?Sized,
    {
        use error::ClaimsRejected as Rejected;

        self.check_algorithm(alg)?;

        if let Some(trusted) = &self.issuer {
            let iss = claims.iss().ok_or(Rejected::MissingRequiredClaim("iss"))?;
            if iss != &**trusted {
                return Err(Rejected::InvalidIssuer);
            }
        }

        if !self.audiences.is_empty() {
            let aud = claims.aud();
            if aud.is_empty() {
                return Err(Rejected::MissingRequiredClaim("aud"));
            }
            if !self.audiences.iter().any(|a| aud.contains(a)) {
                return Err(Rejected::InvalidAudience);
            }
        }

        let now = clock.now();
        let earliest = now.saturating_sub(self.leeway);
        let latest = now.saturating_add(self.leeway);

        let exp = claims.exp().ok_or(Rejected::MissingRequiredClaim("exp"))?;
        if exp < earliest {
            return Err(Rejected::TokenExpired);
        }

        if claims.nbf().is_some_and(|nbf| nbf > latest) {
            return Err(Rejected::TokenNotYetValid);
        }

        if claims.iat().is_some_and(|iat| iat > latest) {
            return Err(Rejected::IssuedInFuture);
        }

        Ok(())
    }
}

/// The header fields of an RS-signed access token
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[must_use]
pub struct BasicHeaders {
    alg: jwa::Algorithm,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    kid: Option<jwk::KeyId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    typ: Option<String>,
}

impl BasicHeaders {
    /// A header naming only `alg`
    pub const fn new(alg: jwa::Algorithm) -> Self {
        Self {
            alg,
            kid: None,
            typ: None,
        }
    }

    /// Adds a `kid`
    pub fn with_key_id(self, kid: impl Into<jwk::KeyId>) -> Self {
        Self {
            kid: Some(kid.into()),
            ..self
        }
    }

    /// `typ`, usually `JWT` when present
    #[must_use]
    pub fn typ(&self) -> Option<&str> {
        self.typ.as_deref()
    }
}

impl JoseHeader for BasicHeaders {
    fn alg(&self) -> jwa::Algorithm {
        self.alg
    }

    fn kid(&self) -> Option<&jwk::KeyIdRef> {
        self.kid.as_deref()
    }
}

/// The RFC7519 §4.1 claims this crate acts upon
///
/// Unknown claims are ignored; read them from
/// [`Validated::raw_payload`].
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
#[must_use]
pub struct RegisteredClaims {
    #[serde(skip_serializing_if = "Option::is_none")]
    iss: Option<Issuer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sub: Option<Subject>,
    #[serde(skip_serializing_if = "Audiences::is_empty")]
    aud: Audiences,
    #[serde(skip_serializing_if = "Option::is_none")]
    exp: Option<UnixTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    nbf: Option<UnixTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    iat: Option<UnixTime>,
}

impl RegisteredClaims {
    /// No claims at all
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `iss`
    pub fn with_issuer(self, iss: impl Into<Issuer>) -> Self {
        Self {
            iss: Some(iss.into()),
            ..self
        }
    }

    /// Sets `sub`
    pub fn with_subject(self, sub: impl Into<Subject>) -> Self {
        Self {
            sub: Some(sub.into()),
            ..self
        }
    }

    /// Sets `aud` to one audience
    pub fn with_audience(self, aud: impl Into<Audience>) -> Self {
        self.with_audiences(aud.into())
    }

    /// Sets `aud`
    pub fn with_audiences(self, aud: impl Into<Audiences>) -> Self {
        Self {
            aud: aud.into(),
            ..self
        }
    }

    /// Sets `exp`
    pub fn with_expiration(self, exp: UnixTime) -> Self {
        Self {
            exp: Some(exp),
            ..self
        }
    }

    /// Sets `nbf`
    pub fn with_not_before(self, nbf: UnixTime) -> Self {
        Self {
            nbf: Some(nbf),
            ..self
        }
    }

    /// Sets `iat`
    pub fn with_issued_at(self, iat: UnixTime) -> Self {
        Self {
            iat: Some(iat),
            ..self
        }
    }
}

impl ClaimSet for RegisteredClaims {
    fn iss(&self) -> Option<&IssuerRef> {
        self.iss.as_deref()
    }

    fn sub(&self) -> Option<&SubjectRef> {
        self.sub.as_deref()
    }

    fn aud(&self) -> &Audiences {
        &self.aud
    }

    fn exp(&self) -> Option<UnixTime> {
        self.exp
    }

    fn nbf(&self) -> Option<UnixTime> {
        self.nbf
    }

    fn iat(&self) -> Option<UnixTime> {
        self.iat
    }
}

#[cfg(test)]
mod tests {
    use color_eyre::Result;
    use serde_json::json;
    use warden_clock::TestClock;

    use super::*;
    use crate::{test_util::TestSigner, Jwks};

    const NOW: UnixTime = UnixTime(1_700_000_000);

    fn validator() -> ClaimsValidator {
        ClaimsValidator::default()
            .approve_algorithm(jwa::Algorithm::RS256)
            .with_leeway(Duration::from_secs(60))
            .trust_issuer(Issuer::from_static("https://tenant.example/"))
            .allow_audience(Audience::from_static("orders-api"))
    }

    fn claims() -> RegisteredClaims {
        RegisteredClaims::new()
            .with_issuer(Issuer::from_static("https://tenant.example/"))
            .with_audience(Audience::from_static("orders-api"))
            .with_subject(Subject::from_static("auth0|123"))
            .with_expiration(NOW + DurationSecs(3600))
            .with_issued_at(NOW)
    }

    fn header() -> BasicHeaders {
        BasicHeaders::new(jwa::Algorithm::RS256)
    }

    fn verify(token: &JwtRef) -> Result<Validated, error::JwtVerifyError> {
        let keys: Jwks = serde_json::from_str(crate::test_util::JWKS).unwrap();
        let decomposed: Decomposed = token.decompose()?;
        let kid = decomposed.kid().unwrap_or(jwk::KeyIdRef::from_static("none"));
        let key = keys
            .get_key_by_id(kid, decomposed.alg())
            .expect("key present");
        decomposed.verify(key, &validator(), &TestClock::new(NOW))
    }

    #[test]
    fn deserializes_single_and_multiple_audiences() -> Result<()> {
        let one: RegisteredClaims = serde_json::from_value(json!({"aud": "a"}))?;
        assert!(one.aud().contains(AudienceRef::from_static("a")));

        let many: RegisteredClaims = serde_json::from_value(json!({"aud": ["a", "b"]}))?;
        assert!(many.aud().contains(AudienceRef::from_static("b")));
        assert!(!many.aud().contains(AudienceRef::from_static("c")));

        assert_eq!(serde_json::to_value(&one)?, json!({"aud": "a"}));
        Ok(())
    }

    #[test]
    fn accepts_valid_claims() {
        let clock = TestClock::new(NOW);
        validator().check(header().alg(), &claims(), &clock).unwrap();
    }

    #[test]
    fn rejects_wrong_issuer() {
        let clock = TestClock::new(NOW);
        let claims = claims().with_issuer(Issuer::from_static("https://tenant.example"));
        let err = validator().check(header().alg(), &claims, &clock).unwrap_err();
        assert!(matches!(err, error::ClaimsRejected::InvalidIssuer));
    }

    #[test]
    fn rejects_wrong_audience() {
        let clock = TestClock::new(NOW);
        let claims = claims().with_audiences(vec![
            Audience::from_static("billing-api"),
            Audience::from_static("https://tenant.example/userinfo"),
        ]);
        let err = validator().check(header().alg(), &claims, &clock).unwrap_err();
        assert!(matches!(err, error::ClaimsRejected::InvalidAudience));
    }

    #[test]
    fn issuer_checked_before_audience() {
        let clock = TestClock::new(NOW);
        let claims = RegisteredClaims::new()
            .with_issuer(Issuer::from_static("https://other.example/"))
            .with_audience(Audience::from_static("billing-api"))
            .with_expiration(NOW);
        let err = validator().check(header().alg(), &claims, &clock).unwrap_err();
        assert!(matches!(err, error::ClaimsRejected::InvalidIssuer));
    }

    #[test]
    fn expiry_honours_leeway() {
        let clock = TestClock::new(NOW);

        let within = claims().with_expiration(NOW.saturating_sub(DurationSecs(60)));
        validator().check(header().alg(), &within, &clock).unwrap();

        let beyond = claims().with_expiration(NOW.saturating_sub(DurationSecs(61)));
        let err = validator().check(header().alg(), &beyond, &clock).unwrap_err();
        assert!(matches!(err, error::ClaimsRejected::TokenExpired));
    }

    #[test]
    fn expiration_is_required() {
        let clock = TestClock::new(NOW);
        let claims = RegisteredClaims::new()
            .with_issuer(Issuer::from_static("https://tenant.example/"))
            .with_audience(Audience::from_static("orders-api"));
        let err = validator().check(header().alg(), &claims, &clock).unwrap_err();
        assert!(matches!(
            err,
            error::ClaimsRejected::MissingRequiredClaim("exp")
        ));
    }

    #[test]
    fn not_before_honours_leeway() {
        let clock = TestClock::new(NOW);

        let within = claims().with_not_before(NOW + DurationSecs(60));
        validator().check(header().alg(), &within, &clock).unwrap();

        let beyond = claims().with_not_before(NOW + DurationSecs(61));
        let err = validator().check(header().alg(), &beyond, &clock).unwrap_err();
        assert!(matches!(err, error::ClaimsRejected::TokenNotYetValid));
    }

    #[test]
    fn rejects_issued_in_future() {
        let clock = TestClock::new(NOW);
        let claims = claims().with_issued_at(NOW + DurationSecs(120));
        let err = validator().check(header().alg(), &claims, &clock).unwrap_err();
        assert!(matches!(err, error::ClaimsRejected::IssuedInFuture));
    }

    #[test]
    fn rejects_unapproved_algorithm() {
        let clock = TestClock::new(NOW);
        let header = BasicHeaders::new(jwa::Algorithm::PS256);
        let err = validator().check(header.alg(), &claims(), &clock).unwrap_err();
        assert!(matches!(err, error::ClaimsRejected::InvalidAlgorithm));
    }

    #[test]
    fn decompose_requires_three_segments() {
        for raw in ["", "abc", "a.b", "a.b.c.d", ".e30.sig", "eyJhbGciOiJSUzI1NiJ9..c2ln"] {
            let err = JwtRef::from_str(raw)
                .decompose::<BasicHeaders>()
                .unwrap_err();
            assert!(err.is_malformed(), "{:?} should be malformed", raw);
        }
    }

    #[test]
    fn decompose_rejects_unsupported_algorithms() {
        let signer = TestSigner::primary();
        let hs256 = signer.sign_raw(br#"{"alg":"HS256","kid":"warden-primary"}"#, b"{}");
        let none = signer.sign_raw(br#"{"alg":"none"}"#, b"{}");

        for token in [hs256, none] {
            let err = token.decompose::<BasicHeaders>().unwrap_err();
            assert_eq!(err.malformed_part(), Some(error::JwtPart::Header));
        }
    }

    #[test]
    fn decompose_rejects_non_base64_segments() {
        let err = JwtRef::from_str("eyJhbGciOiJSUzI1NiJ9.e30.not*base64")
            .decompose::<BasicHeaders>()
            .unwrap_err();
        assert_eq!(err.malformed_part(), Some(error::JwtPart::Signature));
    }

    #[test]
    fn verifies_signed_token() -> Result<()> {
        let token = TestSigner::primary().sign_json(&serde_json::to_value(claims())?);
        let validated = verify(&token)?;

        assert_eq!(
            validated.claims().sub().map(SubjectRef::as_str),
            Some("auth0|123")
        );
        assert_eq!(
            validated.headers().kid().map(jwk::KeyIdRef::as_str),
            Some(crate::test_util::PRIMARY_KEY_ID)
        );

        let raw: serde_json::Value = serde_json::from_slice(validated.raw_payload())?;
        assert_eq!(raw["iss"], "https://tenant.example/");
        Ok(())
    }

    #[test]
    fn verifies_token_from_rotated_key() -> Result<()> {
        let token = TestSigner::secondary().sign_json(&serde_json::to_value(claims())?);
        verify(&token)?;
        Ok(())
    }

    #[test]
    fn rejects_forged_signature() -> Result<()> {
        let token = TestSigner::rogue().sign_json(&serde_json::to_value(claims())?);
        let err = verify(&token).unwrap_err();
        assert!(matches!(
            err,
            error::JwtVerifyError::JwkVerifyError(ref e) if e.is_signature_mismatch()
        ));
        Ok(())
    }

    #[test]
    fn rejects_tampered_payload() -> Result<()> {
        let token = TestSigner::primary().sign_json(&serde_json::to_value(claims())?);
        let forged = b64::encode(
            serde_json::to_string(&claims().with_subject(Subject::from_static("admin")))?
                .as_bytes(),
        );
        let mut parts: Vec<&str> = token.as_str().split('.').collect();
        parts[1] = &forged;
        let tampered = Jwt::new(parts.join("."));

        let err = verify(&tampered).unwrap_err();
        assert!(matches!(err, error::JwtVerifyError::JwkVerifyError(_)));
        Ok(())
    }

    #[test]
    fn redacts_token_by_default() {
        let token = TestSigner::primary().sign_json(&json!({"sub": "x"}));
        assert_eq!(format!("{}", token), "***JWT***");
        assert_eq!(format!("{:?}", token), "***JWT***");
        assert!(format!("{:#}", token).starts_with("eyJ"));
    }
}
