use std::time::Duration;

use thiserror::Error;
use url::Url;
use warden::{
    error::{ClaimsRejected, JwkVerifyError, JwtVerifyError},
    jwa,
    jwt::{self, ClaimSet, JoseHeader},
    JwtRef,
};
use warden_clock::{Clock, System};

use crate::{
    claims::{CustomClaims, ValidatedClaims},
    fetch::KeyFetcher,
    resolver::{KeyResolveError, KeyResolver},
    scope::InvalidScopeToken,
};

/// The clock skew tolerated on either side of `exp`, `nbf`, and `iat`
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(60);

/// A token that could not be taken apart into a verifiable form
#[derive(Debug, Error)]
pub enum MalformedToken {
    /// The token segments, header, or payload could not be decoded
    #[error(transparent)]
    Structure(JwtVerifyError),

    /// The header names an algorithm this validator does not accept
    #[error("algorithm {0} is not accepted")]
    UnsupportedAlgorithm(jwa::Algorithm),

    /// The header does not name the key that signed the token
    #[error("token header has no key id")]
    MissingKeyId,
}

/// Custom claims that could not be decoded or checked
#[derive(Debug, Error)]
pub enum MalformedCustomClaims {
    /// The payload does not decode into the expected custom claims
    #[error("custom claims could not be decoded")]
    Undecodable(#[source] serde_json::Error),

    /// The `scope` claim holds an invalid scope token
    #[error("scope claim is invalid")]
    InvalidScope(#[source] InvalidScopeToken),
}

/// An error validating a bearer token
///
/// Variants are reported in the order the checks run. The first failing
/// check wins.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The token could not be parsed, or uses an unaccepted algorithm
    #[error("malformed token")]
    MalformedToken(#[from] MalformedToken),

    /// No key could be resolved to verify the token
    #[error("unable to resolve verification key")]
    KeyFetchFailed(#[from] KeyResolveError),

    /// The signature does not verify against the resolved key
    #[error("token signature is invalid")]
    SignatureInvalid(#[source] JwkVerifyError),

    /// A registered claim was rejected
    #[error("token claims rejected")]
    ClaimInvalid(#[source] ClaimsRejected),

    /// The custom claims could not be decoded or checked
    #[error("custom claims malformed")]
    CustomClaimMalformed(#[from] MalformedCustomClaims),
}

impl From<JwtVerifyError> for ValidationError {
    fn from(err: JwtVerifyError) -> Self {
        match err {
            JwtVerifyError::JwkVerifyError(e) => Self::SignatureInvalid(e),
            JwtVerifyError::ClaimsRejected(e) => Self::ClaimInvalid(e),
            other => Self::MalformedToken(MalformedToken::Structure(other)),
        }
    }
}

/// Validates bearer tokens issued by a single issuer
///
/// Keys are resolved through a [`KeyResolver`], so the key cache lives as
/// long as the validator.
#[derive(Debug)]
pub struct TokenValidator<F, K = System> {
    resolver: KeyResolver<F, K>,
    leeway: Duration,
    algorithm: jwa::Algorithm,
}

impl<F, K> TokenValidator<F, K>
where
    F: KeyFetcher,
    K: Clock,
{
    /// Constructs a validator accepting RS256 tokens with the default
    /// clock skew
    pub fn new(resolver: KeyResolver<F, K>) -> Self {
        Self {
            resolver,
            leeway: DEFAULT_CLOCK_SKEW,
            algorithm: jwa::Algorithm::RS256,
        }
    }

    /// Overrides the tolerated clock skew
    #[must_use]
    pub fn with_leeway(self, leeway: Duration) -> Self {
        Self { leeway, ..self }
    }

    /// Overrides the single accepted signing algorithm
    #[must_use]
    pub fn with_algorithm(self, algorithm: jwa::Algorithm) -> Self {
        Self { algorithm, ..self }
    }

    /// The key resolver backing this validator
    pub fn resolver(&self) -> &KeyResolver<F, K> {
        &self.resolver
    }

    /// Validates `token`, requiring it to be issued by `issuer` for
    /// `audience`
    ///
    /// Checks run in order: structure and algorithm, key resolution,
    /// signature, issuer, audience, time bounds, and finally the custom
    /// claims.
    ///
    /// # Errors
    ///
    /// Returns the first check that fails.
    pub async fn validate(
        &self,
        token: &JwtRef,
        issuer: &Url,
        audience: &jwt::AudienceRef,
    ) -> Result<ValidatedClaims, ValidationError> {
        let decomposed: jwt::Decomposed = token
            .decompose()
            .map_err(MalformedToken::Structure)?;

        let alg = decomposed.alg();
        if alg != self.algorithm {
            tracing::debug!(%alg, "rejecting token signed with unaccepted algorithm");
            return Err(MalformedToken::UnsupportedAlgorithm(alg).into());
        }

        let kid = decomposed.kid().ok_or(MalformedToken::MissingKeyId)?;
        let key = self.resolver.get_key(kid, alg).await?;

        let validator = jwt::ClaimsValidator::default()
            .approve_algorithm(self.algorithm)
            .with_leeway(self.leeway)
            .trust_issuer(jwt::Issuer::new(issuer.as_str().to_owned()))
            .allow_audience(audience.to_owned());

        let validated: jwt::Validated =
            decomposed.verify(&key, &validator, self.resolver.clock())?;

        let custom: CustomClaims = serde_json::from_slice(validated.raw_payload())
            .map_err(MalformedCustomClaims::Undecodable)?;
        let scope = custom
            .validate()
            .map_err(MalformedCustomClaims::InvalidScope)?;

        let (_, registered) = validated.into_parts();
        tracing::debug!(
            sub = registered.sub().map(|s| s.as_str()),
            %scope,
            "token validated"
        );

        Ok(ValidatedClaims::new(registered, scope))
    }
}
