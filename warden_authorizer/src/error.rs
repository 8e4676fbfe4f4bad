use std::fmt;

use serde::Serialize;
use thiserror::Error;
use warden::{
    error::{ClaimsRejected, JwkVerifyError},
    jwa, jwk,
};
use warden_oauth2::{
    FetchError, KeyResolveError, MalformedCustomClaims, MalformedToken, ValidationError,
};

/// Why a request was denied
///
/// Every kind collapses the decision to a deny. None is fatal to the
/// authorizer: later requests are handled independently.
#[derive(Debug, Error)]
pub enum AuthorizerError {
    /// A required configuration value is absent
    #[error("authorizer failed, {name} is not set")]
    ConfigMissing {
        /// The environment variable that was expected
        name: &'static str,
    },

    /// The authorization header is missing or not a bearer credential
    #[error("authorizer failed, invalid token")]
    MalformedCredential,

    /// The request line could not be decoded as an authorizer request
    #[error("authorizer failed, malformed request")]
    MalformedRequest(#[source] serde_json::Error),

    /// The configured domain does not form a valid issuer URL
    #[error("authorizer failed, invalid issuer URL")]
    IssuerUrlInvalid(#[source] url::ParseError),

    /// The bearer token could not be parsed
    #[error("malformed token")]
    MalformedToken(#[source] MalformedToken),

    /// The issuer's key set could not be fetched
    #[error("unable to fetch signing keys")]
    KeyFetchFailed(#[source] FetchError),

    /// The issuer's key set holds no key for the token
    #[error("signing key {kid} not found for {alg}")]
    KeyNotFound {
        /// The key ID named by the token
        kid: jwk::KeyId,
        /// The algorithm named by the token
        alg: jwa::Algorithm,
    },

    /// The token signature does not verify
    #[error("token signature is invalid")]
    SignatureInvalid(#[source] JwkVerifyError),

    /// A registered claim was rejected
    #[error("token claims rejected")]
    ClaimInvalid(#[source] ClaimsRejected),

    /// The custom claims could not be decoded
    #[error("custom claims malformed")]
    CustomClaimMalformed(#[source] MalformedCustomClaims),
}

impl AuthorizerError {
    /// The stable kind of this error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConfigMissing { .. } => ErrorKind::ConfigMissing,
            Self::MalformedCredential => ErrorKind::MalformedCredential,
            Self::MalformedRequest(_) => ErrorKind::MalformedRequest,
            Self::IssuerUrlInvalid(_) => ErrorKind::IssuerUrlInvalid,
            Self::MalformedToken(_) => ErrorKind::MalformedToken,
            Self::KeyFetchFailed(_) => ErrorKind::KeyFetchFailed,
            Self::KeyNotFound { .. } => ErrorKind::KeyNotFound,
            Self::SignatureInvalid(_) => ErrorKind::SignatureInvalid,
            Self::ClaimInvalid(_) => ErrorKind::ClaimInvalid,
            Self::CustomClaimMalformed(_) => ErrorKind::CustomClaimMalformed,
        }
    }

    /// Whether the error stems from the authorizer's own configuration
    /// rather than the request
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::ConfigMissing { .. } | Self::IssuerUrlInvalid(_)
        )
    }

    /// The error and its sources, joined by `: `
    #[must_use]
    pub fn description(&self) -> String {
        use std::fmt::Write;

        let mut description = self.to_string();
        let mut err: &dyn std::error::Error = self;
        while let Some(next) = err.source() {
            let _ = write!(&mut description, ": {next}");
            err = next;
        }
        description
    }
}

impl From<ValidationError> for AuthorizerError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::MalformedToken(e) => Self::MalformedToken(e),
            ValidationError::KeyFetchFailed(KeyResolveError::Fetch(e)) => Self::KeyFetchFailed(e),
            ValidationError::KeyFetchFailed(KeyResolveError::KeyNotFound { kid, alg }) => {
                Self::KeyNotFound { kid, alg }
            }
            ValidationError::SignatureInvalid(e) => Self::SignatureInvalid(e),
            ValidationError::ClaimInvalid(e) => Self::ClaimInvalid(e),
            ValidationError::CustomClaimMalformed(e) => Self::CustomClaimMalformed(e),
        }
    }
}

/// The stable name of an [`AuthorizerError`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    /// See [`AuthorizerError::ConfigMissing`]
    ConfigMissing,
    /// See [`AuthorizerError::MalformedCredential`]
    MalformedCredential,
    /// See [`AuthorizerError::MalformedRequest`]
    MalformedRequest,
    /// See [`AuthorizerError::IssuerUrlInvalid`]
    IssuerUrlInvalid,
    /// See [`AuthorizerError::MalformedToken`]
    MalformedToken,
    /// See [`AuthorizerError::KeyFetchFailed`]
    KeyFetchFailed,
    /// See [`AuthorizerError::KeyNotFound`]
    KeyNotFound,
    /// See [`AuthorizerError::SignatureInvalid`]
    SignatureInvalid,
    /// See [`AuthorizerError::ClaimInvalid`]
    ClaimInvalid,
    /// See [`AuthorizerError::CustomClaimMalformed`]
    CustomClaimMalformed,
}

impl ErrorKind {
    /// The kind's name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ConfigMissing => "ConfigMissing",
            Self::MalformedCredential => "MalformedCredential",
            Self::MalformedRequest => "MalformedRequest",
            Self::IssuerUrlInvalid => "IssuerUrlInvalid",
            Self::MalformedToken => "MalformedToken",
            Self::KeyFetchFailed => "KeyFetchFailed",
            Self::KeyNotFound => "KeyNotFound",
            Self::SignatureInvalid => "SignatureInvalid",
            Self::ClaimInvalid => "ClaimInvalid",
            Self::CustomClaimMalformed => "CustomClaimMalformed",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
