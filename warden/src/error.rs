//! Errors raised while loading keys and verifying tokens

use std::{error::Error as StdError, fmt};

use thiserror::Error;

use crate::jwa;

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// A key pinned to one algorithm was asked to verify with another
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Error)]
#[error("key is pinned to {pinned}, but {requested} was requested")]
pub struct IncompatibleAlgorithm {
    pinned: jwa::Algorithm,
    requested: jwa::Algorithm,
}

impl IncompatibleAlgorithm {
    pub(crate) const fn new(pinned: jwa::Algorithm, requested: jwa::Algorithm) -> Self {
        Self { pinned, requested }
    }

    /// The algorithm the key is restricted to
    #[must_use]
    pub const fn pinned(&self) -> jwa::Algorithm {
        self.pinned
    }

    /// The algorithm the token asked for
    #[must_use]
    pub const fn requested(&self) -> jwa::Algorithm {
        self.requested
    }
}

/// An algorithm name outside the supported set
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unsupported algorithm {name:?}")]
pub struct UnknownAlgorithm {
    name: String,
}

impl UnknownAlgorithm {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// The name as it appeared
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// The key is declared for something other than signature verification
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Error)]
#[error("key is declared for {usage:?}, not signature verification")]
pub struct UsageMismatch {
    usage: jwa::Usage,
}

impl UsageMismatch {
    pub(crate) const fn new(usage: jwa::Usage) -> Self {
        Self { usage }
    }

    /// The declared usage of the key
    #[must_use]
    pub const fn usage(&self) -> jwa::Usage {
        self.usage
    }
}

/// The signature does not match the signed content
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Error)]
#[error("signature does not match")]
pub struct SignatureMismatch;

/// Key material that cannot be turned into a usable public key
#[derive(Debug, Error)]
#[error("key rejected")]
pub struct KeyRejected {
    #[source]
    reason: BoxError,
}

impl KeyRejected {
    pub(crate) fn new(reason: impl Into<BoxError>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// One of the three dot-separated parts of a compact JWT
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum JwtPart {
    /// The JOSE header
    Header,
    /// The claims
    Payload,
    /// The signature
    Signature,
}

impl fmt::Display for JwtPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Header => "header",
            Self::Payload => "payload",
            Self::Signature => "signature",
        })
    }
}

/// A token that could not be taken apart or decoded
///
/// Without a part, the token did not have the `header.payload.signature`
/// shape at all.
#[derive(Debug)]
pub struct MalformedJwt {
    part: Option<JwtPart>,
    cause: Option<BoxError>,
}

impl MalformedJwt {
    pub(crate) const fn shape() -> Self {
        Self {
            part: None,
            cause: None,
        }
    }

    pub(crate) fn in_part(part: JwtPart, cause: impl Into<BoxError>) -> Self {
        Self {
            part: Some(part),
            cause: Some(cause.into()),
        }
    }

    pub(crate) fn header(cause: impl Into<BoxError>) -> Self {
        Self::in_part(JwtPart::Header, cause)
    }

    pub(crate) fn payload(cause: impl Into<BoxError>) -> Self {
        Self::in_part(JwtPart::Payload, cause)
    }

    pub(crate) fn signature(cause: impl Into<BoxError>) -> Self {
        Self::in_part(JwtPart::Signature, cause)
    }

    /// The part that failed to decode, if the shape was right
    #[must_use]
    pub const fn part(&self) -> Option<JwtPart> {
        self.part
    }
}

impl fmt::Display for MalformedJwt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.part {
            Some(part) => write!(f, "malformed JWT {part}"),
            None => f.write_str("malformed JWT"),
        }
    }
}

impl StdError for MalformedJwt {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        let cause: &(dyn StdError + 'static) = self.cause.as_deref()?;
        Some(cause)
    }
}

/// Why a key refused to verify a signature
#[derive(Debug, Error)]
pub enum JwkVerifyError {
    /// The key is pinned to another algorithm
    #[error(transparent)]
    IncompatibleAlgorithm(#[from] IncompatibleAlgorithm),

    /// The key is not meant for verification
    #[error(transparent)]
    UsageMismatch(#[from] UsageMismatch),

    /// The signature is wrong
    #[error(transparent)]
    SignatureMismatch(#[from] SignatureMismatch),
}

impl JwkVerifyError {
    /// Whether the key is pinned to another algorithm
    #[must_use]
    pub fn is_incompatible_alg(&self) -> bool {
        matches!(self, Self::IncompatibleAlgorithm(_))
    }

    /// Whether the key is declared for another use
    #[must_use]
    pub fn is_usage_mismatch(&self) -> bool {
        matches!(self, Self::UsageMismatch(_))
    }

    /// Whether the signature itself is wrong
    #[must_use]
    pub fn is_signature_mismatch(&self) -> bool {
        matches!(self, Self::SignatureMismatch(_))
    }
}

/// Why a token failed verification
#[derive(Debug, Error)]
pub enum JwtVerifyError {
    /// The token could not be decoded
    #[error(transparent)]
    Malformed(#[from] MalformedJwt),

    /// The key refused the signature
    #[error("signature rejected")]
    JwkVerifyError(#[from] JwkVerifyError),

    /// The signature holds, but the claims do not
    #[error("claims rejected")]
    ClaimsRejected(#[from] ClaimsRejected),
}

impl JwtVerifyError {
    /// Whether the token could not be taken apart or decoded
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed(_))
    }

    /// The part that failed to decode, for malformed tokens
    #[must_use]
    pub fn malformed_part(&self) -> Option<JwtPart> {
        match self {
            Self::Malformed(e) => e.part(),
            _ => None,
        }
    }
}

/// A claim check that a signed token failed
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ClaimsRejected {
    /// `alg` is not one the validator approves
    #[error("algorithm not approved")]
    InvalidAlgorithm,

    /// `aud` names none of the allowed audiences
    #[error("audience not allowed")]
    InvalidAudience,

    /// `iss` is not the trusted issuer
    #[error("issuer not trusted")]
    InvalidIssuer,

    /// `exp` has passed
    #[error("token expired")]
    TokenExpired,

    /// `nbf` is still ahead
    #[error("token not yet valid")]
    TokenNotYetValid,

    /// `iat` is ahead of now
    #[error("token issued in the future")]
    IssuedInFuture,

    /// A claim the validator needs is absent
    #[error("{0} claim missing")]
    MissingRequiredClaim(&'static str),
}
