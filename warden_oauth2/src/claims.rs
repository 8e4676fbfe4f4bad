use serde::{Deserialize, Serialize};
use warden::jwt::{self, ClaimSet};
use warden_clock::UnixTime;

use crate::scope::{InvalidScopeToken, Scope};

/// Claims beyond the registered set that this crate extracts from a token
///
/// Decoded independently of the registered claims. A missing or `null`
/// `scope` decodes as no scope; a `scope` that is not a string fails to
/// decode.
///
/// [`validate`](Self::validate) holds each scope token to the RFC 6749
/// grammar, so a scope with a non-ASCII, quote, or backslash character is
/// rejected even though it is a well-formed JSON string.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[must_use]
pub struct CustomClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scope: Option<String>,
}

impl CustomClaims {
    /// Custom claims carrying the given space-delimited scope
    pub fn with_scope(scope: impl Into<String>) -> Self {
        Self {
            scope: Some(scope.into()),
        }
    }

    /// The raw `scope` claim
    #[must_use]
    pub fn raw_scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// Checks the custom claims, producing the granted scope
    ///
    /// # Errors
    ///
    /// Returns an error if any scope token is not a valid RFC 6749 scope token.
    pub fn validate(&self) -> Result<Scope, InvalidScopeToken> {
        match &self.scope {
            Some(s) => s.parse(),
            None => Ok(Scope::empty()),
        }
    }
}

/// The claims of a token that passed every validation step
///
/// Only a validator in this crate can produce this type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedClaims {
    registered: jwt::RegisteredClaims,
    scope: Scope,
}

impl ValidatedClaims {
    pub(crate) fn new(registered: jwt::RegisteredClaims, scope: Scope) -> Self {
        Self { registered, scope }
    }

    /// The issuer that signed the token
    #[must_use]
    pub fn issuer(&self) -> Option<&jwt::IssuerRef> {
        self.registered.iss()
    }

    /// The audiences the token was issued for
    pub fn audiences(&self) -> &jwt::Audiences {
        self.registered.aud()
    }

    /// The subject the token was issued to
    #[must_use]
    pub fn subject(&self) -> Option<&jwt::SubjectRef> {
        self.registered.sub()
    }

    /// When the token expires
    #[must_use]
    pub fn expires(&self) -> Option<UnixTime> {
        self.registered.exp()
    }

    /// When the token starts being valid
    #[must_use]
    pub fn not_before(&self) -> Option<UnixTime> {
        self.registered.nbf()
    }

    /// When the token was issued
    #[must_use]
    pub fn issued_at(&self) -> Option<UnixTime> {
        self.registered.iat()
    }

    /// The OAuth2 scope granted by the token
    pub fn scope(&self) -> &Scope {
        &self.scope
    }
}

impl jwt::ClaimSet for ValidatedClaims {
    fn iss(&self) -> Option<&jwt::IssuerRef> {
        self.registered.iss()
    }

    fn sub(&self) -> Option<&jwt::SubjectRef> {
        self.registered.sub()
    }

    fn aud(&self) -> &jwt::Audiences {
        self.registered.aud()
    }

    fn exp(&self) -> Option<UnixTime> {
        self.registered.exp()
    }

    fn nbf(&self) -> Option<UnixTime> {
        self.registered.nbf()
    }

    fn iat(&self) -> Option<UnixTime> {
        self.registered.iat()
    }
}

#[cfg(test)]
mod tests {
    use color_eyre::Result;
    use serde_json::json;

    use super::*;

    #[test]
    fn missing_scope_is_empty() -> Result<()> {
        let claims: CustomClaims = serde_json::from_value(json!({"sub": "x"}))?;
        assert!(claims.validate()?.is_empty());

        let claims: CustomClaims = serde_json::from_value(json!({"scope": null}))?;
        assert!(claims.validate()?.is_empty());
        Ok(())
    }

    #[test]
    fn non_string_scope_fails_to_decode() {
        assert!(serde_json::from_value::<CustomClaims>(json!({"scope": 42})).is_err());
        assert!(serde_json::from_value::<CustomClaims>(json!({"scope": ["a", "b"]})).is_err());
    }

    #[test]
    fn invalid_scope_token_fails_validation() -> Result<()> {
        let claims: CustomClaims = serde_json::from_value(json!({"scope": "read \"write\""}))?;
        assert!(claims.validate().is_err());
        Ok(())
    }

    #[test]
    fn non_ascii_scope_token_fails_validation() -> Result<()> {
        let claims: CustomClaims = serde_json::from_value(json!({"scope": "read:órdenes"}))?;
        assert!(matches!(
            claims.validate(),
            Err(InvalidScopeToken::ForbiddenCharacter { found: 'ó', .. })
        ));
        Ok(())
    }

    #[test]
    fn scope_string_is_split() -> Result<()> {
        let claims = CustomClaims::with_scope("read:orders write:orders");
        let scope = claims.validate()?;
        assert_eq!(scope.len(), 2);
        Ok(())
    }
}
