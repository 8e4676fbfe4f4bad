//! The `scope` claim: a space-delimited set of RFC 6749 scope tokens

use std::{collections::BTreeSet, convert::Infallible, fmt, str::FromStr};

use aliri_braid::braid;
use thiserror::Error;

/// A scope token that breaks the RFC 6749 grammar
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum InvalidScopeToken {
    /// Nothing between two delimiters
    #[error("empty scope token")]
    Empty,
    /// A character outside `%x21 / %x23-5B / %x5D-7E`
    #[error("scope token has forbidden character {found:?} at byte {index}")]
    ForbiddenCharacter {
        /// Byte offset of the character
        index: usize,
        /// The offending character
        found: char,
    },
}

impl From<Infallible> for InvalidScopeToken {
    fn from(x: Infallible) -> Self {
        match x {}
    }
}

/// A single scope token, such as `read:orders`
///
/// Printable ASCII only, without space, `"`, or `\`.
#[braid(
    serde,
    validator,
    ref_doc = "A borrowed [`ScopeToken`]"
)]
pub struct ScopeToken;

impl aliri_braid::Validator for ScopeToken {
    type Error = InvalidScopeToken;

    fn validate(s: &str) -> Result<(), Self::Error> {
        if s.is_empty() {
            return Err(InvalidScopeToken::Empty);
        }

        match s
            .char_indices()
            .find(|&(_, c)| !matches!(c, '!' | '#'..='[' | ']'..='~'))
        {
            Some((index, found)) => Err(InvalidScopeToken::ForbiddenCharacter { index, found }),
            None => Ok(()),
        }
    }
}

/// The scope granted by a token, kept sorted and deduplicated
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
#[must_use]
pub struct Scope(BTreeSet<ScopeToken>);

impl Scope {
    /// A scope granting nothing
    pub const fn empty() -> Self {
        Self(BTreeSet::new())
    }

    /// Whether nothing is granted
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// How many distinct tokens are granted
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether `token` is granted
    #[must_use]
    pub fn contains(&self, token: &ScopeTokenRef) -> bool {
        self.0.contains(token)
    }

    /// The granted tokens, in order
    pub fn iter(&self) -> impl Iterator<Item = &ScopeTokenRef> + '_ {
        self.0.iter().map(|t| &**t)
    }
}

impl FromIterator<ScopeToken> for Scope {
    fn from_iter<I: IntoIterator<Item = ScopeToken>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl FromStr for Scope {
    type Err = InvalidScopeToken;

    /// Runs of whitespace count as one delimiter
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split_whitespace()
            .map(|t| ScopeToken::new(t.to_owned()))
            .collect()
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, token) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            f.write_str(token.as_str())?;
        }
        Ok(())
    }
}
