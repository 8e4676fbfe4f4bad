//! Bearer token validation against an OAuth2 issuer
//!
//! This crate ties the JOSE primitives in [`warden`] to a live issuer: it
//! fetches and caches the issuer's published JSON Web Key Set, validates
//! RS256 access tokens against it, and extracts the OAuth2 `scope` claim as
//! defined in [RFC 6749](https://datatracker.ietf.org/doc/html/rfc6749).
//!
//! # Feature flags
//!
//! This crate does not enable TLS support in `reqwest` on its own. Enable
//! `rustls-tls` or `default-tls` when fetching keys from an HTTPS issuer
//! and nothing else in the dependency graph already does so.

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

mod claims;
pub mod fetch;
mod resolver;
pub mod scope;
mod validator;

pub use claims::{CustomClaims, ValidatedClaims};
pub use fetch::{
    FetchError, HttpKeyFetcher, JwksEndpoint, KeyFetcher, StaticKeyFetcher, DEFAULT_FETCH_TIMEOUT,
};
pub use resolver::{KeyResolveError, KeyResolver, DEFAULT_KEY_CACHE_TTL};
pub use scope::{InvalidScopeToken, Scope, ScopeToken, ScopeTokenRef};
pub use validator::{
    MalformedCustomClaims, MalformedToken, TokenValidator, ValidationError, DEFAULT_CLOCK_SKEW,
};
