//! An API gateway custom authorizer for bearer tokens
//!
//! Each request carries an `Authorization` header value. The authorizer
//! extracts the bearer token and validates it against the configured
//! tenant's signing keys. The outcome becomes a gateway policy: allow or
//! deny, over a set of method ARN patterns. Failures are always a deny
//! over every resource, with the reason reported alongside.
//!
//! ```
//! use warden_authorizer::{AuthorizerConfig, AuthorizerRequest, Authorizer, ErrorKind};
//! use warden_oauth2::StaticKeyFetcher;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let authorizer = Authorizer::new(
//!     AuthorizerConfig::default()
//!         .with_domain("tenant.example")
//!         .with_audience("https://api.example/"),
//!     StaticKeyFetcher::default(),
//! );
//!
//! let request = AuthorizerRequest::token("Basic dXNlcjpwYXNz", "arn:aws:execute-api:*");
//! let authorization = authorizer.handle(&request).await;
//!
//! assert!(!authorization.is_allowed());
//! assert_eq!(authorization.error_kind(), Some(ErrorKind::MalformedCredential));
//! # }
//! ```

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

mod authorizer;
pub mod config;
mod error;
pub mod event;
pub mod logging;
pub mod policy;

pub use authorizer::{extract_bearer, issuer_url, Authorization, Authorizer, Reply, ReplyError};
pub use config::{AuthorizerConfig, Cli};
pub use error::{AuthorizerError, ErrorKind};
pub use event::{AuthorizerRequest, AuthorizerResponse, Effect};
pub use logging::LogContext;
pub use policy::{PolicyDecision, PolicyEngine, PolicyStrategy};
