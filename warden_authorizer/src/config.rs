//! Authorizer configuration, read from the command line or environment

use std::{path::PathBuf, time::Duration};

use clap::{Parser, ValueEnum};
use warden_oauth2::{JwksEndpoint, DEFAULT_CLOCK_SKEW, DEFAULT_FETCH_TIMEOUT, DEFAULT_KEY_CACHE_TTL};

use crate::AuthorizerError;

/// The environment variable naming the issuer's domain
pub const DOMAIN_VAR: &str = "AUTH0_DOMAIN";

/// The environment variable naming the expected audience
pub const AUDIENCE_VAR: &str = "AUTH0_AUDIENCE";

/// Settings for an [`Authorizer`][crate::Authorizer]
///
/// The domain and audience are optional here so that their absence is
/// reported per request rather than at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
#[must_use]
pub struct AuthorizerConfig {
    domain: Option<String>,
    audience: Option<String>,
    key_cache_ttl: Duration,
    clock_skew: Duration,
    fetch_timeout: Duration,
    jwks_endpoint: JwksEndpoint,
}

impl Default for AuthorizerConfig {
    fn default() -> Self {
        Self {
            domain: None,
            audience: None,
            key_cache_ttl: DEFAULT_KEY_CACHE_TTL,
            clock_skew: DEFAULT_CLOCK_SKEW,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            jwks_endpoint: JwksEndpoint::default(),
        }
    }
}

impl AuthorizerConfig {
    /// Sets the issuer domain, such as `tenant.us.auth0.com`
    pub fn with_domain(self, domain: impl Into<String>) -> Self {
        Self {
            domain: Some(domain.into()),
            ..self
        }
    }

    /// Sets the audience tokens must be issued for
    pub fn with_audience(self, audience: impl Into<String>) -> Self {
        Self {
            audience: Some(audience.into()),
            ..self
        }
    }

    /// Sets how long the issuer's key set is cached
    pub fn with_key_cache_ttl(self, key_cache_ttl: Duration) -> Self {
        Self {
            key_cache_ttl,
            ..self
        }
    }

    /// Sets the clock skew tolerated on token time claims
    pub fn with_clock_skew(self, clock_skew: Duration) -> Self {
        Self { clock_skew, ..self }
    }

    /// Sets the bound on each key set request
    pub fn with_fetch_timeout(self, fetch_timeout: Duration) -> Self {
        Self {
            fetch_timeout,
            ..self
        }
    }

    /// Sets where the issuer's key set is located
    pub fn with_jwks_endpoint(self, jwks_endpoint: JwksEndpoint) -> Self {
        Self {
            jwks_endpoint,
            ..self
        }
    }

    /// The domain and audience, if both are set and non-empty
    ///
    /// # Errors
    ///
    /// Returns [`AuthorizerError::ConfigMissing`] naming the first value
    /// that is absent.
    pub fn required(&self) -> Result<(&str, &str), AuthorizerError> {
        let domain =
            non_empty(&self.domain).ok_or(AuthorizerError::ConfigMissing { name: DOMAIN_VAR })?;
        let audience = non_empty(&self.audience)
            .ok_or(AuthorizerError::ConfigMissing { name: AUDIENCE_VAR })?;
        Ok((domain, audience))
    }

    /// How long the issuer's key set is cached
    #[must_use]
    pub fn key_cache_ttl(&self) -> Duration {
        self.key_cache_ttl
    }

    /// The clock skew tolerated on token time claims
    #[must_use]
    pub fn clock_skew(&self) -> Duration {
        self.clock_skew
    }

    /// The bound on each key set request
    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    /// Where the issuer's key set is located
    #[must_use]
    pub fn jwks_endpoint(&self) -> JwksEndpoint {
        self.jwks_endpoint
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// How the key set location is specified on the command line
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum EndpointArg {
    /// Follow the issuer's OpenID discovery document
    #[default]
    Discovery,
    /// Fetch the issuer's `.well-known/jwks.json` directly
    WellKnown,
}

impl From<EndpointArg> for JwksEndpoint {
    fn from(arg: EndpointArg) -> Self {
        match arg {
            EndpointArg::Discovery => Self::Discovery,
            EndpointArg::WellKnown => Self::WellKnown,
        }
    }
}

/// Authorizes API gateway requests bearing tokens from an OAuth2 tenant
///
/// Reads one JSON authorizer request per line on stdin and writes one JSON
/// reply per line on stdout. Logs are written to stderr.
#[derive(Clone, Debug, Parser)]
#[command(name = "warden-authorizer", version)]
pub struct Cli {
    /// The issuer's domain; tokens must be issued by `https://<domain>/`
    #[arg(long, env = "AUTH0_DOMAIN")]
    pub domain: Option<String>,

    /// The audience tokens must be issued for
    #[arg(long, env = "AUTH0_AUDIENCE")]
    pub audience: Option<String>,

    /// Log verbosity: debug, info, warn, or error
    #[arg(long, env = "LOG_LEVEL", default_value = "debug")]
    pub log_level: String,

    /// The service name attached to every log event
    #[arg(long, env = "WARDEN_SERVICE_NAME", default_value = "warden-authorizer")]
    pub service_name: String,

    /// Seconds a fetched key set is served before it is fetched again
    #[arg(long, env = "WARDEN_KEY_CACHE_TTL_SECS", default_value_t = 300)]
    pub key_cache_ttl_secs: u64,

    /// Seconds of clock skew tolerated on token time claims
    #[arg(long, env = "WARDEN_CLOCK_SKEW_SECS", default_value_t = 60)]
    pub clock_skew_secs: u64,

    /// Seconds allowed for each key set request
    #[arg(long, env = "WARDEN_FETCH_TIMEOUT_SECS", default_value_t = 10)]
    pub fetch_timeout_secs: u64,

    /// How the issuer's key set is located
    #[arg(long, env = "WARDEN_JWKS_ENDPOINT", value_enum, default_value_t)]
    pub jwks_endpoint: EndpointArg,

    /// A JSON file describing the policy strategy; defaults to allowing
    /// every resource to a fixed principal
    #[arg(long, env = "WARDEN_POLICY_FILE")]
    pub policy_file: Option<PathBuf>,
}

impl Cli {
    /// The authorizer settings given on the command line
    pub fn authorizer_config(&self) -> AuthorizerConfig {
        let mut config = AuthorizerConfig::default()
            .with_key_cache_ttl(Duration::from_secs(self.key_cache_ttl_secs))
            .with_clock_skew(Duration::from_secs(self.clock_skew_secs))
            .with_fetch_timeout(Duration::from_secs(self.fetch_timeout_secs))
            .with_jwks_endpoint(self.jwks_endpoint.into());
        config.domain.clone_from(&self.domain);
        config.audience.clone_from(&self.audience);
        config
    }
}
