//! Retrieval of an issuer's published JSON Web Key Set

use std::{fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use url::Url;
use warden::Jwks;

/// The default bound on each request made while fetching keys
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// An error encountered while fetching an issuer's key set
#[derive(Debug, Error)]
pub enum FetchError {
    /// An endpoint location could not be derived
    #[error("invalid key set location")]
    InvalidUrl(#[from] url::ParseError),

    /// The request could not be completed, or its body could not be decoded
    #[error("key set request failed")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status
    #[error("{url} responded with status {status}")]
    Status {
        /// The URL requested
        url: Url,
        /// The HTTP status code returned
        status: u16,
    },
}

/// A source of an issuer's current key set
#[async_trait]
pub trait KeyFetcher: Send + Sync {
    /// Fetches the complete key set published by `issuer`
    ///
    /// # Errors
    ///
    /// Returns an error if the key set cannot be retrieved or decoded.
    async fn fetch_jwks(&self, issuer: &Url) -> Result<Jwks, FetchError>;
}

#[async_trait]
impl<F: KeyFetcher + ?Sized> KeyFetcher for Arc<F> {
    #[inline]
    async fn fetch_jwks(&self, issuer: &Url) -> Result<Jwks, FetchError> {
        F::fetch_jwks(self, issuer).await
    }
}

#[async_trait]
impl<F: KeyFetcher + ?Sized> KeyFetcher for Box<F> {
    #[inline]
    async fn fetch_jwks(&self, issuer: &Url) -> Result<Jwks, FetchError> {
        F::fetch_jwks(self, issuer).await
    }
}

/// Where an issuer publishes its key set
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JwksEndpoint {
    /// Read `jwks_uri` from `<issuer>.well-known/openid-configuration`
    #[default]
    Discovery,
    /// Fetch `<issuer>.well-known/jwks.json` directly
    WellKnown,
}

impl JwksEndpoint {
    const DISCOVERY_PATH: &'static str = ".well-known/openid-configuration";
    const WELL_KNOWN_PATH: &'static str = ".well-known/jwks.json";
}

impl fmt::Display for JwksEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Discovery => "discovery",
            Self::WellKnown => "well-known",
        })
    }
}

#[derive(Debug, Deserialize)]
struct OidcConfiguration {
    jwks_uri: Url,
}

/// Fetches key sets over HTTP
#[derive(Clone, Debug)]
pub struct HttpKeyFetcher {
    client: Client,
    endpoint: JwksEndpoint,
}

impl HttpKeyFetcher {
    /// Constructs a fetcher that bounds every request by `timeout`
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(endpoint: JwksEndpoint, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(concat!("warden_oauth2/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self { client, endpoint })
    }

    /// Uses an existing client, keeping whatever timeouts it was built with
    pub fn with_client(client: Client, endpoint: JwksEndpoint) -> Self {
        Self { client, endpoint }
    }

    /// The key set location strategy
    #[must_use]
    pub fn endpoint(&self) -> JwksEndpoint {
        self.endpoint
    }

    async fn get_json<T>(&self, url: Url) -> Result<T, FetchError>
    where
        T: for<'de> Deserialize<'de>,
    {
        tracing::debug!(http.url = %url, "requesting");
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(
                http.url = %url,
                http.status_code = status.as_u16(),
                "unexpected response status",
            );
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
            });
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl KeyFetcher for HttpKeyFetcher {
    #[tracing::instrument(skip_all, fields(issuer = %issuer, jwks.endpoint = %self.endpoint))]
    async fn fetch_jwks(&self, issuer: &Url) -> Result<Jwks, FetchError> {
        let jwks_url = match self.endpoint {
            JwksEndpoint::WellKnown => issuer.join(JwksEndpoint::WELL_KNOWN_PATH)?,
            JwksEndpoint::Discovery => {
                let discovery = issuer.join(JwksEndpoint::DISCOVERY_PATH)?;
                let config: OidcConfiguration = self.get_json(discovery).await?;
                config.jwks_uri
            }
        };

        self.get_json(jwks_url).await
    }
}

/// Serves a fixed key set, for issuers whose keys are known ahead of time
#[derive(Clone, Debug, Default)]
pub struct StaticKeyFetcher {
    jwks: Jwks,
}

impl StaticKeyFetcher {
    /// Serves `jwks` for every issuer
    #[must_use]
    pub fn new(jwks: Jwks) -> Self {
        Self { jwks }
    }
}

#[async_trait]
impl KeyFetcher for StaticKeyFetcher {
    async fn fetch_jwks(&self, _issuer: &Url) -> Result<Jwks, FetchError> {
        Ok(self.jwks.clone())
    }
}
