use std::io;

use once_cell::sync::OnceCell;
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use url::Url;
use warden::{jwt, JwtRef};
use warden_clock::{Clock, System};
use warden_oauth2::{
    FetchError, HttpKeyFetcher, KeyFetcher, KeyResolver, TokenValidator, ValidatedClaims,
};

use crate::{
    config::AuthorizerConfig,
    error::{AuthorizerError, ErrorKind},
    event::{AuthorizerRequest, AuthorizerResponse},
    logging::LogContext,
    policy::{PolicyDecision, PolicyEngine},
};

/// Extracts the token from a `Bearer` authorization value
///
/// The scheme is matched case-insensitively and must be followed by a
/// space and at least one more character. Everything after that space is
/// the token, surrounding whitespace included.
#[must_use]
pub fn extract_bearer(auth: &str) -> Option<&JwtRef> {
    match auth.get(..7) {
        Some(scheme) if auth.len() > 7 && scheme.eq_ignore_ascii_case("bearer ") => {
            Some(JwtRef::from_str(&auth[7..]))
        }
        _ => None,
    }
}

/// The issuer URL for a tenant domain: `https://<domain>/`
///
/// # Errors
///
/// Returns [`AuthorizerError::IssuerUrlInvalid`] if the domain does not
/// form a valid URL.
pub fn issuer_url(domain: &str) -> Result<Url, AuthorizerError> {
    Url::parse(&format!("https://{domain}/")).map_err(AuthorizerError::IssuerUrlInvalid)
}

/// The outcome of one authorization request
///
/// The decision is always present. When the request was denied for a
/// reason, the reason is carried alongside rather than in the decision.
#[derive(Debug)]
#[must_use]
pub struct Authorization {
    /// The policy decision to return to the gateway
    pub decision: PolicyDecision,
    /// Why the request was denied, if it was denied for a reason
    pub error: Option<AuthorizerError>,
}

impl Authorization {
    /// Whether the decision grants access
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        self.decision.is_allowed()
    }

    /// The kind of error reported, if any
    #[must_use]
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(AuthorizerError::kind)
    }
}

/// A reported error, as written alongside a response
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReplyError {
    /// The stable error kind
    pub kind: ErrorKind,
    /// The error and its sources
    pub message: String,
}

/// One line of output: the response and any error reported with it
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Reply {
    /// The gateway response
    pub response: AuthorizerResponse,
    /// The error reported with the response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ReplyError>,
}

impl From<Authorization> for Reply {
    fn from(authorization: Authorization) -> Self {
        Self {
            response: authorization.decision.into(),
            error: authorization.error.map(|e| ReplyError {
                kind: e.kind(),
                message: e.description(),
            }),
        }
    }
}

/// Authorizes gateway requests bearing tokens from the configured issuer
///
/// The token validator, and with it the issuer's cached key set, is built
/// on the first request that reaches validation and kept for the life of
/// the authorizer.
#[derive(Debug)]
pub struct Authorizer<F = HttpKeyFetcher, K = System> {
    config: AuthorizerConfig,
    engine: PolicyEngine,
    fetcher: F,
    clock: K,
    validator: OnceCell<TokenValidator<F, K>>,
}

impl Authorizer {
    /// Constructs an authorizer fetching keys over HTTP as configured
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn from_config(config: AuthorizerConfig) -> Result<Self, FetchError> {
        let fetcher = HttpKeyFetcher::new(config.jwks_endpoint(), config.fetch_timeout())?;
        Ok(Self::new(config, fetcher))
    }
}

impl<F> Authorizer<F>
where
    F: KeyFetcher + Clone,
{
    /// Constructs an authorizer fetching keys through `fetcher`
    pub fn new(config: AuthorizerConfig, fetcher: F) -> Self {
        Self::with_clock(config, fetcher, System)
    }
}

impl<F, K> Authorizer<F, K>
where
    F: KeyFetcher + Clone,
    K: Clock + Clone,
{
    /// Constructs an authorizer reading time from `clock`
    pub fn with_clock(config: AuthorizerConfig, fetcher: F, clock: K) -> Self {
        Self {
            config,
            engine: PolicyEngine::default(),
            fetcher,
            clock,
            validator: OnceCell::new(),
        }
    }

    /// Replaces the policy engine
    #[must_use]
    pub fn with_engine(self, engine: PolicyEngine) -> Self {
        Self { engine, ..self }
    }

    /// The authorizer's configuration
    pub fn config(&self) -> &AuthorizerConfig {
        &self.config
    }

    /// The policy engine in use
    pub fn engine(&self) -> &PolicyEngine {
        &self.engine
    }

    /// Decides on a request
    ///
    /// Never fails: every failure is a deny decision paired with the error
    /// that caused it.
    #[tracing::instrument(level = "debug", skip_all, fields(method_arn = %request.method_arn))]
    pub async fn handle(&self, request: &AuthorizerRequest) -> Authorization {
        match self.authorize(request).await {
            Ok(claims) => {
                let decision = self.engine.decide(Ok(&claims));
                tracing::debug!(
                    principal = decision.principal_id(),
                    effect = ?decision.effect(),
                    "request decided"
                );
                Authorization {
                    decision,
                    error: None,
                }
            }
            Err(error) => self.deny(error),
        }
    }

    /// Decides on a request encoded as one line of JSON
    pub async fn handle_line(&self, line: &str) -> Reply {
        let authorization = match serde_json::from_str::<AuthorizerRequest>(line) {
            Ok(request) => self.handle(&request).await,
            Err(err) => self.deny(AuthorizerError::MalformedRequest(err)),
        };

        authorization.into()
    }

    /// Answers each non-blank line of `input` with one line of `output`
    /// until `input` ends
    ///
    /// # Errors
    ///
    /// Returns an error if reading or writing fails.
    pub async fn serve<R, W>(&self, log: &LogContext, input: R, mut output: W) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        log.scope(async { tracing::info!(level = %log.level(), "service started") })
            .await;

        let mut lines = input.lines();
        let mut answered = 0_u64;

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            let reply = log.scope(self.handle_line(&line)).await;

            let mut out = serde_json::to_vec(&reply)?;
            out.push(b'\n');
            output.write_all(&out).await?;
            output.flush().await?;
            answered += 1;
        }

        log.scope(async { tracing::info!(requests = answered, "service finished") })
            .await;

        Ok(())
    }

    fn deny(&self, error: AuthorizerError) -> Authorization {
        let kind = error.kind();
        let description = error.description();
        if error.is_configuration() {
            tracing::error!(%kind, error = %description, "request denied");
        } else {
            tracing::debug!(%kind, error = %description, "request denied");
        }

        Authorization {
            decision: self.engine.decide(Err(&error)),
            error: Some(error),
        }
    }

    async fn authorize(
        &self,
        request: &AuthorizerRequest,
    ) -> Result<ValidatedClaims, AuthorizerError> {
        let (domain, audience) = self.config.required()?;

        let token = extract_bearer(&request.authorization_token)
            .ok_or(AuthorizerError::MalformedCredential)?;

        let issuer = issuer_url(domain)?;
        let audience = jwt::AudienceRef::from_str(audience);

        let claims = self
            .validator(&issuer)
            .validate(token, &issuer, audience)
            .await?;

        Ok(claims)
    }

    fn validator(&self, issuer: &Url) -> &TokenValidator<F, K> {
        self.validator.get_or_init(|| {
            tracing::info!(
                %issuer,
                key_cache.ttl_secs = self.config.key_cache_ttl().as_secs(),
                "initializing token validator"
            );

            let resolver =
                KeyResolver::with_clock(issuer.clone(), self.fetcher.clone(), self.clock.clone())
                    .with_ttl(self.config.key_cache_ttl());

            TokenValidator::new(resolver).with_leeway(self.config.clock_skew())
        })
    }
}
