//! The logging context each invocation runs under

use std::future::Future;

use tracing::{instrument::WithSubscriber, level_filters::LevelFilter, Dispatch, Instrument};
use tracing_subscriber::{fmt::MakeWriter, EnvFilter};

/// Parses a `LOG_LEVEL` value
///
/// Only the lowercase names `debug`, `info`, `warn`, and `error` are
/// recognized.
#[must_use]
pub fn parse_level(raw: &str) -> Option<LevelFilter> {
    match raw {
        "debug" => Some(LevelFilter::DEBUG),
        "info" => Some(LevelFilter::INFO),
        "warn" => Some(LevelFilter::WARN),
        "error" => Some(LevelFilter::ERROR),
        _ => None,
    }
}

/// A subscriber and the service name it tags events with
///
/// Built once at startup and applied to each invocation, so no global
/// subscriber is installed or swapped while requests are in flight.
#[derive(Clone, Debug)]
pub struct LogContext {
    dispatch: Dispatch,
    service: String,
    level: LevelFilter,
}

impl LogContext {
    /// A context writing formatted events to stderr
    ///
    /// An unrecognized `level` logs everything, and says so.
    pub fn new(service: impl Into<String>, level: &str) -> Self {
        Self::with_writer(service, level, std::io::stderr)
    }

    /// A context writing formatted events to `writer`
    pub fn with_writer<W>(service: impl Into<String>, level: &str, writer: W) -> Self
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let parsed = parse_level(level);
        let filter = parsed.unwrap_or(LevelFilter::TRACE);

        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::builder()
                    .with_default_directive(filter.into())
                    .parse_lossy(""),
            )
            .with_writer(writer)
            .with_ansi(false)
            .finish();

        let context = Self {
            dispatch: Dispatch::new(subscriber),
            service: service.into(),
            level: filter,
        };

        if parsed.is_none() {
            tracing::dispatcher::with_default(&context.dispatch, || {
                tracing::error!(
                    service = %context.service,
                    log_level = level,
                    "unrecognized LOG_LEVEL; logging everything"
                );
            });
        }

        context
    }

    /// The service name events are tagged with
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// The most verbose level that is logged
    #[must_use]
    pub fn level(&self) -> LevelFilter {
        self.level
    }

    /// The dispatch events are sent to
    #[must_use]
    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Runs `fut` under this context, inside a root span carrying the
    /// service name
    pub async fn scope<F>(&self, fut: F) -> F::Output
    where
        F: Future,
    {
        // Error level so the span survives every filter
        let span = tracing::dispatcher::with_default(&self.dispatch, || {
            tracing::error_span!("invocation", service = %self.service)
        });

        fut.instrument(span)
            .with_subscriber(self.dispatch.clone())
            .await
    }
}
