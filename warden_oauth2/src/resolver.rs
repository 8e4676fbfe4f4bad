use std::{sync::Arc, time::Duration};

use arc_swap::ArcSwapOption;
use thiserror::Error;
use tokio::sync::Mutex;
use url::Url;
use warden::{jwa, jwk, Jwk, Jwks};
use warden_clock::{Clock, DurationSecs, System, UnixTime};

use crate::fetch::{FetchError, KeyFetcher};

/// How long a fetched key set is served before it is fetched again
pub const DEFAULT_KEY_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// An error resolving a signing key
#[derive(Debug, Error)]
pub enum KeyResolveError {
    /// The issuer's current key set holds no key usable for the token
    #[error("no key with id {kid} usable with {alg}")]
    KeyNotFound {
        /// The key ID requested by the token
        kid: jwk::KeyId,
        /// The algorithm requested by the token
        alg: jwa::Algorithm,
    },

    /// The issuer's key set could not be fetched
    #[error("unable to fetch key set")]
    Fetch(#[from] FetchError),
}

impl KeyResolveError {
    /// Whether the key set was available but lacked the requested key
    #[must_use]
    pub fn is_key_not_found(&self) -> bool {
        matches!(self, Self::KeyNotFound { .. })
    }
}

#[derive(Debug)]
struct CachedKeys {
    jwks: Jwks,
    fetched_at: UnixTime,
}

impl CachedKeys {
    fn is_fresh(&self, now: UnixTime, ttl: DurationSecs) -> bool {
        now - self.fetched_at < ttl
    }
}

/// Resolves signing keys for one issuer from a cached copy of its key set
///
/// The whole key set is fetched at once and replaces any prior copy. A
/// cached copy is served without network access while it is younger than
/// the TTL, and a key ID it does not hold is reported as not found without
/// fetching again. Once the copy expires, concurrent callers wait on a
/// single fetch. A failed fetch leaves the prior copy in place.
#[derive(Debug)]
pub struct KeyResolver<F, K = System> {
    issuer: Url,
    fetcher: F,
    clock: K,
    ttl: DurationSecs,
    cache: ArcSwapOption<CachedKeys>,
    refresh: Mutex<()>,
}

impl<F> KeyResolver<F>
where
    F: KeyFetcher,
{
    /// Constructs a resolver for `issuer` using the system clock and the
    /// default TTL
    pub fn new(issuer: Url, fetcher: F) -> Self {
        Self::with_clock(issuer, fetcher, System)
    }
}

impl<F, K> KeyResolver<F, K>
where
    F: KeyFetcher,
    K: Clock,
{
    /// Constructs a resolver for `issuer` reading time from `clock`
    pub fn with_clock(issuer: Url, fetcher: F, clock: K) -> Self {
        Self {
            issuer,
            fetcher,
            clock,
            ttl: DEFAULT_KEY_CACHE_TTL.into(),
            cache: ArcSwapOption::empty(),
            refresh: Mutex::new(()),
        }
    }

    /// Overrides how long a fetched key set is served
    #[must_use]
    pub fn with_ttl(self, ttl: Duration) -> Self {
        Self {
            ttl: ttl.into(),
            ..self
        }
    }

    /// The issuer whose keys are resolved
    #[must_use]
    pub fn issuer(&self) -> &Url {
        &self.issuer
    }

    /// The clock used to age the cached key set
    #[must_use]
    pub fn clock(&self) -> &K {
        &self.clock
    }

    /// The key IDs in the cached key set, regardless of its age
    #[must_use]
    pub fn cached_key_ids(&self) -> Vec<jwk::KeyId> {
        self.cache
            .load()
            .as_ref()
            .map(|c| c.jwks.key_ids().map(ToOwned::to_owned).collect())
            .unwrap_or_default()
    }

    /// Resolves the key with the given ID that can verify `alg`
    ///
    /// # Errors
    ///
    /// Returns [`KeyResolveError::Fetch`] if a refresh was needed and
    /// failed, or [`KeyResolveError::KeyNotFound`] if the current key set
    /// holds no matching key.
    pub async fn get_key(
        &self,
        kid: &jwk::KeyIdRef,
        alg: jwa::Algorithm,
    ) -> Result<Jwk, KeyResolveError> {
        let keys = match self.fresh_keys() {
            Some(keys) => keys,
            None => {
                let _guard = self.refresh.lock().await;

                // another caller may have refreshed while this one waited
                match self.fresh_keys() {
                    Some(keys) => keys,
                    None => self.refresh_locked().await?,
                }
            }
        };

        keys.jwks.get_key_by_id(kid, alg).cloned().ok_or_else(|| {
            tracing::debug!(%kid, %alg, "no matching key in key set");
            KeyResolveError::KeyNotFound {
                kid: kid.to_owned(),
                alg,
            }
        })
    }

    fn fresh_keys(&self) -> Option<Arc<CachedKeys>> {
        self.cache
            .load_full()
            .filter(|c| c.is_fresh(self.clock.now(), self.ttl))
    }

    /// Fetches the issuer's key set now, replacing any cached copy
    ///
    /// # Errors
    ///
    /// Returns an error if the fetch fails, in which case the cached copy
    /// is left untouched.
    pub async fn refresh(&self) -> Result<(), FetchError> {
        let _guard = self.refresh.lock().await;
        self.refresh_locked().await.map(drop)
    }

    async fn refresh_locked(&self) -> Result<Arc<CachedKeys>, FetchError> {
        tracing::debug!(issuer = %self.issuer, "refreshing JWKS");

        let jwks = match self.fetcher.fetch_jwks(&self.issuer).await {
            Ok(jwks) => jwks,
            Err(err) => {
                let error: &dyn std::error::Error = &err;
                tracing::warn!(issuer = %self.issuer, error, "JWKS refresh failed");
                return Err(err);
            }
        };

        let keys = Arc::new(CachedKeys {
            jwks,
            fetched_at: self.clock.now(),
        });

        tracing::info!(
            issuer = %self.issuer,
            jwks.keys = keys.jwks.len(),
            "JWKS refreshed"
        );

        self.cache.store(Some(Arc::clone(&keys)));
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex as StdMutex,
    };

    use async_trait::async_trait;
    use color_eyre::Result;
    use tracing_test::traced_test;
    use warden::test_util;
    use warden_clock::TestClock;

    use super::*;

    const START: UnixTime = UnixTime(1_700_000_000);

    #[derive(Debug)]
    struct ScriptedFetcher {
        jwks: StdMutex<Result<Jwks, u16>>,
        calls: AtomicUsize,
        delay: Duration,
    }

    impl ScriptedFetcher {
        fn serving(doc: &str) -> Arc<Self> {
            Arc::new(Self {
                jwks: StdMutex::new(Ok(serde_json::from_str(doc).unwrap())),
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
            })
        }

        fn slow(doc: &str, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                jwks: StdMutex::new(Ok(serde_json::from_str(doc).unwrap())),
                calls: AtomicUsize::new(0),
                delay,
            })
        }

        fn serve(&self, doc: &str) {
            *self.jwks.lock().unwrap() = Ok(serde_json::from_str(doc).unwrap());
        }

        fn fail_with(&self, status: u16) {
            *self.jwks.lock().unwrap() = Err(status);
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl KeyFetcher for ScriptedFetcher {
        async fn fetch_jwks(&self, issuer: &Url) -> Result<Jwks, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let scripted = self.jwks.lock().unwrap().clone();
            scripted.map_err(|status| FetchError::Status {
                url: issuer.clone(),
                status,
            })
        }
    }

    fn issuer() -> Url {
        Url::parse("https://tenant.example/").unwrap()
    }

    fn primary() -> &'static jwk::KeyIdRef {
        jwk::KeyIdRef::from_static(test_util::PRIMARY_KEY_ID)
    }

    fn secondary() -> &'static jwk::KeyIdRef {
        jwk::KeyIdRef::from_static(test_util::SECONDARY_KEY_ID)
    }

    #[tokio::test]
    async fn serves_cached_keys_within_ttl() -> Result<()> {
        let fetcher = ScriptedFetcher::serving(test_util::JWKS);
        let clock = TestClock::new(START);
        let resolver = KeyResolver::with_clock(issuer(), Arc::clone(&fetcher), clock.clone());

        let _primary = resolver.get_key(primary(), jwa::Algorithm::RS256).await?;
        clock.advance(DurationSecs(299));
        let _secondary = resolver.get_key(secondary(), jwa::Algorithm::RS256).await?;

        assert_eq!(fetcher.calls(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn refetches_after_ttl() -> Result<()> {
        let fetcher = ScriptedFetcher::serving(test_util::JWKS);
        let clock = TestClock::new(START);
        let resolver = KeyResolver::with_clock(issuer(), Arc::clone(&fetcher), clock.clone());

        let _key = resolver.get_key(primary(), jwa::Algorithm::RS256).await?;
        clock.advance(DurationSecs(300));
        let _key = resolver.get_key(primary(), jwa::Algorithm::RS256).await?;

        assert_eq!(fetcher.calls(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn honours_custom_ttl() -> Result<()> {
        let fetcher = ScriptedFetcher::serving(test_util::JWKS);
        let clock = TestClock::new(START);
        let resolver = KeyResolver::with_clock(issuer(), Arc::clone(&fetcher), clock.clone())
            .with_ttl(Duration::from_secs(30));

        let _key = resolver.get_key(primary(), jwa::Algorithm::RS256).await?;
        clock.advance(DurationSecs(30));
        let _key = resolver.get_key(primary(), jwa::Algorithm::RS256).await?;

        assert_eq!(fetcher.calls(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_kid_within_ttl_does_not_refetch() -> Result<()> {
        let fetcher = ScriptedFetcher::serving(test_util::JWKS_PRIMARY);
        let clock = TestClock::new(START);
        let resolver = KeyResolver::with_clock(issuer(), Arc::clone(&fetcher), clock.clone());

        let _key = resolver.get_key(primary(), jwa::Algorithm::RS256).await?;

        fetcher.serve(test_util::JWKS);
        for _ in 0..10 {
            let err = resolver
                .get_key(jwk::KeyIdRef::from_static("made-up"), jwa::Algorithm::RS256)
                .await
                .unwrap_err();
            assert!(err.is_key_not_found());
        }
        assert_eq!(fetcher.calls(), 1);

        clock.advance(DurationSecs(299));
        let err = resolver
            .get_key(secondary(), jwa::Algorithm::RS256)
            .await
            .unwrap_err();
        assert!(err.is_key_not_found());
        assert_eq!(fetcher.calls(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn rotated_in_key_is_found_after_ttl() -> Result<()> {
        let fetcher = ScriptedFetcher::serving(test_util::JWKS_PRIMARY);
        let clock = TestClock::new(START);
        let resolver = KeyResolver::with_clock(issuer(), Arc::clone(&fetcher), clock.clone());

        let _key = resolver.get_key(primary(), jwa::Algorithm::RS256).await?;

        fetcher.serve(test_util::JWKS);
        clock.advance(DurationSecs(300));
        let key = resolver.get_key(secondary(), jwa::Algorithm::RS256).await?;

        assert_eq!(key.key_id(), Some(secondary()));
        assert_eq!(fetcher.calls(), 2);
        assert_eq!(resolver.cached_key_ids().len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn missing_kid_after_refresh_is_not_found() -> Result<()> {
        let fetcher = ScriptedFetcher::serving(test_util::JWKS_PRIMARY);
        let resolver =
            KeyResolver::with_clock(issuer(), Arc::clone(&fetcher), TestClock::new(START));

        let err = resolver
            .get_key(secondary(), jwa::Algorithm::RS256)
            .await
            .unwrap_err();

        assert!(err.is_key_not_found());
        assert_eq!(fetcher.calls(), 1);
        Ok(())
    }

    #[tokio::test]
    #[traced_test]
    async fn failed_refresh_keeps_prior_keys() -> Result<()> {
        let fetcher = ScriptedFetcher::serving(test_util::JWKS);
        let clock = TestClock::new(START);
        let resolver = KeyResolver::with_clock(issuer(), Arc::clone(&fetcher), clock.clone());

        let _key = resolver.get_key(primary(), jwa::Algorithm::RS256).await?;

        fetcher.fail_with(503);
        clock.advance(DurationSecs(301));
        let err = resolver
            .get_key(primary(), jwa::Algorithm::RS256)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            KeyResolveError::Fetch(FetchError::Status { status: 503, .. })
        ));
        assert!(logs_contain("JWKS refresh failed"));
        assert_eq!(resolver.cached_key_ids().len(), 2);

        fetcher.serve(test_util::JWKS);
        let _key = resolver.get_key(primary(), jwa::Algorithm::RS256).await?;
        assert_eq!(fetcher.calls(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn fetch_failure_without_cache_is_reported() {
        let fetcher = ScriptedFetcher::serving(test_util::JWKS);
        fetcher.fail_with(500);
        let resolver =
            KeyResolver::with_clock(issuer(), Arc::clone(&fetcher), TestClock::new(START));

        let err = resolver
            .get_key(primary(), jwa::Algorithm::RS256)
            .await
            .unwrap_err();
        assert!(matches!(err, KeyResolveError::Fetch(_)));
        assert!(resolver.cached_key_ids().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_callers_share_one_fetch() -> Result<()> {
        let fetcher = ScriptedFetcher::slow(test_util::JWKS, Duration::from_millis(100));
        let resolver = Arc::new(KeyResolver::with_clock(
            issuer(),
            Arc::clone(&fetcher),
            TestClock::new(START),
        ));

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let resolver = Arc::clone(&resolver);
                tokio::spawn(async move {
                    let kid = if i % 2 == 0 { primary() } else { secondary() };
                    resolver.get_key(kid, jwa::Algorithm::RS256).await
                })
            })
            .collect();

        for task in tasks {
            let _key = task.await??;
        }

        assert_eq!(fetcher.calls(), 1);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_callers_after_expiry_share_one_refresh() -> Result<()> {
        let fetcher = ScriptedFetcher::slow(test_util::JWKS, Duration::from_millis(100));
        let clock = TestClock::new(START);
        let resolver = Arc::new(KeyResolver::with_clock(
            issuer(),
            Arc::clone(&fetcher),
            clock.clone(),
        ));
        resolver.refresh().await?;

        clock.advance(DurationSecs(301));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let resolver = Arc::clone(&resolver);
                tokio::spawn(async move { resolver.get_key(primary(), jwa::Algorithm::RS256).await })
            })
            .collect();

        for task in tasks {
            let key = task.await??;
            assert_eq!(key.key_id(), Some(primary()));
        }

        assert_eq!(fetcher.calls(), 2);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_unknown_kids_within_ttl_do_not_fetch() -> Result<()> {
        let fetcher = ScriptedFetcher::serving(test_util::JWKS);
        let resolver = Arc::new(KeyResolver::with_clock(
            issuer(),
            Arc::clone(&fetcher),
            TestClock::new(START),
        ));
        resolver.refresh().await?;

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let resolver = Arc::clone(&resolver);
                tokio::spawn(async move {
                    resolver
                        .get_key(jwk::KeyIdRef::from_static("retired"), jwa::Algorithm::RS256)
                        .await
                })
            })
            .collect();

        for task in tasks {
            assert!(task.await?.unwrap_err().is_key_not_found());
        }

        assert_eq!(fetcher.calls(), 1);
        Ok(())
    }
}
