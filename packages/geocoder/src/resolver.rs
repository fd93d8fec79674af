//! Memoizing geocoder with bounded retry.
//!
//! [`Geocoder::resolve`] is the single entry point the pipeline uses. For a
//! `(country, city, address)` triple it:
//!
//! 1. builds the query key `"{address}, {city}, {country}"`,
//! 2. returns the cached outcome if the key was seen before,
//! 3. otherwise asks the provider, retrying transient errors per the
//!    [`RetryPolicy`], and caches whatever terminal outcome it reaches.
//!
//! Failed lookups are cached too, so a query that exhausted its retries
//! is not sent again later in the same run.

use location_map_models::{GeocodeOutcome, LocationRecord, query_key};

use crate::{ErrorKind, GeocodeCache, GeocodeProvider, RetryPolicy};

/// Counters collected while resolving.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeocodeStats {
    /// Calls answered from the cache.
    pub cache_hits: u64,
    /// Requests sent to the provider, retries included.
    pub provider_calls: u64,
    /// Distinct queries that reached the provider.
    pub queries: u64,
    /// Requests that were repeats of a failed attempt.
    pub retries: u64,
}

/// A provider wrapped with a per-run cache and retry policy.
pub struct Geocoder {
    provider: Box<dyn GeocodeProvider>,
    cache: GeocodeCache,
    retry: RetryPolicy,
    stats: GeocodeStats,
}

impl Geocoder {
    /// Creates a geocoder with an empty cache.
    #[must_use]
    pub fn new(provider: Box<dyn GeocodeProvider>, retry: RetryPolicy) -> Self {
        Self::with_cache(provider, retry, GeocodeCache::new())
    }

    /// Creates a geocoder that starts from an existing cache.
    #[must_use]
    pub fn with_cache(
        provider: Box<dyn GeocodeProvider>,
        retry: RetryPolicy,
        cache: GeocodeCache,
    ) -> Self {
        Self {
            provider,
            cache,
            retry,
            stats: GeocodeStats::default(),
        }
    }

    /// Id of the wrapped provider.
    #[must_use]
    pub fn provider_id(&self) -> &str {
        self.provider.id()
    }

    /// Counters collected so far.
    #[must_use]
    pub const fn stats(&self) -> GeocodeStats {
        self.stats
    }

    /// The cache as it currently stands.
    #[must_use]
    pub const fn cache(&self) -> &GeocodeCache {
        &self.cache
    }

    /// Resolves a record's address fields.
    pub async fn resolve_record(&mut self, record: &LocationRecord) -> GeocodeOutcome {
        self.resolve(&record.country, &record.city, &record.address)
            .await
    }

    /// Resolves an address to coordinates, consulting the cache first.
    ///
    /// Never fails: errors are folded into [`GeocodeOutcome::Failed`].
    pub async fn resolve(&mut self, country: &str, city: &str, address: &str) -> GeocodeOutcome {
        let query = query_key(country, city, address);

        if let Some(outcome) = self.cache.get(&query) {
            self.stats.cache_hits += 1;
            log::debug!("Cache hit for '{query}'");
            return outcome.clone();
        }

        let outcome = self.lookup(&query).await;
        self.cache.insert(query, outcome.clone());
        outcome
    }

    async fn lookup(&mut self, query: &str) -> GeocodeOutcome {
        let max_attempts = self.retry.max_attempts();
        self.stats.queries += 1;

        let mut attempt = 1;
        loop {
            self.stats.provider_calls += 1;
            if attempt > 1 {
                self.stats.retries += 1;
            }

            match self.provider.geocode(query).await {
                Ok(Some(found)) => {
                    log::debug!(
                        "Geocoded '{query}' -> {} ({})",
                        found.coordinates(),
                        found.matched_address.as_deref().unwrap_or("no label"),
                    );
                    return GeocodeOutcome::Resolved(found.coordinates());
                }
                Ok(None) => {
                    log::info!("No match for '{query}'");
                    return GeocodeOutcome::Missing;
                }
                Err(e) => {
                    let kind = e.kind();
                    if kind == ErrorKind::Transient && attempt < max_attempts {
                        let delay = self.retry.delay_before(attempt + 1);
                        log::warn!(
                            "Geocoding '{query}' failed (attempt {attempt}/{max_attempts}): {e}; \
                             retrying in {delay:?}"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }

                    if kind == ErrorKind::Transient {
                        log::error!(
                            "Geocoding '{query}' failed after {max_attempts} attempt(s): {e}"
                        );
                    } else {
                        log::error!("Geocoding '{query}' failed permanently: {e}");
                    }
                    return GeocodeOutcome::Failed {
                        reason: e.to_string(),
                    };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use location_map_models::Coordinates;

    use super::*;
    use crate::{GeocodeError, GeocodedAddress};

    type Reply = Result<Option<GeocodedAddress>, GeocodeError>;

    /// Replays scripted replies in order and counts calls.
    struct ScriptedProvider {
        replies: Mutex<VecDeque<Reply>>,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedProvider {
        fn new(replies: Vec<Reply>) -> (Box<dyn GeocodeProvider>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let provider = Self {
                replies: Mutex::new(replies.into()),
                calls: Arc::clone(&calls),
            };
            (Box::new(provider), calls)
        }
    }

    #[async_trait::async_trait]
    impl GeocodeProvider for ScriptedProvider {
        fn id(&self) -> &str {
            "scripted"
        }

        async fn geocode(&self, _query: &str) -> Result<Option<GeocodedAddress>, GeocodeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| panic!("provider called more often than scripted"))
        }
    }

    fn found(latitude: f64, longitude: f64) -> Reply {
        Ok(Some(GeocodedAddress {
            latitude,
            longitude,
            matched_address: None,
        }))
    }

    fn instant_retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::ZERO, Duration::ZERO)
    }

    #[tokio::test]
    async fn identical_queries_call_provider_once() {
        let (provider, calls) = ScriptedProvider::new(vec![found(40.7484, -73.9857)]);
        let mut geocoder = Geocoder::new(provider, instant_retry(3));

        let first = geocoder.resolve("USA", "New York", "20 W 34th St").await;
        let second = geocoder.resolve("USA", "New York", "20 W 34th St").await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(first, GeocodeOutcome::Resolved(Coordinates::new(40.7484, -73.9857)));
        assert_eq!(second, first);
        assert_eq!(geocoder.stats().cache_hits, 1);
        assert_eq!(geocoder.stats().queries, 1);
    }

    #[tokio::test]
    async fn prepopulated_cache_answers_without_network() {
        let mut cache = GeocodeCache::new();
        let coords = Coordinates::new(35.6586, 139.7454);
        cache.insert(
            "4 Chome-2-8 Shibakoen, Tokyo, Japan",
            GeocodeOutcome::Resolved(coords),
        );
        cache.insert("Nowhere 0, Tokyo, Japan", GeocodeOutcome::Missing);

        let (provider, calls) = ScriptedProvider::new(vec![]);
        let mut geocoder = Geocoder::with_cache(provider, instant_retry(3), cache);

        assert_eq!(
            geocoder
                .resolve("Japan", "Tokyo", "4 Chome-2-8 Shibakoen")
                .await,
            GeocodeOutcome::Resolved(coords)
        );
        assert_eq!(
            geocoder.resolve("Japan", "Tokyo", "Nowhere 0").await,
            GeocodeOutcome::Missing
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(geocoder.stats().provider_calls, 0);
    }

    #[tokio::test]
    async fn empty_result_is_cached_as_missing() {
        let (provider, calls) = ScriptedProvider::new(vec![Ok(None)]);
        let mut geocoder = Geocoder::new(provider, instant_retry(3));

        assert_eq!(
            geocoder.resolve("Atlantis", "Poseidonia", "1 Temple Rd").await,
            GeocodeOutcome::Missing
        );
        assert_eq!(
            geocoder.resolve("Atlantis", "Poseidonia", "1 Temple Rd").await,
            GeocodeOutcome::Missing
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(geocoder.cache().contains("1 Temple Rd, Poseidonia, Atlantis"));
    }

    #[tokio::test]
    async fn transient_errors_are_retried() {
        let (provider, calls) = ScriptedProvider::new(vec![
            Err(GeocodeError::RateLimited),
            Err(GeocodeError::Status {
                status: 502,
                message: "Bad Gateway".to_string(),
            }),
            found(-22.9519, -43.2105),
        ]);
        let mut geocoder = Geocoder::new(provider, instant_retry(5));

        let outcome = geocoder
            .resolve("Brazil", "Rio de Janeiro", "Parque Nacional da Tijuca")
            .await;

        assert_eq!(
            outcome,
            GeocodeOutcome::Resolved(Coordinates::new(-22.9519, -43.2105))
        );
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(geocoder.stats().retries, 2);
    }

    #[tokio::test]
    async fn permanent_error_fails_without_retry() {
        let (provider, calls) = ScriptedProvider::new(vec![Err(GeocodeError::Unauthorized {
            message: "invalid API key".to_string(),
        })]);
        let mut geocoder = Geocoder::new(provider, instant_retry(5));

        let outcome = geocoder.resolve("Kenya", "Nairobi", "Kenyatta Ave").await;

        assert!(outcome.is_failed());
        assert!(outcome.coordinates().is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_stop_at_max_attempts() {
        let (provider, calls) = ScriptedProvider::new(vec![
            Err(GeocodeError::RateLimited),
            Err(GeocodeError::RateLimited),
            Err(GeocodeError::RateLimited),
        ]);
        let mut geocoder = Geocoder::new(provider, instant_retry(3));

        let outcome = geocoder.resolve("Peru", "Cusco", "Plaza de Armas").await;

        assert_eq!(
            outcome,
            GeocodeOutcome::Failed {
                reason: "Rate limit exceeded".to_string()
            }
        );
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn failed_queries_are_not_repeated() {
        let (provider, calls) = ScriptedProvider::new(vec![Err(GeocodeError::QuotaExceeded)]);
        let mut geocoder = Geocoder::new(provider, instant_retry(3));

        let first = geocoder.resolve("Chile", "Santiago", "Av. Libertador 1").await;
        let second = geocoder.resolve("Chile", "Santiago", "Av. Libertador 1").await;

        assert!(first.is_failed());
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_queries_each_reach_provider() {
        let (provider, calls) =
            ScriptedProvider::new(vec![found(1.0, 2.0), found(3.0, 4.0)]);
        let mut geocoder = Geocoder::new(provider, instant_retry(1));

        geocoder.resolve("A", "B", "C").await;
        geocoder.resolve("A", "B", "D").await;
        geocoder.resolve("A", "B", "C").await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(geocoder.cache().len(), 2);
        assert_eq!(
            geocoder.stats(),
            GeocodeStats {
                cache_hits: 1,
                provider_calls: 2,
                queries: 2,
                retries: 0,
            }
        );
    }
}
