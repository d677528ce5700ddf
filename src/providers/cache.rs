//! TTL cache in front of the provider clients.
//!
//! Keys are `(source, parameter, resolution, window length)`. The window is
//! stored as a length rather than absolute instants so that a request made a
//! minute later still hits. Only successful fetches are cached.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lru::LruCache;
use tokio::sync::Mutex;
use tracing::debug;

use super::{FetchOutcome, Location, ObservationSource, SeriesRequest, WindForecastSource};
use crate::models::{RawObservation, RawWindSample, Resolution};

// ---

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FetchKey {
    pub source_id: String,
    pub parameter: String,
    pub resolution: Resolution,
    pub window_hours: i64,
}

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// Bounded LRU map whose entries expire after a per-insert TTL.
pub struct TtlCache<V> {
    store: Mutex<LruCache<FetchKey, Entry<V>>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(max_entries: usize) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            store: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub async fn get(&self, key: &FetchKey) -> Option<V> {
        let mut store = self.store.lock().await;
        let expired = match store.get(key) {
            Some(entry) if Instant::now() < entry.expires_at => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            store.pop(key);
        }
        None
    }

    pub async fn insert(&self, key: FetchKey, value: V, ttl: Duration) {
        let entry = Entry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.store.lock().await.put(key, entry);
    }

    pub async fn clear(&self) {
        self.store.lock().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.store.lock().await.len()
    }
}

/// [`ObservationSource`] that serves repeated requests from a [`TtlCache`].
pub struct CachedObservationSource<S> {
    inner: S,
    cache: Arc<TtlCache<Vec<RawObservation>>>,
    ttl: Duration,
}

impl<S> CachedObservationSource<S> {
    pub fn new(inner: S, cache: Arc<TtlCache<Vec<RawObservation>>>, ttl: Duration) -> Self {
        Self { inner, cache, ttl }
    }
}

#[async_trait]
impl<S: ObservationSource> ObservationSource for CachedObservationSource<S> {
    async fn fetch_timeseries(&self, request: &SeriesRequest) -> FetchOutcome<RawObservation> {
        // ---
        let key = FetchKey {
            source_id: request.source_id.clone(),
            parameter: request.parameter.to_string(),
            resolution: request.resolution,
            window_hours: (request.window.end - request.window.start).num_hours(),
        };
        if let Some(items) = self.cache.get(&key).await {
            debug!("cache hit for station {} parameter {}", key.source_id, key.parameter);
            return FetchOutcome::ok(items);
        }

        let outcome = self.inner.fetch_timeseries(request).await;
        if outcome.is_ok() {
            self.cache.insert(key, outcome.items.clone(), self.ttl).await;
        }
        outcome
    }
}

/// [`WindForecastSource`] that serves repeated requests from a [`TtlCache`].
pub struct CachedWindSource<S> {
    inner: S,
    cache: Arc<TtlCache<Vec<RawWindSample>>>,
    ttl: Duration,
}

impl<S> CachedWindSource<S> {
    pub fn new(inner: S, cache: Arc<TtlCache<Vec<RawWindSample>>>, ttl: Duration) -> Self {
        Self { inner, cache, ttl }
    }
}

#[async_trait]
impl<S: WindForecastSource> WindForecastSource for CachedWindSource<S> {
    async fn fetch_wind_forecast(
        &self,
        location: &Location,
        days_ahead: i64,
        now: DateTime<Utc>,
    ) -> FetchOutcome<RawWindSample> {
        // ---
        let key = FetchKey {
            source_id: location.id(),
            parameter: "wind".to_string(),
            resolution: Resolution::Hourly,
            window_hours: days_ahead * 24,
        };
        if let Some(items) = self.cache.get(&key).await {
            debug!("cache hit for wind forecast at {}", key.source_id);
            return FetchOutcome::ok(items);
        }

        let outcome = self.inner.fetch_wind_forecast(location, days_ahead, now).await;
        if outcome.is_ok() {
            self.cache.insert(key, outcome.items.clone(), self.ttl).await;
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::models::TimeWindow;
    use chrono::{Duration as ChronoDuration, TimeZone};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl ObservationSource for CountingSource {
        async fn fetch_timeseries(&self, _request: &SeriesRequest) -> FetchOutcome<RawObservation> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return FetchOutcome::failed("timeout");
            }
            FetchOutcome::ok(vec![RawObservation {
                time: Some("2026-07-01T00:00:00Z".into()),
                value: Some(18.0),
                quality: Some(1),
            }])
        }
    }

    fn request(end_hour: u32) -> SeriesRequest {
        let end = Utc.with_ymd_and_hms(2026, 7, 1, end_hour, 0, 0).unwrap();
        SeriesRequest {
            source_id: "2.410.0".into(),
            parameter: 1003,
            resolution: Resolution::Hourly,
            window: TimeWindow::new(end - ChronoDuration::hours(72), end),
        }
    }

    fn key(id: &str) -> FetchKey {
        FetchKey {
            source_id: id.into(),
            parameter: "1003".into(),
            resolution: Resolution::Hourly,
            window_hours: 72,
        }
    }

    #[test]
    fn test_entries_expire() {
        // ---
        tokio_test::block_on(async {
            let cache = TtlCache::new(4);
            cache.insert(key("a"), 1, Duration::from_secs(3600)).await;
            cache.insert(key("b"), 2, Duration::ZERO).await;

            assert_eq!(cache.get(&key("a")).await, Some(1));
            assert_eq!(cache.get(&key("b")).await, None);
            assert_eq!(cache.len().await, 1);

            cache.clear().await;
            assert_eq!(cache.get(&key("a")).await, None);
        });
    }

    #[test]
    fn test_capacity_evicts_least_recent() {
        // ---
        tokio_test::block_on(async {
            let cache = TtlCache::new(2);
            let ttl = Duration::from_secs(60);
            cache.insert(key("a"), 1, ttl).await;
            cache.insert(key("b"), 2, ttl).await;
            cache.get(&key("a")).await;
            cache.insert(key("c"), 3, ttl).await;

            assert_eq!(cache.get(&key("b")).await, None);
            assert_eq!(cache.get(&key("a")).await, Some(1));
            assert_eq!(cache.get(&key("c")).await, Some(3));
        });
    }

    #[tokio::test]
    async fn test_repeated_request_served_from_cache() {
        // ---
        let cache = Arc::new(TtlCache::new(8));
        let source = CachedObservationSource::new(
            CountingSource {
                calls: AtomicUsize::new(0),
                fail: false,
            },
            cache,
            Duration::from_secs(3600),
        );

        let first = source.fetch_timeseries(&request(0)).await;
        // Same window length an hour later maps to the same key.
        let second = source.fetch_timeseries(&request(1)).await;

        assert_eq!(first, second);
        assert_eq!(source.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        // ---
        let cache = Arc::new(TtlCache::new(8));
        let source = CachedObservationSource::new(
            CountingSource {
                calls: AtomicUsize::new(0),
                fail: true,
            },
            cache.clone(),
            Duration::from_secs(3600),
        );

        assert!(!source.fetch_timeseries(&request(0)).await.is_ok());
        assert!(!source.fetch_timeseries(&request(0)).await.is_ok());
        assert_eq!(source.inner.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len().await, 0);
    }
}
