use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use chrono::{DateTime, Utc};
use model::feed::LiveFeedSnapshot;
use serde::de::DeserializeOwned;

use crate::{
    clock::{Clock, SystemClock},
    source::FeedSource,
    FeedRequest, FetchResult,
};

type Slot<T> = Arc<tokio::sync::Mutex<Option<Arc<LiveFeedSnapshot<T>>>>>;

/// Caches parsed feed responses until the end of the current wall-clock
/// window.
///
/// Windows are aligned to the epoch, not to the time of the first fetch: with
/// a two minute window, a response fetched at 10:01:59 expires at 10:02:00.
/// Each request has one slot; callers that miss in the same window wait for
/// the fetch already in flight instead of issuing their own. Failed fetches
/// leave the slot untouched, so the next call tries again.
pub struct WindowedFetchCache<T> {
    name: String,
    window: Duration,
    source: Arc<dyn FeedSource>,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, Slot<T>>>,
}

impl<T> fmt::Debug for WindowedFetchCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowedFetchCache")
            .field("name", &self.name)
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}

impl<T> WindowedFetchCache<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    pub fn new<S: Into<String>>(name: S, window: Duration, source: Arc<dyn FeedSource>) -> Self {
        Self {
            name: name.into(),
            window,
            source,
            clock: Arc::new(SystemClock),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    fn window_secs(&self) -> i64 {
        self.window.as_secs().max(1) as i64
    }

    /// Index of the window `time` falls into.
    pub fn window_of(&self, time: DateTime<Utc>) -> i64 {
        time.timestamp().div_euclid(self.window_secs())
    }

    /// Time left until the current window ends, by the cache's clock.
    pub fn until_next_window(&self) -> Duration {
        let window_ms = self.window_secs() * 1000;
        let elapsed = self.clock.now().timestamp_millis().rem_euclid(window_ms);
        Duration::from_millis((window_ms - elapsed) as u64)
    }

    /// Like [`Self::try_fetch`], but failures are logged and reported as `None`.
    pub async fn fetch(&self, request: &FeedRequest) -> Option<Arc<LiveFeedSnapshot<T>>> {
        match self.try_fetch(request).await {
            Ok(snapshot) => Some(snapshot),
            Err(why) => {
                log::warn!("Fetching '{}' for {} failed: {}", request.cache_key(), self.name, why);
                None
            }
        }
    }

    pub async fn try_fetch(&self, request: &FeedRequest) -> FetchResult<Arc<LiveFeedSnapshot<T>>> {
        let key = request.cache_key();
        let slot = self.slot(&key);
        let mut entry = slot.lock().await;

        let now = self.clock.now();
        let window = self.window_of(now);
        if let Some(snapshot) = entry.as_ref().filter(|snapshot| snapshot.window == window) {
            log::trace!("{}: window {} hit for '{}'.", self.name, window, key);
            return Ok(snapshot.clone());
        }

        log::debug!("{}: window {} miss for '{}'.", self.name, window, key);
        self.evict_stale(window);
        let value = self.source.get(request).await?;
        let payload: T = serde_json::from_value(value)?;
        let snapshot = Arc::new(LiveFeedSnapshot::new(now, window, key, payload));
        *entry = Some(snapshot.clone());
        Ok(snapshot)
    }

    /// Drops every cached response.
    pub fn invalidate_all(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Removes slots nobody is using whose response is older than `window`.
    /// Slots held by a caller or locked by a fetch in flight stay.
    fn evict_stale(&self, window: i64) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, slot| {
            if Arc::strong_count(slot) > 1 {
                return true;
            }
            match slot.try_lock() {
                Ok(entry) => entry.as_ref().is_some_and(|snapshot| snapshot.window >= window),
                Err(_) => true,
            }
        });
        let evicted = before - entries.len();
        if evicted > 0 {
            log::debug!("{}: evicted {} stale entries.", self.name, evicted);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn slot(&self, key: &str) -> Slot<T> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.to_owned())
            .or_default()
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::TimeZone;
    use rstest::rstest;
    use serde::Deserialize;
    use serde_json::json;

    use super::*;
    use crate::{clock::ManualClock, FetchError};

    #[derive(Debug, Deserialize)]
    struct Counter {
        count: usize,
    }

    #[derive(Default)]
    struct CountingSource {
        calls: AtomicUsize,
        failing: AtomicBool,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl FeedSource for CountingSource {
        async fn get(&self, _request: &FeedRequest) -> FetchResult<serde_json::Value> {
            let count = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.failing.load(Ordering::SeqCst) {
                return Err(FetchError::Other("upstream down".to_owned()));
            }
            Ok(json!({ "count": count }))
        }
    }

    fn start() -> DateTime<Utc> {
        // 10:00:00 is a two minute boundary
        Utc.with_ymd_and_hms(2024, 8, 14, 10, 0, 0).unwrap()
    }

    fn setup(source: CountingSource) -> (Arc<CountingSource>, Arc<ManualClock>, WindowedFetchCache<Counter>) {
        let source = Arc::new(source);
        let clock = Arc::new(ManualClock::new(start()));
        let cache = WindowedFetchCache::new("test", Duration::from_secs(120), source.clone())
            .with_clock(clock.clone());
        (source, clock, cache)
    }

    fn request() -> FeedRequest {
        FeedRequest::new("https://example.org/feed")
    }

    #[tokio::test]
    async fn serves_repeated_calls_in_one_window_from_cache() {
        let (source, clock, cache) = setup(CountingSource::default());

        let first = cache.try_fetch(&request()).await.unwrap();
        clock.advance(chrono::Duration::seconds(119));
        let second = cache.try_fetch(&request()).await.unwrap();

        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.payload.count, 1);
        assert_eq!(second.source_url, "https://example.org/feed");
    }

    #[tokio::test]
    async fn refetches_after_the_window_rolls_over() {
        let (source, clock, cache) = setup(CountingSource::default());
        clock.advance(chrono::Duration::seconds(119));

        let before = cache.try_fetch(&request()).await.unwrap();
        clock.advance(chrono::Duration::seconds(1));
        let after = cache.try_fetch(&request()).await.unwrap();

        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert_eq!(after.window, before.window + 1);
        assert_eq!(after.payload.count, 2);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let (source, _clock, cache) = setup(CountingSource::default());
        source.failing.store(true, Ordering::SeqCst);

        assert!(cache.fetch(&request()).await.is_none());
        assert!(matches!(
            cache.try_fetch(&request()).await,
            Err(FetchError::Other(_))
        ));

        source.failing.store(false, Ordering::SeqCst);
        let snapshot = cache.try_fetch(&request()).await.unwrap();
        assert_eq!(snapshot.payload.count, 3);
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn unparseable_payloads_are_not_cached() {
        struct Garbage(AtomicUsize);

        #[async_trait]
        impl FeedSource for Garbage {
            async fn get(&self, _request: &FeedRequest) -> FetchResult<serde_json::Value> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Ok(json!({ "unexpected": true }))
            }
        }

        let source = Arc::new(Garbage(AtomicUsize::new(0)));
        let cache: WindowedFetchCache<Counter> =
            WindowedFetchCache::new("garbage", Duration::from_secs(60), source.clone());

        assert!(matches!(
            cache.try_fetch(&request()).await,
            Err(FetchError::Json(_))
        ));
        assert!(cache.fetch(&request()).await.is_none());
        assert_eq!(source.0.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn requests_with_different_queries_are_cached_separately() {
        let (source, _clock, cache) = setup(CountingSource::default());
        let a = request().query("BusStopCode", "83139");
        let b = request().query("BusStopCode", "01012");

        cache.try_fetch(&a).await.unwrap();
        cache.try_fetch(&b).await.unwrap();
        cache.try_fetch(&a).await.unwrap();

        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_misses_share_one_fetch() {
        let (source, _clock, cache) = setup(CountingSource {
            delay: Some(Duration::from_millis(50)),
            ..Default::default()
        });
        let cache = Arc::new(cache);

        let tasks = (0..8)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.try_fetch(&request()).await })
            })
            .collect::<Vec<_>>();
        let results = futures::future::join_all(tasks).await;

        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        for result in results {
            assert_eq!(result.unwrap().unwrap().payload.count, 1);
        }
    }

    #[tokio::test]
    async fn invalidate_all_forces_a_refetch() {
        let (source, _clock, cache) = setup(CountingSource::default());

        cache.try_fetch(&request()).await.unwrap();
        cache.invalidate_all();
        cache.try_fetch(&request()).await.unwrap();

        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn stale_entries_are_evicted_on_the_next_miss() {
        let (source, clock, cache) = setup(CountingSource::default());
        for code in 0..50 {
            let request = request().query("BusStopCode", format!("{code:05}"));
            cache.try_fetch(&request).await.unwrap();
        }
        assert_eq!(cache.len(), 50);

        clock.advance(chrono::Duration::seconds(120));
        cache.try_fetch(&request().query("BusStopCode", "83139")).await.unwrap();

        assert_eq!(cache.len(), 1);
        assert_eq!(source.calls.load(Ordering::SeqCst), 51);
    }

    #[tokio::test]
    async fn current_entries_survive_eviction() {
        let (source, clock, cache) = setup(CountingSource::default());
        let kept = request().query("BusStopCode", "01012");

        clock.advance(chrono::Duration::seconds(120));
        cache.try_fetch(&kept).await.unwrap();
        cache.try_fetch(&request().query("BusStopCode", "83139")).await.unwrap();
        cache.try_fetch(&kept).await.unwrap();

        assert_eq!(cache.len(), 2);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[rstest]
    #[case(0, 120)]
    #[case(30, 90)]
    #[case(119, 1)]
    #[case(120, 120)]
    fn until_next_window_counts_down_to_the_boundary(
        #[case] offset_secs: i64,
        #[case] remaining_secs: u64,
    ) {
        let (_source, clock, cache) = setup(CountingSource::default());
        clock.advance(chrono::Duration::seconds(offset_secs));
        assert_eq!(cache.until_next_window(), Duration::from_secs(remaining_secs));
    }

    #[test]
    fn windows_are_aligned_to_the_epoch() {
        let (_source, _clock, cache) = setup(CountingSource::default());
        let boundary = start();
        assert_eq!(cache.window_of(boundary), boundary.timestamp() / 120);
        assert_eq!(
            cache.window_of(boundary - chrono::Duration::seconds(1)),
            cache.window_of(boundary) - 1
        );
    }
}
