//! Parking availability service: the cache plus its refresh loop.
//!
//! Lifecycle: `Stopped -> Starting -> Running -> Stopping -> Stopped`.
//!
//! [`ParkingService::start`] runs one refresh synchronously and fails if
//! it fails, so the service never comes up serving an empty cache. It
//! then spawns a background task that refreshes every interval. Failed
//! periodic refreshes are logged and counted; the cache keeps the last
//! good snapshot. [`ParkingService::stop`] signals the task and waits
//! for it to exit.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, error, info, warn};

use crate::cache::AvailabilityCache;
use crate::config::{DEFAULT_REFRESH_INTERVAL_SECS, MAX_REFRESH_INTERVAL_SECS};
use crate::domain::{DomainError, Observation};
use crate::providers::{ParkingProvider, ProviderError, convert_records};

/// Error from a single refresh cycle.
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    /// The data source failed
    #[error("fetch from {provider} provider failed: {source}")]
    Provider {
        provider: String,
        #[source]
        source: ProviderError,
    },

    /// The data source returned a record that cannot be cached
    #[error("invalid data from {provider} provider: {source}")]
    Invalid {
        provider: String,
        #[source]
        source: DomainError,
    },
}

/// Lifecycle state of the refresh loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

/// Configuration for the refresh loop.
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// Time between refresh cycles. Must be non-zero; values above
    /// [`MAX_REFRESH_INTERVAL_SECS`] are capped.
    pub interval: Duration,
}

impl RefreshConfig {
    /// The interval the loop actually runs at.
    fn period(&self) -> Duration {
        let max = Duration::from_secs(MAX_REFRESH_INTERVAL_SECS);
        if self.interval > max {
            warn!(
                requested_secs = self.interval.as_secs(),
                max_secs = MAX_REFRESH_INTERVAL_SECS,
                "refresh interval too long; capping"
            );
            return max;
        }
        self.interval
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_REFRESH_INTERVAL_SECS),
        }
    }
}

/// Counters for refresh activity since the service was created.
#[derive(Debug, Default)]
struct RefreshMetrics {
    succeeded: AtomicU64,
    failed: AtomicU64,
    /// Milliseconds since the epoch of the last success; 0 if none.
    last_success_ms: AtomicI64,
}

impl RefreshMetrics {
    fn record_success(&self, at: DateTime<Utc>) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
        self.last_success_ms
            .store(at.timestamp_millis(), Ordering::Relaxed);
    }

    fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> RefreshStats {
        let last_success_ms = self.last_success_ms.load(Ordering::Relaxed);
        RefreshStats {
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            last_success: (last_success_ms != 0)
                .then(|| DateTime::<Utc>::from_timestamp_millis(last_success_ms))
                .flatten(),
        }
    }
}

/// Snapshot of refresh counters at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshStats {
    pub succeeded: u64,
    pub failed: u64,
    pub last_success: Option<DateTime<Utc>>,
}

/// Everything one refresh cycle needs, shared with the background task.
#[derive(Clone)]
struct Refresher {
    provider: Arc<dyn ParkingProvider>,
    cache: Arc<AvailabilityCache>,
    metrics: Arc<RefreshMetrics>,
}

impl Refresher {
    /// Fetch and convert a full snapshot. Does not touch the cache.
    async fn fetch(&self) -> Result<Vec<Observation>, RefreshError> {
        let records = self
            .provider
            .fetch_all()
            .await
            .map_err(|source| RefreshError::Provider {
                provider: self.provider.name().to_string(),
                source,
            })?;

        convert_records(records, Utc::now()).map_err(|source| RefreshError::Invalid {
            provider: self.provider.name().to_string(),
            source,
        })
    }

    /// Swap `observations` into the cache. Returns the new generation.
    async fn apply(&self, observations: Vec<Observation>) -> u64 {
        let generation = self.cache.replace(observations).await;
        self.metrics.record_success(Utc::now());
        generation
    }

    /// Apply a fetch result: replace the cache on success, count the
    /// failure otherwise. Returns the number of observations applied.
    async fn complete(
        &self,
        fetched: Result<Vec<Observation>, RefreshError>,
    ) -> Result<usize, RefreshError> {
        let observations = match fetched {
            Ok(observations) => observations,
            Err(e) => {
                self.metrics.record_failure();
                return Err(e);
            }
        };

        let count = observations.len();
        let generation = self.apply(observations).await;
        debug!(street_count = count, generation, "refreshed parking data");
        Ok(count)
    }

    /// One full fetch-and-replace cycle.
    async fn run_cycle(&self) -> Result<usize, RefreshError> {
        self.complete(self.fetch().await).await
    }
}

/// Handle to the running refresh task.
struct Worker {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Cached parking availability, kept fresh by a background task.
///
/// Construct one per process and share it behind an `Arc`.
pub struct ParkingService {
    refresher: Refresher,
    config: RefreshConfig,
    state: watch::Sender<ServiceState>,
    /// Held across start/stop so they never interleave.
    worker: Mutex<Option<Worker>>,
}

impl ParkingService {
    /// Create a stopped service with an empty cache.
    pub fn new(provider: Arc<dyn ParkingProvider>, config: RefreshConfig) -> Self {
        let (state, _) = watch::channel(ServiceState::Stopped);
        Self {
            refresher: Refresher {
                provider,
                cache: Arc::new(AvailabilityCache::new()),
                metrics: Arc::new(RefreshMetrics::default()),
            },
            config,
            state,
            worker: Mutex::new(None),
        }
    }

    /// Run the initial refresh, then start the background loop.
    ///
    /// An initial refresh failure is returned and the service stays
    /// stopped. Calling this while already running does nothing.
    pub async fn start(&self) -> Result<(), RefreshError> {
        let mut worker = self.worker.lock().await;
        if worker.is_some() {
            debug!("parking service already running");
            return Ok(());
        }

        self.state.send_replace(ServiceState::Starting);
        info!(
            provider = self.refresher.provider.name(),
            interval_secs = self.config.interval.as_secs(),
            "starting parking service"
        );

        let count = match self.refresher.run_cycle().await {
            Ok(count) => count,
            Err(e) => {
                self.state.send_replace(ServiceState::Stopped);
                return Err(e);
            }
        };
        info!(street_count = count, "initial parking data loaded");

        let (shutdown, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(refresh_loop(
            self.refresher.clone(),
            self.config.period(),
            shutdown_rx,
        ));
        *worker = Some(Worker { shutdown, handle });
        self.state.send_replace(ServiceState::Running);

        Ok(())
    }

    /// Stop the background loop and wait for it to exit.
    ///
    /// Once this returns no refresh is in flight and the cache will not
    /// change again until the next `start`. Calling this while stopped
    /// does nothing.
    pub async fn stop(&self) {
        let mut worker = self.worker.lock().await;
        let Some(Worker { shutdown, handle }) = worker.take() else {
            return;
        };

        self.state.send_replace(ServiceState::Stopping);
        let _ = shutdown.send(true);

        if let Err(e) = handle.await {
            error!(error = %e, "refresh task ended abnormally");
        }

        self.state.send_replace(ServiceState::Stopped);
        info!("parking service stopped");
    }

    /// Run one refresh cycle now, outside the background schedule.
    ///
    /// Returns the number of observations applied. On error the cache is
    /// left as it was.
    pub async fn refresh(&self) -> Result<usize, RefreshError> {
        self.refresher.run_cycle().await
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ServiceState {
        *self.state.borrow()
    }

    /// Refresh counters.
    pub fn stats(&self) -> RefreshStats {
        self.refresher.metrics.snapshot()
    }

    /// The underlying cache (read access for callers).
    pub fn cache(&self) -> &AvailabilityCache {
        &self.refresher.cache
    }

    /// Every cached observation.
    pub async fn get_all(&self) -> Vec<Observation> {
        self.refresher.cache.get_all().await
    }

    /// The cached observation for a street, ignoring case.
    pub async fn get_by_street(&self, street_name: &str) -> Option<Observation> {
        self.refresher.cache.get(street_name).await
    }
}

impl Drop for ParkingService {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.get_mut().take() {
            let _ = worker.shutdown.send(true);
            worker.handle.abort();
        }
    }
}

/// Background task: refresh every `period` until shutdown is signalled.
///
/// Shutdown is checked while waiting for the next tick, while fetching,
/// and once more before applying, so a fetch that finishes after
/// shutdown was requested is discarded.
async fn refresh_loop(
    refresher: Refresher,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    // The initial refresh already ran, so the first tick is one period out
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(interval_secs = period.as_secs(), "refresh loop started");

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {}
        }

        let fetched = tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            fetched = refresher.fetch() => fetched,
        };

        if *shutdown.borrow() {
            break;
        }

        if let Err(e) = refresher.complete(fetched).await {
            warn!(error = %e, "parking data refresh failed; keeping previous snapshot");
        }
    }

    let stats = refresher.metrics.snapshot();
    info!(
        succeeded = stats.succeeded,
        failed = stats.failed,
        "refresh loop stopped"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::RawObservation;
    use futures::FutureExt;
    use futures::future::BoxFuture;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;

    const INTERVAL: Duration = Duration::from_secs(30);

    type FetchResult = Result<Vec<RawObservation>, ProviderError>;

    /// Provider that plays back scripted results, then repeats the last one.
    struct ScriptedProvider {
        script: std::sync::Mutex<VecDeque<FetchResult>>,
        last: std::sync::Mutex<Option<Vec<RawObservation>>>,
        calls: AtomicUsize,
        delay: Option<Duration>,
    }

    impl ScriptedProvider {
        fn new(script: Vec<FetchResult>) -> Arc<Self> {
            Arc::new(Self {
                script: std::sync::Mutex::new(script.into()),
                last: std::sync::Mutex::new(None),
                calls: AtomicUsize::new(0),
                delay: None,
            })
        }

        fn slow(script: Vec<FetchResult>, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                script: std::sync::Mutex::new(script.into()),
                last: std::sync::Mutex::new(None),
                calls: AtomicUsize::new(0),
                delay: Some(delay),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn next(&self) -> FetchResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(Ok(records)) => {
                    *self.last.lock().unwrap() = Some(records.clone());
                    Ok(records)
                }
                Some(Err(e)) => Err(e),
                None => Ok(self.last.lock().unwrap().clone().unwrap_or_default()),
            }
        }
    }

    impl ParkingProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        fn fetch_all(&self) -> BoxFuture<'_, FetchResult> {
            async move {
                if let Some(delay) = self.delay {
                    tokio::time::sleep(delay).await;
                }
                self.next()
            }
            .boxed()
        }
    }

    fn upstream_down() -> ProviderError {
        ProviderError::Api {
            status: 503,
            message: "upstream down".to_string(),
        }
    }

    fn record(street: &str, available: u32) -> RawObservation {
        RawObservation::new(street, available, 20).with_coordinates(39.62, 19.92)
    }

    fn service(provider: Arc<ScriptedProvider>) -> ParkingService {
        ParkingService::new(provider, RefreshConfig { interval: INTERVAL })
    }

    /// Let the spawned loop run up to its next await point.
    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn refresh_end_to_end() {
        let provider = ScriptedProvider::new(vec![Ok(vec![
            RawObservation::new("Nikiforou Theotoki", 10, 20).with_coordinates(39.0, 19.0),
        ])]);
        let service = service(provider);

        assert_eq!(service.refresh().await.unwrap(), 1);

        let obs = service.get_by_street("nikiforou theotoki").await.unwrap();
        assert_eq!(obs.street_name, "Nikiforou Theotoki");
        assert_eq!(obs.available_spots, 10);
        assert_eq!(obs.total_spots, 20);
        assert_eq!(obs.coordinates, (39.0, 19.0));
        assert!(!obs.last_updated.is_empty());
        assert_eq!(obs.source, "unknown");
    }

    #[tokio::test]
    async fn unknown_street_is_absent() {
        let provider = ScriptedProvider::new(vec![Ok(vec![record("Spianada", 3)])]);
        let service = service(provider);
        service.refresh().await.unwrap();

        assert!(service.get_by_street("Spianada").await.is_some());
        assert!(service.get_by_street("Nonexistent").await.is_none());
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_snapshot() {
        let provider = ScriptedProvider::new(vec![
            Ok(vec![record("Spianada", 3), record("Kapodistriou", 0)]),
            Err(upstream_down()),
        ]);
        let service = service(provider);

        service.refresh().await.unwrap();
        let before = service.get_all().await;

        let err = service.refresh().await.unwrap_err();
        assert!(matches!(err, RefreshError::Provider { .. }));
        assert_eq!(service.get_all().await, before);
        assert_eq!(service.cache().generation().await, 1);

        let stats = service.stats();
        assert_eq!(stats.succeeded, 1);
        assert_eq!(stats.failed, 1);
        assert!(stats.last_success.is_some());
    }

    #[tokio::test]
    async fn invalid_record_rejects_whole_fetch() {
        let provider = ScriptedProvider::new(vec![
            Ok(vec![record("Spianada", 3)]),
            Ok(vec![record("Kapodistriou", 1), record("", 2)]),
        ]);
        let service = service(provider);

        service.refresh().await.unwrap();
        let err = service.refresh().await.unwrap_err();

        assert!(matches!(err, RefreshError::Invalid { .. }));
        assert!(service.get_by_street("Kapodistriou").await.is_none());
        assert!(service.get_by_street("Spianada").await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn start_fails_when_initial_fetch_fails() {
        let provider = ScriptedProvider::new(vec![Err(upstream_down())]);
        let service = service(provider.clone());

        let err = service.start().await.unwrap_err();

        assert!(err.to_string().contains("upstream down"));
        assert_eq!(service.state(), ServiceState::Stopped);
        assert!(service.cache().is_empty().await);

        // No loop was left behind
        tokio::time::sleep(INTERVAL * 3).await;
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn start_is_idempotent() {
        let provider = ScriptedProvider::new(vec![Ok(vec![record("Spianada", 3)])]);
        let service = service(provider.clone());

        service.start().await.unwrap();
        service.start().await.unwrap();
        assert_eq!(service.state(), ServiceState::Running);
        assert_eq!(provider.calls(), 1);

        // One loop means one fetch per interval
        tokio::time::sleep(INTERVAL + Duration::from_millis(1)).await;
        settle().await;
        assert_eq!(provider.calls(), 2);

        service.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_starts_fetch_once() {
        let provider = ScriptedProvider::slow(
            vec![Ok(vec![record("Spianada", 3)])],
            Duration::from_secs(1),
        );
        let service = service(provider.clone());

        let (a, b) = tokio::join!(service.start(), service.start());
        a.unwrap();
        b.unwrap();

        assert_eq!(provider.calls(), 1);
        service.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn loop_refreshes_each_interval() {
        let provider = ScriptedProvider::new(vec![
            Ok(vec![record("Spianada", 1)]),
            Ok(vec![record("Spianada", 2)]),
            Ok(vec![record("Spianada", 3)]),
        ]);
        let service = service(provider.clone());
        service.start().await.unwrap();
        assert_eq!(service.get_by_street("spianada").await.unwrap().available_spots, 1);

        tokio::time::sleep(INTERVAL + Duration::from_millis(1)).await;
        settle().await;
        assert_eq!(service.get_by_street("spianada").await.unwrap().available_spots, 2);

        tokio::time::sleep(INTERVAL).await;
        settle().await;
        assert_eq!(service.get_by_street("spianada").await.unwrap().available_spots, 3);
        assert_eq!(provider.calls(), 3);

        service.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn loop_survives_failed_cycle() {
        let provider = ScriptedProvider::new(vec![
            Ok(vec![record("Spianada", 1)]),
            Err(upstream_down()),
            Ok(vec![record("Spianada", 5)]),
        ]);
        let service = service(provider.clone());
        service.start().await.unwrap();

        tokio::time::sleep(INTERVAL + Duration::from_millis(1)).await;
        settle().await;
        assert_eq!(provider.calls(), 2);
        assert_eq!(service.get_by_street("spianada").await.unwrap().available_spots, 1);
        assert_eq!(service.state(), ServiceState::Running);

        tokio::time::sleep(INTERVAL).await;
        settle().await;
        assert_eq!(service.get_by_street("spianada").await.unwrap().available_spots, 5);

        let stats = service.stats();
        assert_eq!(stats.succeeded, 2);
        assert_eq!(stats.failed, 1);

        service.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn no_replace_after_stop() {
        let provider = ScriptedProvider::new(vec![Ok(vec![record("Spianada", 1)])]);
        let service = service(provider.clone());
        service.start().await.unwrap();

        service.stop().await;
        assert_eq!(service.state(), ServiceState::Stopped);
        let generation = service.cache().generation().await;

        tokio::time::sleep(INTERVAL * 5).await;
        settle().await;

        assert_eq!(provider.calls(), 1);
        assert_eq!(service.cache().generation().await, generation);
        // Data stays readable after stop
        assert!(service.get_by_street("spianada").await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_discards_in_flight_fetch() {
        let provider = ScriptedProvider::slow(
            vec![
                Ok(vec![record("Spianada", 1)]),
                Ok(vec![record("Spianada", 2)]),
            ],
            Duration::from_secs(10),
        );
        let service = service(provider.clone());
        service.start().await.unwrap();

        // Land in the middle of the second fetch
        tokio::time::sleep(INTERVAL + Duration::from_secs(5)).await;
        settle().await;
        assert_eq!(provider.calls(), 1);

        service.stop().await;
        tokio::time::sleep(Duration::from_secs(60)).await;
        settle().await;

        assert_eq!(service.get_by_street("spianada").await.unwrap().available_spots, 1);
        assert_eq!(service.cache().generation().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_interval_is_capped() {
        let provider = ScriptedProvider::new(vec![
            Ok(vec![record("Spianada", 1)]),
            Ok(vec![record("Spianada", 2)]),
        ]);
        let service = ParkingService::new(
            provider.clone(),
            RefreshConfig {
                interval: Duration::from_secs(u64::MAX),
            },
        );
        service.start().await.unwrap();

        tokio::time::sleep(Duration::from_secs(MAX_REFRESH_INTERVAL_SECS) + Duration::from_millis(1))
            .await;
        settle().await;

        assert_eq!(provider.calls(), 2);
        assert_eq!(service.get_by_street("spianada").await.unwrap().available_spots, 2);
        assert_eq!(service.state(), ServiceState::Running);
        service.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn stop_is_idempotent_and_restartable() {
        let provider = ScriptedProvider::new(vec![Ok(vec![record("Spianada", 1)])]);
        let service = service(provider.clone());

        service.stop().await;
        assert_eq!(service.state(), ServiceState::Stopped);

        service.start().await.unwrap();
        service.stop().await;
        service.stop().await;
        assert_eq!(service.state(), ServiceState::Stopped);

        service.start().await.unwrap();
        assert_eq!(service.state(), ServiceState::Running);
        assert_eq!(provider.calls(), 2);
        service.stop().await;
    }
}
