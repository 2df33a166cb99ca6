//! Artwork cache manager and its completion applier.
//!
//! The manager decides which tracks need artwork and spawns one fetch task
//! per eligible track. Fetch tasks never touch the store: they hand their
//! result to the [`CompletionApplier`] over a channel, and the applier is the
//! only writer of post-fetch artwork state.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use reqwest::Url;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::AbortHandle;
use tracing::{debug, error, info, warn};

use super::error::ArtworkError;
use super::traits::{ContentWriter, Transport};
use super::types::{AttemptId, FetchCompletion, ReconcileReport};
use crate::config::ArtworkConfig;
use crate::metrics::{
    ARTWORK_BYTES_WRITTEN, ARTWORK_FETCHES, ARTWORK_FETCHES_CANCELLED, ARTWORK_FETCHES_SCHEDULED,
    ARTWORK_FETCH_DURATION,
};
use crate::notify::{ChangeNotifier, StoreChange};
use crate::track::{ArtworkFetchState, ContentLocation, Track, TrackKey, TrackStore};

/// An outstanding fetch known to this process.
struct InFlightFetch {
    attempt: AttemptId,
    abort: AbortHandle,
}

type InFlightMap = Arc<Mutex<HashMap<TrackKey, InFlightFetch>>>;

type InFlightGuard<'a> = MutexGuard<'a, HashMap<TrackKey, InFlightFetch>>;

fn lock_map(map: &Mutex<HashMap<TrackKey, InFlightFetch>>) -> InFlightGuard<'_> {
    map.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Schedules artwork fetches for tracks that lack cached artwork.
///
/// Cheaply cloneable. All clones share the same in-flight registry and
/// concurrency limit.
#[derive(Clone)]
pub struct ArtworkCacheManager {
    store: Arc<dyn TrackStore>,
    transport: Arc<dyn Transport>,
    writer: Arc<dyn ContentWriter>,
    notifier: ChangeNotifier,
    limiter: Arc<Semaphore>,
    in_flight: InFlightMap,
    next_attempt: Arc<AtomicU64>,
    completions: mpsc::Sender<FetchCompletion>,
    fetch_timeout: Duration,
    cancel_superseded: bool,
}

impl std::fmt::Debug for ArtworkCacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtworkCacheManager")
            .field("in_flight", &self.in_flight_count())
            .field("fetch_timeout", &self.fetch_timeout)
            .field("cancel_superseded", &self.cancel_superseded)
            .finish()
    }
}

impl ArtworkCacheManager {
    /// Override the per-fetch timeout.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Bring cached artwork in line with `tracks`.
    ///
    /// Every track with a remote reference and no local artwork gets exactly
    /// one fetch, unless one is already outstanding. When superseded-batch
    /// cancellation is enabled, outstanding fetches for keys absent from
    /// `tracks` are aborted first.
    pub fn reconcile(&self, tracks: &[Track]) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        if self.cancel_superseded {
            let batch: HashSet<TrackKey> = tracks.iter().map(|t| t.key).collect();
            report.cancelled = self.cancel_where(|key| !batch.contains(key));
        }

        for track in tracks {
            if track.local_artwork.is_some() {
                report.already_cached += 1;
                continue;
            }

            let Some(url) = track
                .remote_artwork
                .as_deref()
                .and_then(|r| Url::parse(r).ok())
            else {
                report.no_artwork += 1;
                continue;
            };

            match self.store.begin_fetch(track.key) {
                Ok(Some(started)) => {
                    debug_assert_eq!(started.fetch_state, ArtworkFetchState::InFlight);
                    self.spawn_fetch(track.key, url);
                    report.scheduled += 1;
                }
                Ok(None) => self.classify_skipped(track.key, &mut report),
                Err(e) => warn!("Failed to begin artwork fetch for track {}: {}", track.key, e),
            }
        }

        debug!(
            "Reconciled {} tracks: scheduled={}, cached={}, in_flight={}, no_artwork={}, cancelled={}",
            tracks.len(),
            report.scheduled,
            report.already_cached,
            report.in_flight,
            report.no_artwork,
            report.cancelled
        );

        report
    }

    /// Keys with a fetch outstanding in this process, ascending.
    pub fn in_flight_keys(&self) -> Vec<TrackKey> {
        let mut keys: Vec<TrackKey> = lock_map(&self.in_flight).keys().copied().collect();
        keys.sort();
        keys
    }

    /// Number of fetches outstanding in this process.
    pub fn in_flight_count(&self) -> usize {
        lock_map(&self.in_flight).len()
    }

    /// Abort every outstanding fetch and release its track. Returns the number aborted.
    pub fn cancel_all(&self) -> usize {
        self.cancel_where(|_| true)
    }

    /// Work out why `begin_fetch` declined a track.
    fn classify_skipped(&self, key: TrackKey, report: &mut ReconcileReport) {
        match self.store.get(key) {
            Ok(Some(track)) if track.local_artwork.is_some() => report.already_cached += 1,
            Ok(Some(track)) if track.fetch_state == ArtworkFetchState::InFlight => {
                report.in_flight += 1
            }
            Ok(_) => report.no_artwork += 1,
            Err(e) => warn!("Failed to read track {} after declined fetch: {}", key, e),
        }
    }

    fn cancel_where(&self, should_cancel: impl Fn(&TrackKey) -> bool) -> usize {
        let cancelled: Vec<TrackKey> = {
            let mut map = lock_map(&self.in_flight);
            let keys: Vec<TrackKey> = map.keys().copied().filter(|k| should_cancel(k)).collect();
            for key in &keys {
                if let Some(fetch) = map.remove(key) {
                    fetch.abort.abort();
                }
            }
            keys
        };

        for key in &cancelled {
            ARTWORK_FETCHES_CANCELLED.inc();
            match self.store.release_fetch(*key) {
                Ok(Some(_)) => {
                    debug!("Cancelled artwork fetch for track {}", key);
                    self.notifier
                        .notify(StoreChange::ArtworkReleased { key: *key });
                }
                Ok(None) => debug!("Track {} was no longer in flight when cancelled", key),
                Err(e) => warn!("Failed to release track {}: {}", key, e),
            }
        }

        cancelled.len()
    }

    fn spawn_fetch(&self, key: TrackKey, url: Url) {
        let attempt = self.next_attempt.fetch_add(1, Ordering::Relaxed) + 1;
        let task = FetchTask {
            key,
            attempt,
            url,
            transport: Arc::clone(&self.transport),
            writer: Arc::clone(&self.writer),
            limiter: Arc::clone(&self.limiter),
            completions: self.completions.clone(),
            timeout: self.fetch_timeout,
        };

        // Registered under the lock so the applier cannot see the completion first
        let mut map = lock_map(&self.in_flight);
        let handle = tokio::spawn(task.run());
        let previous = map.insert(
            key,
            InFlightFetch {
                attempt,
                abort: handle.abort_handle(),
            },
        );
        if let Some(previous) = previous {
            warn!("Replacing untracked fetch attempt {} for track {}", previous.attempt, key);
            previous.abort.abort();
        }

        ARTWORK_FETCHES_SCHEDULED.inc();
        debug!("Scheduled artwork fetch {} for track {}", attempt, key);
    }
}

/// One scheduled fetch, run as its own task.
struct FetchTask {
    key: TrackKey,
    attempt: AttemptId,
    url: Url,
    transport: Arc<dyn Transport>,
    writer: Arc<dyn ContentWriter>,
    limiter: Arc<Semaphore>,
    completions: mpsc::Sender<FetchCompletion>,
    timeout: Duration,
}

impl FetchTask {
    async fn run(self) {
        let started = Instant::now();
        let result = self.fetch_and_write().await;

        let label = match &result {
            Ok(_) => "success",
            Err(e) => e.result_label(),
        };
        ARTWORK_FETCH_DURATION
            .with_label_values(&[label])
            .observe(started.elapsed().as_secs_f64());

        let key = self.key;
        let completion = FetchCompletion {
            key,
            attempt: self.attempt,
            result,
        };
        if self.completions.send(completion).await.is_err() {
            warn!("Completion applier stopped, dropping artwork result for track {}", key);
        }
    }

    async fn fetch_and_write(&self) -> Result<ContentLocation, ArtworkError> {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| ArtworkError::ShuttingDown)?;

        let bytes = match tokio::time::timeout(self.timeout, self.transport.fetch(&self.url)).await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(ArtworkError::Timeout {
                    secs: self.timeout.as_secs(),
                })
            }
        };

        let location = self.writer.write(&bytes).await?;
        ARTWORK_BYTES_WRITTEN.inc_by(bytes.len() as u64);
        Ok(location)
    }
}

/// Background task that applies fetch results to the store.
///
/// Spawn once with `tokio::spawn(applier.run())`.
pub struct CompletionApplier {
    rx: mpsc::Receiver<FetchCompletion>,
    store: Arc<dyn TrackStore>,
    notifier: ChangeNotifier,
    in_flight: InFlightMap,
}

impl CompletionApplier {
    /// Apply completions until every sender is gone.
    pub async fn run(mut self) {
        info!("Artwork completion applier started");

        while let Some(completion) = self.rx.recv().await {
            self.apply(completion);
        }

        info!("Artwork completion applier shutting down");
    }

    fn apply(&self, completion: FetchCompletion) {
        let FetchCompletion {
            key,
            attempt,
            result,
        } = completion;

        {
            let mut map = lock_map(&self.in_flight);
            match map.get(&key) {
                Some(current) if current.attempt == attempt => {
                    map.remove(&key);
                }
                _ => {
                    debug!("Ignoring superseded fetch attempt {} for track {}", attempt, key);
                    ARTWORK_FETCHES.with_label_values(&["stale"]).inc();
                    return;
                }
            }
        }

        match result {
            Ok(location) => match self.store.complete_fetch(key, &location) {
                Ok(Some(_)) => {
                    ARTWORK_FETCHES.with_label_values(&["success"]).inc();
                    debug!("Cached artwork for track {} at {}", key, location);
                    self.notifier
                        .notify(StoreChange::ArtworkCached { key, location });
                }
                Ok(None) => {
                    warn!(
                        "Track {} already had artwork or was removed; {} is unreferenced",
                        key, location
                    );
                }
                Err(e) => error!("Failed to record artwork for track {}: {}", key, e),
            },
            Err(fetch_error) => {
                ARTWORK_FETCHES
                    .with_label_values(&[fetch_error.result_label()])
                    .inc();
                warn!("Artwork fetch for track {} failed: {}", key, fetch_error);

                match self.store.fail_fetch(key) {
                    Ok(Some(_)) => self.notifier.notify(StoreChange::ArtworkFailed {
                        key,
                        error: fetch_error.to_string(),
                    }),
                    Ok(None) => debug!("Track {} was no longer in flight on failure", key),
                    Err(e) => error!("Failed to mark track {} as failed: {}", key, e),
                }
            }
        }
    }
}

/// Create a complete artwork cache system.
///
/// Returns:
/// - `ArtworkCacheManager` - for reconciling track batches (clone this to share)
/// - `CompletionApplier` - spawn this as a background task with `tokio::spawn(applier.run())`
pub fn create_artwork_system(
    store: Arc<dyn TrackStore>,
    transport: Arc<dyn Transport>,
    writer: Arc<dyn ContentWriter>,
    notifier: ChangeNotifier,
    config: &ArtworkConfig,
) -> (ArtworkCacheManager, CompletionApplier) {
    let (tx, rx) = mpsc::channel(config.notify_capacity.max(1));
    let in_flight: InFlightMap = Arc::new(Mutex::new(HashMap::new()));

    let manager = ArtworkCacheManager {
        store: Arc::clone(&store),
        transport,
        writer,
        notifier: notifier.clone(),
        limiter: Arc::new(Semaphore::new(config.max_concurrent_fetches.max(1))),
        in_flight: Arc::clone(&in_flight),
        next_attempt: Arc::new(AtomicU64::new(0)),
        completions: tx,
        fetch_timeout: Duration::from_secs(u64::from(config.fetch_timeout_secs)),
        cancel_superseded: config.cancel_superseded,
    };

    let applier = CompletionApplier {
        rx,
        store,
        notifier,
        in_flight,
    };

    (manager, applier)
}
