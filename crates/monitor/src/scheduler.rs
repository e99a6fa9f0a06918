use crate::publisher::Publisher;
use crate::store::SeriesStore;
use netmon_config::RetentionConfig;
use netmon_core::Sample;
use netmon_system::Sampler;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

/// When the tick should also prune the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrunePolicy {
    /// Prune roughly this often, in milliseconds.
    pub interval_ms:       i64,
    /// Horizon passed to [`SeriesStore::prune`].
    pub retention_minutes: i64,
}

impl PrunePolicy {
    /// Time-sliced check: due when the tick lands in the first tick-width of
    /// a prune interval.
    #[must_use]
    pub fn is_due(&self, tick_timestamp: i64, period: Duration) -> bool {
        if self.interval_ms <= 0 {
            return false;
        }
        let width = i64::try_from(period.as_millis()).unwrap_or(i64::MAX);
        tick_timestamp.rem_euclid(self.interval_ms) < width
    }
}

impl From<&RetentionConfig> for PrunePolicy {
    fn from(config: &RetentionConfig) -> Self {
        Self {
            interval_ms:       config.prune_interval_minutes.saturating_mul(60_000),
            retention_minutes: config.retention_minutes,
        }
    }
}

impl Default for PrunePolicy {
    fn default() -> Self {
        Self::from(&RetentionConfig::default())
    }
}

/// The sample → append → publish sequence run on every tick.
pub(crate) struct Pipeline {
    pub(crate) sampler:   Arc<Sampler>,
    pub(crate) store:     Arc<SeriesStore>,
    pub(crate) publisher: Arc<Publisher>,
    pub(crate) prune:     PrunePolicy,
}

impl Pipeline {
    async fn tick(&self, period: Duration) -> Option<Sample> {
        let reading = match self.sampler.sample().await {
            Ok(reading) => reading,
            Err(e) => {
                warn!("Skipping tick: {e}");
                return None;
            }
        };
        let sample = reading.sample;

        self.store.append(sample);
        match self.publisher.publish(&sample) {
            Ok(report) if report.dropped > 0 => {
                debug!("Published to {} listener(s), dropped {}", report.delivered, report.dropped)
            }
            Ok(_) => {}
            Err(e) => warn!("Publish failed: {e}"),
        }

        if self.prune.is_due(sample.timestamp, period) {
            let removed = self.store.prune(self.prune.retention_minutes);
            debug!("Pruned {removed} expired sample(s)");
        }
        Some(sample)
    }
}

struct Running {
    shutdown: oneshot::Sender<()>,
    handle:   JoinHandle<()>,
}

/// Drives the sampling pipeline on a single repeating timer.
///
/// `start` while running and `stop` while stopped are no-ops. Once `stop`
/// returns the timer task has exited, so no further tick can run.
pub struct Scheduler {
    pipeline: Arc<Pipeline>,
    running:  Mutex<Option<Running>>,
}

impl Scheduler {
    pub(crate) fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            running:  Mutex::new(None),
        }
    }

    /// Spawn the timer task. The first tick fires one `period` from now.
    /// Returns `false` if the scheduler was already running.
    pub fn start(&self, period: Duration) -> bool {
        let mut running = self.lock();
        if running.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            return false;
        }

        let (shutdown, rx) = oneshot::channel();
        let handle = tokio::spawn(run(Arc::clone(&self.pipeline), period, rx));
        *running = Some(Running { shutdown, handle });
        info!("Network monitoring started with {}ms interval", period.as_millis());
        true
    }

    /// Stop the timer and wait for any in-flight tick to finish.
    /// Returns `false` if the scheduler was not running.
    pub async fn stop(&self) -> bool {
        let Some(Running { shutdown, handle }) = self.lock().take() else {
            return false;
        };
        let _ = shutdown.send(());
        if let Err(e) = handle.await {
            warn!("Scheduler task ended abnormally: {e}");
        }
        info!("Network monitoring stopped");
        true
    }

    pub fn is_running(&self) -> bool {
        self.lock().as_ref().is_some_and(|r| !r.handle.is_finished())
    }

    fn lock(&self) -> MutexGuard<'_, Option<Running>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn run(pipeline: Arc<Pipeline>, period: Duration, mut shutdown: oneshot::Receiver<()>) {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    loop {
        tokio::select! {
            biased;
            // also fires if the Scheduler is dropped
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                pipeline.tick(period).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::{BoxFuture, FutureExt};
    use netmon_core::{MonitorError, Result};
    use netmon_system::{FixedSource, InterfaceCounters, NetworkSource};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const PERIOD: Duration = Duration::from_millis(1_000);

    fn eth0() -> InterfaceCounters {
        InterfaceCounters {
            name:             "eth0".into(),
            rx_bytes_per_sec: 2_048.0,
            tx_bytes_per_sec: 1_024.0,
            rx_bytes_total:   1,
            tx_bytes_total:   2,
        }
    }

    /// Fails every other call, starting with the first.
    #[derive(Default)]
    struct FlakySource {
        calls: AtomicUsize,
    }

    impl NetworkSource for FlakySource {
        fn interfaces(&self) -> BoxFuture<'_, Result<Vec<InterfaceCounters>>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n % 2 == 0 {
                    Err(MonitorError::Sampler("counter read failed".into()))
                } else {
                    Ok(vec![eth0()])
                }
            }
            .boxed()
        }
    }

    fn scheduler(source: Arc<dyn NetworkSource>) -> (Scheduler, Arc<SeriesStore>, Arc<Publisher>) {
        let store = Arc::new(SeriesStore::default());
        let publisher = Arc::new(Publisher::new());
        let scheduler = Scheduler::new(Pipeline {
            sampler:   Arc::new(Sampler::new(source, Duration::from_secs(5))),
            store:     Arc::clone(&store),
            publisher: Arc::clone(&publisher),
            prune:     PrunePolicy::default(),
        });
        (scheduler, store, publisher)
    }

    #[tokio::test(start_paused = true)]
    async fn three_and_a_half_periods_yield_three_ticks() {
        let (scheduler, store, publisher) = scheduler(Arc::new(FixedSource::new(vec![eth0()])));

        assert!(scheduler.start(PERIOD));
        time::sleep(Duration::from_millis(3_500)).await;

        assert_eq!(store.len(), 3);
        assert_eq!(publisher.published_count(), 3);
        assert!(scheduler.stop().await);
    }

    #[tokio::test(start_paused = true)]
    async fn start_is_idempotent() {
        let (scheduler, store, _) = scheduler(Arc::new(FixedSource::new(vec![eth0()])));

        assert!(scheduler.start(PERIOD));
        assert!(!scheduler.start(PERIOD));
        assert!(scheduler.is_running());
        time::sleep(Duration::from_millis(2_500)).await;

        assert_eq!(store.len(), 2);
        scheduler.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn no_ticks_after_stop_returns() {
        let source = Arc::new(FixedSource::new(vec![eth0()]));
        let (scheduler, store, publisher) = scheduler(source.clone());

        scheduler.start(PERIOD);
        time::sleep(Duration::from_millis(1_500)).await;
        assert!(scheduler.stop().await);
        assert!(!scheduler.is_running());

        let calls = source.calls();
        time::sleep(Duration::from_millis(5_000)).await;
        assert_eq!(source.calls(), calls);
        assert_eq!(store.len(), 1);
        assert_eq!(publisher.published_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_when_stopped_is_a_noop_and_restart_works() {
        let (scheduler, store, _) = scheduler(Arc::new(FixedSource::new(vec![eth0()])));

        assert!(!scheduler.stop().await);
        scheduler.start(PERIOD);
        scheduler.stop().await;
        assert!(scheduler.start(PERIOD));
        time::sleep(Duration::from_millis(1_500)).await;
        assert_eq!(store.len(), 1);
        scheduler.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn sampler_failure_skips_the_tick() {
        let (scheduler, store, publisher) = scheduler(Arc::new(FlakySource::default()));

        scheduler.start(PERIOD);
        time::sleep(Duration::from_millis(4_500)).await;
        scheduler.stop().await;

        // ticks 1 and 3 fail, 2 and 4 succeed
        assert_eq!(store.len(), 2);
        assert_eq!(publisher.published_count(), 2);
    }

    #[tokio::test]
    async fn tick_prunes_expired_samples_when_due() {
        let store = Arc::new(SeriesStore::default());
        let pipeline = Pipeline {
            sampler:   Arc::new(Sampler::new(
                Arc::new(FixedSource::new(vec![eth0()])),
                Duration::from_secs(5),
            )),
            store:     Arc::clone(&store),
            publisher: Arc::new(Publisher::new()),
            prune:     PrunePolicy {
                interval_ms:       1,
                retention_minutes: 60,
            },
        };
        let stale = netmon_core::sample::now_millis() - 2 * 60 * 60_000;
        store.append(Sample::zeroed(stale));

        let fresh = pipeline.tick(PERIOD).await.unwrap();

        let kept: Vec<_> = store.query(24 * 60).iter().map(|s| s.timestamp).collect();
        assert_eq!(kept, [fresh.timestamp]);
    }

    #[tokio::test]
    async fn tick_keeps_history_when_prune_not_due() {
        let store = Arc::new(SeriesStore::default());
        let pipeline = Pipeline {
            sampler:   Arc::new(Sampler::new(
                Arc::new(FixedSource::new(vec![eth0()])),
                Duration::from_secs(5),
            )),
            store:     Arc::clone(&store),
            publisher: Arc::new(Publisher::new()),
            prune:     PrunePolicy {
                interval_ms:       0,
                retention_minutes: 60,
            },
        };
        store.append(Sample::zeroed(netmon_core::sample::now_millis() - 2 * 60 * 60_000));

        pipeline.tick(PERIOD).await.unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn prune_is_due_once_per_interval() {
        let policy = PrunePolicy {
            interval_ms:       300_000,
            retention_minutes: 60,
        };
        assert!(policy.is_due(600_000, PERIOD));
        assert!(policy.is_due(600_999, PERIOD));
        assert!(!policy.is_due(601_000, PERIOD));
        assert!(!policy.is_due(899_999, PERIOD));
    }

    #[test]
    fn default_policy_matches_retention_defaults() {
        let policy = PrunePolicy::default();
        assert_eq!(policy.interval_ms, 5 * 60_000);
        assert_eq!(policy.retention_minutes, 60);
    }
}
