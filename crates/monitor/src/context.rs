use crate::publisher::Publisher;
use crate::scheduler::{Pipeline, PrunePolicy, Scheduler};
use crate::store::SeriesStore;
use netmon_config::MonitorConfig;
use netmon_core::{FeedRecord, NetworkStats, Result};
use netmon_system::{NetworkSource, Sampler};
use std::sync::Arc;

/// Process-wide monitoring state, built once by the entry point and shared
/// with the HTTP and live-feed handlers.
pub struct Monitor {
    sampler:        Arc<Sampler>,
    store:          Arc<SeriesStore>,
    publisher:      Arc<Publisher>,
    scheduler:      Scheduler,
    default_window: i64,
}

impl Monitor {
    pub fn new(source: Arc<dyn NetworkSource>, config: &MonitorConfig) -> Self {
        let sampler = Arc::new(Sampler::new(source, config.sampler.timeout()));
        let store = Arc::new(SeriesStore::new(config.retention.max_samples));
        let publisher = Arc::new(Publisher::new());
        let scheduler = Scheduler::new(Pipeline {
            sampler:   Arc::clone(&sampler),
            store:     Arc::clone(&store),
            publisher: Arc::clone(&publisher),
            prune:     PrunePolicy::from(&config.retention),
        });
        Self {
            sampler,
            store,
            publisher,
            scheduler,
            default_window: config.retention.default_window_minutes,
        }
    }

    pub fn store(&self) -> &SeriesStore {
        &self.store
    }

    pub fn publisher(&self) -> &Publisher {
        &self.publisher
    }

    /// The one tick scheduler driving this monitor. It starts stopped.
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Sample the host right now. Never reads the store, so it works while
    /// the scheduler is stopped or the store is empty.
    pub async fn current_snapshot(&self) -> Result<NetworkStats> {
        let reading = self.sampler.sample().await?;
        Ok(NetworkStats::from(&reading))
    }

    /// Stored samples from the last `minutes` (default window if `None`),
    /// shaped like the live feed.
    pub fn recent_window(&self, minutes: Option<i64>) -> Vec<FeedRecord> {
        let minutes = minutes.unwrap_or(self.default_window);
        self.store
            .query(minutes)
            .iter()
            .map(FeedRecord::from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netmon_core::sample::now_millis;
    use netmon_core::Sample;
    use netmon_system::{FixedSource, InterfaceCounters};
    use std::time::Duration;

    fn monitor(interfaces: Vec<InterfaceCounters>) -> Monitor {
        Monitor::new(Arc::new(FixedSource::new(interfaces)), &MonitorConfig::default())
    }

    #[tokio::test]
    async fn snapshot_works_with_an_empty_store() {
        let monitor = monitor(vec![InterfaceCounters {
            name:             "eth0".into(),
            rx_bytes_per_sec: 1_073_741_824.0,
            ..InterfaceCounters::default()
        }]);
        assert!(monitor.store().is_empty());

        let stats = monitor.current_snapshot().await.unwrap();
        assert_eq!(stats.interface, "eth0");
        assert_eq!(stats.rx_rate, 1.0);
        assert_eq!(stats.tx_rate, 0.0);
        assert_eq!(stats.bandwidth, 1.0);

        // snapshots are not recorded
        assert!(monitor.store().is_empty());
    }

    #[tokio::test]
    async fn snapshot_without_interfaces_is_unknown() {
        let stats = monitor(vec![]).current_snapshot().await.unwrap();
        assert_eq!(stats.interface, "unknown");
        assert_eq!(stats.bandwidth, 0.0);
    }

    #[test]
    fn recent_window_maps_stored_samples() {
        let monitor = monitor(vec![]);
        let now = now_millis();
        monitor.store().append(Sample {
            timestamp:        now - 20 * 60_000,
            rx_bytes_per_sec: 1.0,
            ..Sample::default()
        });
        monitor.store().append(Sample {
            timestamp:        now,
            rx_bytes_per_sec: 1_073_741_824.0,
            tx_bytes_per_sec: 1_073_741_824.0,
            ..Sample::default()
        });

        let recent = monitor.recent_window(None);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].timestamp, now);
        assert_eq!(recent[0].bandwidth, 2.0);

        assert_eq!(monitor.recent_window(Some(30)).len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn scheduler_is_shared_across_callers() {
        let monitor = monitor(vec![InterfaceCounters {
            name: "eth0".into(),
            ..InterfaceCounters::default()
        }]);

        assert!(monitor.scheduler().start(Duration::from_millis(1_000)));
        assert!(!monitor.scheduler().start(Duration::from_millis(1_000)));
        tokio::time::sleep(Duration::from_millis(3_500)).await;

        assert_eq!(monitor.store().len(), 3);
        assert_eq!(monitor.publisher().published_count(), 3);
        assert!(monitor.scheduler().stop().await);
    }
}
