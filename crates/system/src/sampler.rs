use crate::source::{InterfaceCounters, NetworkSource};
use netmon_core::sample::{now_millis, UNKNOWN_INTERFACE};
use netmon_core::{MonitorError, Reading, Result, Sample};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Turns host counters into normalized [`Reading`]s.
///
/// Only the first interface the source reports is tracked. Timestamps are
/// never allowed to go backwards between two calls on the same sampler.
pub struct Sampler {
    source:         Arc<dyn NetworkSource>,
    timeout:        Duration,
    last_timestamp: AtomicI64,
}

impl Sampler {
    pub fn new(source: Arc<dyn NetworkSource>, timeout: Duration) -> Self {
        Self {
            source,
            timeout,
            last_timestamp: AtomicI64::new(i64::MIN),
        }
    }

    /// Read the host once.
    ///
    /// Fails if the source fails or does not answer within the timeout; no
    /// sample is produced in that case.
    pub async fn sample(&self) -> Result<Reading> {
        let interfaces = tokio::time::timeout(self.timeout, self.source.interfaces())
            .await
            .map_err(|_| MonitorError::SamplerTimeout(self.timeout))??;

        if interfaces.is_empty() {
            tracing::debug!("Host reported no network interfaces");
        }
        let timestamp = self.next_timestamp(now_millis());
        Ok(reading_from(interfaces.into_iter().next(), timestamp))
    }

    fn next_timestamp(&self, now: i64) -> i64 {
        let previous = self.last_timestamp.fetch_max(now, Ordering::SeqCst);
        previous.max(now)
    }
}

fn reading_from(primary: Option<InterfaceCounters>, timestamp: i64) -> Reading {
    match primary {
        Some(iface) => Reading {
            interface: iface.name,
            sample: Sample {
                timestamp,
                rx_bytes_per_sec: non_negative(iface.rx_bytes_per_sec),
                tx_bytes_per_sec: non_negative(iface.tx_bytes_per_sec),
                rx_bytes_total:   iface.rx_bytes_total,
                tx_bytes_total:   iface.tx_bytes_total,
            },
        },
        None => Reading {
            interface: UNKNOWN_INTERFACE.to_string(),
            sample:    Sample::zeroed(timestamp),
        },
    }
}

fn non_negative(rate: f64) -> f64 {
    if rate.is_finite() && rate > 0.0 {
        rate
    } else {
        0.0
    }
}
