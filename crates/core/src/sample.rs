use serde::{Deserialize, Serialize};

/// Bytes in one gibibyte. Displayed rates are bytes/sec divided by this.
pub const BYTES_PER_GIB: f64 = 1_073_741_824.0;

/// Interface name reported when the host lists no interfaces at all.
pub const UNKNOWN_INTERFACE: &str = "unknown";

/// Convert a bytes/second rate into GiB/second.
#[must_use]
pub fn gib_per_sec(bytes_per_sec: f64) -> f64 {
    bytes_per_sec / BYTES_PER_GIB
}

/// Current wall-clock time in milliseconds since the Unix epoch.
#[must_use]
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// One timestamped reading of network counters and rates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Sample {
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Bytes received per second.
    pub rx_bytes_per_sec: f64,
    /// Bytes transmitted per second.
    pub tx_bytes_per_sec: f64,
    /// Cumulative bytes received. May reset with the interface.
    pub rx_bytes_total: u64,
    /// Cumulative bytes transmitted. May reset with the interface.
    pub tx_bytes_total: u64,
}

impl Sample {
    /// A sample with every counter at zero.
    #[must_use]
    pub fn zeroed(timestamp: i64) -> Self {
        Self {
            timestamp,
            ..Self::default()
        }
    }

    /// Receive rate in GiB/s.
    #[must_use]
    pub fn rx_rate(&self) -> f64 {
        gib_per_sec(self.rx_bytes_per_sec)
    }

    /// Transmit rate in GiB/s.
    #[must_use]
    pub fn tx_rate(&self) -> f64 {
        gib_per_sec(self.tx_bytes_per_sec)
    }

    /// Combined rx + tx rate in GiB/s.
    #[must_use]
    pub fn bandwidth(&self) -> f64 {
        self.rx_rate() + self.tx_rate()
    }
}

/// A [`Sample`] together with the interface it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub interface: String,
    pub sample: Sample,
}

/// Response body of the current-snapshot query. Rates are in GiB/s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkStats {
    pub interface: String,
    pub bandwidth: f64,
    pub timestamp: i64,
    pub rx_rate: f64,
    pub tx_rate: f64,
}

impl From<&Reading> for NetworkStats {
    fn from(reading: &Reading) -> Self {
        let sample = &reading.sample;
        Self {
            interface: reading.interface.clone(),
            bandwidth: sample.bandwidth(),
            timestamp: sample.timestamp,
            rx_rate: sample.rx_rate(),
            tx_rate: sample.tx_rate(),
        }
    }
}

/// Flat record pushed over the live feed and returned by the history query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeedRecord {
    pub timestamp: i64,
    pub bandwidth: f64,
    pub rx_rate: f64,
    pub tx_rate: f64,
}

impl From<&Sample> for FeedRecord {
    fn from(sample: &Sample) -> Self {
        Self {
            timestamp: sample.timestamp,
            bandwidth: sample.bandwidth(),
            rx_rate: sample.rx_rate(),
            tx_rate: sample.tx_rate(),
        }
    }
}
