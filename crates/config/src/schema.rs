use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration structure parsed from `netmon.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// HTTP / WebSocket listener.
    pub server: ServerConfig,
    /// Sampling cadence and provider timeout.
    pub sampler: SamplerConfig,
    /// Series store bounds.
    pub retention: RetentionConfig,
    /// Live push feed.
    pub feed: FeedConfig,
}

/// Address the HTTP server binds to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

impl ServerConfig {
    /// `host:port` string suitable for a TCP listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Period of the sampling tick in milliseconds.
    pub interval_ms: u64,
    /// Upper bound on a single host-metrics call in milliseconds.
    pub timeout_ms: u64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1_000,
            timeout_ms: 5_000,
        }
    }
}

impl SamplerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Hard cap on retained samples; the oldest are evicted first.
    pub max_samples: usize,
    /// Samples older than this are dropped by prune.
    pub retention_minutes: i64,
    /// How often the tick runs a prune.
    pub prune_interval_minutes: i64,
    /// Window used by the history query when none is given.
    pub default_window_minutes: i64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            max_samples: 1_000,
            retention_minutes: 60,
            prune_interval_minutes: 5,
            default_window_minutes: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Outbound messages queued per connection before it counts as not ready.
    pub listener_buffer: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self { listener_buffer: 16 }
    }
}
