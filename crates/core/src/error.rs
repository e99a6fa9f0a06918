use std::time::Duration;

use thiserror::Error;

/// Top-level error type used across the monitor crates.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("config error: {0}")]
    Config(String),

    #[error("sampler error: {0}")]
    Sampler(String),

    #[error("sampler timed out after {0:?}")]
    SamplerTimeout(Duration),

    #[error("delivery error: {0}")]
    Delivery(String),

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

pub type Result<T, E = MonitorError> = std::result::Result<T, E>;
