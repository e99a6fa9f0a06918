pub mod schema;

pub use schema::{FeedConfig, MonitorConfig, RetentionConfig, SamplerConfig, ServerConfig};

use netmon_core::{MonitorError, Result};
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "NETMON_CONFIG";

/// Environment variable overriding `server.port`.
pub const PORT_ENV: &str = "PORT";

/// Load configuration from a TOML file.  Returns `MonitorConfig::default()` if
/// the file doesn't exist so the monitor always has sensible defaults.
pub fn load(path: impl AsRef<Path>) -> Result<MonitorConfig> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::warn!(
            "Config file not found at '{}'; using defaults.",
            path.display()
        );
        return Ok(MonitorConfig::default());
    }

    let raw = std::fs::read_to_string(path)
        .map_err(|e| MonitorError::Config(format!("cannot read '{}': {e}", path.display())))?;

    parse(&raw)
}

/// Parse and validate a TOML document.
pub fn parse(raw: &str) -> Result<MonitorConfig> {
    let config: MonitorConfig =
        toml::from_str(raw).map_err(|e| MonitorError::Config(format!("TOML parse error: {e}")))?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &MonitorConfig) -> Result<()> {
    if config.sampler.interval_ms == 0 {
        return Err(MonitorError::Config("sampler.interval_ms must be > 0".into()));
    }
    if config.retention.max_samples == 0 {
        return Err(MonitorError::Config("retention.max_samples must be > 0".into()));
    }
    if config.retention.retention_minutes < 0 {
        return Err(MonitorError::Config(
            "retention.retention_minutes must be >= 0".into(),
        ));
    }
    if config.retention.default_window_minutes < 0 {
        return Err(MonitorError::Config(
            "retention.default_window_minutes must be >= 0".into(),
        ));
    }
    if config.retention.prune_interval_minutes <= 0 {
        return Err(MonitorError::Config(
            "retention.prune_interval_minutes must be > 0".into(),
        ));
    }
    if config.feed.listener_buffer == 0 {
        return Err(MonitorError::Config("feed.listener_buffer must be > 0".into()));
    }
    Ok(())
}

/// Return the default config path: `$NETMON_CONFIG` if set, otherwise
/// `netmon/netmon.toml` under `$XDG_CONFIG_HOME`.
pub fn default_path() -> PathBuf {
    if let Ok(explicit) = std::env::var(CONFIG_ENV) {
        return PathBuf::from(explicit);
    }
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("netmon").join("netmon.toml")
}

/// Apply a `PORT` value on top of `config`. Unparsable values are ignored.
pub fn apply_port_override(config: &mut MonitorConfig, value: Option<&str>) {
    let Some(raw) = value else {
        return;
    };
    match raw.trim().parse::<u16>() {
        Ok(port) => config.server.port = port,
        Err(e) => tracing::warn!("Ignoring {PORT_ENV}='{raw}': {e}"),
    }
}

/// Load the config file from [`default_path`] and apply environment overrides.
pub fn resolve() -> Result<MonitorConfig> {
    let mut config = load(default_path())?;
    apply_port_override(&mut config, std::env::var(PORT_ENV).ok().as_deref());
    Ok(config)
}
