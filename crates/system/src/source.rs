use futures::future::{BoxFuture, FutureExt};
use netmon_core::{MonitorError, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use sysinfo::Networks;

/// Raw counters for one interface as reported by the host.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InterfaceCounters {
    pub name: String,
    pub rx_bytes_per_sec: f64,
    pub tx_bytes_per_sec: f64,
    pub rx_bytes_total: u64,
    pub tx_bytes_total: u64,
}

/// Host-metrics provider consulted by the [`Sampler`](crate::Sampler).
///
/// Implementations report interfaces in preference order; the sampler only
/// ever looks at the first entry.
pub trait NetworkSource: Send + Sync {
    fn interfaces(&self) -> BoxFuture<'_, Result<Vec<InterfaceCounters>>>;
}

// ── sysinfo ───────────────────────────────────────────────────────────────────

/// [`NetworkSource`] backed by `sysinfo::Networks`.
///
/// `received()` / `transmitted()` are deltas since the previous refresh, so
/// dividing by the elapsed wall time gives bytes/second.
pub struct SysinfoSource {
    state: Arc<Mutex<NetState>>,
}

struct NetState {
    networks:     Networks,
    last_refresh: Instant,
}

impl SysinfoSource {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(NetState {
                networks:     Networks::new_with_refreshed_list(),
                last_refresh: Instant::now(),
            })),
        }
    }
}

impl Default for SysinfoSource {
    fn default() -> Self {
        Self::new()
    }
}

impl NetState {
    fn read(&mut self) -> Vec<InterfaceCounters> {
        self.networks.refresh(true); // true = drop interfaces that went away
        let now = Instant::now();
        let elapsed_secs = now.duration_since(self.last_refresh).as_secs_f64();
        self.last_refresh = now;

        let mut list: Vec<InterfaceCounters> = self
            .networks
            .iter()
            .map(|(name, data)| InterfaceCounters {
                name:             name.clone(),
                rx_bytes_per_sec: per_second(data.received(), elapsed_secs),
                tx_bytes_per_sec: per_second(data.transmitted(), elapsed_secs),
                rx_bytes_total:   data.total_received(),
                tx_bytes_total:   data.total_transmitted(),
            })
            .collect();
        sort_interfaces(&mut list);
        list
    }
}

impl NetworkSource for SysinfoSource {
    fn interfaces(&self) -> BoxFuture<'_, Result<Vec<InterfaceCounters>>> {
        let state = Arc::clone(&self.state);
        async move {
            let list = tokio::task::spawn_blocking(move || {
                let mut state = state
                    .lock()
                    .map_err(|_| MonitorError::Sampler("network state lock poisoned".into()))?;
                Ok::<_, MonitorError>(state.read())
            })
            .await
            .map_err(|e| MonitorError::Sampler(format!("refresh task failed: {e}")))??;
            Ok(list)
        }
        .boxed()
    }
}

fn per_second(delta: u64, elapsed_secs: f64) -> f64 {
    if elapsed_secs <= 0.0 {
        return 0.0;
    }
    delta as f64 / elapsed_secs
}

fn is_loopback(name: &str) -> bool {
    name == "lo" || name.starts_with("lo0") || name.starts_with("Loopback")
}

/// Order by name with loopback interfaces last, so "first" is stable.
pub fn sort_interfaces(list: &mut [InterfaceCounters]) {
    list.sort_by(|a, b| {
        (is_loopback(&a.name), &a.name).cmp(&(is_loopback(&b.name), &b.name))
    });
}

// ── Fixed ─────────────────────────────────────────────────────────────────────

/// Serves the same interface list on every call. Counts calls.
#[derive(Debug, Default)]
pub struct FixedSource {
    interfaces: Vec<InterfaceCounters>,
    calls:      AtomicUsize,
}

impl FixedSource {
    pub fn new(interfaces: Vec<InterfaceCounters>) -> Self {
        Self {
            interfaces,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of times [`NetworkSource::interfaces`] has been called.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl NetworkSource for FixedSource {
    fn interfaces(&self) -> BoxFuture<'_, Result<Vec<InterfaceCounters>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let list = self.interfaces.clone();
        async move { Ok(list) }.boxed()
    }
}
