use netmon_core::{FeedRecord, MonitorError, Result, Sample};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::mpsc;
use tracing::debug;

/// Identity of one registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Allocate a process-unique id.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One live subscriber to the sample feed, owned by the transport.
pub trait Listener: Send + Sync {
    /// Whether the transport can take a message right now.
    fn is_ready(&self) -> bool;

    /// Hand over one serialized record. An error deregisters the listener.
    fn deliver(&self, payload: &Arc<str>) -> Result<()>;
}

/// Outcome of a single [`Publisher::publish`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub delivered: usize,
    /// Listeners that were not ready and received nothing.
    pub skipped:   usize,
    /// Listeners whose delivery failed and were deregistered.
    pub dropped:   usize,
}

/// Fans each new sample out to every registered [`Listener`].
///
/// Delivery is best-effort and independent per listener. Newly registered
/// listeners only see samples published after they joined.
#[derive(Default)]
pub struct Publisher {
    listeners: RwLock<HashMap<ListenerId, Arc<dyn Listener>>>,
    published: AtomicU64,
}

impl Publisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` under `id`. Registering an id twice keeps one entry.
    pub fn register(&self, id: ListenerId, listener: Arc<dyn Listener>) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, listener);
    }

    /// Remove `id`. Returns `false` if it was not registered.
    pub fn deregister(&self, id: ListenerId) -> bool {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Number of `publish` calls so far.
    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::SeqCst)
    }

    /// Serialize `sample` once as a [`FeedRecord`] and deliver it to every
    /// ready listener.
    pub fn publish(&self, sample: &Sample) -> Result<PublishReport> {
        self.published.fetch_add(1, Ordering::SeqCst);

        let payload: Arc<str> = serde_json::to_string(&FeedRecord::from(sample))
            .map_err(|e| MonitorError::Delivery(format!("encode feed record: {e}")))?
            .into();

        // Copy the set so joins and leaves never race the loop below.
        let snapshot: Vec<(ListenerId, Arc<dyn Listener>)> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, l)| (*id, Arc::clone(l)))
            .collect();

        let mut report = PublishReport::default();
        for (id, listener) in snapshot {
            if !listener.is_ready() {
                report.skipped += 1;
                continue;
            }
            match listener.deliver(&payload) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    debug!("Dropping listener {id}: {e}");
                    self.deregister(id);
                    report.dropped += 1;
                }
            }
        }
        Ok(report)
    }
}

// ── Channel-backed listener ───────────────────────────────────────────────────

/// [`Listener`] that queues payloads on a bounded tokio channel.
///
/// A full queue reports not-ready; a closed queue fails delivery.
#[derive(Debug, Clone)]
pub struct ChannelListener {
    tx: mpsc::Sender<Arc<str>>,
}

impl ChannelListener {
    /// Create a listener and the receiver the transport drains.
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<Arc<str>>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self { tx }, rx)
    }
}

impl Listener for ChannelListener {
    fn is_ready(&self) -> bool {
        !self.tx.is_closed() && self.tx.capacity() > 0
    }

    fn deliver(&self, payload: &Arc<str>) -> Result<()> {
        self.tx
            .try_send(Arc::clone(payload))
            .map_err(|e| MonitorError::Delivery(e.to_string()))
    }
}
