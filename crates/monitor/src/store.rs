use netmon_core::sample::now_millis;
use netmon_core::Sample;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Default hard cap on retained samples.
pub const DEFAULT_CAPACITY: usize = 1_000;

const MILLIS_PER_MINUTE: i64 = 60_000;

/// Rolling, count- and age-bounded history of samples in append order.
///
/// The lock is only held for the deque operation itself.
#[derive(Debug)]
pub struct SeriesStore {
    samples:  Mutex<VecDeque<Sample>>,
    capacity: usize,
}

impl SeriesStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Push a new sample, evicting the oldest while over capacity.
    pub fn append(&self, sample: Sample) {
        let mut samples = self.lock();
        samples.push_back(sample);
        while samples.len() > self.capacity {
            samples.pop_front();
        }
    }

    /// Samples no older than `max_age_minutes`, oldest first.
    pub fn query(&self, max_age_minutes: i64) -> Vec<Sample> {
        self.query_at(max_age_minutes, now_millis())
    }

    pub fn query_at(&self, max_age_minutes: i64, now: i64) -> Vec<Sample> {
        let cutoff = cutoff(now, max_age_minutes);
        self.lock()
            .iter()
            .filter(|s| s.timestamp >= cutoff)
            .copied()
            .collect()
    }

    /// Drop every sample older than `retention_minutes`. Returns how many
    /// were removed.
    pub fn prune(&self, retention_minutes: i64) -> usize {
        self.prune_at(retention_minutes, now_millis())
    }

    pub fn prune_at(&self, retention_minutes: i64, now: i64) -> usize {
        let cutoff = cutoff(now, retention_minutes);
        let mut samples = self.lock();
        let before = samples.len();
        samples.retain(|s| s.timestamp >= cutoff);
        before - samples.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Sample>> {
        self.samples.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SeriesStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

fn cutoff(now: i64, minutes: i64) -> i64 {
    now.saturating_sub(minutes.saturating_mul(MILLIS_PER_MINUTE))
}
