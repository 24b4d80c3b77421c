use std::sync::atomic::{AtomicU64, Ordering};

/// Running counters kept by the batcher. Updated with relaxed atomics; a snapshot is
/// consistent per counter, not across counters.
#[derive(Debug, Default)]
pub struct SchedulerStats {
    batches_dispatched: AtomicU64,
    batches_failed: AtomicU64,
    requests_dispatched: AtomicU64,
    requests_completed: AtomicU64,
    requests_failed: AtomicU64,
    requests_rejected: AtomicU64,
    results_abandoned: AtomicU64,
    padding_tokens: AtomicU64,
}

/// Point-in-time copy of [`SchedulerStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub batches_dispatched: u64,
    pub batches_failed: u64,
    pub requests_dispatched: u64,
    pub requests_completed: u64,
    pub requests_failed: u64,
    pub requests_rejected: u64,
    pub results_abandoned: u64,
    pub padding_tokens: u64,
}

impl StatsSnapshot {
    /// Mean number of requests per dispatched batch.
    pub fn mean_batch_size(&self) -> f64 {
        if self.batches_dispatched == 0 {
            return 0.0;
        }
        self.requests_dispatched as f64 / self.batches_dispatched as f64
    }
}

impl SchedulerStats {
    pub(crate) fn record_dispatch(&self, requests: usize, padding_tokens: usize) {
        self.batches_dispatched.fetch_add(1, Ordering::Relaxed);
        self.requests_dispatched.fetch_add(requests as u64, Ordering::Relaxed);
        self.padding_tokens.fetch_add(padding_tokens as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_batch_failed(&self) {
        self.batches_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_completed(&self, count: usize) {
        self.requests_completed.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self, count: usize) {
        self.requests_failed.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.requests_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_abandoned(&self) {
        self.results_abandoned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            batches_dispatched: self.batches_dispatched.load(Ordering::Relaxed),
            batches_failed: self.batches_failed.load(Ordering::Relaxed),
            requests_dispatched: self.requests_dispatched.load(Ordering::Relaxed),
            requests_completed: self.requests_completed.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
            requests_rejected: self.requests_rejected.load(Ordering::Relaxed),
            results_abandoned: self.results_abandoned.load(Ordering::Relaxed),
            padding_tokens: self.padding_tokens.load(Ordering::Relaxed),
        }
    }
}
