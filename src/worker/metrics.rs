use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerMetrics {
    pub capacity: usize,
    pub queue_len: usize,
    pub threads: usize,
    pub active: usize,
    pub submitted: u64,
    pub completed: u64,
    pub failed: u64,
    pub dropped: u64,
    pub abandoned: u64,
}

#[derive(Debug, Default)]
pub(crate) struct WorkerCounters {
    pub submitted: AtomicU64,
    pub completed: AtomicU64,
    pub failed: AtomicU64,
    pub dropped: AtomicU64,
    pub abandoned: AtomicU64,
}

impl WorkerCounters {
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn load(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}
