use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Lock-free counters shared by every send on one transport.
#[derive(Debug, Default)]
pub struct TransportStats {
    total_requests: AtomicU64,
    successful_requests: AtomicU64,
    rejected_requests: AtomicU64,
    connection_failures: AtomicU64,
    compressed_requests: AtomicU64,
    bytes_sent: AtomicU64,
    total_response_time: AtomicU64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportStatsSnapshot {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub rejected_requests: u64,
    pub connection_failures: u64,
    pub compressed_requests: u64,
    pub bytes_sent: u64,
    pub average_response_time: Duration,
}

impl TransportStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_response(
        &self,
        success: bool,
        bytes_sent: usize,
        compressed: bool,
        response_time: Duration,
    ) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent
            .fetch_add(bytes_sent as u64, Ordering::Relaxed);
        self.total_response_time
            .fetch_add(response_time.as_millis() as u64, Ordering::Relaxed);

        if compressed {
            self.compressed_requests.fetch_add(1, Ordering::Relaxed);
        }
        if success {
            self.successful_requests.fetch_add(1, Ordering::Relaxed);
        } else {
            self.rejected_requests.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_connection_failure(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.connection_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> TransportStatsSnapshot {
        let total_requests = self.total_requests.load(Ordering::Relaxed);
        let total_response_time = self.total_response_time.load(Ordering::Relaxed);

        let average_response_time = if total_requests > 0 {
            Duration::from_millis(total_response_time / total_requests)
        } else {
            Duration::ZERO
        };

        TransportStatsSnapshot {
            total_requests,
            successful_requests: self.successful_requests.load(Ordering::Relaxed),
            rejected_requests: self.rejected_requests.load(Ordering::Relaxed),
            connection_failures: self.connection_failures.load(Ordering::Relaxed),
            compressed_requests: self.compressed_requests.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            average_response_time,
        }
    }
}
