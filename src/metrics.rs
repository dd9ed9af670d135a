//! Process-local metrics for the fabric.
//!
//! Lightweight counters for observability

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics counters
pub struct Metrics {
    pub messages_published: AtomicU64,
    pub messages_consumed: AtomicU64,
    pub bytes_published: AtomicU64,
    pub bytes_consumed: AtomicU64,
    pub lag_jumps: AtomicU64,
    pub torn_reads: AtomicU64,
    pub commit_timeouts: AtomicU64,
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            messages_published: AtomicU64::new(0),
            messages_consumed: AtomicU64::new(0),
            bytes_published: AtomicU64::new(0),
            bytes_consumed: AtomicU64::new(0),
            lag_jumps: AtomicU64::new(0),
            torn_reads: AtomicU64::new(0),
            commit_timeouts: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_publish(&self, bytes: u64) {
        self.messages_published.fetch_add(1, Ordering::Relaxed);
        self.bytes_published.fetch_add(bytes, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_consume(&self, bytes: u64) {
        self.messages_consumed.fetch_add(1, Ordering::Relaxed);
        self.bytes_consumed.fetch_add(bytes, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_lag_jump(&self) {
        self.lag_jumps.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_torn_read(&self) {
        self.torn_reads.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_commit_timeout(&self) {
        self.commit_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_published: self.messages_published.load(Ordering::Relaxed),
            messages_consumed: self.messages_consumed.load(Ordering::Relaxed),
            bytes_published: self.bytes_published.load(Ordering::Relaxed),
            bytes_consumed: self.bytes_consumed.load(Ordering::Relaxed),
            lag_jumps: self.lag_jumps.load(Ordering::Relaxed),
            torn_reads: self.torn_reads.load(Ordering::Relaxed),
            commit_timeouts: self.commit_timeouts.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.messages_published.store(0, Ordering::Relaxed);
        self.messages_consumed.store(0, Ordering::Relaxed);
        self.bytes_published.store(0, Ordering::Relaxed);
        self.bytes_consumed.store(0, Ordering::Relaxed);
        self.lag_jumps.store(0, Ordering::Relaxed);
        self.torn_reads.store(0, Ordering::Relaxed);
        self.commit_timeouts.store(0, Ordering::Relaxed);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MetricsSnapshot {
    pub messages_published: u64,
    pub messages_consumed: u64,
    pub bytes_published: u64,
    pub bytes_consumed: u64,
    pub lag_jumps: u64,
    pub torn_reads: u64,
    pub commit_timeouts: u64,
}

impl std::fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "pub={} sub={} bytes_pub={} bytes_sub={} lag_jumps={} torn={} timeouts={}",
            self.messages_published,
            self.messages_consumed,
            self.bytes_published,
            self.bytes_consumed,
            self.lag_jumps,
            self.torn_reads,
            self.commit_timeouts
        )
    }
}

/// Global metrics instance
pub static METRICS: Metrics = Metrics::new();
