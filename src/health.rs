//! Health derived from ring state.
//!
//! Nothing here is stored: every metric is computed on demand from the same
//! atomics the protocol already maintains, so a probe is safe to run from
//! any attached process, including one that neither publishes nor consumes.

use std::time::Duration;

use serde::Serialize;

use crate::error::Result;
use crate::ring::{RingView, Sequence};
use crate::time::monotonic_nanos;

/// Read-only health view over one topic.
pub struct HealthProbe<'r> {
    topic: String,
    ring: RingView<'r>,
}

impl<'r> HealthProbe<'r> {
    pub(crate) fn new(topic: String, ring: RingView<'r>) -> Self {
        Self { topic, ring }
    }

    /// Topic this probe watches
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Total messages ever reserved on this ring
    pub fn total_published(&self) -> u64 {
        self.ring.write_head()
    }

    /// Commit timestamp of the newest message, or 0 while it is still being
    /// committed (or nothing was ever published).
    pub fn last_publish_ns(&self) -> u64 {
        let head = self.ring.write_head();
        if head == 0 {
            return 0;
        }
        let idx = self.ring.index_of(head);
        if self.ring.slot_seq(idx) != head {
            return 0;
        }
        self.ring.slot_timestamp_ns(idx)
    }

    /// Slots a subscriber at `last_seq` is behind the head
    pub fn lag_of(&self, last_seq: Sequence) -> u64 {
        self.ring.write_head().saturating_sub(last_seq)
    }

    /// True when nothing was committed within `threshold`
    pub fn is_silent(&self, threshold: Duration) -> bool {
        let last = self.last_publish_ns();
        monotonic_nanos().saturating_sub(last) > threshold.as_nanos() as u64
    }

    /// True when a subscriber at `last_seq` is further behind than `threshold` slots
    pub fn lag_breached(&self, last_seq: Sequence, threshold: u64) -> bool {
        self.lag_of(last_seq) > threshold
    }

    /// Snapshot the probe for a subscriber at `last_seq`
    pub fn report(&self, last_seq: Sequence) -> HealthReport {
        HealthReport {
            topic: self.topic.clone(),
            published: self.total_published(),
            last_pub_ns: self.last_publish_ns(),
            lag: self.lag_of(last_seq),
        }
    }
}

/// One topic's health at a point in time.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub topic: String,
    pub published: u64,
    pub last_pub_ns: u64,
    pub lag: u64,
}

impl HealthReport {
    /// Render as one compact JSON line.
    ///
    /// Only the field names are stable; consumers should not rely on field
    /// order or formatting beyond that.
    pub fn to_json_line(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
