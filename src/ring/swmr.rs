//! Single-writer publish path.

use crate::error::{Result, SurgeError};
use crate::layout::RingKind;
use crate::metrics::METRICS;
use crate::region::TopicHandle;
use crate::ring::{RingView, Sequence};

/// Publisher for a single-writer ring.
///
/// Wait-free: every publish is one atomic increment, a payload copy, and a
/// fenced sequence store. The caller owns exclusivity - exactly one live
/// `SwmrPublisher` per ring, in one process at a time.
pub struct SwmrPublisher<'r> {
    ring: RingView<'r>,
    publisher_id: u16,
}

// One publisher thread at a time; moving it between threads is fine.
unsafe impl Send for SwmrPublisher<'_> {}

impl<'r> SwmrPublisher<'r> {
    /// Attach to `topic`, which must be a single-writer ring.
    pub fn attach(topic: &TopicHandle<'r>, publisher_id: u16) -> Result<Self> {
        if topic.kind() != RingKind::SingleWriter {
            return Err(SurgeError::invalid_args(format!(
                "topic {:?} is a multi-writer ring",
                topic.name()
            )));
        }
        Ok(Self { ring: topic.ring(), publisher_id })
    }

    /// Append one message; returns its sequence number.
    ///
    /// The size check runs before the reservation, so a rejected payload
    /// leaves `write_head` untouched.
    pub fn publish(&mut self, payload: &[u8]) -> Result<Sequence> {
        let capacity = self.ring.payload_capacity();
        if payload.len() > capacity {
            return Err(SurgeError::PayloadTooLarge { len: payload.len(), capacity });
        }

        let commit_seq = self.ring.reserve();
        self.ring.commit(commit_seq, payload, self.publisher_id);
        METRICS.record_publish(payload.len() as u64);
        Ok(commit_seq)
    }

    /// Identity stamped into every slot this publisher commits
    pub fn publisher_id(&self) -> u16 {
        self.publisher_id
    }

    /// Sequence of the last reservation on this ring (acquire)
    pub fn write_head(&self) -> Sequence {
        self.ring.write_head()
    }

    /// The underlying ring view
    pub fn ring(&self) -> &RingView<'r> {
        &self.ring
    }
}
