//! Multi-writer publish path.

use std::sync::atomic::Ordering;

use tracing::warn;

use crate::constants::{COMMIT_SPIN_BEFORE_YIELD, COMMIT_SPIN_LIMIT};
use crate::error::{Result, SurgeError};
use crate::layout::RingKind;
use crate::metrics::METRICS;
use crate::region::TopicHandle;
use crate::ring::{RingView, Sequence};
use crate::wait::Backoff;

/// Publisher for a multi-writer ring.
///
/// Any number of these may publish to the same ring concurrently, from any
/// mix of threads and processes. The atomic reservation hands each writer a
/// unique sequence; the generation wait keeps a fast writer from storing a
/// newer sequence into a slot while a lapped writer is still mid-commit, so
/// readers never see a slot's sequence move backwards.
pub struct MwmrPublisher<'r> {
    ring: RingView<'r>,
    publisher_id: u16,
}

// One thread drives a given publisher; clone-free moves between threads are fine.
unsafe impl Send for MwmrPublisher<'_> {}

impl<'r> MwmrPublisher<'r> {
    /// Attach to `topic`, which must be a multi-writer ring.
    pub fn attach(topic: &TopicHandle<'r>, publisher_id: u16) -> Result<Self> {
        if topic.kind() != RingKind::MultiWriter {
            return Err(SurgeError::invalid_args(format!(
                "topic {:?} is a single-writer ring",
                topic.name()
            )));
        }
        Ok(Self { ring: topic.ring(), publisher_id })
    }

    /// Append one message; returns its sequence number.
    ///
    /// May spin while a slower writer finishes an earlier generation of the
    /// same slot; gives up with `Timeout` once the iteration budget is
    /// exhausted, leaving the reservation abandoned (readers lag past it).
    pub fn publish(&mut self, payload: &[u8]) -> Result<Sequence> {
        let capacity = self.ring.payload_capacity();
        if payload.len() > capacity {
            return Err(SurgeError::PayloadTooLarge { len: payload.len(), capacity });
        }

        let commit_seq = self.ring.reserve();
        self.wait_for_generation(commit_seq)?;
        self.ring.commit(commit_seq, payload, self.publisher_id);
        METRICS.record_publish(payload.len() as u64);
        Ok(commit_seq)
    }

    /// Spin until this writer's slot has drained every earlier generation.
    ///
    /// The writer may proceed once the slot is unused (`seq == 0`) or its
    /// committed generation is strictly older than ours. Sequences mapping
    /// to one slot differ by multiples of `slot_count`, so the integer
    /// division compares wraps exactly.
    fn wait_for_generation(&self, commit_seq: Sequence) -> Result<()> {
        let slot_count = self.ring.slot_count() as u64;
        let my_generation = commit_seq / slot_count;
        let header = self.ring.slot_header(self.ring.index_of(commit_seq));

        let mut backoff = Backoff::new(COMMIT_SPIN_BEFORE_YIELD);
        loop {
            let current = header.seq.load(Ordering::Acquire);
            if current == 0 || current / slot_count < my_generation {
                return Ok(());
            }
            if backoff.rounds() >= COMMIT_SPIN_LIMIT {
                METRICS.record_commit_timeout();
                warn!(
                    seq = commit_seq,
                    occupant = current,
                    "generation wait exhausted, abandoning reservation"
                );
                return Err(SurgeError::Timeout { spins: backoff.rounds() });
            }
            backoff.snooze();
        }
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::{RegionBuilder, SharedRegion, TopicConfig};

    fn test_region(tag: &str) -> String {
        format!("/surge-mwmr-{}-{}", tag, std::process::id())
    }

    fn build(name: &str, slots: u32) -> SharedRegion {
        RegionBuilder::new(name, 1 << 20)
            .topic(TopicConfig::new("t", slots, 64, RingKind::MultiWriter))
            .create()
            .unwrap()
    }

    #[test]
    fn test_publish_assigns_sequences() {
        let name = test_region("seq");
        let region = build(&name, 16);
        let mut publisher = region.mwmr_publisher("t", 3).unwrap();

        assert_eq!(publisher.publish(b"a").unwrap(), 1);
        assert_eq!(publisher.publish(b"b").unwrap(), 2);

        drop(region);
        SharedRegion::unlink(&name).unwrap();
    }

    #[test]
    fn test_two_publishers_interleave() {
        let name = test_region("pair");
        let region = build(&name, 16);
        let mut first = region.mwmr_publisher("t", 1).unwrap();
        let mut second = region.mwmr_publisher("t", 2).unwrap();

        let a = first.publish(b"a").unwrap();
        let b = second.publish(b"b").unwrap();
        let c = first.publish(b"c").unwrap();
        assert_eq!((a, b, c), (1, 2, 3));

        drop(region);
        SharedRegion::unlink(&name).unwrap();
    }

    #[test]
    fn test_wraps_keep_slot_sequences_monotone() {
        let name = test_region("wrap");
        let region = build(&name, 8);
        let mut publisher = region.mwmr_publisher("t", 1).unwrap();

        for i in 0..64u64 {
            publisher.publish(&i.to_le_bytes()).unwrap();
        }

        let ring = region.topic("t").unwrap().ring();
        for idx in 0..8 {
            let seq = ring.slot_seq(idx);
            // last wrap owns every slot
            assert!(seq > 64 - 8 && seq <= 64);
            assert_eq!((seq - 1) % 8, idx as u64);
        }

        drop(region);
        SharedRegion::unlink(&name).unwrap();
    }

    #[test]
    fn test_rejects_single_writer_ring() {
        let name = test_region("kind");
        let region = RegionBuilder::new(&name, 1 << 20)
            .topic(TopicConfig::new("s", 8, 8, RingKind::SingleWriter))
            .create()
            .unwrap();

        assert!(region.mwmr_publisher("s", 1).is_err());

        drop(region);
        SharedRegion::unlink(&name).unwrap();
    }
}
