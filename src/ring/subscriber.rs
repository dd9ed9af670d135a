//! Seqlock-verified consume path.
//!
//! A subscriber owns a private cursor and nothing else; any number of them
//! read one ring independently. Every call settles into exactly one of
//! "message delivered", "nothing available", or "message lost", and lost
//! messages are tallied on the [`Subscriber::skipped`] counter.

use std::ptr;
use std::sync::atomic::{fence, Ordering};

use tracing::trace;

use crate::error::RetCode;
use crate::layout::SlotHeader;
use crate::metrics::METRICS;
use crate::region::TopicHandle;
use crate::ring::{RingView, Sequence};

/// Outcome of one [`Subscriber::consume`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consumed {
    /// One message copied into the caller's buffer
    Delivered { seq: Sequence, len: usize, publisher_id: u16 },
    /// No new message is ready
    NoData,
    /// The next message does not fit; the cursor has moved past it
    Truncated { seq: Sequence, required: usize },
}

impl Consumed {
    /// Map onto the shared return-code taxonomy
    pub fn code(&self) -> RetCode {
        match self {
            Self::Delivered { .. } => RetCode::Ok,
            Self::NoData => RetCode::NoData,
            Self::Truncated { .. } => RetCode::Truncated,
        }
    }
}

/// Independent reader over one ring.
///
/// Works identically on single- and multi-writer rings. The cursor starts
/// at zero, meaning "everything still present in the ring", and only moves
/// forward; falling more than a ring behind triggers a forward jump to the
/// oldest slot the writer has not reclaimed.
pub struct Subscriber<'r> {
    ring: RingView<'r>,
    last_seq: Sequence,
    skipped: u64,
}

// One thread drives a given subscriber.
unsafe impl Send for Subscriber<'_> {}

impl<'r> Subscriber<'r> {
    /// Attach a fresh cursor to `topic`.
    pub fn attach(topic: &TopicHandle<'r>) -> Self {
        Self { ring: topic.ring(), last_seq: 0, skipped: 0 }
    }

    /// Try to read the next message into `buf`.
    ///
    /// Wait-free: never blocks, returns [`Consumed::NoData`] instead. The
    /// payload copy is bracketed by acquire loads of the slot's sequence
    /// word; if the bracket observes movement the copy is discarded and the
    /// cursor re-syncs to the head.
    pub fn consume(&mut self, buf: &mut [u8]) -> Consumed {
        let slot_count = self.ring.slot_count() as u64;
        let mut w = self.ring.write_head();
        let mut next = self.last_seq + 1;

        if next > w {
            return Consumed::NoData;
        }

        // Lapped: jump forward to the oldest sequence still guaranteed to
        // live in its slot.
        if w - next >= slot_count {
            let new_start = w - slot_count + 1;
            self.skipped += w - next;
            METRICS.record_lag_jump();
            trace!(from = next, to = new_start, "reader lapped, jumping forward");
            self.last_seq = new_start - 1;
            next = new_start;
            w = self.ring.write_head();
            if next > w {
                return Consumed::NoData;
            }
        }

        let idx = self.ring.index_of(next);
        let header = self.ring.slot_header(idx);
        let seq_pre = header.seq.load(Ordering::Acquire);

        // The generation we expect has not been committed yet. In MWMR this
        // also covers a reservation abandoned by a crashed writer: its slot
        // keeps an old sequence until some later wrap reclaims it.
        if seq_pre == 0 || seq_pre < next {
            return Consumed::NoData;
        }

        // The writer overtook us between the head load and here.
        if seq_pre > next {
            self.skipped += seq_pre - next;
            self.last_seq = seq_pre - 1;
            return Consumed::NoData;
        }

        // seq_pre == next: the slot is ours to copy, pending verification.
        let (payload_len, publisher_id) = self.read_slot_fields(idx);
        if payload_len > buf.len() {
            self.last_seq = next;
            return Consumed::Truncated { seq: next, required: payload_len };
        }

        // A concurrent overwrite can tear payload_len itself; clamping keeps
        // the copy inside the slot, and the bracket below rejects the read.
        let copy_len = payload_len.min(self.ring.payload_capacity());
        // SAFETY: copy_len is within both the slot payload and buf
        unsafe {
            ptr::copy_nonoverlapping(self.ring.payload_ptr(idx), buf.as_mut_ptr(), copy_len);
        }

        fence(Ordering::Acquire);
        let seq_post = header.seq.load(Ordering::Relaxed);
        if seq_post != seq_pre {
            // Torn read: the writer reclaimed the slot mid-copy.
            self.skipped += 1;
            self.last_seq = w;
            METRICS.record_torn_read();
            trace!(seq = next, "torn read, re-syncing to head");
            return Consumed::NoData;
        }

        self.last_seq = next;
        METRICS.record_consume(payload_len as u64);
        Consumed::Delivered { seq: next, len: payload_len, publisher_id }
    }

    /// Plain reads of the non-atomic header fields, valid once the seqlock
    /// bracket confirms the slot held still.
    fn read_slot_fields(&self, idx: u32) -> (usize, u16) {
        let header = self.ring.slot_header(idx) as *const SlotHeader;
        // SAFETY: the header lives inside the mapping; plain reads are what
        // the seqlock discipline prescribes between the seq loads
        unsafe {
            (
                ptr::addr_of!((*header).payload_len).read() as usize,
                ptr::addr_of!((*header).publisher_id).read(),
            )
        }
    }

    /// Sequence of the last message this cursor accounted for
    pub fn last_seq(&self) -> Sequence {
        self.last_seq
    }

    /// Messages lost to lag jumps, overtakes, and torn reads
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Messages published but not yet read by this cursor
    pub fn available(&self) -> u64 {
        self.ring.write_head().saturating_sub(self.last_seq)
    }

    /// The underlying ring view
    pub fn ring(&self) -> &RingView<'r> {
        &self.ring
    }

    /// Largest payload this ring can deliver
    pub fn payload_capacity(&self) -> usize {
        self.ring.payload_capacity()
    }
}
