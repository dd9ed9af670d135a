//! Offset-addressed view over one ring.

use std::marker::PhantomData;
use std::ptr;
use std::sync::atomic::{fence, Ordering};

use crate::layout::{RingDescriptor, RingKind, SlotHeader, SLOT_HEADER_SIZE};
use crate::region::SharedRegion;
use crate::ring::Sequence;
use crate::time::monotonic_nanos;

/// A view over one ring inside a mapped region.
///
/// Holds the region base plus offsets and cached geometry; slot pointers are
/// recomputed at every access so the view stays valid at whatever address
/// the region happens to be mapped.
#[derive(Clone, Copy)]
pub struct RingView<'r> {
    base: *mut u8,
    descriptor_offset: u64,
    slots_base_offset: u64,
    slot_count: u32,
    slot_size: u32,
    kind: RingKind,
    _region: PhantomData<&'r SharedRegion>,
}

// SAFETY: all shared-state mutation goes through the descriptor/slot atomics
// under the seqlock discipline; the rest of the view is immutable geometry.
unsafe impl Send for RingView<'_> {}
unsafe impl Sync for RingView<'_> {}

impl<'r> RingView<'r> {
    /// Build a view from a region base and a descriptor offset.
    ///
    /// Geometry is read from the descriptor, not from the topic entry, so
    /// callers observe what the builder actually laid out.
    pub(crate) fn from_region(base: *mut u8, descriptor_offset: u64, kind: RingKind) -> Self {
        // SAFETY: the builder placed a RingDescriptor at this offset and the
        // non-atomic fields are written exactly once, before any attach
        let descriptor = unsafe { &*(base.add(descriptor_offset as usize) as *const RingDescriptor) };
        Self {
            base,
            descriptor_offset,
            slots_base_offset: descriptor.slots_base_offset,
            slot_count: descriptor.slot_count,
            slot_size: descriptor.slot_size,
            kind,
            _region: PhantomData,
        }
    }

    /// The ring's descriptor
    #[inline]
    pub(crate) fn descriptor(&self) -> &RingDescriptor {
        // SAFETY: descriptor_offset was validated at construction
        unsafe { &*(self.base.add(self.descriptor_offset as usize) as *const RingDescriptor) }
    }

    /// Writer discipline this ring was built for
    pub fn kind(&self) -> RingKind {
        self.kind
    }

    /// Number of slots (power of two)
    pub fn slot_count(&self) -> u32 {
        self.slot_count
    }

    /// Bytes per slot, header included
    pub fn slot_size(&self) -> u32 {
        self.slot_size
    }

    /// Largest payload a slot can carry
    pub fn payload_capacity(&self) -> usize {
        self.slot_size as usize - SLOT_HEADER_SIZE
    }

    #[inline]
    fn mask(&self) -> u64 {
        self.slot_count as u64 - 1
    }

    /// Physical slot index holding sequence `seq`
    #[inline]
    pub fn index_of(&self, seq: Sequence) -> u32 {
        ((seq - 1) & self.mask()) as u32
    }

    /// Sequence number of the last reservation (acquire)
    #[inline]
    pub fn write_head(&self) -> Sequence {
        self.descriptor().write_head.load(Ordering::Acquire)
    }

    /// Reserve the next sequence number.
    ///
    /// The acquire-release increment hands every concurrent writer a unique,
    /// gapless sequence.
    #[inline]
    pub(crate) fn reserve(&self) -> Sequence {
        self.descriptor().write_head.fetch_add(1, Ordering::AcqRel) + 1
    }

    #[inline]
    fn slot_ptr(&self, idx: u32) -> *mut u8 {
        debug_assert!(idx < self.slot_count);
        // SAFETY: idx is masked into bounds and the slot array is inside the
        // mapping by construction
        unsafe {
            self.base
                .add(self.slots_base_offset as usize + idx as usize * self.slot_size as usize)
        }
    }

    /// Header of the slot at `idx`.
    ///
    /// The reference points into the mapped region, so it carries the
    /// region lifetime rather than the view borrow.
    #[inline]
    pub(crate) fn slot_header(&self, idx: u32) -> &'r SlotHeader {
        // SAFETY: every slot starts with a SlotHeader and the region mapping
        // outlives 'r
        unsafe { &*(self.slot_ptr(idx) as *const SlotHeader) }
    }

    /// First payload byte of the slot at `idx`
    #[inline]
    pub(crate) fn payload_ptr(&self, idx: u32) -> *mut u8 {
        // SAFETY: payload bytes follow the header within the same slot
        unsafe { self.slot_ptr(idx).add(SLOT_HEADER_SIZE) }
    }

    /// Committed sequence of the slot at `idx` (acquire); 0 if never written.
    ///
    /// Exposed so property tests can check slot/sequence congruence without
    /// reaching into the layout.
    pub fn slot_seq(&self, idx: u32) -> Sequence {
        self.slot_header(idx).seq.load(Ordering::Acquire)
    }

    /// Commit timestamp of the slot at `idx`, as a plain read.
    ///
    /// Callers decide how much staleness they tolerate; health probes gate
    /// this on the slot's sequence matching the head.
    pub(crate) fn slot_timestamp_ns(&self, idx: u32) -> u64 {
        let header = self.slot_ptr(idx) as *const SlotHeader;
        // SAFETY: the header lives inside the mapping
        unsafe { ptr::addr_of!((*header).timestamp_ns).read() }
    }

    /// Commit `payload` as sequence `commit_seq`.
    ///
    /// Payload and header fields are plain stores; the release fence plus
    /// the release store of `seq` publishes them atomically as far as any
    /// seqlock-disciplined reader is concerned. The caller must hold the
    /// reservation for `commit_seq` and, for multi-writer rings, have won
    /// the generation wait for its slot.
    pub(crate) fn commit(&self, commit_seq: Sequence, payload: &[u8], publisher_id: u16) {
        debug_assert!(payload.len() <= self.payload_capacity());
        let idx = self.index_of(commit_seq);
        let header = self.slot_ptr(idx) as *mut SlotHeader;

        // SAFETY: the reservation (plus the generation wait in MWMR) makes
        // this writer the only one touching this slot for this generation;
        // concurrent readers detect the overlap through the seq bracket
        unsafe {
            ptr::copy_nonoverlapping(payload.as_ptr(), self.payload_ptr(idx), payload.len());
            ptr::addr_of_mut!((*header).timestamp_ns).write(monotonic_nanos());
            ptr::addr_of_mut!((*header).payload_len).write(payload.len() as u32);
            ptr::addr_of_mut!((*header).publisher_id).write(publisher_id);

            fence(Ordering::Release);
            (*header).seq.store(commit_seq, Ordering::Release);
        }
    }
}
