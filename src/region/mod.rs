//! Named shared-memory regions.
//!
//! A region is created once by [`RegionBuilder`] and attached by any number
//! of publisher/subscriber processes via [`SharedRegion::open`]. The mapping
//! is `MAP_SHARED`; teardown is an explicit [`SharedRegion::unlink`] by the
//! owning process, and attached processes keep operating on their own
//! mappings until they drop them.

pub mod builder;

use std::ffi::CString;
use std::fs::File;
use std::io;
use std::mem::size_of;
use std::os::unix::io::{AsRawFd, FromRawFd};
use std::slice;

use tracing::debug;

use crate::constants::{LAYOUT_VERSION, REGION_MAGIC};
use crate::error::{Result, SurgeError};
use crate::health::HealthProbe;
use crate::layout::{RegionHeader, RingKind, TopicEntry};
use crate::ring::{MwmrPublisher, RingView, Subscriber, SwmrPublisher};

pub use builder::{RegionBuilder, TopicConfig};

/// A mapped surge region.
///
/// Holds the process-local mapping; all addressing into the region goes
/// through offsets from `base`, never stored pointers.
#[derive(Debug)]
pub struct SharedRegion {
    base: *mut u8,
    len: usize,
    /// Keeps the shm fd alive for the lifetime of the mapping
    _file: File,
}

// SAFETY: the mapping is shared memory by construction; every mutation goes
// through atomics or the seqlock discipline enforced by the ring paths.
unsafe impl Send for SharedRegion {}
unsafe impl Sync for SharedRegion {}

impl SharedRegion {
    /// Attach to an existing region by name.
    ///
    /// Validates magic and version before returning; any process may attach
    /// any number of times.
    pub fn open(name: &str) -> Result<Self> {
        let c_name = region_name(name)?;

        let fd = unsafe { libc::shm_open(c_name.as_ptr(), libc::O_RDWR, 0) };
        if fd < 0 {
            return Err(SurgeError::Io(io::Error::last_os_error()));
        }
        // SAFETY: fd is a freshly opened, owned descriptor
        let file = unsafe { File::from_raw_fd(fd) };
        let len = file.metadata().map_err(SurgeError::Io)?.len() as usize;

        if len < size_of::<RegionHeader>() {
            return Err(SurgeError::bad_region(format!(
                "object is {len} bytes, smaller than the region header"
            )));
        }

        let base = map_shared(&file, len)?;
        let region = Self { base, len, _file: file };

        let header = region.header();
        if header.magic != REGION_MAGIC {
            return Err(SurgeError::bad_region(format!(
                "bad magic {:#010x}, expected {:#010x}",
                header.magic, REGION_MAGIC
            )));
        }
        if header.version != LAYOUT_VERSION {
            return Err(SurgeError::bad_region(format!(
                "layout version {} not supported (expected {})",
                header.version, LAYOUT_VERSION
            )));
        }
        if header.region_size as usize > len {
            return Err(SurgeError::bad_region(format!(
                "header claims {} bytes but only {} are mapped",
                header.region_size, len
            )));
        }

        debug!(name, len, topics = header.topic_count, "attached region");
        Ok(region)
    }

    /// Remove the region name from the system.
    ///
    /// Existing mappings stay valid until their owners unmap. Unlinking a
    /// name that is already gone is not an error.
    pub fn unlink(name: &str) -> Result<()> {
        let c_name = region_name(name)?;
        let rc = unsafe { libc::shm_unlink(c_name.as_ptr()) };
        if rc != 0 {
            let err = io::Error::last_os_error();
            if err.raw_os_error() != Some(libc::ENOENT) {
                return Err(SurgeError::Io(err));
            }
        }
        debug!(name, "unlinked region");
        Ok(())
    }

    #[inline]
    pub(crate) fn base(&self) -> *mut u8 {
        self.base
    }

    /// Region header at offset 0
    #[inline]
    fn header(&self) -> &RegionHeader {
        // SAFETY: open()/create() guarantee the mapping covers the header
        unsafe { &*(self.base as *const RegionHeader) }
    }

    /// Total mapped bytes
    pub fn size(&self) -> u64 {
        self.header().region_size
    }

    /// Number of topics carved into the region
    pub fn topic_count(&self) -> u32 {
        self.header().topic_count
    }

    /// The topic table
    fn entries(&self) -> &[TopicEntry] {
        let header = self.header();
        let count = header.topic_count as usize;
        // SAFETY: the builder placed `count` entries at the recorded offset
        // inside the mapping, and TopicEntry is Pod
        let bytes = unsafe {
            slice::from_raw_parts(
                self.base.add(header.topic_table_offset as usize),
                count * size_of::<TopicEntry>(),
            )
        };
        bytemuck::cast_slice(bytes)
    }

    /// Names of every topic in table order
    pub fn topic_names(&self) -> impl Iterator<Item = &str> {
        self.entries()
            .iter()
            .filter_map(|entry| std::str::from_utf8(entry.name_bytes()).ok())
    }

    /// Look up a topic by exact name. `None` on miss.
    pub fn topic(&self, name: &str) -> Option<TopicHandle<'_>> {
        self.entries()
            .iter()
            .find(|entry| entry.name_matches(name))
            .map(|entry| TopicHandle { region: self, entry: *entry })
    }

    fn require_topic(&self, name: &str) -> Result<TopicHandle<'_>> {
        self.topic(name)
            .ok_or_else(|| SurgeError::UnknownTopic { name: name.to_string() })
    }

    /// Attach a single-writer publisher to `topic`
    pub fn swmr_publisher(&self, topic: &str, publisher_id: u16) -> Result<SwmrPublisher<'_>> {
        SwmrPublisher::attach(&self.require_topic(topic)?, publisher_id)
    }

    /// Attach a multi-writer publisher to `topic`
    pub fn mwmr_publisher(&self, topic: &str, publisher_id: u16) -> Result<MwmrPublisher<'_>> {
        MwmrPublisher::attach(&self.require_topic(topic)?, publisher_id)
    }

    /// Attach a subscriber to `topic`
    pub fn subscriber(&self, topic: &str) -> Result<Subscriber<'_>> {
        Ok(Subscriber::attach(&self.require_topic(topic)?))
    }
}

impl Drop for SharedRegion {
    fn drop(&mut self) {
        // SAFETY: base/len come from a successful mmap of exactly len bytes
        unsafe {
            libc::munmap(self.base as *mut _, self.len);
        }
    }
}

/// One topic of an attached region.
#[derive(Clone, Copy)]
pub struct TopicHandle<'r> {
    region: &'r SharedRegion,
    entry: TopicEntry,
}

impl<'r> TopicHandle<'r> {
    /// Topic name
    pub fn name(&self) -> &str {
        std::str::from_utf8(self.entry.name_bytes()).unwrap_or_default()
    }

    /// Writer discipline of this topic's ring
    pub fn kind(&self) -> RingKind {
        // The builder only writes the two known discriminants
        RingKind::from_raw(self.entry.ring_kind).unwrap_or(RingKind::SingleWriter)
    }

    /// Slot count actually built (requested count rounded up)
    pub fn slot_count(&self) -> u32 {
        self.entry.slot_count
    }

    /// Bytes per slot, header included
    pub fn slot_size(&self) -> u32 {
        self.entry.slot_size
    }

    /// Largest payload a single slot can carry
    pub fn payload_capacity(&self) -> usize {
        self.entry.slot_size as usize - crate::layout::SLOT_HEADER_SIZE
    }

    /// Raw view over this topic's ring
    pub fn ring(&self) -> RingView<'r> {
        RingView::from_region(
            self.region.base(),
            self.entry.ring_descriptor_offset,
            self.kind(),
        )
    }

    /// Read-only health probe over this topic
    pub fn health(&self) -> HealthProbe<'r> {
        HealthProbe::new(self.name().to_string(), self.ring())
    }
}

fn region_name(name: &str) -> Result<CString> {
    if name.is_empty() {
        return Err(SurgeError::invalid_args("region name is empty"));
    }
    CString::new(name).map_err(|_| SurgeError::invalid_args("region name contains NUL"))
}

fn map_shared(file: &File, len: usize) -> Result<*mut u8> {
    // SAFETY: len matches the object size; MAP_SHARED makes the mapping
    // visible to every attached process
    let ptr = unsafe {
        libc::mmap(
            std::ptr::null_mut(),
            len,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_SHARED,
            file.as_raw_fd(),
            0,
        )
    };
    if ptr == libc::MAP_FAILED {
        return Err(SurgeError::MapFailed(io::Error::last_os_error()));
    }
    Ok(ptr as *mut u8)
}
