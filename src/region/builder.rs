//! One-shot region construction.
//!
//! The builder computes the full layout up front, creates the named object
//! exclusively, installs the header, topic table, and ring descriptors, and
//! zeroes every slot. A failure at any stage unlinks the name so no process
//! can attach to a half-initialized region.

use std::ffi::CString;
use std::fs::File;
use std::io;
use std::mem::size_of;
use std::os::unix::io::FromRawFd;
use std::ptr;

use tracing::{debug, warn};

use crate::constants::{CACHE_LINE_SIZE, LAYOUT_VERSION, MIN_REGION_SIZE, REGION_MAGIC};
use crate::error::{Result, SurgeError};
use crate::layout::{
    align_up, slot_size_for, RegionHeader, RingDescriptor, RingKind, SlotHeader, TopicEntry,
};
use crate::region::SharedRegion;

/// Configuration of one topic to carve into the region.
#[derive(Debug, Clone)]
pub struct TopicConfig {
    /// Unique name, 1..=63 bytes, no NUL
    pub name: String,
    /// Requested slot count; the builder rounds it up to a power of two
    pub slot_count: u32,
    /// Largest payload a slot must carry
    pub payload_max: u32,
    /// Writer discipline of the ring
    pub kind: RingKind,
}

impl TopicConfig {
    pub fn new(name: impl Into<String>, slot_count: u32, payload_max: u32, kind: RingKind) -> Self {
        Self { name: name.into(), slot_count, payload_max, kind }
    }
}

/// Computed placement of one topic inside the region.
struct TopicLayout {
    name: [u8; crate::constants::MAX_TOPIC_NAME],
    descriptor_offset: u64,
    slots_offset: u64,
    slot_count: u32,
    slot_size: u32,
    kind: RingKind,
}

/// Builds a fresh region containing one ring per topic.
pub struct RegionBuilder {
    name: String,
    size: usize,
    topics: Vec<TopicConfig>,
}

impl RegionBuilder {
    pub fn new(name: impl Into<String>, size: usize) -> Self {
        Self { name: name.into(), size, topics: Vec::new() }
    }

    /// Add a topic. Topics are laid out in the order they are added.
    pub fn topic(mut self, config: TopicConfig) -> Self {
        self.topics.push(config);
        self
    }

    /// Create, size, map, and initialize the region.
    pub fn create(self) -> Result<SharedRegion> {
        self.validate()?;
        let layouts = self.compute_layouts()?;

        let c_name = CString::new(self.name.as_str())
            .map_err(|_| SurgeError::invalid_args("region name contains NUL"))?;

        // A previous region of the same name is replaced wholesale.
        unsafe {
            libc::shm_unlink(c_name.as_ptr());
        }

        let fd = unsafe {
            libc::shm_open(
                c_name.as_ptr(),
                libc::O_CREAT | libc::O_EXCL | libc::O_RDWR,
                0o600,
            )
        };
        if fd < 0 {
            let err = io::Error::last_os_error();
            warn!(name = %self.name, %err, "region create failed");
            return Err(SurgeError::CreateFailed(err));
        }
        // SAFETY: fd is a freshly created, owned descriptor
        let file = unsafe { File::from_raw_fd(fd) };

        if unsafe { libc::ftruncate(fd, self.size as libc::off_t) } != 0 {
            let err = io::Error::last_os_error();
            unsafe {
                libc::shm_unlink(c_name.as_ptr());
            }
            return Err(SurgeError::ResizeFailed(err));
        }

        let base = match super::map_shared(&file, self.size) {
            Ok(base) => base,
            Err(err) => {
                unsafe {
                    libc::shm_unlink(c_name.as_ptr());
                }
                return Err(err);
            }
        };

        // SAFETY: the mapping spans self.size bytes and no other process can
        // attach before the header lands (the name was created O_EXCL and any
        // early attach is rejected on the zero magic)
        unsafe {
            ptr::write_bytes(base, 0, self.size);
            self.install(base, &layouts);
        }

        debug!(
            name = %self.name,
            size = self.size,
            topics = layouts.len(),
            "region created"
        );
        Ok(SharedRegion { base, len: self.size, _file: file })
    }

    fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(SurgeError::invalid_args("region name is empty"));
        }
        if self.size < MIN_REGION_SIZE {
            return Err(SurgeError::invalid_args(format!(
                "region size {} below minimum {}",
                self.size, MIN_REGION_SIZE
            )));
        }
        if self.topics.is_empty() {
            return Err(SurgeError::invalid_args("region needs at least one topic"));
        }
        for (i, config) in self.topics.iter().enumerate() {
            if TopicEntry::encode_name(&config.name).is_none() {
                return Err(SurgeError::invalid_args(format!(
                    "topic name {:?} is empty, too long, or contains NUL",
                    config.name
                )));
            }
            if config.slot_count == 0 {
                return Err(SurgeError::invalid_args(format!(
                    "topic {:?} requests zero slots",
                    config.name
                )));
            }
            if self.topics[..i].iter().any(|prior| prior.name == config.name) {
                return Err(SurgeError::invalid_args(format!(
                    "duplicate topic name {:?}",
                    config.name
                )));
            }
        }
        Ok(())
    }

    /// Pure layout arithmetic; fails with `OutOfRegion` before any OS call.
    fn compute_layouts(&self) -> Result<Vec<TopicLayout>> {
        let table_offset = size_of::<RegionHeader>();
        let table_end = table_offset + self.topics.len() * size_of::<TopicEntry>();
        let mut cursor = align_up(table_end, CACHE_LINE_SIZE);

        let mut layouts = Vec::with_capacity(self.topics.len());
        for config in &self.topics {
            let name = TopicEntry::encode_name(&config.name).ok_or_else(|| {
                SurgeError::invalid_args(format!("topic name {:?} does not encode", config.name))
            })?;
            let slot_count = config.slot_count.next_power_of_two();
            let slot_size = slot_size_for(config.payload_max);

            let descriptor_offset = cursor;
            cursor = align_up(cursor + size_of::<RingDescriptor>(), CACHE_LINE_SIZE);
            let slots_offset = cursor;
            cursor += slot_count as usize * slot_size as usize;
            cursor = align_up(cursor, CACHE_LINE_SIZE);

            layouts.push(TopicLayout {
                name,
                descriptor_offset: descriptor_offset as u64,
                slots_offset: slots_offset as u64,
                slot_count,
                slot_size,
                kind: config.kind,
            });
        }

        if cursor > self.size {
            return Err(SurgeError::OutOfRegion {
                needed: cursor as u64,
                available: self.size as u64,
            });
        }
        Ok(layouts)
    }

    /// Write header, table, descriptors, and slot headers into zeroed memory.
    ///
    /// # Safety
    /// `base` must map at least `self.size` writable bytes laid out by
    /// `compute_layouts` on the same topic list.
    unsafe fn install(&self, base: *mut u8, layouts: &[TopicLayout]) {
        let table_offset = size_of::<RegionHeader>();

        let header = base as *mut RegionHeader;
        header.write(RegionHeader {
            magic: REGION_MAGIC,
            version: LAYOUT_VERSION,
            region_size: self.size as u64,
            topic_table_offset: table_offset as u64,
            topic_count: layouts.len() as u32,
            _pad: [0; 36],
        });

        for (i, layout) in layouts.iter().enumerate() {
            let entry = (base.add(table_offset) as *mut TopicEntry).add(i);
            entry.write(TopicEntry {
                name: layout.name,
                ring_descriptor_offset: layout.descriptor_offset,
                slot_count: layout.slot_count,
                slot_size: layout.slot_size,
                ring_kind: layout.kind as u32,
                _pad: [0; 12],
            });

            let descriptor = base.add(layout.descriptor_offset as usize) as *mut RingDescriptor;
            descriptor.write(RingDescriptor {
                slot_count: layout.slot_count,
                slot_size: layout.slot_size,
                slots_base_offset: layout.slots_offset,
                write_head: std::sync::atomic::AtomicU64::new(0),
                _pad: [0; 40],
            });

            // seq == 0 marks a slot as never written
            for slot in 0..layout.slot_count {
                let offset = layout.slots_offset as usize + slot as usize * layout.slot_size as usize;
                let slot_header = base.add(offset) as *mut SlotHeader;
                (*slot_header)
                    .seq
                    .store(0, std::sync::atomic::Ordering::Relaxed);
            }
        }
    }
}
