//! Surge layout and protocol constants.
//!
//! Core constants shared by the region builder and the ring paths.

/// Identifies a valid surge region ("SRGE" in ASCII).
pub const REGION_MAGIC: u32 = 0x5352_4745;

/// Current region layout version. Attach rejects a mismatch.
pub const LAYOUT_VERSION: u32 = 1;

/// Cache line size for alignment (64 bytes on most CPUs)
pub const CACHE_LINE_SIZE: usize = 64;

/// Topic name field width, including the NUL terminator (names are <= 63 bytes)
pub const MAX_TOPIC_NAME: usize = 64;

/// Smallest region the builder accepts
pub const MIN_REGION_SIZE: usize = 4096;

/// Iteration cap for the multi-writer commit wait before giving up with `Timeout`
pub const COMMIT_SPIN_LIMIT: u32 = 1 << 20;

/// Commit-wait iterations spent on `spin_loop` hints before degrading to yields
pub const COMMIT_SPIN_BEFORE_YIELD: u32 = 1024;
