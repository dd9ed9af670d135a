//! Monotonic time for commit timestamps.
//!
//! Slot timestamps are compared across attached processes, so they come from
//! `CLOCK_MONOTONIC` rather than a per-process `Instant` epoch.

/// Current `CLOCK_MONOTONIC` reading in nanoseconds.
pub fn monotonic_nanos() -> u64 {
    let mut ts = libc::timespec { tv_sec: 0, tv_nsec: 0 };
    // SAFETY: CLOCK_MONOTONIC with a valid timespec pointer cannot fail
    unsafe {
        libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts);
    }
    (ts.tv_sec as u64) * 1_000_000_000 + (ts.tv_nsec as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_time_advances() {
        let t1 = monotonic_nanos();
        std::thread::sleep(std::time::Duration::from_millis(1));
        let t2 = monotonic_nanos();
        assert!(t2 > t1);
    }
}
