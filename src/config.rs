use std::sync::atomic::{AtomicUsize, Ordering};

/// Default on-disk/in-memory page size, in bytes.
pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// Default number of page frames a `BufferPool` holds before it must evict.
pub const DEFAULT_BUFFER_POOL_PAGES: usize = 50;

/// Bounds of the randomized per-acquisition lock timeout window.
pub const LOCK_TIMEOUT_MIN_MS: u64 = 1000;
pub const LOCK_TIMEOUT_MAX_MS: u64 = 3000;

/// Interval between polling attempts while waiting on a contended lock.
pub const LOCK_POLL_INTERVAL_MS: u64 = 10;

static PAGE_SIZE: AtomicUsize = AtomicUsize::new(DEFAULT_PAGE_SIZE);

pub fn page_size() -> usize {
    PAGE_SIZE.load(Ordering::Relaxed)
}

pub fn set_page_size(size: usize) {
    PAGE_SIZE.store(size, Ordering::Relaxed);
}
