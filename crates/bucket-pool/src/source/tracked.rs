//! Tracked arena source
//!
//! Wraps another source and counts the regions and bytes it hands out,
//! optionally refusing reservations beyond a byte limit.

use core::alloc::Layout;
use core::ptr::NonNull;
use core::sync::atomic::{AtomicUsize, Ordering};

use super::ArenaSource;
use crate::error::{AllocError, AllocResult};

/// Snapshot of a [`TrackedSource`]'s counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceStats {
    /// Regions currently reserved and not yet released
    pub live_regions: usize,
    /// Bytes currently reserved
    pub live_bytes: usize,
    /// Highest value `live_bytes` reached
    pub peak_bytes: usize,
    /// Successful reservations since creation
    pub total_reservations: usize,
    /// Reservations refused because of the byte limit or the inner source
    pub failed_reservations: usize,
}

/// A wrapper source that tracks reservation statistics
#[derive(Debug)]
pub struct TrackedSource<S> {
    inner: S,
    limit: Option<usize>,
    live_regions: AtomicUsize,
    live_bytes: AtomicUsize,
    peak_bytes: AtomicUsize,
    total_reservations: AtomicUsize,
    failed_reservations: AtomicUsize,
}

impl<S> TrackedSource<S> {
    /// Creates a tracked source without a limit
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            limit: None,
            live_regions: AtomicUsize::new(0),
            live_bytes: AtomicUsize::new(0),
            peak_bytes: AtomicUsize::new(0),
            total_reservations: AtomicUsize::new(0),
            failed_reservations: AtomicUsize::new(0),
        }
    }

    /// Creates a tracked source that refuses to hold more than `limit` bytes
    pub fn with_limit(inner: S, limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::new(inner)
        }
    }

    /// Gets a reference to the underlying source
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Current counters
    pub fn stats(&self) -> SourceStats {
        SourceStats {
            live_regions: self.live_regions.load(Ordering::Relaxed),
            live_bytes: self.live_bytes.load(Ordering::Relaxed),
            peak_bytes: self.peak_bytes.load(Ordering::Relaxed),
            total_reservations: self.total_reservations.load(Ordering::Relaxed),
            failed_reservations: self.failed_reservations.load(Ordering::Relaxed),
        }
    }

    /// Claims `size` bytes against the limit; returns the new live total
    fn claim(&self, size: usize) -> Option<usize> {
        let mut current = self.live_bytes.load(Ordering::Relaxed);
        loop {
            let next = current.checked_add(size)?;
            if self.limit.is_some_and(|limit| next > limit) {
                return None;
            }
            match self.live_bytes.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Some(next),
                Err(actual) => current = actual,
            }
        }
    }
}

impl<S: ArenaSource> ArenaSource for TrackedSource<S> {
    fn reserve(&self, layout: Layout) -> AllocResult<NonNull<u8>> {
        let Some(live) = self.claim(layout.size()) else {
            self.failed_reservations.fetch_add(1, Ordering::Relaxed);
            return Err(AllocError::allocation_failed_with_layout(layout));
        };

        match self.inner.reserve(layout) {
            Ok(ptr) => {
                self.live_regions.fetch_add(1, Ordering::Relaxed);
                self.total_reservations.fetch_add(1, Ordering::Relaxed);
                self.peak_bytes.fetch_max(live, Ordering::Relaxed);
                Ok(ptr)
            }
            Err(err) => {
                self.live_bytes.fetch_sub(layout.size(), Ordering::Relaxed);
                self.failed_reservations.fetch_add(1, Ordering::Relaxed);
                Err(err)
            }
        }
    }

    unsafe fn release(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: forwarded unchanged; the caller upholds the contract for
        // the inner source, which produced ptr.
        unsafe { self.inner.release(ptr, layout) };
        self.live_regions.fetch_sub(1, Ordering::Relaxed);
        self.live_bytes.fetch_sub(layout.size(), Ordering::Relaxed);
    }

    fn name(&self) -> &'static str {
        "tracked"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SystemSource;

    #[test]
    fn counts_live_regions() {
        let source = TrackedSource::new(SystemSource::new());
        let layout = Layout::from_size_align(128, 8).unwrap();

        let a = source.reserve(layout).unwrap();
        let b = source.reserve(layout).unwrap();
        assert_eq!(source.stats().live_regions, 2);
        assert_eq!(source.stats().live_bytes, 256);

        // SAFETY: both regions were reserved above with `layout`.
        unsafe {
            source.release(a, layout);
            source.release(b, layout);
        }
        let stats = source.stats();
        assert_eq!(stats.live_regions, 0);
        assert_eq!(stats.live_bytes, 0);
        assert_eq!(stats.peak_bytes, 256);
        assert_eq!(stats.total_reservations, 2);
    }

    #[test]
    fn limit_refuses_reservation() {
        let source = TrackedSource::with_limit(SystemSource::new(), 100);
        let small = Layout::from_size_align(64, 8).unwrap();

        let ptr = source.reserve(small).unwrap();
        let err = source.reserve(small).unwrap_err();
        assert_eq!(err.code(), "MEM:ALLOC:FAILED");
        assert_eq!(source.stats().failed_reservations, 1);
        assert_eq!(source.stats().live_bytes, 64);

        // SAFETY: reserved above with `small`.
        unsafe { source.release(ptr, small) };
    }
}
