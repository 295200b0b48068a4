//! Arena sources
//!
//! An arena source supplies the raw backing storage of every bucket. A bucket
//! asks its source exactly twice, once for the block arena and once for the
//! occupancy bitmap, and hands both regions back when it is dropped.
//!
//! # Safety
//!
//! All raw-address handling of the crate lives in [`RawRegion`]:
//! - A region owns `layout.size()` bytes reserved from a source
//! - Byte views are only created over regions the owner has initialized
//! - Fills and pointer derivation are bounds-checked against the region
//!
//! ## Invariants
//!
//! - A region is released exactly once, to the source it came from
//! - The layout passed to `release` is the layout used for `reserve`

mod system;
mod tracked;

use core::alloc::Layout;
use core::ptr::NonNull;
use std::sync::{Arc, LazyLock};

pub use system::SystemSource;
pub use tracked::{SourceStats, TrackedSource};

use crate::error::{AllocError, AllocResult};

/// Capability that reserves and releases raw storage for buckets
///
/// Mirrors a general-purpose `allocate(size) / deallocate(ptr, size)` pair;
/// regions are addressed purely by pointer and layout.
pub trait ArenaSource: Send + Sync {
    /// Reserves `layout.size()` bytes aligned to `layout.align()`
    ///
    /// The returned memory is uninitialized.
    fn reserve(&self, layout: Layout) -> AllocResult<NonNull<u8>>;

    /// Releases a region obtained from [`reserve`](Self::reserve)
    ///
    /// # Safety
    /// - `ptr` must have been returned by `reserve` on this source
    /// - `layout` must be the layout passed to that `reserve` call
    /// - The region must not be used after this call
    unsafe fn release(&self, ptr: NonNull<u8>, layout: Layout);

    /// Human readable name used in logs
    fn name(&self) -> &'static str {
        "arena-source"
    }
}

/// Shared handle to an arena source
pub type SourceRef = Arc<dyn ArenaSource>;

static DEFAULT_SOURCE: LazyLock<SourceRef> = LazyLock::new(|| Arc::new(SystemSource::new()));

/// Returns the process-wide default arena source (the system allocator)
pub fn default_source() -> SourceRef {
    Arc::clone(&DEFAULT_SOURCE)
}

/// Region of raw memory owned until drop and returned to its source
pub(crate) struct RawRegion {
    ptr: NonNull<u8>,
    layout: Layout,
    source: SourceRef,
}

// SAFETY: RawRegion exclusively owns its memory region.
// - No aliasing handles to the region exist outside the owner
// - The source handle is Send + Sync by the ArenaSource bound
unsafe impl Send for RawRegion {}

// SAFETY: Shared access only reads the region (`as_bytes`, address queries).
// - Every write requires `&mut self`
unsafe impl Sync for RawRegion {}

impl RawRegion {
    /// Reserves an uninitialized region
    pub(crate) fn reserve(source: &SourceRef, layout: Layout) -> AllocResult<Self> {
        let ptr = source.reserve(layout)?;
        Ok(Self {
            ptr,
            layout,
            source: Arc::clone(source),
        })
    }

    /// Reserves a region and fills it with zero bytes
    pub(crate) fn reserve_zeroed(source: &SourceRef, layout: Layout) -> AllocResult<Self> {
        let mut region = Self::reserve(source, layout)?;
        region.fill(0, layout.size(), 0)?;
        Ok(region)
    }

    pub(crate) fn source(&self) -> &SourceRef {
        &self.source
    }

    pub(crate) fn len(&self) -> usize {
        self.layout.size()
    }

    pub(crate) fn align(&self) -> usize {
        self.layout.align()
    }

    pub(crate) fn start_addr(&self) -> usize {
        self.ptr.as_ptr() as usize
    }

    /// Returns `true` if `addr` lies in `[start, start + len)`
    pub(crate) fn contains_addr(&self, addr: usize) -> bool {
        addr.checked_sub(self.start_addr())
            .is_some_and(|offset| offset < self.len())
    }

    /// Pointer to the byte at `offset`, if it lies inside the region
    pub(crate) fn ptr_at(&self, offset: usize) -> Option<NonNull<u8>> {
        if offset >= self.len() {
            return None;
        }
        // SAFETY: offset < len, so the result stays inside the reserved
        // region and cannot wrap to null.
        Some(unsafe { self.ptr.add(offset) })
    }

    /// Writes `byte` over `len` bytes starting at `offset`
    pub(crate) fn fill(&mut self, offset: usize, len: usize, byte: u8) -> AllocResult<()> {
        let end = offset
            .checked_add(len)
            .ok_or_else(|| AllocError::size_overflow("region fill"))?;
        if end > self.len() {
            return Err(AllocError::invalid_layout("fill exceeds region bounds"));
        }
        if len == 0 {
            return Ok(());
        }
        // SAFETY: [offset, offset + len) lies inside the reserved region
        // (checked above) and `&mut self` guarantees exclusive access.
        unsafe { self.ptr.add(offset).write_bytes(byte, len) };
        Ok(())
    }

    /// Byte view of the region
    ///
    /// # Safety
    /// Every byte of the region must have been initialized.
    pub(crate) unsafe fn as_bytes(&self) -> &[u8] {
        // SAFETY: ptr is valid for len bytes and the caller guarantees
        // initialization; the borrow of self prevents concurrent writes.
        unsafe { core::slice::from_raw_parts(self.ptr.as_ptr(), self.len()) }
    }

    /// Mutable byte view of the region
    ///
    /// # Safety
    /// Every byte of the region must have been initialized.
    pub(crate) unsafe fn as_bytes_mut(&mut self) -> &mut [u8] {
        // SAFETY: as for `as_bytes`, with exclusivity from `&mut self`.
        unsafe { core::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len()) }
    }
}

impl Drop for RawRegion {
    fn drop(&mut self) {
        // SAFETY: ptr and layout are exactly what `reserve` returned and
        // received; the region is released once, here.
        unsafe { self.source.release(self.ptr, self.layout) };
    }
}

impl core::fmt::Debug for RawRegion {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RawRegion")
            .field("start", &format_args!("{:#x}", self.start_addr()))
            .field("len", &self.len())
            .field("align", &self.align())
            .field("source", &self.source.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(size: usize, align: usize) -> Layout {
        Layout::from_size_align(size, align).unwrap()
    }

    #[test]
    fn default_source_is_shared() {
        let a = default_source();
        let b = default_source();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.name(), "system");
    }

    #[test]
    fn zeroed_region_reads_zero() {
        let region = RawRegion::reserve_zeroed(&default_source(), layout(37, 1)).unwrap();
        // SAFETY: reserve_zeroed initialized every byte.
        let bytes = unsafe { region.as_bytes() };
        assert_eq!(bytes.len(), 37);
        assert!(bytes.iter().all(|&b| b == 0));
    }

    #[test]
    fn contains_is_half_open() {
        let region = RawRegion::reserve(&default_source(), layout(64, 16)).unwrap();
        let start = region.start_addr();
        assert_eq!(start % 16, 0);
        assert!(region.contains_addr(start));
        assert!(region.contains_addr(start + 63));
        assert!(!region.contains_addr(start + 64));
        assert!(!region.contains_addr(start.wrapping_sub(1)));
    }

    #[test]
    fn fill_is_bounds_checked() {
        let mut region = RawRegion::reserve_zeroed(&default_source(), layout(16, 8)).unwrap();
        region.fill(4, 8, 0xAB).unwrap();
        assert!(region.fill(10, 8, 0xAB).is_err());
        assert!(region.fill(usize::MAX, 2, 0).is_err());

        // SAFETY: zero-filled at reservation, then partially refilled.
        let bytes = unsafe { region.as_bytes() };
        assert_eq!(&bytes[..4], &[0; 4]);
        assert_eq!(&bytes[4..12], &[0xAB; 8]);
        assert_eq!(&bytes[12..], &[0; 4]);
    }

    #[test]
    fn ptr_at_rejects_out_of_range() {
        let region = RawRegion::reserve(&default_source(), layout(8, 8)).unwrap();
        assert!(region.ptr_at(7).is_some());
        assert!(region.ptr_at(8).is_none());
    }
}
