//! Typed front-end over a shared bucket pool
//!
//! [`PoolAllocator`] turns a request for `n` elements of `T` into a byte
//! demand, ranks the pool's buckets by waste, and takes the first bucket
//! that yields a run. There is no fallback to the global heap.

use core::alloc::Layout;
use core::fmt;
use core::marker::PhantomData;
use core::ptr::NonNull;

#[cfg(feature = "logging")]
use tracing::trace;

use super::selection::{self, Candidate};
use super::traits::{Allocator, dangling, validate_layout};
use crate::config::PoolConfig;
use crate::error::{AllocError, AllocResult};
use crate::pool::{BucketStats, Pool, PoolStats, SharedPool};
use crate::profile::{DefaultProfile, PoolProfile};
use crate::source::{SourceRef, default_source};

/// Best-fit allocator for `T` backed by the pool of profile `P`
///
/// Clones and [`rebind`](Self::rebind)s share one physical pool; the pool
/// is dropped with the last of them.
///
/// # Examples
/// ```
/// use nebula_bucket_pool::PoolAllocator;
///
/// let alloc = PoolAllocator::<u64>::new()?;
/// let ptr = alloc.allocate(3)?;
/// // SAFETY: ptr came from `alloc.allocate(3)` and is not used afterwards.
/// unsafe { alloc.deallocate(ptr, 3) };
/// # Ok::<(), nebula_bucket_pool::MemoryError>(())
/// ```
pub struct PoolAllocator<T, P: PoolProfile = DefaultProfile> {
    pool: SharedPool,
    _marker: PhantomData<fn() -> (T, P)>,
}

impl<T, P: PoolProfile> PoolAllocator<T, P> {
    /// Creates an allocator with a fresh pool on the default arena source
    pub fn new() -> AllocResult<Self> {
        Self::with_source(default_source())
    }

    /// Creates an allocator with a fresh pool on `source`
    pub fn with_source(source: SourceRef) -> AllocResult<Self> {
        Self::with_config(PoolConfig::default(), source)
    }

    /// Creates an allocator with a fresh pool and explicit configuration
    pub fn with_config(config: PoolConfig, source: SourceRef) -> AllocResult<Self> {
        let pool = Pool::for_profile::<P>(source, &config)?;
        Ok(Self::from_shared(SharedPool::new(pool)))
    }

    fn from_shared(pool: SharedPool) -> Self {
        Self {
            pool,
            _marker: PhantomData,
        }
    }

    /// Allocator for another element type over the same pool
    pub fn rebind<U>(&self) -> PoolAllocator<U, P> {
        PoolAllocator::from_shared(self.pool.clone())
    }

    /// Returns `true` if both allocators draw from the same pool
    pub fn equals<U>(&self, other: &PoolAllocator<U, P>) -> bool {
        self.pool.ptr_eq(&other.pool)
    }

    /// Handle to the underlying pool
    pub fn shared_pool(&self) -> &SharedPool {
        &self.pool
    }

    /// Pool counters, if `track_stats` is enabled
    pub fn stats(&self) -> Option<PoolStats> {
        self.pool.lock().stats()
    }

    pub fn bucket_stats(&self) -> Vec<BucketStats> {
        self.pool.lock().bucket_stats()
    }

    /// Allocates storage for `n` values of `T`
    ///
    /// A zero-byte request returns a dangling, well-aligned pointer without
    /// touching the pool.
    ///
    /// # Errors
    /// - `SizeOverflow` if `n * size_of::<T>()` overflows
    /// - `InvalidAlignment` if no bucket is aligned for `T`
    /// - `Fragmented` if free blocks exist but no run is long enough
    /// - `PoolExhausted` otherwise
    pub fn allocate(&self, n: usize) -> AllocResult<NonNull<T>> {
        let layout = Self::array_layout(n)?;
        if layout.size() == 0 {
            return Ok(NonNull::dangling());
        }
        self.allocate_bytes(layout.size(), layout.align())
            .map(NonNull::cast)
    }

    /// Returns storage for `n` values of `T` to the pool
    ///
    /// A pointer the pool does not own is logged and ignored.
    ///
    /// # Safety
    /// - `ptr` must come from `allocate(n)` on an allocator sharing this pool
    /// - `ptr` must not be used after this call
    pub unsafe fn deallocate(&self, ptr: NonNull<T>, n: usize) {
        // SAFETY: forwarded from the caller; failures are already logged.
        let _ = unsafe { self.try_deallocate(ptr, n) };
    }

    /// Like [`deallocate`](Self::deallocate), but reports misuse
    ///
    /// # Errors
    /// - `ForeignPointer` if no bucket owns `ptr`
    /// - `InvalidState` if `ptr` is not the start of a live run of that size
    ///
    /// # Safety
    /// `ptr` must not be used after a successful call.
    pub unsafe fn try_deallocate(&self, ptr: NonNull<T>, n: usize) -> AllocResult<()> {
        let layout = Self::array_layout(n)?;
        if layout.size() == 0 {
            return Ok(());
        }
        // SAFETY: forwarded from the caller.
        unsafe { self.release_bytes(ptr.cast(), layout.size()) }
    }

    /// Allocates `size` bytes aligned to `align`
    pub fn allocate_bytes(&self, size: usize, align: usize) -> AllocResult<NonNull<u8>> {
        if size == 0 {
            return dangling(align);
        }
        if !align.is_power_of_two() {
            return Err(AllocError::invalid_alignment(align));
        }
        if size > isize::MAX as usize - (align - 1) {
            return Err(AllocError::size_overflow("pool request size"));
        }

        let mut pool = self.pool.lock();
        let candidates = selection::rank(pool.buckets(), size, align);

        for candidate in &candidates {
            let bucket = &mut pool.buckets_mut()[candidate.index];
            let reserved = candidate.reserved(bucket.block_size());
            if let Some(ptr) = bucket.allocate(size) {
                pool.record_alloc(reserved);

                #[cfg(feature = "logging")]
                trace!(
                    pool = pool.name(),
                    bucket = candidate.index,
                    size,
                    waste = candidate.waste,
                    "Pool allocation"
                );

                return Ok(ptr);
            }
        }

        pool.record_failure();
        Err(Self::failure(&pool, &candidates, size, align))
    }

    /// Returns `size` bytes at `ptr` to the pool
    ///
    /// # Safety
    /// `ptr` must not be used after a successful call.
    pub unsafe fn release_bytes(&self, ptr: NonNull<u8>, size: usize) -> AllocResult<()> {
        if size == 0 {
            return Ok(());
        }
        // SAFETY: forwarded from the caller.
        unsafe { self.pool.lock().release(ptr, size) }
    }

    fn array_layout(n: usize) -> AllocResult<Layout> {
        Layout::array::<T>(n).map_err(|_| AllocError::size_overflow("element array layout"))
    }

    /// Classifies a request that every candidate refused
    fn failure(pool: &Pool, candidates: &[Candidate], size: usize, align: usize) -> AllocError {
        if !pool.buckets().iter().any(|bucket| bucket.block_align() >= align) {
            return AllocError::invalid_alignment(align);
        }

        // Only the reported bucket pays for a bitmap scan.
        let fragmented = candidates
            .iter()
            .map(|c| (c, &pool.buckets()[c.index]))
            .filter(|(c, bucket)| c.blocks <= bucket.free_blocks())
            .max_by_key(|(_, bucket)| bucket.free_blocks() * bucket.block_size())
            .map(|(_, bucket)| bucket.stats());

        match fragmented {
            Some(stats) => AllocError::fragmented(
                pool.name(),
                stats.free_bytes(),
                stats.largest_free_bytes(),
                size,
            ),
            None => AllocError::pool_exhausted(pool.name(), size),
        }
    }
}

impl<T, P: PoolProfile> Clone for PoolAllocator<T, P> {
    fn clone(&self) -> Self {
        Self::from_shared(self.pool.clone())
    }
}

impl<T, U, P: PoolProfile> PartialEq<PoolAllocator<U, P>> for PoolAllocator<T, P> {
    fn eq(&self, other: &PoolAllocator<U, P>) -> bool {
        self.equals(other)
    }
}

impl<T, P: PoolProfile> Eq for PoolAllocator<T, P> {}

impl<T, P: PoolProfile> fmt::Debug for PoolAllocator<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolAllocator")
            .field("element", &core::any::type_name::<T>())
            .field("profile", &P::NAME)
            .field("pool", &self.pool)
            .finish()
    }
}

// SAFETY: runs handed out by a bucket are block-aligned to at least the
// requested alignment (only aligned buckets qualify) and stay reserved in
// the bitmap until deallocated.
unsafe impl<T, P: PoolProfile> Allocator for PoolAllocator<T, P> {
    unsafe fn allocate(&self, layout: Layout) -> AllocResult<NonNull<[u8]>> {
        validate_layout(layout)?;
        let ptr = self.allocate_bytes(layout.size(), layout.align())?;
        Ok(NonNull::slice_from_raw_parts(ptr, layout.size()))
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: caller contract of `Allocator::deallocate`.
        let _ = unsafe { self.release_bytes(ptr, layout.size()) };
    }
}

#[cfg(feature = "nightly")]
// SAFETY: clones share one pool, so memory from any clone may be returned
// through any other; see the `Allocator` impl above for the storage rules.
unsafe impl<T, P: PoolProfile> core::alloc::Allocator for PoolAllocator<T, P> {
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, core::alloc::AllocError> {
        self.allocate_bytes(layout.size(), layout.align())
            .map(|ptr| NonNull::slice_from_raw_parts(ptr, layout.size()))
            .map_err(|_| core::alloc::AllocError)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: caller contract of `core::alloc::Allocator::deallocate`.
        let _ = unsafe { self.release_bytes(ptr, layout.size()) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool_profile;

    pool_profile! {
        struct Tiny { (8, 4), (32, 2) }
    }

    type TinyAlloc<T> = PoolAllocator<T, Tiny>;

    fn tiny<T>() -> TinyAlloc<T> {
        TinyAlloc::with_config(PoolConfig::monitored(), default_source()).unwrap()
    }

    #[test]
    fn routes_to_lowest_waste_bucket() {
        let alloc = tiny::<u8>();
        let small = alloc.allocate(8).unwrap();
        let large = alloc.allocate(32).unwrap();

        let pool = alloc.shared_pool().lock();
        assert_eq!(pool.owner_of(small.as_ptr()), Some(0));
        assert_eq!(pool.owner_of(large.as_ptr()), Some(1));
    }

    #[test]
    fn falls_back_to_next_bucket_when_full() {
        let alloc = tiny::<u64>();
        let ptrs: Vec<_> = (0..4).map(|_| alloc.allocate(1).unwrap()).collect();
        let overflow = alloc.allocate(1).unwrap();
        assert_eq!(alloc.shared_pool().lock().owner_of(overflow.as_ptr().cast::<u8>()), Some(1));

        for ptr in ptrs {
            // SAFETY: allocated above, never dereferenced.
            unsafe { alloc.deallocate(ptr, 1) };
        }
        // SAFETY: as above.
        unsafe { alloc.deallocate(overflow, 1) };
        assert_eq!(alloc.stats().unwrap().current_usage, 0);
    }

    #[test]
    fn exhaustion_is_reported() {
        let alloc = tiny::<u8>();
        let _a = alloc.allocate(64).unwrap();
        let _b = alloc.allocate(32).unwrap();
        let err = alloc.allocate(64).unwrap_err();
        assert_eq!(err.code(), "MEM:POOL:EXHAUSTED");
        assert!(err.is_retryable());
        assert_eq!(alloc.stats().unwrap().failed_allocs, 1);
    }

    #[test]
    fn fragmentation_is_reported() {
        let alloc = tiny::<u8>();
        let blocks: Vec<_> = (0..4).map(|_| alloc.allocate(8).unwrap()).collect();
        let _big = alloc.allocate(64).unwrap();
        // SAFETY: allocated above, never dereferenced.
        unsafe {
            alloc.deallocate(blocks[0], 8);
            alloc.deallocate(blocks[2], 8);
        }

        let err = alloc.allocate(16).unwrap_err();
        assert_eq!(
            err,
            AllocError::Fragmented {
                pool_id: "Tiny".to_string(),
                available: 16,
                largest_run: 8,
                requested: 16,
            }
        );
    }

    #[test]
    fn alignment_beyond_every_bucket() {
        let alloc = tiny::<u8>();
        let err = alloc.allocate_bytes(8, 64).unwrap_err();
        assert!(err.is_invalid_alignment());
    }

    #[test]
    fn oversized_requests_are_not_alignment_errors() {
        let alloc = tiny::<u8>();
        let err = alloc.allocate_bytes(usize::MAX - 2, 1).unwrap_err();
        assert_eq!(err.code(), "MEM:ALLOC:OVERFLOW");

        let err = alloc.allocate_bytes(isize::MAX as usize, 1).unwrap_err();
        assert_eq!(err.code(), "MEM:POOL:EXHAUSTED");
        assert_eq!(alloc.stats().unwrap().failed_allocs, 1);
    }

    #[test]
    fn zero_sized_requests_skip_the_pool() {
        let alloc = tiny::<u32>();
        let ptr = alloc.allocate(0).unwrap();
        assert_eq!(ptr, NonNull::dangling());
        // SAFETY: zero-sized release is a no-op.
        unsafe { alloc.try_deallocate(ptr, 0) }.unwrap();

        let unit = tiny::<()>();
        assert!(unit.allocate(1000).is_ok());
        assert_eq!(alloc.stats().unwrap().total_allocs, 0);
    }

    #[test]
    fn foreign_pointers_are_ignored_or_reported() {
        let alloc = tiny::<u64>();
        let mut local = 7u64;
        let foreign = NonNull::from(&mut local);

        // SAFETY: the pool only checks the address; `local` is untouched.
        unsafe { alloc.deallocate(foreign, 1) };
        let err = unsafe { alloc.try_deallocate(foreign, 1) }.unwrap_err();
        assert_eq!(err.code(), "MEM:POOL:FOREIGN");
        assert_eq!(local, 7);
        assert_eq!(alloc.stats().unwrap().foreign_deallocs, 2);
    }

    #[test]
    fn rebind_shares_the_pool() {
        let bytes = tiny::<u8>();
        let words = bytes.rebind::<u64>();
        assert!(bytes.equals(&words));
        assert!(bytes == words);

        let ptr = words.allocate(1).unwrap();
        assert_eq!(bytes.bucket_stats()[0].free_blocks, 3);
        // SAFETY: allocated above, never dereferenced.
        unsafe { words.deallocate(ptr, 1) };

        let other = tiny::<u8>();
        assert!(!bytes.equals(&other));
        assert_ne!(bytes, other);
    }

    #[test]
    fn trait_allocation_round_trip() {
        let alloc = tiny::<u8>();
        let layout = Layout::from_size_align(24, 8).unwrap();
        // SAFETY: the block is written and read within its bounds, then freed.
        unsafe {
            let block = Allocator::allocate(&alloc, layout).unwrap();
            assert_eq!(block.len(), 24);
            block.cast::<u8>().write_bytes(0x5A, 24);
            Allocator::deallocate(&alloc, block.cast(), layout);
        }
        assert_eq!(alloc.bucket_stats()[0].free_blocks, 4);
    }

    #[test]
    fn reallocate_moves_contents() {
        let alloc = tiny::<u8>();
        let small = Layout::from_size_align(8, 8).unwrap();
        let large = Layout::from_size_align(32, 8).unwrap();
        // SAFETY: all accesses stay within the live allocation.
        unsafe {
            let block = Allocator::allocate(&alloc, small).unwrap().cast::<u8>();
            block.write_bytes(0x11, 8);
            let moved = alloc.reallocate(block, small, large).unwrap().cast::<u8>();
            let bytes = core::slice::from_raw_parts(moved.as_ptr(), 8);
            assert!(bytes.iter().all(|&b| b == 0x11));
            Allocator::deallocate(&alloc, moved, large);
        }
        let stats = alloc.stats().unwrap();
        assert_eq!(stats.total_allocs, 2);
        assert_eq!(stats.total_deallocs, 2);
    }
}
