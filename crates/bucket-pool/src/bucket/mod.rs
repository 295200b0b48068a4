//! Fixed-block buckets
//!
//! A bucket is one contiguous arena cut into equally sized blocks, plus an
//! occupancy bitmap. Requests are served as runs of contiguous blocks found
//! by a sliding-window search that starts at a search hint.
//!
//! ## Invariants
//!
//! - `free_blocks` equals the number of clear bits in the bitmap
//! - `search_hint` never exceeds the index of the lowest free block
//! - Every returned pointer is the start of a block inside the arena

mod bitmap;

use core::alloc::Layout;
use core::fmt;
use core::ptr::NonNull;

#[cfg(feature = "logging")]
use tracing::trace;

use self::bitmap::OccupancyBitmap;
use crate::config::PoolConfig;
use crate::error::{AllocError, AllocResult};
use crate::pool::BucketStats;
use crate::profile::BucketSpec;
use crate::source::{RawRegion, SourceRef};
use crate::traits::MemoryUsage;

/// Arena of fixed-size blocks with bitmap occupancy tracking
pub struct Bucket {
    block_size: usize,
    block_count: usize,
    free_blocks: usize,
    search_hint: usize,
    arena: RawRegion,
    bitmap: OccupancyBitmap,
    config: PoolConfig,
}

impl Bucket {
    /// Builds a bucket, reserving the arena and then the bitmap from `source`
    ///
    /// # Errors
    /// - `InvalidConfig` / `SizeOverflow` if `spec` is invalid
    /// - `AllocationFailed` if the source cannot supply either region
    pub fn new(spec: BucketSpec, source: &SourceRef, config: &PoolConfig) -> AllocResult<Self> {
        spec.validate()?;
        let arena_bytes = spec
            .arena_bytes()
            .ok_or_else(|| AllocError::size_overflow("bucket arena size"))?;
        let layout = Layout::from_size_align(arena_bytes, spec.block_align())
            .map_err(|_| AllocError::invalid_layout("bucket arena"))?;

        let arena = RawRegion::reserve(source, layout)?;
        let bitmap = OccupancyBitmap::new(source, spec.block_count)?;

        #[cfg(feature = "logging")]
        trace!(
            block_size = spec.block_size,
            block_count = spec.block_count,
            source = source.name(),
            "Bucket created"
        );

        Ok(Self {
            block_size: spec.block_size,
            block_count: spec.block_count,
            free_blocks: spec.block_count,
            search_hint: 0,
            arena,
            bitmap,
            config: *config,
        })
    }

    /// Builds a bucket of the same shape backed by a fresh arena
    ///
    /// Contents and occupancy are not copied: every block of the clone is
    /// free, and the clone draws from the same source.
    pub fn try_clone(&self) -> AllocResult<Self> {
        Self::new(self.spec(), self.arena.source(), &self.config)
    }

    // --- Accessors ---

    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    #[inline]
    pub fn block_count(&self) -> usize {
        self.block_count
    }

    #[inline]
    pub fn free_blocks(&self) -> usize {
        self.free_blocks
    }

    #[inline]
    pub fn used_blocks(&self) -> usize {
        self.block_count - self.free_blocks
    }

    /// Lower bound on the index of the lowest free block
    #[inline]
    pub fn search_hint(&self) -> usize {
        self.search_hint
    }

    /// Alignment every block start satisfies
    #[inline]
    pub fn block_align(&self) -> usize {
        self.arena.align()
    }

    #[inline]
    pub fn spec(&self) -> BucketSpec {
        BucketSpec::new(self.block_size, self.block_count)
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.free_blocks == 0
    }

    /// Number of blocks a request of `bytes` occupies
    #[inline]
    pub fn blocks_for(&self, bytes: usize) -> usize {
        bytes.div_ceil(self.block_size)
    }

    /// Longest run of contiguous free blocks
    pub fn largest_free_run(&self) -> usize {
        self.bitmap.largest_zero_run()
    }

    pub fn stats(&self) -> BucketStats {
        BucketStats {
            block_size: self.block_size,
            block_count: self.block_count,
            free_blocks: self.free_blocks,
            largest_free_run: self.largest_free_run(),
        }
    }

    // --- Addressing ---

    /// Returns `true` if `ptr` lies inside this bucket's arena
    #[inline]
    pub fn contains(&self, ptr: *const u8) -> bool {
        self.arena.contains_addr(ptr as usize)
    }

    /// Index of the block starting at `ptr`
    ///
    /// Returns `None` if `ptr` is outside the arena or not at a block start.
    pub fn block_index_of(&self, ptr: *const u8) -> Option<usize> {
        let offset = (ptr as usize).checked_sub(self.arena.start_addr())?;
        (offset < self.arena.len() && offset % self.block_size == 0)
            .then(|| offset / self.block_size)
    }

    /// Occupancy of block `index`, or `None` if out of range
    pub fn block_in_use(&self, index: usize) -> Option<bool> {
        (index < self.block_count).then(|| self.bitmap.get(index))
    }

    // --- Allocation ---

    /// Reserves a run of blocks large enough for `bytes`
    ///
    /// Returns `None` for a zero-byte request, when fewer blocks are free
    /// than needed, or when no contiguous run of that length exists.
    pub fn allocate(&mut self, bytes: usize) -> Option<NonNull<u8>> {
        let needed = self.blocks_for(bytes);
        if needed == 0 || needed > self.free_blocks {
            return None;
        }

        let start = self.bitmap.find_zero_run(self.search_hint, needed)?;
        let offset = start * self.block_size;
        let ptr = self.arena.ptr_at(offset)?;
        if let Some(pattern) = self.config.alloc_pattern {
            self.arena.fill(offset, needed * self.block_size, pattern).ok()?;
        }

        self.bitmap.set_range(start, needed);
        self.free_blocks -= needed;
        if (start..start + needed).contains(&self.search_hint) {
            self.search_hint = start + needed;
            if self.search_hint >= self.block_count {
                self.search_hint = 0;
            }
        }

        Some(ptr)
    }

    /// Returns the run of blocks starting at `ptr` that served `bytes`
    ///
    /// Returns `false` and changes nothing if `ptr` is not a block start in
    /// this arena or any block of the run is not in use.
    ///
    /// # Safety
    /// No live reference may point into the run; it may be overwritten
    /// with the dealloc pattern and handed out again.
    pub unsafe fn deallocate(&mut self, ptr: NonNull<u8>, bytes: usize) -> bool {
        let Some(start) = self.block_index_of(ptr.as_ptr()) else {
            return false;
        };
        let needed = self.blocks_for(bytes);
        if needed == 0 || !self.bitmap.all_set(start, needed) {
            return false;
        }

        if let Some(pattern) = self.config.dealloc_pattern
            && self
                .arena
                .fill(start * self.block_size, needed * self.block_size, pattern)
                .is_err()
        {
            return false;
        }

        self.bitmap.clear_range(start, needed);
        self.free_blocks += needed;
        self.search_hint = self.search_hint.min(start);
        true
    }
}

impl MemoryUsage for Bucket {
    fn used_memory(&self) -> usize {
        self.used_blocks() * self.block_size
    }

    fn available_memory(&self) -> usize {
        self.free_blocks * self.block_size
    }
}

impl fmt::Debug for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bucket")
            .field("block_size", &self.block_size)
            .field("block_count", &self.block_count)
            .field("free_blocks", &self.free_blocks)
            .field("search_hint", &self.search_hint)
            .field("arena", &self.arena)
            .field("bitmap", &self.bitmap)
            .finish()
    }
}
