//! Pool and bucket statistics

use core::fmt;

/// Counters maintained by a pool when `track_stats` is enabled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Successful allocations
    pub total_allocs: u64,
    /// Successful deallocations
    pub total_deallocs: u64,
    /// Requests no bucket could serve
    pub failed_allocs: u64,
    /// Deallocations of pointers no bucket owns
    pub foreign_deallocs: u64,
    /// Bytes currently reserved, rounded up to whole blocks
    pub current_usage: usize,
    /// Highest value of `current_usage`
    pub peak_usage: usize,
}

impl PoolStats {
    /// Allocations not yet returned
    pub fn live_allocations(&self) -> u64 {
        self.total_allocs.saturating_sub(self.total_deallocs)
    }

    pub(crate) fn record_alloc(&mut self, bytes: usize) {
        self.total_allocs += 1;
        self.current_usage += bytes;
        self.peak_usage = self.peak_usage.max(self.current_usage);
    }

    pub(crate) fn record_dealloc(&mut self, bytes: usize) {
        self.total_deallocs += 1;
        self.current_usage = self.current_usage.saturating_sub(bytes);
    }

    pub(crate) fn record_failure(&mut self) {
        self.failed_allocs += 1;
    }

    pub(crate) fn record_foreign(&mut self) {
        self.foreign_deallocs += 1;
    }
}

impl fmt::Display for PoolStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "allocs: {}, deallocs: {}, failed: {}, foreign: {}, in use: {} bytes (peak {})",
            self.total_allocs,
            self.total_deallocs,
            self.failed_allocs,
            self.foreign_deallocs,
            self.current_usage,
            self.peak_usage
        )
    }
}

/// Point-in-time view of one bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketStats {
    pub block_size: usize,
    pub block_count: usize,
    pub free_blocks: usize,
    /// Longest run of contiguous free blocks
    pub largest_free_run: usize,
}

impl BucketStats {
    pub fn used_blocks(&self) -> usize {
        self.block_count - self.free_blocks
    }

    pub fn free_bytes(&self) -> usize {
        self.free_blocks * self.block_size
    }

    /// Largest request in bytes this bucket could serve right now
    pub fn largest_free_bytes(&self) -> usize {
        self.largest_free_run * self.block_size
    }

    /// Share of free blocks that are not part of the largest run (0.0 to 1.0)
    pub fn fragmentation(&self) -> f32 {
        if self.free_blocks == 0 {
            0.0
        } else {
            1.0 - self.largest_free_run as f32 / self.free_blocks as f32
        }
    }
}
