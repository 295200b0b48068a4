//! Bucket pools
//!
//! A [`Pool`] is the fixed, ordered set of buckets realizing one profile.
//! It never grows or shrinks and holds no selection policy; choosing a
//! bucket is the job of [`PoolAllocator`](crate::allocator::PoolAllocator).

mod handle;
mod stats;

use core::fmt;
use core::ptr::NonNull;
use std::borrow::Cow;

#[cfg(feature = "logging")]
use tracing::debug;

pub use handle::SharedPool;
pub use stats::{BucketStats, PoolStats};

use crate::bucket::Bucket;
use crate::config::PoolConfig;
use crate::error::{AllocError, AllocResult};
use crate::profile::{BucketSpec, CheckedProfile, PoolProfile};
use crate::source::SourceRef;
use crate::traits::MemoryUsage;

/// Fixed collection of buckets sharing one arena source
pub struct Pool {
    name: Cow<'static, str>,
    buckets: Box<[Bucket]>,
    source: SourceRef,
    config: PoolConfig,
    stats: Option<PoolStats>,
}

impl Pool {
    /// Builds one bucket per entry of profile `P`
    pub fn for_profile<P: PoolProfile>(source: SourceRef, config: &PoolConfig) -> AllocResult<Self> {
        let () = <P as CheckedProfile>::VALID;
        Self::build(Cow::Borrowed(P::NAME), P::BUCKETS, source, config)
    }

    /// Builds a pool from a runtime list of bucket specs
    ///
    /// # Errors
    /// `InvalidConfig` if `specs` is empty or any spec is invalid.
    pub fn from_specs(
        name: impl Into<Cow<'static, str>>,
        specs: &[BucketSpec],
        source: SourceRef,
        config: &PoolConfig,
    ) -> AllocResult<Self> {
        if specs.is_empty() {
            return Err(AllocError::invalid_config("pool needs at least one bucket"));
        }
        for spec in specs {
            spec.validate()?;
        }
        Self::build(name.into(), specs, source, config)
    }

    fn build(
        name: Cow<'static, str>,
        specs: &[BucketSpec],
        source: SourceRef,
        config: &PoolConfig,
    ) -> AllocResult<Self> {
        let buckets = specs
            .iter()
            .map(|spec| Bucket::new(*spec, &source, config))
            .collect::<AllocResult<Box<[Bucket]>>>()?;

        #[cfg(feature = "logging")]
        debug!(
            pool = %name,
            buckets = buckets.len(),
            capacity = buckets.iter().map(|b| b.total_memory()).sum::<usize>(),
            source = source.name(),
            "Pool created"
        );

        Ok(Self {
            name,
            buckets,
            source,
            config: *config,
            stats: config.track_stats.then(PoolStats::default),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Buckets in profile order
    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    pub(crate) fn buckets_mut(&mut self) -> &mut [Bucket] {
        &mut self.buckets
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Always `false`; a pool has at least one bucket
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn source(&self) -> &SourceRef {
        &self.source
    }

    /// Counters, if `track_stats` is enabled
    pub fn stats(&self) -> Option<PoolStats> {
        self.stats
    }

    pub fn bucket_stats(&self) -> Vec<BucketStats> {
        self.buckets.iter().map(Bucket::stats).collect()
    }

    /// Index of the bucket whose arena contains `ptr`
    pub fn owner_of(&self, ptr: *const u8) -> Option<usize> {
        self.buckets.iter().position(|b| b.contains(ptr))
    }

    /// Returns `bytes` at `ptr` to the bucket that owns it
    ///
    /// # Errors
    /// - `ForeignPointer` if no bucket contains `ptr`
    /// - `InvalidState` if `ptr` is not the start of a live run of that size
    ///
    /// # Safety
    /// No live reference may point into the released run.
    pub unsafe fn release(&mut self, ptr: NonNull<u8>, bytes: usize) -> AllocResult<()> {
        let Some(index) = self.owner_of(ptr.as_ptr()) else {
            self.record_foreign();
            return Err(AllocError::foreign_pointer(&self.name, ptr.as_ptr() as usize));
        };

        let bucket = &mut self.buckets[index];
        let reserved = bucket.blocks_for(bytes) * bucket.block_size();
        // SAFETY: forwarded from the caller.
        if !unsafe { bucket.deallocate(ptr, bytes) } {
            return Err(AllocError::invalid_deallocation(ptr.as_ptr() as usize, bytes));
        }
        self.record_dealloc(reserved);
        Ok(())
    }

    pub(crate) fn record_alloc(&mut self, bytes: usize) {
        if let Some(stats) = self.stats.as_mut() {
            stats.record_alloc(bytes);
        }
    }

    pub(crate) fn record_dealloc(&mut self, bytes: usize) {
        if let Some(stats) = self.stats.as_mut() {
            stats.record_dealloc(bytes);
        }
    }

    pub(crate) fn record_failure(&mut self) {
        if let Some(stats) = self.stats.as_mut() {
            stats.record_failure();
        }
    }

    pub(crate) fn record_foreign(&mut self) {
        if let Some(stats) = self.stats.as_mut() {
            stats.record_foreign();
        }
    }
}

impl MemoryUsage for Pool {
    fn used_memory(&self) -> usize {
        self.buckets.iter().map(MemoryUsage::used_memory).sum()
    }

    fn available_memory(&self) -> usize {
        self.buckets.iter().map(MemoryUsage::available_memory).sum()
    }
}

impl fmt::Debug for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("name", &self.name)
            .field("buckets", &self.buckets)
            .field("source", &self.source.name())
            .field("stats", &self.stats)
            .finish()
    }
}
