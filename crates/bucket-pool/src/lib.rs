//! # nebula-bucket-pool
//!
//! Fixed-configuration memory pool allocator.
//!
//! A pool is a fixed set of buckets, each one contiguous arena of
//! equally sized blocks with a compact occupancy bitmap. Requests for `n`
//! values of `T` are routed to the bucket that wastes the fewest bytes
//! and served as a run of contiguous blocks. Nothing falls back to the
//! global heap once the pool is built.
//!
//! ## Quick Start
//!
//! ```rust
//! use nebula_bucket_pool::prelude::*;
//!
//! pool_profile! {
//!     /// Two buckets for small records
//!     pub struct Records { (16, 1024), (64, 256) }
//! }
//!
//! let alloc = PoolAllocator::<u32, Records>::new()?;
//! let ptr = alloc.allocate(4)?;
//! // SAFETY: ptr came from `alloc` and is not used afterwards.
//! unsafe { alloc.deallocate(ptr, 4) };
//!
//! // Another element type sharing the same pool
//! let wide = alloc.rebind::<u64>();
//! assert!(alloc.equals(&wide));
//! # Ok::<(), MemoryError>(())
//! ```
//!
//! ## Features
//!
//! - `logging` (default): structured logging via `tracing`
//! - `nightly`: implement `core::alloc::Allocator` for use with `Vec::new_in`
//!
//! ## Architecture
//!
//! - [`bucket`]: bitmap-backed arena of fixed-size blocks
//! - [`pool`]: the buckets of one profile behind a shared handle
//! - [`profile`]: static bucket layouts declared with [`pool_profile!`]
//! - [`allocator`]: best-fit front-end
//! - [`source`]: where arenas get their raw storage

#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(feature = "nightly", feature(allocator_api))]
#![allow(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::perf)]
#![warn(clippy::pedantic)]
#![warn(rust_2018_idioms)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
// Precision loss in usize -> f32 casts is acceptable for usage percentages
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::return_self_not_must_use)]

#[macro_use]
mod macros;

pub mod allocator;
pub mod bucket;
pub mod config;
pub mod error;
pub mod pool;
pub mod profile;
pub mod source;
pub mod traits;

pub use crate::allocator::PoolAllocator;
pub use crate::config::PoolConfig;
pub use crate::error::{MemoryError, MemoryResult, Result};
pub use crate::profile::{DefaultProfile, PoolProfile};

/// Current version of nebula-bucket-pool
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    pub use crate::allocator::{AllocError, AllocResult, Allocator, PoolAllocator};
    pub use crate::bucket::Bucket;
    pub use crate::config::PoolConfig;
    pub use crate::error::{MemoryError, MemoryResult};
    pub use crate::pool::{BucketStats, Pool, PoolStats, SharedPool};
    pub use crate::pool_profile;
    pub use crate::profile::{BucketSpec, DefaultProfile, PoolProfile};
    pub use crate::source::{ArenaSource, SourceRef, SystemSource, TrackedSource, default_source};
    pub use crate::traits::MemoryUsage;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
