//! Allocator front-end
//!
//! - [`PoolAllocator`]: typed best-fit allocator over a shared pool
//! - [`Allocator`]: raw layout-based allocation interface
//! - [`selection`]: waste scoring and bucket ranking

mod pool_allocator;
pub mod selection;
mod traits;

pub use pool_allocator::PoolAllocator;
pub use selection::Candidate;
pub use traits::Allocator;

pub use crate::error::{AllocError, AllocResult};
