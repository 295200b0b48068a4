//! System arena source
//!
//! Provides an arena source that wraps the system's default memory allocator.

use core::alloc::{GlobalAlloc, Layout};
use core::ptr::{self, NonNull};
use std::alloc::System;

use super::ArenaSource;
use crate::error::{AllocError, AllocResult};

/// Wrapper for the system's default allocator
///
/// This is the process-wide default source returned by
/// [`default_source`](super::default_source).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemSource;

impl SystemSource {
    /// Creates a new SystemSource
    #[inline]
    pub const fn new() -> Self {
        SystemSource
    }
}

impl ArenaSource for SystemSource {
    fn reserve(&self, layout: Layout) -> AllocResult<NonNull<u8>> {
        if layout.size() == 0 {
            // Well-aligned dangling pointer for zero-sized regions
            return NonNull::new(ptr::without_provenance_mut(layout.align()))
                .ok_or_else(|| AllocError::invalid_alignment(layout.align()));
        }

        // SAFETY: layout has non-zero size (checked above).
        let ptr = unsafe { System.alloc(layout) };
        NonNull::new(ptr).ok_or_else(|| AllocError::allocation_failed_with_layout(layout))
    }

    unsafe fn release(&self, ptr: NonNull<u8>, layout: Layout) {
        if layout.size() == 0 {
            return;
        }

        // SAFETY: caller guarantees ptr came from `reserve` with this layout,
        // which delegated to System.alloc with the same layout.
        unsafe { System.dealloc(ptr.as_ptr(), layout) };
    }

    fn name(&self) -> &'static str {
        "system"
    }
}
