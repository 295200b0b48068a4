//! Allocator trait
//!
//! # Safety
//!
//! Implementors of [`Allocator`] promise that:
//! - Returned pointers are valid for reads and writes of `layout.size()` bytes
//! - Returned pointers are aligned to `layout.align()`
//! - Storage is not handed out twice while it is live
//!
//! The default `reallocate` moves contents with `copy_nonoverlapping`
//! between two distinct live allocations.

use core::alloc::Layout;
use core::ptr::{self, NonNull};

use crate::error::{AllocError, AllocResult};

/// Validation of layout parameters
#[inline]
pub(crate) fn validate_layout(layout: Layout) -> AllocResult<()> {
    if !layout.align().is_power_of_two() {
        return Err(AllocError::invalid_alignment(layout.align()));
    }
    if layout.size() > isize::MAX as usize - (layout.align() - 1) {
        return Err(AllocError::size_overflow("layout size"));
    }
    Ok(())
}

/// Well-aligned dangling pointer used for zero-sized allocations
#[inline]
pub(crate) fn dangling(align: usize) -> AllocResult<NonNull<u8>> {
    if !align.is_power_of_two() {
        return Err(AllocError::invalid_alignment(align));
    }
    NonNull::new(ptr::without_provenance_mut(align))
        .ok_or_else(|| AllocError::invalid_alignment(align))
}

/// Raw allocation interface
///
/// # Safety
///
/// Implementors must ensure that returned storage is valid, aligned, and
/// exclusive until it is passed back to `deallocate`.
pub unsafe trait Allocator {
    /// Allocates memory with the given layout
    ///
    /// Zero-sized layouts yield a dangling, well-aligned pointer.
    ///
    /// # Safety
    /// The returned memory is uninitialized and must be initialized before use.
    ///
    /// # Errors
    /// Returns an error if no storage can satisfy the layout.
    unsafe fn allocate(&self, layout: Layout) -> AllocResult<NonNull<[u8]>>;

    /// Deallocates memory at the given pointer with the specified layout
    ///
    /// # Safety
    /// - `ptr` must have been allocated by this allocator
    /// - `layout` must match the original allocation layout
    /// - `ptr` must not be used after this call
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);

    /// Moves an allocation to storage matching `new_layout`
    ///
    /// Allocates first, copies the smaller of the two sizes, then releases
    /// the old allocation. On error the old allocation is untouched.
    ///
    /// # Safety
    /// - Same requirements as `deallocate` for `ptr` and `old_layout`
    /// - On success the old pointer becomes invalid
    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
    ) -> AllocResult<NonNull<[u8]>> {
        validate_layout(new_layout)?;

        // SAFETY: new_layout is validated; the result is a fresh allocation.
        let new_ptr = unsafe { self.allocate(new_layout)? };

        // SAFETY: both regions are live, distinct, and at least
        // min(old, new) bytes long.
        unsafe {
            ptr::copy_nonoverlapping(
                ptr.as_ptr().cast_const(),
                new_ptr.as_ptr().cast::<u8>(),
                old_layout.size().min(new_layout.size()),
            );
        }

        // SAFETY: caller contract; contents were moved above.
        unsafe { self.deallocate(ptr, old_layout) };
        Ok(new_ptr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dangling_is_aligned() {
        assert_eq!(dangling(16).unwrap().as_ptr() as usize, 16);
        assert!(dangling(3).unwrap_err().is_invalid_alignment());
    }

    #[test]
    fn well_formed_layouts_pass() {
        assert!(validate_layout(Layout::new::<u64>()).is_ok());
        assert!(validate_layout(Layout::from_size_align(0, 4096).unwrap()).is_ok());
    }
}
