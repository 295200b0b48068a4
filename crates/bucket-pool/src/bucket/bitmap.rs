//! Occupancy bitmap
//!
//! One bit per block, eight blocks per byte, most-significant bit first.
//! A set bit marks a block in use. Storage comes from the bucket's arena
//! source and is zero-filled at construction.

use core::alloc::Layout;

use crate::error::{AllocError, AllocResult};
use crate::source::{RawRegion, SourceRef};

#[inline]
const fn mask(index: usize) -> u8 {
    0x80 >> (index % 8)
}

pub(crate) struct OccupancyBitmap {
    bits: RawRegion,
    len: usize,
}

impl OccupancyBitmap {
    /// Reserves a zeroed bitmap of `len` bits from `source`
    pub(crate) fn new(source: &SourceRef, len: usize) -> AllocResult<Self> {
        let layout = Layout::from_size_align(len.div_ceil(8).max(1), 1)
            .map_err(|_| AllocError::invalid_layout("occupancy bitmap"))?;
        let bits = RawRegion::reserve_zeroed(source, layout)?;
        Ok(Self { bits, len })
    }

    #[inline]
    fn bytes(&self) -> &[u8] {
        // SAFETY: the region was zero-filled at construction and only ever
        // written through `bytes_mut`.
        unsafe { self.bits.as_bytes() }
    }

    #[inline]
    fn bytes_mut(&mut self) -> &mut [u8] {
        // SAFETY: as for `bytes`.
        unsafe { self.bits.as_bytes_mut() }
    }

    /// Number of bits tracked
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Bytes of backing storage
    #[inline]
    pub(crate) fn storage_bytes(&self) -> usize {
        self.bits.len()
    }

    /// Returns the bit at `index`; out-of-range bits read as unset
    #[inline]
    pub(crate) fn get(&self, index: usize) -> bool {
        index < self.len && self.bytes()[index / 8] & mask(index) != 0
    }

    /// Sets bits `[start, start + count)`
    pub(crate) fn set_range(&mut self, start: usize, count: usize) {
        debug_assert!(start + count <= self.len);
        let bytes = self.bytes_mut();
        for index in start..start + count {
            bytes[index / 8] |= mask(index);
        }
    }

    /// Clears bits `[start, start + count)`
    pub(crate) fn clear_range(&mut self, start: usize, count: usize) {
        debug_assert!(start + count <= self.len);
        let bytes = self.bytes_mut();
        for index in start..start + count {
            bytes[index / 8] &= !mask(index);
        }
    }

    /// Total number of set bits
    pub(crate) fn count_ones(&self) -> usize {
        // Padding bits past `len` are never set.
        self.bytes().iter().map(|b| b.count_ones() as usize).sum()
    }

    /// Set bits in `[start, end)`
    pub(crate) fn count_ones_in(&self, start: usize, end: usize) -> usize {
        (start..end.min(self.len)).filter(|&i| self.get(i)).count()
    }

    /// Finds the first run of `needed` clear bits starting at or after `from`
    ///
    /// Keeps a running count of set bits inside a window of width `needed`
    /// and slides it one bit at a time. Returns the first index of the run.
    pub(crate) fn find_zero_run(&self, from: usize, needed: usize) -> Option<usize> {
        if needed == 0 || from.checked_add(needed)? > self.len {
            return None;
        }

        let mut in_use = self.count_ones_in(from, from + needed);
        if in_use == 0 {
            return Some(from);
        }

        for end in from + needed..self.len {
            in_use += usize::from(self.get(end));
            in_use -= usize::from(self.get(end - needed));
            if in_use == 0 {
                return Some(end + 1 - needed);
            }
        }
        None
    }

    /// Length of the longest run of clear bits
    pub(crate) fn largest_zero_run(&self) -> usize {
        let mut best = 0;
        let mut current = 0;
        for index in 0..self.len {
            if self.get(index) {
                current = 0;
            } else {
                current += 1;
                best = best.max(current);
            }
        }
        best
    }

    /// Returns `true` if every bit in `[start, start + count)` is set
    pub(crate) fn all_set(&self, start: usize, count: usize) -> bool {
        start
            .checked_add(count)
            .is_some_and(|end| end <= self.len && (start..end).all(|i| self.get(i)))
    }
}

impl core::fmt::Debug for OccupancyBitmap {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("OccupancyBitmap")
            .field("len", &self.len())
            .field("bytes", &self.storage_bytes())
            .field("in_use", &self.count_ones())
            .finish()
    }
}
