//! Static pool profiles
//!
//! A profile names a fixed, ordered list of `(block_size, block_count)` pairs.
//! Profiles are types, so an unknown profile is a compile error, and the
//! list is checked by const evaluation the first time a pool is built from it.

use crate::error::{AllocError, AllocResult};

/// Largest alignment a bucket arena is reserved with
pub const MAX_BLOCK_ALIGN: usize = 4096;

/// Shape of one bucket: block size in bytes and number of blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BucketSpec {
    pub block_size: usize,
    pub block_count: usize,
}

impl BucketSpec {
    #[inline]
    pub const fn new(block_size: usize, block_count: usize) -> Self {
        Self {
            block_size,
            block_count,
        }
    }

    /// Alignment every block of this bucket satisfies
    ///
    /// The largest power of two dividing `block_size`, capped at
    /// [`MAX_BLOCK_ALIGN`].
    #[inline]
    pub const fn block_align(&self) -> usize {
        if self.block_size == 0 {
            return 1;
        }
        let natural = 1usize << self.block_size.trailing_zeros();
        if natural > MAX_BLOCK_ALIGN {
            MAX_BLOCK_ALIGN
        } else {
            natural
        }
    }

    /// Size of the block arena in bytes, if it does not overflow
    #[inline]
    pub const fn arena_bytes(&self) -> Option<usize> {
        self.block_size.checked_mul(self.block_count)
    }

    /// Size of the occupancy bitmap in bytes
    #[inline]
    pub const fn bitmap_bytes(&self) -> usize {
        self.block_count.div_ceil(8)
    }

    /// Returns `true` if a bucket can be built from this spec
    pub const fn is_valid(&self) -> bool {
        if self.block_size == 0 || self.block_count == 0 {
            return false;
        }
        match self.arena_bytes() {
            Some(bytes) => bytes <= isize::MAX as usize - (self.block_align() - 1),
            None => false,
        }
    }

    /// Runtime validation with a descriptive error
    pub fn validate(&self) -> AllocResult<()> {
        if self.block_size == 0 {
            return Err(AllocError::invalid_config("block size must be non-zero"));
        }
        if self.block_count == 0 {
            return Err(AllocError::invalid_config("block count must be non-zero"));
        }
        if !self.is_valid() {
            return Err(AllocError::size_overflow("bucket arena size"));
        }
        Ok(())
    }
}

impl From<(usize, usize)> for BucketSpec {
    fn from((block_size, block_count): (usize, usize)) -> Self {
        Self::new(block_size, block_count)
    }
}

/// A named, fixed bucket layout
///
/// Usually declared with [`pool_profile!`](crate::pool_profile).
pub trait PoolProfile: 'static {
    /// Identifier used in logs and errors
    const NAME: &'static str;

    /// Bucket layout, in pool order; sizes need not be sorted
    const BUCKETS: &'static [BucketSpec];
}

const fn all_valid(specs: &[BucketSpec]) -> bool {
    let mut i = 0;
    while i < specs.len() {
        if !specs[i].is_valid() {
            return false;
        }
        i += 1;
    }
    true
}

/// Const validation of a profile, evaluated once per profile type
pub(crate) trait CheckedProfile: PoolProfile {
    const VALID: ();
}

impl<P: PoolProfile> CheckedProfile for P {
    const VALID: () = {
        assert!(
            !P::BUCKETS.is_empty(),
            "pool profile must declare at least one bucket"
        );
        assert!(
            all_valid(P::BUCKETS),
            "pool profile declares a zero-sized or oversized bucket"
        );
    };
}

crate::pool_profile! {
    /// General-purpose profile: many small blocks, fewer large ones
    pub struct DefaultProfile { (24, 10_000_000), (32, 100_000), (1024, 10_000) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(24, 8)]
    #[case(32, 32)]
    #[case(1024, 1024)]
    #[case(3, 1)]
    #[case(12, 4)]
    #[case(1 << 20, MAX_BLOCK_ALIGN)]
    fn block_alignment(#[case] block_size: usize, #[case] expected: usize) {
        assert_eq!(BucketSpec::new(block_size, 1).block_align(), expected);
    }

    #[rstest]
    #[case(BucketSpec::new(0, 10), "MEM:CONFIG:INVALID")]
    #[case(BucketSpec::new(10, 0), "MEM:CONFIG:INVALID")]
    #[case(BucketSpec::new(usize::MAX, 2), "MEM:ALLOC:OVERFLOW")]
    fn invalid_specs(#[case] spec: BucketSpec, #[case] code: &str) {
        assert!(!spec.is_valid());
        assert_eq!(spec.validate().unwrap_err().code(), code);
    }

    #[test]
    fn bitmap_rounds_up() {
        assert_eq!(BucketSpec::new(8, 4).bitmap_bytes(), 1);
        assert_eq!(BucketSpec::new(8, 8).bitmap_bytes(), 1);
        assert_eq!(BucketSpec::new(8, 9).bitmap_bytes(), 2);
    }

    #[test]
    fn default_profile_layout() {
        assert_eq!(DefaultProfile::NAME, "DefaultProfile");
        assert_eq!(
            DefaultProfile::BUCKETS,
            &[
                BucketSpec::new(24, 10_000_000),
                BucketSpec::new(32, 100_000),
                BucketSpec::new(1024, 10_000),
            ]
        );
        let () = <DefaultProfile as CheckedProfile>::VALID;
    }
}
