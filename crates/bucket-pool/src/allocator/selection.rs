//! Best-fit bucket selection
//!
//! Every bucket that can hold the request at the right alignment gets a
//! [`Candidate`] scoring how many bytes rounding up to whole blocks wastes.
//! Candidates are tried cheapest first.

use smallvec::SmallVec;

use crate::bucket::Bucket;

/// Fitness of one bucket for one request
///
/// Orders by waste, then block count, then bucket index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Candidate {
    /// Bytes left unused in the reserved run
    pub waste: usize,
    /// Blocks the request occupies
    pub blocks: usize,
    /// Position of the bucket in the pool
    pub index: usize,
}

impl Candidate {
    /// Scores a bucket of `block_size` for `demand` bytes
    ///
    /// Returns `None` if `demand` is zero or the rounded size overflows.
    pub fn evaluate(index: usize, block_size: usize, demand: usize) -> Option<Self> {
        if demand == 0 || block_size == 0 {
            return None;
        }
        let blocks = demand.div_ceil(block_size);
        let reserved = blocks.checked_mul(block_size)?;
        Some(Self {
            waste: reserved - demand,
            blocks,
            index,
        })
    }

    /// Bytes the run reserves
    pub fn reserved(&self, block_size: usize) -> usize {
        self.blocks * block_size
    }
}

/// Ranks the buckets able to serve `demand` bytes aligned to `align`
pub fn rank(buckets: &[Bucket], demand: usize, align: usize) -> SmallVec<[Candidate; 8]> {
    let mut candidates: SmallVec<[Candidate; 8]> = buckets
        .iter()
        .enumerate()
        .filter(|(_, bucket)| bucket.block_align() >= align)
        .filter_map(|(index, bucket)| Candidate::evaluate(index, bucket.block_size(), demand))
        .collect();
    candidates.sort_unstable();
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolConfig;
    use crate::profile::BucketSpec;
    use crate::source::default_source;
    use rstest::rstest;

    fn buckets(sizes: &[usize]) -> Vec<Bucket> {
        sizes
            .iter()
            .map(|&size| {
                Bucket::new(BucketSpec::new(size, 4), &default_source(), &PoolConfig::production())
                    .unwrap()
            })
            .collect()
    }

    #[rstest]
    #[case(24, 24, 1, 0)]
    #[case(24, 10, 1, 14)]
    #[case(8, 24, 3, 0)]
    #[case(32, 40, 2, 24)]
    fn evaluate_waste(
        #[case] block_size: usize,
        #[case] demand: usize,
        #[case] blocks: usize,
        #[case] waste: usize,
    ) {
        let candidate = Candidate::evaluate(0, block_size, demand).unwrap();
        assert_eq!(candidate.blocks, blocks);
        assert_eq!(candidate.waste, waste);
    }

    #[test]
    fn zero_demand_has_no_candidate() {
        assert!(Candidate::evaluate(0, 8, 0).is_none());
    }

    #[test]
    fn lowest_waste_first() {
        let pool = buckets(&[1024, 24, 32]);
        let order: Vec<_> = rank(&pool, 24, 1).iter().map(|c| c.index).collect();
        assert_eq!(order, vec![1, 2, 0]);
    }

    #[test]
    fn ties_prefer_fewer_blocks_then_index() {
        // 16 bytes: 8-byte buckets waste 0 with 2 blocks, 16-byte waste 0 with 1.
        let pool = buckets(&[8, 16, 8]);
        let order: Vec<_> = rank(&pool, 16, 1).iter().map(|c| c.index).collect();
        assert_eq!(order, vec![1, 0, 2]);
    }

    #[test]
    fn misaligned_buckets_do_not_qualify() {
        let pool = buckets(&[24, 32]);
        let order: Vec<_> = rank(&pool, 16, 16).iter().map(|c| c.index).collect();
        assert_eq!(order, vec![1]);
        assert!(rank(&pool, 16, 64).is_empty());
    }
}
