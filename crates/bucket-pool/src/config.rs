//! Pool configuration
//!
//! Runtime knobs applied to every bucket of a pool. The bucket layout itself
//! (block sizes and counts) comes from a [`PoolProfile`](crate::profile::PoolProfile).

/// Configuration for a bucket pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Enable statistics tracking
    pub track_stats: bool,

    /// Fill pattern byte for newly allocated runs (for debugging)
    pub alloc_pattern: Option<u8>,
    /// Fill pattern byte for deallocated runs (for debugging)
    pub dealloc_pattern: Option<u8>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            track_stats: cfg!(debug_assertions),
            alloc_pattern: if cfg!(debug_assertions) {
                Some(0xBB)
            } else {
                None
            },
            dealloc_pattern: if cfg!(debug_assertions) {
                Some(0xDD)
            } else {
                None
            },
        }
    }
}

impl PoolConfig {
    /// Production configuration - optimized for performance
    #[must_use]
    pub fn production() -> Self {
        Self {
            track_stats: false,
            alloc_pattern: None,
            dealloc_pattern: None,
        }
    }

    /// Debug configuration - optimized for debugging
    #[must_use]
    pub fn debug() -> Self {
        Self {
            track_stats: true,
            alloc_pattern: Some(0xBB),
            dealloc_pattern: Some(0xDD),
        }
    }

    /// Production configuration with statistics enabled
    #[must_use]
    pub fn monitored() -> Self {
        Self {
            track_stats: true,
            ..Self::production()
        }
    }

    /// Returns `true` if either fill pattern is configured
    pub fn fills_memory(&self) -> bool {
        self.alloc_pattern.is_some() || self.dealloc_pattern.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn production_disables_everything() {
        let config = PoolConfig::production();
        assert!(!config.track_stats);
        assert!(!config.fills_memory());
    }

    #[test]
    fn debug_fills_and_tracks() {
        let config = PoolConfig::debug();
        assert!(config.track_stats);
        assert_eq!(config.alloc_pattern, Some(0xBB));
        assert_eq!(config.dealloc_pattern, Some(0xDD));
    }

    #[test]
    fn monitored_only_tracks() {
        let config = PoolConfig::monitored();
        assert!(config.track_stats);
        assert!(!config.fills_memory());
    }

    #[test]
    fn default_follows_build_profile() {
        let config = PoolConfig::default();
        assert_eq!(config.track_stats, cfg!(debug_assertions));
        assert_eq!(config.fills_memory(), cfg!(debug_assertions));
    }
}
