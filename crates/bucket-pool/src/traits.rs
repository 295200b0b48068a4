//! Capacity reporting shared by buckets and pools

/// Memory usage tracking trait
///
/// Fixed-capacity structures always know their totals, so every method is
/// infallible.
pub trait MemoryUsage {
    /// Bytes currently handed out
    fn used_memory(&self) -> usize;

    /// Bytes still free
    fn available_memory(&self) -> usize;

    /// Total capacity in bytes
    fn total_memory(&self) -> usize {
        self.used_memory() + self.available_memory()
    }

    /// Returns memory usage as a percentage (0.0 to 100.0)
    fn memory_usage_percent(&self) -> f32 {
        let total = self.total_memory();
        if total == 0 {
            0.0
        } else {
            (self.used_memory() as f32 / total as f32) * 100.0
        }
    }

    /// Checks if memory usage is at or above the threshold percentage
    fn is_memory_pressure(&self, threshold_percent: f32) -> bool {
        self.memory_usage_percent() >= threshold_percent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed {
        used: usize,
        free: usize,
    }

    impl MemoryUsage for Fixed {
        fn used_memory(&self) -> usize {
            self.used
        }

        fn available_memory(&self) -> usize {
            self.free
        }
    }

    #[test]
    fn percent_and_pressure() {
        let usage = Fixed { used: 75, free: 25 };
        assert_eq!(usage.total_memory(), 100);
        assert!((usage.memory_usage_percent() - 75.0).abs() < f32::EPSILON);
        assert!(usage.is_memory_pressure(75.0));
        assert!(!usage.is_memory_pressure(80.0));
    }

    #[test]
    fn empty_capacity_reports_zero() {
        let usage = Fixed { used: 0, free: 0 };
        assert_eq!(usage.memory_usage_percent(), 0.0);
    }
}
