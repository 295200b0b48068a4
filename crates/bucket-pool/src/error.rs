//! Standalone error types for nebula-bucket-pool
//!
//! Uses thiserror for clean, idiomatic Rust error definitions.

use core::alloc::Layout;
use thiserror::Error;

#[cfg(feature = "logging")]
use tracing::{error, warn};

// ============================================================================
// Main Error Types
// ============================================================================

/// Bucket pool errors
#[must_use = "errors should be handled"]
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    // --- Allocation Errors ---
    #[error("Memory allocation failed: {size} bytes with {align} byte alignment")]
    AllocationFailed { size: usize, align: usize },

    #[error("Invalid memory layout: {reason}")]
    InvalidLayout { reason: String },

    #[error("Size overflow during operation: {operation}")]
    SizeOverflow { operation: String },

    #[error("Invalid alignment: {alignment}")]
    InvalidAlignment { alignment: usize },

    // --- Pool Errors ---
    #[error("Memory pool '{pool_id}' exhausted: no bucket can serve {requested} bytes")]
    PoolExhausted { pool_id: String, requested: usize },

    #[error(
        "Memory pool '{pool_id}' fragmented: {available} bytes free, largest run {largest_run} bytes, requested {requested}"
    )]
    Fragmented {
        pool_id: String,
        available: usize,
        largest_run: usize,
        requested: usize,
    },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    // --- Misuse ---
    #[error("Pointer {address:#x} is not owned by memory pool '{pool_id}'")]
    ForeignPointer { pool_id: String, address: usize },

    #[error("Invalid state: {reason}")]
    InvalidState { reason: String },
}

impl MemoryError {
    /// Check if error is retryable
    ///
    /// Capacity errors clear up once live allocations are returned.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::PoolExhausted { .. } | Self::Fragmented { .. })
    }

    /// Get error code for categorization
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::AllocationFailed { .. } => "MEM:ALLOC:FAILED",
            Self::InvalidLayout { .. } => "MEM:ALLOC:LAYOUT",
            Self::SizeOverflow { .. } => "MEM:ALLOC:OVERFLOW",
            Self::InvalidAlignment { .. } => "MEM:ALLOC:ALIGN",
            Self::PoolExhausted { .. } => "MEM:POOL:EXHAUSTED",
            Self::Fragmented { .. } => "MEM:POOL:FRAGMENTED",
            Self::InvalidConfig { .. } => "MEM:CONFIG:INVALID",
            Self::ForeignPointer { .. } => "MEM:POOL:FOREIGN",
            Self::InvalidState { .. } => "MEM:SYSTEM:STATE",
        }
    }

    // ============================================================================
    // Convenience Constructors - Allocation Errors
    // ============================================================================

    /// Create allocation failed error
    pub fn allocation_failed(size: usize, align: usize) -> Self {
        #[cfg(feature = "logging")]
        error!(size, align, "Arena source failed to reserve memory");

        Self::AllocationFailed { size, align }
    }

    /// Create allocation failed error from layout
    pub fn allocation_failed_with_layout(layout: Layout) -> Self {
        Self::allocation_failed(layout.size(), layout.align())
    }

    /// Create invalid layout error
    pub fn invalid_layout(reason: &str) -> Self {
        Self::InvalidLayout {
            reason: reason.to_string(),
        }
    }

    /// Create size overflow error
    pub fn size_overflow(operation: &str) -> Self {
        Self::SizeOverflow {
            operation: operation.to_string(),
        }
    }

    /// Create invalid alignment error
    pub fn invalid_alignment(alignment: usize) -> Self {
        Self::InvalidAlignment { alignment }
    }

    // --- Pool Errors ---

    /// Create pool exhausted error
    pub fn pool_exhausted(pool_id: &str, requested: usize) -> Self {
        #[cfg(feature = "logging")]
        warn!(pool = pool_id, requested, "Memory pool exhausted");

        Self::PoolExhausted {
            pool_id: pool_id.to_string(),
            requested,
        }
    }

    /// Create fragmentation error
    pub fn fragmented(pool_id: &str, available: usize, largest_run: usize, requested: usize) -> Self {
        #[cfg(feature = "logging")]
        warn!(
            pool = pool_id,
            available, largest_run, requested, "No contiguous run large enough"
        );

        Self::Fragmented {
            pool_id: pool_id.to_string(),
            available,
            largest_run,
            requested,
        }
    }

    /// Create invalid config error
    pub fn invalid_config(reason: &str) -> Self {
        Self::InvalidConfig {
            reason: reason.to_string(),
        }
    }

    // --- Misuse ---

    /// Create foreign pointer error
    pub fn foreign_pointer(pool_id: &str, address: usize) -> Self {
        #[cfg(feature = "logging")]
        warn!(pool = pool_id, address, "Deallocation of a pointer the pool does not own");

        Self::ForeignPointer {
            pool_id: pool_id.to_string(),
            address,
        }
    }

    /// Create invalid deallocation error (misaligned pointer or blocks not in use)
    pub fn invalid_deallocation(address: usize, size: usize) -> Self {
        #[cfg(feature = "logging")]
        warn!(address, size, "Deallocation does not match a live allocation");

        Self::InvalidState {
            reason: format!("deallocation of {size} bytes at {address:#x} does not match a live allocation"),
        }
    }

    /// Check if this is an invalid alignment error
    #[must_use]
    pub fn is_invalid_alignment(&self) -> bool {
        matches!(self, Self::InvalidAlignment { .. })
    }
}

// ============================================================================
// Result Types
// ============================================================================

/// Result type for memory operations
pub type MemoryResult<T> = core::result::Result<T, MemoryError>;

/// Generic result type alias
pub type Result<T> = MemoryResult<T>;

/// Aliases used throughout the allocator code
pub type AllocError = MemoryError;
pub type AllocResult<T> = MemoryResult<T>;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_error_creation() {
        let error = MemoryError::allocation_failed(1024, 8);
        assert!(error.to_string().contains("1024"));
    }

    #[test]
    fn test_error_with_layout() {
        let layout = Layout::new::<u64>();
        let error = MemoryError::allocation_failed_with_layout(layout);
        assert!(error.to_string().contains(&layout.size().to_string()));
    }

    #[test]
    fn test_pool_errors_name_the_pool() {
        let exhausted = MemoryError::pool_exhausted("DefaultProfile", 24);
        assert!(exhausted.to_string().contains("DefaultProfile"));

        let fragmented = MemoryError::fragmented("DefaultProfile", 24, 16, 24);
        assert!(fragmented.to_string().contains("largest run 16"));
    }

    #[test]
    fn test_foreign_pointer_formats_hex() {
        let error = MemoryError::foreign_pointer("p", 0xdead);
        assert!(error.to_string().contains("0xdead"));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(MemoryError::allocation_failed(1024, 8).code(), "MEM:ALLOC:FAILED");
        assert_eq!(MemoryError::pool_exhausted("test", 100).code(), "MEM:POOL:EXHAUSTED");
        assert_eq!(MemoryError::fragmented("t", 1, 1, 2).code(), "MEM:POOL:FRAGMENTED");
        assert_eq!(MemoryError::foreign_pointer("t", 1).code(), "MEM:POOL:FOREIGN");
        assert_eq!(MemoryError::invalid_deallocation(1, 8).code(), "MEM:SYSTEM:STATE");
    }

    #[test]
    fn test_retryable() {
        assert!(MemoryError::pool_exhausted("test", 100).is_retryable());
        assert!(MemoryError::fragmented("test", 10, 5, 8).is_retryable());
        assert!(!MemoryError::invalid_alignment(8).is_retryable());
        assert!(!MemoryError::foreign_pointer("test", 8).is_retryable());
    }
}
