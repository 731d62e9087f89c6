//! Error types for storage and value construction

use std::alloc::Layout;

/// Result type alias for storage operations
pub type Result<T> = std::result::Result<T, Error>;

/// A memory resource could not satisfy a request.
///
/// This is the only failure the resource layer itself reports. It is never
/// retried or papered over with a fallback resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Allocation of {size} bytes (align {align}) failed")]
pub struct AllocationFailure {
    /// Requested size in bytes
    pub size: usize,
    /// Requested alignment in bytes
    pub align: usize,
}

impl AllocationFailure {
    /// Describe a failed request for `layout`
    pub fn new(layout: Layout) -> Self {
        Self {
            size: layout.size(),
            align: layout.align(),
        }
    }

    /// Describe a failed request for `count` elements of `T`
    pub fn for_array<T>(count: usize) -> Self {
        Self {
            size: count.saturating_mul(std::mem::size_of::<T>()),
            align: std::mem::align_of::<T>(),
        }
    }
}

impl From<AllocationFailure> for allocator_api2::alloc::AllocError {
    fn from(_: AllocationFailure) -> Self {
        allocator_api2::alloc::AllocError
    }
}

/// Main error type for storage, container and parser operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The backing memory resource refused an allocation
    #[error(transparent)]
    Allocation(#[from] AllocationFailure),

    /// Invalid JSON syntax
    #[error("Invalid JSON syntax at position {position}: {message}")]
    Syntax {
        /// Byte offset where the error was detected
        position: usize,
        /// Error description
        message: String,
    },

    /// Nesting exceeded the configured maximum depth
    #[error("Nesting depth limit of {depth} exceeded")]
    DepthLimitExceeded {
        /// Configured maximum depth
        depth: usize,
    },

    /// Input ended before a complete document was read
    #[error("Incomplete JSON document")]
    Incomplete,

    /// Configuration rejected by validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Create a syntax error
    pub fn syntax(position: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            position,
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// True when the error came from a refused allocation
    pub fn is_allocation_failure(&self) -> bool {
        matches!(self, Self::Allocation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation_failure_display() {
        let err = AllocationFailure::new(Layout::from_size_align(64, 8).unwrap());
        assert_eq!(err.to_string(), "Allocation of 64 bytes (align 8) failed");
    }

    #[test]
    fn test_allocation_failure_for_array() {
        let err = AllocationFailure::for_array::<u64>(4);
        assert_eq!(err.size, 32);
        assert_eq!(err.align, 8);

        let overflow = AllocationFailure::for_array::<u64>(usize::MAX);
        assert_eq!(overflow.size, usize::MAX);
    }

    #[test]
    fn test_error_from_allocation_failure() {
        let err: Error = AllocationFailure { size: 1, align: 1 }.into();
        assert!(err.is_allocation_failure());
        assert_eq!(err.to_string(), "Allocation of 1 bytes (align 1) failed");
    }

    #[test]
    fn test_error_helpers() {
        let err = Error::syntax(7, "unexpected token");
        assert_eq!(
            err.to_string(),
            "Invalid JSON syntax at position 7: unexpected token"
        );
        assert!(!err.is_allocation_failure());

        let err = Error::invalid_config("zero block size");
        assert!(matches!(err, Error::InvalidConfig(_)));
    }
}
