use thiserror::Error;

/// Errors reported by [`ScrubbingAllocator::allocate`](crate::ScrubbingAllocator::allocate)
/// and by every [`SecureBuffer`](crate::SecureBuffer) operation that allocates.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// `count * elem_size` does not fit in a `usize` (or exceeds `isize::MAX`).
    #[error("allocation of {count} elements of {elem_size} bytes overflows")]
    Overflow { count: usize, elem_size: usize },

    /// The underlying allocator could not satisfy a request of `size` bytes.
    #[error("out of memory while allocating {size} bytes")]
    OutOfMemory { size: usize },
}

pub type Result<T> = core::result::Result<T, AllocError>;

#[cfg(feature = "std")]
impl From<AllocError> for std::io::Error {
    fn from(err: AllocError) -> Self {
        let kind = match err {
            AllocError::Overflow { .. } => std::io::ErrorKind::InvalidInput,
            AllocError::OutOfMemory { .. } => std::io::ErrorKind::OutOfMemory,
        };

        std::io::Error::new(kind, err)
    }
}
