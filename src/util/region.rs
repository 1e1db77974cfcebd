use core::ptr::NonNull;

/// An owned, unaliased pointer to a backing region of `len` initialized bytes.
///
/// Whoever holds a `Region` is the only owner of the bytes behind it. The
/// type does not free anything on drop; releasing the region (and scrubbing
/// it) is the job of the allocator it came from.
pub(crate) struct Region {
    ptr: NonNull<u8>,
    len: usize,
}

impl Region {
    /// Takes ownership of `len` bytes at `ptr`.
    ///
    /// # Safety
    /// `ptr` must be a live allocation of exactly `len` bytes that nothing
    /// else owns or aliases.
    #[inline]
    pub const unsafe fn from_raw_parts(ptr: NonNull<u8>, len: usize) -> Self {
        Self { ptr, len }
    }

    /// Acquires the underlying `*mut` pointer.
    #[inline]
    pub const fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// Size of the region in bytes.
    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }
}

/// `Region` is `Send` because the bytes it references are unaliased.
unsafe impl Send for Region {}

/// `Region` is `Sync` because shared access only ever reads the bytes.
unsafe impl Sync for Region {}
