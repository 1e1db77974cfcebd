use core::ptr::{self, NonNull};

use zeroize::Zeroize;

/// Overwrites `len` bytes starting at `ptr` with zeros.
///
/// The write goes through [`Zeroize`], which uses volatile stores followed by
/// a compiler fence, so it survives even when the region is freed right after.
///
/// # Safety
/// `ptr` must be valid for writes of `len` bytes.
#[inline]
pub(crate) unsafe fn scrub(ptr: NonNull<u8>, len: usize) {
    if len == 0 {
        return;
    }

    Zeroize::zeroize({
        let bytes_slice = ptr::slice_from_raw_parts_mut(ptr.as_ptr(), len);
        unsafe { &mut *bytes_slice }
    });
}

/// Scrubs a region when dropped, including while unwinding.
pub(crate) struct ScrubOnExit {
    ptr: NonNull<u8>,
    len: usize,
}

impl ScrubOnExit {
    /// # Safety
    /// `ptr` must stay valid for writes of `len` bytes until the guard is dropped.
    #[inline]
    pub(crate) const unsafe fn new(ptr: NonNull<u8>, len: usize) -> Self {
        Self { ptr, len }
    }
}

impl Drop for ScrubOnExit {
    fn drop(&mut self) {
        unsafe { scrub(self.ptr, self.len) }
    }
}
