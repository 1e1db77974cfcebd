use core::{
    alloc::{GlobalAlloc, Layout},
    ffi::{c_char, CStr},
    fmt, mem, ptr, slice,
    str::Utf8Error,
};
use std::alloc::{handle_alloc_error, System};

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{
    alloc::ScrubbingAllocator,
    error::{AllocError, Result},
    util::Region,
};

/// A byte string for secret material that zeroes its memory on release.
///
/// Every backing region is obtained from, and given back to, a
/// [`ScrubbingAllocator`], so no plaintext copy survives a `clear`, an
/// `assign`, a reallocation or the drop of the buffer. Content is always
/// stored on the heap, never inline, and is followed by a NUL terminator
/// that is not counted in [`len`](Self::len).
///
/// An empty buffer owns no allocation at all.
///
/// Equality is **not** constant-time.
pub struct SecureBuffer<A: GlobalAlloc = System> {
    region: Option<Region>,
    len: usize,
    alloc: ScrubbingAllocator<u8, A>,
}

impl SecureBuffer {
    /// Creates an empty buffer. Does not allocate.
    #[inline]
    pub const fn new() -> Self {
        Self::new_in(ScrubbingAllocator::new())
    }

    /// Creates a buffer holding a copy of `bytes`.
    ///
    /// # Arguments
    /// * `bytes` - Content to copy into a fresh region.
    ///
    /// # Returns
    /// The buffer if successful, or an [`AllocError`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_bytes_in(bytes, ScrubbingAllocator::new())
    }

    /// Creates a buffer from a NUL-terminated string, without its terminator.
    ///
    /// # Arguments
    /// * `s` - Null-terminated source; the terminator is not copied as content.
    ///
    /// # Returns
    /// The buffer if successful, or an [`AllocError`].
    pub fn from_c_str(s: &CStr) -> Result<Self> {
        Self::from_bytes(s.to_bytes())
    }
}

impl<A: GlobalAlloc> SecureBuffer<A> {
    /// Creates an empty buffer using `alloc`. Does not allocate.
    ///
    /// # Arguments
    /// * `alloc` - Allocator every future region goes through.
    #[inline]
    pub const fn new_in(alloc: ScrubbingAllocator<u8, A>) -> Self {
        Self {
            region: None,
            len: 0,
            alloc,
        }
    }

    /// Creates a buffer holding a copy of `bytes`, allocated with `alloc`.
    ///
    /// # Arguments
    /// * `bytes` - Content to copy into a fresh region.
    /// * `alloc` - Allocator every region of the buffer goes through.
    ///
    /// # Returns
    /// The buffer if successful, or an [`AllocError`].
    pub fn from_bytes_in(bytes: &[u8], alloc: ScrubbingAllocator<u8, A>) -> Result<Self> {
        let mut this = Self::new_in(alloc);
        this.assign(bytes)?;
        Ok(this)
    }

    /// Returns the allocator backing this buffer.
    #[inline]
    pub fn allocator(&self) -> &ScrubbingAllocator<u8, A> {
        &self.alloc
    }

    /// Number of content bytes, terminator excluded.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of content bytes the current region can hold without
    /// reallocating. Zero when nothing is allocated.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.region.as_ref().map_or(0, |region| region.len() - 1)
    }

    /// Content bytes, terminator excluded.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        match &self.region {
            Some(region) => unsafe { slice::from_raw_parts(region.as_ptr(), self.len) },
            None => &[],
        }
    }

    /// Mutable content bytes. The terminator is not reachable from here.
    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        match &mut self.region {
            Some(region) => unsafe { slice::from_raw_parts_mut(region.as_ptr(), self.len) },
            None => &mut [],
        }
    }

    /// Content bytes followed by the NUL terminator.
    #[inline]
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        match &self.region {
            Some(region) => unsafe { slice::from_raw_parts(region.as_ptr(), self.len + 1) },
            None => b"\0",
        }
    }

    /// Pointer to the NUL-terminated content, valid until the next mutation.
    ///
    /// Never null: an empty buffer points at a static NUL byte. Content that
    /// contains NUL bytes itself is cut short when read as a C string.
    #[inline]
    pub fn as_ptr(&self) -> *const c_char {
        self.as_bytes_with_nul().as_ptr().cast()
    }

    /// Content as UTF-8.
    ///
    /// # Errors
    /// Fails if the content is not valid UTF-8.
    #[inline]
    pub fn as_str(&self) -> core::result::Result<&str, Utf8Error> {
        core::str::from_utf8(self.as_bytes())
    }

    /// Replaces the content with a copy of `src`.
    ///
    /// The current region is scrubbed and released first, even when `src`
    /// is empty. If allocating the new region fails the buffer is left empty.
    ///
    /// # Errors
    /// Fails if the new region cannot be allocated.
    pub fn assign(&mut self, src: &[u8]) -> Result<()> {
        self.clear();
        if src.is_empty() {
            return Ok(());
        }

        let region = self.alloc_region(src.len() + 1)?;
        unsafe {
            ptr::copy_nonoverlapping(src.as_ptr(), region.as_ptr(), src.len());
            region.as_ptr().add(src.len()).write(0);
        }

        self.region = Some(region);
        self.len = src.len();
        Ok(())
    }

    /// Appends a copy of `src`.
    ///
    /// Appending nothing is a no-op. Otherwise content is written in place
    /// when the region has room, or moved to a new region of exactly the
    /// required size, in which case the old region is scrubbed and released.
    /// On failure the buffer is unchanged.
    ///
    /// # Errors
    /// Fails if a larger region is needed and cannot be allocated.
    pub fn append(&mut self, src: &[u8]) -> Result<()> {
        if src.is_empty() {
            return Ok(());
        }

        // Both lengths are at most `isize::MAX`, so the sum fits.
        let new_len = self.len + src.len();
        self.grow_to(new_len)?;

        if let Some(region) = &self.region {
            unsafe {
                ptr::copy_nonoverlapping(src.as_ptr(), region.as_ptr().add(self.len), src.len());
                region.as_ptr().add(new_len).write(0);
            }
        }

        self.len = new_len;
        Ok(())
    }

    /// Makes room for at least `additional` more content bytes.
    ///
    /// An empty buffer stays unallocated: its first region is sized by the
    /// next `assign` or `append`. Otherwise, when the region has to move, the
    /// old one is scrubbed and released.
    ///
    /// # Errors
    /// [`AllocError::Overflow`] (with `count` set to `additional`) if the
    /// total size is not representable, or any allocation failure.
    pub fn reserve(&mut self, additional: usize) -> Result<()> {
        if self.is_empty() {
            return Ok(());
        }

        match self.len.checked_add(additional) {
            Some(min_len) => self.grow_to(min_len),
            None => Err(AllocError::Overflow {
                count: additional,
                elem_size: 1,
            }),
        }
    }

    /// Scrubs the whole region, terminator included, then releases it.
    ///
    /// Clearing an empty buffer does nothing.
    pub fn clear(&mut self) {
        self.len = 0;
        if let Some(region) = self.region.take() {
            self.release(region);
        }
    }

    /// Exchanges content with `other` without copying or scrubbing.
    ///
    /// Allocators travel with their regions, so each region is still
    /// released by the backend that allocated it.
    #[inline]
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(self, other);
    }

    /// Ensures the region holds `min_len` content bytes plus the terminator.
    fn grow_to(&mut self, min_len: usize) -> Result<()> {
        if self.region.is_some() && self.capacity() >= min_len {
            return Ok(());
        }

        let size = min_len.checked_add(1).ok_or(AllocError::Overflow {
            count: min_len,
            elem_size: 1,
        })?;

        let region = self.alloc_region(size)?;
        unsafe {
            ptr::copy_nonoverlapping(self.as_bytes().as_ptr(), region.as_ptr(), self.len);
            ptr::write_bytes(region.as_ptr().add(self.len), 0, size - self.len);
        }

        log::trace!("moved {} bytes into a region of {} bytes", self.len, size);
        if let Some(old) = self.region.replace(region) {
            self.release(old);
        }

        Ok(())
    }

    fn alloc_region(&self, size: usize) -> Result<Region> {
        let ptr = self.alloc.allocate(size)?;
        Ok(unsafe { Region::from_raw_parts(ptr, size) })
    }

    fn release(&self, region: Region) {
        unsafe { self.alloc.deallocate(region.as_ptr(), region.len()) }
    }
}

impl<A: GlobalAlloc + Clone> SecureBuffer<A> {
    /// Deep copy of this buffer in a fresh region.
    ///
    /// # Errors
    /// Fails if the new region cannot be allocated.
    pub fn try_clone(&self) -> Result<Self> {
        Self::from_bytes_in(self.as_bytes(), self.alloc.clone())
    }

    /// Moves the content out, leaving this buffer empty.
    ///
    /// Ownership of the region is transferred; no byte is copied.
    #[inline]
    pub fn take(&mut self) -> Self {
        let empty = Self::new_in(self.alloc.clone());
        mem::replace(self, empty)
    }
}

impl<A: GlobalAlloc> Drop for SecureBuffer<A> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<A: GlobalAlloc + Default> Default for SecureBuffer<A> {
    #[inline]
    fn default() -> Self {
        Self::new_in(ScrubbingAllocator::default())
    }
}

impl<A: GlobalAlloc + Clone> Clone for SecureBuffer<A> {
    fn clone(&self) -> Self {
        match self.try_clone() {
            Ok(clone) => clone,
            Err(_) => handle_alloc_error(region_layout(self.len)),
        }
    }

    fn clone_from(&mut self, source: &Self) {
        if self.assign(source.as_bytes()).is_err() {
            handle_alloc_error(region_layout(source.len))
        }
    }
}

/// Layout reported to `handle_alloc_error` for a region holding `len` bytes.
fn region_layout(len: usize) -> Layout {
    Layout::array::<u8>(len.saturating_add(1)).unwrap_or(Layout::new::<u8>())
}

impl<A: GlobalAlloc> Zeroize for SecureBuffer<A> {
    #[inline]
    fn zeroize(&mut self) {
        self.clear();
    }
}

impl<A: GlobalAlloc> ZeroizeOnDrop for SecureBuffer<A> {}

impl<A: GlobalAlloc> fmt::Debug for SecureBuffer<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureBuffer")
            .field("data", &"REDACTED")
            .field("len", &self.len)
            .finish()
    }
}

impl<A: GlobalAlloc> AsRef<[u8]> for SecureBuffer<A> {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl<A: GlobalAlloc> AsMut<[u8]> for SecureBuffer<A> {
    #[inline]
    fn as_mut(&mut self) -> &mut [u8] {
        self.as_bytes_mut()
    }
}

impl TryFrom<&[u8]> for SecureBuffer {
    type Error = AllocError;

    fn try_from(value: &[u8]) -> Result<Self> {
        Self::from_bytes(value)
    }
}

impl TryFrom<&str> for SecureBuffer {
    type Error = AllocError;

    fn try_from(value: &str) -> Result<Self> {
        Self::from_bytes(value.as_bytes())
    }
}

impl TryFrom<&CStr> for SecureBuffer {
    type Error = AllocError;

    fn try_from(value: &CStr) -> Result<Self> {
        Self::from_c_str(value)
    }
}

impl<A: GlobalAlloc, B: GlobalAlloc> PartialEq<SecureBuffer<B>> for SecureBuffer<A> {
    #[inline]
    fn eq(&self, other: &SecureBuffer<B>) -> bool {
        self.len == other.len && self.as_bytes() == other.as_bytes()
    }
}

impl<A: GlobalAlloc> Eq for SecureBuffer<A> {}

impl<A: GlobalAlloc> PartialEq<[u8]> for SecureBuffer<A> {
    #[inline]
    fn eq(&self, other: &[u8]) -> bool {
        self.as_bytes() == other
    }
}

impl<A: GlobalAlloc> PartialEq<&[u8]> for SecureBuffer<A> {
    #[inline]
    fn eq(&self, other: &&[u8]) -> bool {
        self.as_bytes() == *other
    }
}

impl<A: GlobalAlloc> PartialEq<str> for SecureBuffer<A> {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl<A: GlobalAlloc> PartialEq<&str> for SecureBuffer<A> {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl<A: GlobalAlloc> PartialEq<SecureBuffer<A>> for [u8] {
    #[inline]
    fn eq(&self, other: &SecureBuffer<A>) -> bool {
        other == self
    }
}

impl<A: GlobalAlloc> PartialEq<SecureBuffer<A>> for &[u8] {
    #[inline]
    fn eq(&self, other: &SecureBuffer<A>) -> bool {
        other == self
    }
}

impl<A: GlobalAlloc> PartialEq<SecureBuffer<A>> for str {
    #[inline]
    fn eq(&self, other: &SecureBuffer<A>) -> bool {
        other == self
    }
}

impl<A: GlobalAlloc> PartialEq<SecureBuffer<A>> for &str {
    #[inline]
    fn eq(&self, other: &SecureBuffer<A>) -> bool {
        other == self
    }
}
