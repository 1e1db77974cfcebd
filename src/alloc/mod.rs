mod api;
mod scrub;

use core::{
    alloc::{GlobalAlloc, Layout},
    fmt,
    marker::PhantomData,
    mem,
    ptr::{self, NonNull},
};
use std::alloc::System;

use crate::error::{AllocError, Result};

use scrub::{scrub, ScrubOnExit};

/// A stateless allocator that zeroes every region it hands out before the
/// region goes back to the underlying allocator.
///
/// The underlying allocator `A` defaults to [`System`]. Any two instances
/// sharing the same backend compare equal, so the allocator can be copied,
/// moved and propagated between containers freely.
///
/// Besides the typed `allocate`/`deallocate`/`construct`/`destroy` set, the
/// allocator implements [`allocator_api2::alloc::Allocator`], which lets it
/// back an [`allocator_api2::vec::Vec`] or any other generic container.
pub struct ScrubbingAllocator<T, A = System> {
    backend: A,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ScrubbingAllocator<T> {
    /// Creates an allocator backed by the system allocator.
    #[inline]
    pub const fn new() -> Self {
        Self::with_backend(System)
    }
}

impl<T, A: GlobalAlloc> ScrubbingAllocator<T, A> {
    /// Creates an allocator on top of `backend`.
    ///
    /// `backend` is expected to be a zero-sized, stateless value: equality
    /// between allocators ignores it.
    ///
    /// # Arguments
    /// * `backend` - Allocator that regions come from and are released to.
    #[inline]
    pub const fn with_backend(backend: A) -> Self {
        Self {
            backend,
            _marker: PhantomData,
        }
    }

    /// Returns the underlying allocator.
    #[inline]
    pub fn backend(&self) -> &A {
        &self.backend
    }

    /// Returns the same allocator for elements of type `U`.
    #[inline]
    pub fn rebind<U>(self) -> ScrubbingAllocator<U, A> {
        ScrubbingAllocator::with_backend(self.backend)
    }

    /// Allocates uninitialized storage for `n` values of type `T`.
    ///
    /// Zero-sized requests (`n == 0` or a zero-sized `T`) return a dangling,
    /// well-aligned pointer without touching the backend.
    ///
    /// # Arguments
    /// * `n` - Number of elements to make room for.
    ///
    /// # Returns
    /// A pointer to the uninitialized storage if successful, otherwise
    /// * [`AllocError::Overflow`] if `n * size_of::<T>()` is not representable.
    /// * [`AllocError::OutOfMemory`] if the backend returns null.
    pub fn allocate(&self, n: usize) -> Result<NonNull<T>> {
        let layout = array_layout::<T>(n)?;
        if layout.size() == 0 {
            return Ok(NonNull::dangling());
        }

        unsafe { self.alloc_bytes(layout) }.map(NonNull::cast)
    }

    /// Zeroes and releases storage obtained from [`allocate`](Self::allocate).
    ///
    /// A null `ptr` is a no-op, and so is a zero-sized region.
    ///
    /// # Arguments
    /// * `ptr` - Start of the storage, or null.
    /// * `n` - Element count passed to the matching `allocate`.
    ///
    /// # Safety
    /// A non-null `ptr` must come from `allocate(n)` on an allocator equal to
    /// this one, with the same `n`, and must not have been released already.
    pub unsafe fn deallocate(&self, ptr: *mut T, n: usize) {
        let Some(ptr) = NonNull::new(ptr) else {
            return;
        };

        // Same `n` as the matching `allocate`, so neither step can fail.
        let size = mem::size_of::<T>().wrapping_mul(n);
        if size == 0 {
            return;
        }

        let layout = unsafe { Layout::from_size_align_unchecked(size, mem::align_of::<T>()) };
        unsafe { self.release_bytes(ptr.cast(), layout) }
    }

    /// Writes `value` into the uninitialized slot at `ptr`.
    ///
    /// # Safety
    /// `ptr` must be valid for writes and properly aligned for `T`.
    #[inline]
    pub unsafe fn construct(&self, ptr: NonNull<T>, value: T) {
        unsafe { ptr.as_ptr().write(value) }
    }

    /// Builds a value with `init` and writes it into the slot at `ptr`.
    ///
    /// If `init` panics the slot is left untouched and unscrubbed. The caller
    /// still owns the storage and must release it through
    /// [`deallocate`](Self::deallocate), which zeroes it.
    ///
    /// # Safety
    /// `ptr` must be valid for writes and properly aligned for `T`.
    #[inline]
    pub unsafe fn construct_with<F>(&self, ptr: NonNull<T>, init: F)
    where
        F: FnOnce() -> T,
    {
        unsafe { self.construct(ptr, init()) }
    }

    /// Drops the value at `ptr` in place, then zeroes its `size_of::<T>()` bytes.
    ///
    /// The zeroing also runs if the value's destructor panics. A null `ptr`
    /// is a no-op.
    ///
    /// # Safety
    /// A non-null `ptr` must point to an initialized `T` that is not used
    /// again afterwards except to be released or overwritten.
    pub unsafe fn destroy(&self, ptr: *mut T) {
        let Some(ptr) = NonNull::new(ptr) else {
            return;
        };

        let _scrub = unsafe { ScrubOnExit::new(ptr.cast(), mem::size_of::<T>()) };
        unsafe { ptr::drop_in_place(ptr.as_ptr()) };
    }

    /// Single entry point into the backend for every non-empty allocation.
    ///
    /// # Safety
    /// `layout` must have a non-zero size.
    pub(crate) unsafe fn alloc_bytes(&self, layout: Layout) -> Result<NonNull<u8>> {
        match NonNull::new(unsafe { self.backend.alloc(layout) }) {
            Some(ptr) => {
                log::trace!("allocated {} bytes", layout.size());
                Ok(ptr)
            }
            None => {
                log::debug!("backend refused an allocation of {} bytes", layout.size());
                Err(AllocError::OutOfMemory {
                    size: layout.size(),
                })
            }
        }
    }

    /// Single exit point to the backend: zeroes the region, then releases it.
    ///
    /// # Safety
    /// `ptr` must be a live region of `layout` obtained from `alloc_bytes`.
    pub(crate) unsafe fn release_bytes(&self, ptr: NonNull<u8>, layout: Layout) {
        unsafe {
            scrub(ptr, layout.size());
            self.backend.dealloc(ptr.as_ptr(), layout);
        }

        log::trace!("scrubbed and released {} bytes", layout.size());
    }
}

fn array_layout<T>(n: usize) -> Result<Layout> {
    let elem_size = mem::size_of::<T>();
    let overflow = AllocError::Overflow {
        count: n,
        elem_size,
    };

    // Checked before multiplying.
    if elem_size != 0 && n > usize::MAX / elem_size {
        return Err(overflow);
    }

    Layout::from_size_align(elem_size * n, mem::align_of::<T>()).map_err(|_| overflow)
}

impl<T, A: GlobalAlloc + Default> Default for ScrubbingAllocator<T, A> {
    #[inline]
    fn default() -> Self {
        Self::with_backend(A::default())
    }
}

impl<T, A: Clone> Clone for ScrubbingAllocator<T, A> {
    #[inline]
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T, A: Copy> Copy for ScrubbingAllocator<T, A> {}

impl<T, U, A> PartialEq<ScrubbingAllocator<U, A>> for ScrubbingAllocator<T, A> {
    #[inline]
    fn eq(&self, _: &ScrubbingAllocator<U, A>) -> bool {
        true
    }
}

impl<T, A> Eq for ScrubbingAllocator<T, A> {}

impl<T, A> fmt::Debug for ScrubbingAllocator<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScrubbingAllocator")
            .field("element", &core::any::type_name::<T>())
            .finish()
    }
}
