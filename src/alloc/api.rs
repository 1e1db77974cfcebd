use core::{
    alloc::{GlobalAlloc, Layout},
    ptr::NonNull,
};

use allocator_api2::alloc::{AllocError, Allocator};

use super::ScrubbingAllocator;

// `grow` and `shrink` keep the trait's default allocate-copy-deallocate
// path, so the region being replaced always goes through `deallocate`.
unsafe impl<T, A: GlobalAlloc> Allocator for ScrubbingAllocator<T, A> {
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        if layout.size() == 0 {
            // Non-zero alignment, so the address is never null.
            let dangling = unsafe { NonNull::new_unchecked(layout.align() as *mut u8) };
            return Ok(NonNull::slice_from_raw_parts(dangling, 0));
        }

        match unsafe { self.alloc_bytes(layout) } {
            Ok(ptr) => Ok(NonNull::slice_from_raw_parts(ptr, layout.size())),
            Err(_) => Err(AllocError),
        }
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        if layout.size() == 0 {
            return;
        }

        unsafe { self.release_bytes(ptr, layout) }
    }
}
