use core::ffi::CStr;

use super::recording::{is_zeroed, recorded, Exhausted, RecordedBuffer, Recording, Tagged};
use crate::{AllocError, ScrubbingAllocator, SecureBuffer};

// =============================================================================
// new() / from_bytes()
// =============================================================================

#[test]
fn test_new_is_empty_and_unallocated() {
    Recording::reset();
    let s = RecordedBuffer::default();

    assert!(s.is_empty());
    assert_eq!(s.len(), 0);
    assert_eq!(s.capacity(), 0);
    assert_eq!(s.as_bytes(), b"");
    assert_eq!(s.as_bytes_with_nul(), b"\0");
    assert!(!s.as_ptr().is_null());
    assert_eq!(Recording::events().allocations, 0);
}

#[test]
fn test_from_bytes() {
    let s = SecureBuffer::from_bytes(b"hello").expect("Failed to create buffer");

    assert_eq!(s.len(), 5);
    assert_eq!(s.as_bytes(), b"hello");
    assert_eq!(s.as_bytes_with_nul(), b"hello\0");
    assert_eq!(s.capacity(), 5);
}

#[test]
fn test_from_c_str() {
    let c = CStr::from_bytes_with_nul(b"token\0").expect("Invalid C string");
    let s = SecureBuffer::from_c_str(c).expect("Failed to create buffer");

    assert_eq!(s, "token");
    let back = unsafe { CStr::from_ptr(s.as_ptr()) };
    assert_eq!(back, c);
}

#[test]
fn test_try_from() {
    let a: SecureBuffer = "secret".try_into().expect("Failed to create buffer");
    let b: SecureBuffer = (&b"secret"[..]).try_into().expect("Failed to create buffer");

    assert_eq!(a, b);
}

#[test]
fn test_from_bytes_out_of_memory() {
    let alloc = ScrubbingAllocator::with_backend(Exhausted);
    let err = SecureBuffer::from_bytes_in(b"abc", alloc).expect_err("Allocation should fail");

    assert_eq!(err, AllocError::OutOfMemory { size: 4 });
}

#[test]
fn test_from_empty_bytes_does_not_allocate() {
    Recording::reset();
    let s = recorded(b"");

    assert!(s.is_empty());
    assert_eq!(Recording::events().allocations, 0);
}

// =============================================================================
// clear()
// =============================================================================

#[test]
fn test_clear_scrubs_whole_region() {
    Recording::reset();
    let mut s = recorded(b"clear_me");
    s.clear();

    assert!(s.is_empty());
    assert_eq!(s.capacity(), 0);

    let events = Recording::events();
    assert_eq!(events.deallocations, 1);
    // Content plus terminator.
    assert_eq!(events.released[0].len(), 9);
    assert!(is_zeroed(&events.released[0]));
}

#[test]
fn test_clear_empty_is_noop() {
    Recording::reset();
    let mut s = recorded(b"");
    s.clear();
    s.clear();

    let events = Recording::events();
    assert_eq!(events.allocations, 0);
    assert_eq!(events.deallocations, 0);
}

#[test]
fn test_drop_scrubs() {
    Recording::reset();
    drop(recorded(b"dropped secret"));

    let events = Recording::events();
    assert_eq!(events.deallocations, 1);
    assert!(is_zeroed(&events.released[0]));
}

#[test]
fn test_zeroize_clears() {
    use zeroize::Zeroize;

    Recording::reset();
    let mut s = recorded(b"zeroize me");
    s.zeroize();

    assert!(s.is_empty());
    assert!(is_zeroed(&Recording::events().released[0]));
}

// =============================================================================
// assign()
// =============================================================================

#[test]
fn test_assign_shorter_scrubs_old_region_entirely() {
    Recording::reset();
    let mut s = recorded(b"a rather long password");
    s.assign(b"short").expect("Failed to assign");

    assert_eq!(s, "short");
    assert_eq!(s.as_bytes_with_nul(), b"short\0");

    let events = Recording::events();
    assert_eq!(events.released.len(), 1);
    assert_eq!(events.released[0].len(), 23);
    assert!(is_zeroed(&events.released[0]));
}

#[test]
fn test_assign_empty_still_scrubs() {
    Recording::reset();
    let mut s = recorded(b"secret");
    s.assign(b"").expect("Failed to assign");

    assert!(s.is_empty());
    let events = Recording::events();
    assert_eq!(events.allocations, 1);
    assert_eq!(events.deallocations, 1);
    assert!(is_zeroed(&events.released[0]));
}

#[test]
fn test_assign_longer() {
    let mut s = SecureBuffer::from_bytes(b"pw").expect("Failed to create buffer");
    s.assign(b"much longer password").expect("Failed to assign");

    assert_eq!(s, "much longer password");
}

// =============================================================================
// append()
// =============================================================================

#[test]
fn test_append() {
    let mut s = SecureBuffer::from_bytes(b"hello").expect("Failed to create buffer");
    s.append(b" world").expect("Failed to append");

    assert_eq!(s, "hello world");
    assert_eq!(s.as_bytes_with_nul(), b"hello world\0");
}

#[test]
fn test_append_to_empty() {
    let mut s = SecureBuffer::new();
    s.append(b"first").expect("Failed to append");

    assert_eq!(s, "first");
}

#[test]
fn test_append_reallocation_scrubs_old_region() {
    Recording::reset();
    let mut s = recorded(b"abc");
    s.append(b"def").expect("Failed to append");

    assert_eq!(s, "abcdef");
    assert_eq!(s.capacity(), 6);

    let events = Recording::events();
    assert_eq!(events.allocations, 2);
    assert_eq!(events.released.len(), 1);
    assert_eq!(events.released[0].len(), 4);
    assert!(is_zeroed(&events.released[0]));
}

#[test]
fn test_append_empty_is_noop() {
    Recording::reset();
    let mut s = recorded(b"abc");
    let before = s.as_ptr();

    s.append(b"").expect("Failed to append");

    assert_eq!(s, "abc");
    assert_eq!(s.as_ptr(), before);
    let events = Recording::events();
    assert_eq!(events.allocations, 1);
    assert_eq!(events.deallocations, 0);
}

#[test]
fn test_append_within_reserved_capacity_stays_in_place() {
    Recording::reset();
    let mut s = recorded(b"abc");
    s.reserve(16).expect("Failed to reserve");
    let before = s.as_ptr();
    let allocations = Recording::events().allocations;

    s.append(b"defgh").expect("Failed to append");

    assert_eq!(s, "abcdefgh");
    assert_eq!(s.as_bytes_with_nul(), b"abcdefgh\0");
    assert_eq!(s.as_ptr(), before);
    assert_eq!(Recording::events().allocations, allocations);
}

#[test]
fn test_append_out_of_memory_leaves_buffer_unchanged() {
    let alloc = ScrubbingAllocator::with_backend(Exhausted);
    let mut s = SecureBuffer::new_in(alloc);

    let err = s.append(b"data").expect_err("Allocation should fail");
    assert_eq!(err, AllocError::OutOfMemory { size: 5 });
    assert!(s.is_empty());
    assert_eq!(s.capacity(), 0);
}

// =============================================================================
// reserve()
// =============================================================================

#[test]
fn test_reserve_moves_and_scrubs() {
    Recording::reset();
    let mut s = recorded(b"key");
    s.reserve(10).expect("Failed to reserve");

    assert_eq!(s, "key");
    assert!(s.capacity() >= 13);
    assert_eq!(s.as_bytes_with_nul(), b"key\0");
    assert!(is_zeroed(&Recording::events().released[0]));
}

#[test]
fn test_reserve_overflow() {
    let mut s = SecureBuffer::from_bytes(b"x").expect("Failed to create buffer");
    let err = s.reserve(usize::MAX).expect_err("Reserve should overflow");

    assert!(matches!(err, AllocError::Overflow { .. }));
    assert_eq!(s, "x");
}

#[test]
fn test_reserve_on_empty_stays_unallocated() {
    Recording::reset();
    let mut s = recorded(b"");
    s.reserve(8).expect("Failed to reserve");

    assert!(s.is_empty());
    assert_eq!(s.capacity(), 0);
    assert_eq!(s.as_bytes_with_nul(), b"\0");
    assert_eq!(s.as_ptr(), SecureBuffer::new().as_ptr());
    assert_eq!(Recording::events().allocations, 0);

    s.append(b"key").expect("Failed to append");
    assert_eq!(s.capacity(), 3);
}

// =============================================================================
// Moves, swap(), clone
// =============================================================================

#[test]
fn test_move() {
    let s1 = SecureBuffer::from_bytes(b"move_me").expect("Failed to create buffer");
    let s2 = s1;

    assert_eq!(s2, "move_me");
}

#[test]
fn test_take_leaves_source_empty_without_copying() {
    Recording::reset();
    let mut s1 = recorded(b"move_me");
    let ptr = s1.as_ptr();

    let s2 = s1.take();

    assert!(s1.is_empty());
    assert_eq!(s2, "move_me");
    assert_eq!(s2.as_ptr(), ptr);
    let events = Recording::events();
    assert_eq!(events.allocations, 1);
    assert_eq!(events.deallocations, 0);
}

#[test]
fn test_swap() {
    Recording::reset();
    let mut a = recorded(b"alpha");
    let mut b = recorded(b"be");
    a.swap(&mut b);

    assert_eq!(a, "be");
    assert_eq!(b, "alpha");
    assert_eq!(Recording::events().deallocations, 0);
}

#[test]
fn test_swap_exchanges_allocators() {
    Tagged::reset();
    let mut a = SecureBuffer::from_bytes_in(b"alpha", ScrubbingAllocator::with_backend(Tagged(1)))
        .expect("Failed to create buffer");
    let mut b = SecureBuffer::from_bytes_in(b"beta", ScrubbingAllocator::with_backend(Tagged(2)))
        .expect("Failed to create buffer");

    a.swap(&mut b);
    assert_eq!(a, "beta");
    assert_eq!(a.allocator().backend().0, 2);
    assert_eq!(b.allocator().backend().0, 1);

    drop(a);
    drop(b);

    // Each region went back to the backend that handed it out.
    let log = Tagged::log();
    assert_eq!(log.len(), 2);
    assert!(log.iter().all(|(allocated_by, released_by)| allocated_by == released_by));
}

#[test]
fn test_swap_with_empty() {
    let mut a = SecureBuffer::from_bytes(b"alpha").expect("Failed to create buffer");
    let mut b = SecureBuffer::new();
    a.swap(&mut b);

    assert!(a.is_empty());
    assert_eq!(b, "alpha");
}

#[test]
fn test_clone_is_deep() {
    let s1 = SecureBuffer::from_bytes(b"copy_me").expect("Failed to create buffer");
    let mut s2 = s1.clone();

    assert_eq!(s1, s2);
    assert_ne!(s1.as_ptr(), s2.as_ptr());

    s2.as_bytes_mut()[0] = b'C';
    assert_eq!(s1, "copy_me");
    assert_eq!(s2, "Copy_me");
}

#[test]
fn test_clone_from_scrubs_destination() {
    Recording::reset();
    let src = recorded(b"new");
    let mut dst = recorded(b"old secret");
    dst.clone_from(&src);

    assert_eq!(dst, "new");
    let events = Recording::events();
    assert_eq!(events.released.len(), 1);
    assert!(is_zeroed(&events.released[0]));
}

// =============================================================================
// Access and comparison
// =============================================================================

#[test]
fn test_as_bytes_mut_keeps_terminator() {
    let mut s = SecureBuffer::from_bytes(b"abc").expect("Failed to create buffer");
    s.as_mut().fill(b'z');

    assert_eq!(s.as_bytes_mut().len(), 3);
    assert_eq!(s.as_bytes_with_nul(), b"zzz\0");
}

#[test]
fn test_as_str() {
    let s = SecureBuffer::from_bytes("Hello 世界 🦀".as_bytes()).expect("Failed to create buffer");
    assert_eq!(s.as_str(), Ok("Hello 世界 🦀"));

    let s = SecureBuffer::from_bytes(&[0xFF, 0xFE]).expect("Failed to create buffer");
    assert!(s.as_str().is_err());
}

#[test]
fn test_equality() {
    let a = SecureBuffer::from_bytes(b"secret").expect("Failed to create buffer");
    let b = SecureBuffer::from_bytes(b"secret").expect("Failed to create buffer");
    let c = SecureBuffer::from_bytes(b"other").expect("Failed to create buffer");
    let d = SecureBuffer::from_bytes(b"secreT").expect("Failed to create buffer");

    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_ne!(a, d);
    assert_eq!(a, "secret");
    assert_eq!("secret", a);
    assert_eq!(a, &b"secret"[..]);
    assert_eq!(&b"secret"[..], a);
    assert_ne!(a, "secret\0");
    assert_eq!(SecureBuffer::new(), "");
}

#[test]
fn test_equality_across_backends() {
    let a = SecureBuffer::from_bytes(b"same").expect("Failed to create buffer");
    let b = recorded(b"same");

    assert!(a == b);
}

#[test]
fn test_debug_is_redacted() {
    let s = SecureBuffer::from_bytes(b"hunter2").expect("Failed to create buffer");
    let debug = format!("{s:?}");

    assert!(!debug.contains("hunter2"));
    assert!(debug.contains("REDACTED"));
}
