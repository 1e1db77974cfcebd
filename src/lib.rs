//! Byte strings for secret material (passwords, keys, tokens) that zero
//! their memory whenever it is released.
//!
//! Erasure is enforced in one place, the [`ScrubbingAllocator`]: every region
//! it hands out is overwritten with zeros before going back to the underlying
//! allocator. [`SecureBuffer`] routes all of its allocations through it and
//! never stores content inline.
//!
//! ```rust
//! use secure_string::SecureBuffer;
//!
//! let mut password = SecureBuffer::from_bytes(b"hunter")?;
//! password.append(b"2")?;
//! assert_eq!(password, "hunter2");
//!
//! // The region is zeroed before it is freed.
//! password.clear();
//! assert!(password.is_empty());
//! # Ok::<(), secure_string::AllocError>(())
//! ```
//!
//! This crate does not lock pages in memory, does not keep secrets out of
//! swap and does not compare in constant time.

mod alloc;
mod error;
mod string;
mod util;

#[cfg(test)]
mod tests;

pub use alloc::ScrubbingAllocator;
pub use error::{AllocError, Result};
pub use string::SecureBuffer;
