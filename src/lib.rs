//! # regionalloc
//!
//! Three memory allocation strategies over a region of memory requested from
//! the OS, all sharing the same [`Allocator`] contract:
//!
//! - [`LinearAllocator`]: bump pointer, no individual deallocation.
//! - [`StackAllocator`]: bump pointer that can be rewound in LIFO order.
//! - [`FreeListAllocator`]: general purpose, first fit with block splitting
//!   and coalescing of adjacent free blocks.
//!
//! Every allocator owns exactly one [`Region`]:
//!
//! ```text
//! +-------------------------------------------------------------------+
//! |                            Region                                 |
//! |  +--------+-----------+--------+------------------+------------+  |
//! |  | alloc  |   free    | alloc  |      alloc       |    free    |  |
//! |  +--------+-----------+--------+------------------+------------+  |
//! +-------------------------------------------------------------------+
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use regionalloc::{Allocator, FreeListAllocator};
//!
//! let mut allocator = FreeListAllocator::new(4096);
//!
//! let ptr = allocator.allocate(100, 8).unwrap();
//! assert_eq!(ptr.as_ptr() as usize % 8, 0);
//!
//! unsafe {
//!     ptr.as_ptr().write(23);
//!     allocator.deallocate(ptr.as_ptr()).unwrap();
//! }
//!
//! assert_eq!(allocator.remaining_memory(), 4096);
//! ```
//!
//! ## Errors
//!
//! Bad input (zero sizes, null pointers) and exhausted memory are returned as
//! [`AllocError`]. A corrupted allocator (accounting that goes out of range,
//! the OS refusing to map a region, initializing a region twice) panics.
//!
//! ## Thread Safety
//!
//! The allocators are `Send` but not `Sync`. Wrap them in [`Locked`] to share
//! one between threads.
//!
//! ## Logging
//!
//! Operations emit [`tracing`] events: `debug` for every allocation and
//! deallocation, `warn` when memory runs out, `error` right before a fatal
//! panic. The crate never installs a subscriber.

mod align;
mod allocator;
mod block;
mod error;
mod freelist;
mod kernel;
mod linear;
mod list;
mod region;
mod stack;
mod sync;

pub use align::{align_adjustment, align_adjustment_with_header};
pub use allocator::{Allocator, AllocatorKind};
pub use block::{FreeBlock, HEADER_SIZE, STACK_HEADER_SIZE};
pub use error::{AllocError, Result};
pub use freelist::{FreeListAllocator, HEADER_ROOM, MIN_BLOCK_SIZE};
pub use linear::LinearAllocator;
pub use region::Region;
pub use stack::StackAllocator;
pub use sync::Locked;

/// Region size used by the `Default` implementations.
pub const DEFAULT_REGION_SIZE: usize = 4096;
