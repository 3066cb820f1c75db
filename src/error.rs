//! Errors returned by the allocators.
//!
//! Only caller mistakes and exhausted memory are reported through
//! [`AllocError`]. A broken internal invariant (accounting overflow, the OS
//! refusing to hand out a region, initializing a region twice) means the
//! allocator itself is corrupt and panics instead.

use thiserror::Error;

/// Recoverable allocator failures.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// Null pointer, zero size or zero alignment.
    #[error("invalid parameter")]
    InvalidParam,

    /// No free block is large enough for the request.
    #[error("out of memory")]
    OutOfMemory,

    /// The allocator does not implement the requested operation.
    #[error("operation not supported by this allocator")]
    Unsupported,
}

/// Result type for allocator operations.
pub type Result<T> = core::result::Result<T, AllocError>;
