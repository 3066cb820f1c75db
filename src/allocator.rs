use std::ptr::{self, NonNull};

use crate::{AllocError, FreeListAllocator, LinearAllocator, Result, StackAllocator};

/// Operations every allocation strategy of this crate provides.
///
/// Each allocator owns exactly one [`crate::Region`] and hands out pieces of
/// it. The trait is object safe, so strategies can be picked at runtime with
/// [`AllocatorKind::build`] as well as used through generics.
pub trait Allocator {
    /// Allocates `size` bytes aligned to `alignment`.
    ///
    /// `alignment` does not need to be a power of two, any non-zero value
    /// works.
    ///
    /// # Errors
    ///
    /// - [`AllocError::InvalidParam`] if `size` or `alignment` is zero.
    /// - [`AllocError::OutOfMemory`] if the request does not fit.
    fn allocate(&mut self, size: usize, alignment: usize) -> Result<NonNull<u8>>;

    /// Gives back memory obtained from [`Allocator::allocate`].
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a live pointer returned by this same allocator
    /// since its region was last initialized. Freeing twice or freeing a
    /// foreign pointer corrupts the allocator; it is not detected.
    unsafe fn deallocate(&mut self, ptr: *mut u8) -> Result<()>;

    /// Optimistic check of whether `size` bytes could be allocated. It ignores
    /// alignment and header costs.
    fn enough_memory(&self, size: usize) -> bool;

    /// Releases the region. The allocator can't be used again until
    /// [`Allocator::init_memory`] is called.
    fn clear_memory(&mut self) -> Result<()>;

    /// Acquires a fresh region of `size` bytes.
    ///
    /// # Panics
    ///
    /// Panics if the allocator still owns a region.
    fn init_memory(&mut self, size: usize) -> Result<()>;

    fn remaining_memory(&self) -> usize;

    fn in_use_memory(&self) -> usize;

    fn total_memory(&self) -> usize;

    /// Out-pointer flavour of [`Allocator::allocate`].
    ///
    /// A missing `out` is reported as [`AllocError::InvalidParam`]. On any
    /// failure `out` is set to null.
    fn allocate_into(&mut self, size: usize, alignment: usize, out: Option<&mut *mut u8>) -> Result<()> {
        let Some(out) = out else {
            return Err(AllocError::InvalidParam);
        };

        match self.allocate(size, alignment) {
            Ok(ptr) => {
                *out = ptr.as_ptr();
                Ok(())
            }
            Err(err) => {
                *out = ptr::null_mut();
                Err(err)
            }
        }
    }
}

/// Rejects the requests every strategy considers invalid.
pub(crate) fn check_request(size: usize, alignment: usize) -> Result<()> {
    if size == 0 || alignment == 0 {
        tracing::debug!(size, alignment, "rejected allocation: zero size or alignment");
        return Err(AllocError::InvalidParam);
    }

    Ok(())
}

/// Allocation strategies available in this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocatorKind {
    /// [`LinearAllocator`]
    Linear,
    /// [`StackAllocator`]
    Stack,
    /// [`FreeListAllocator`]
    FreeList,
}

impl AllocatorKind {
    /// Builds an allocator of this kind owning a region of `size` bytes.
    pub fn build(self, size: usize) -> Box<dyn Allocator + Send> {
        match self {
            Self::Linear => Box::new(LinearAllocator::new(size)),
            Self::Stack => Box::new(StackAllocator::new(size)),
            Self::FreeList => Box::new(FreeListAllocator::new(size)),
        }
    }
}
