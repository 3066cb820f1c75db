use std::{mem, ptr::NonNull};

/// Size of the header the free-list allocator writes in front of every
/// pointer it returns.
pub const HEADER_SIZE: usize = mem::size_of::<Header>();

/// Size of the header the stack allocator writes in front of every pointer
/// it returns.
pub const STACK_HEADER_SIZE: usize = mem::size_of::<StackHeader>();

/// Metadata of an allocated block, stored right before the pointer returned
/// to the user.
///
/// ```text
///  block start                   returned pointer
///     |                                |
///     v                                v
///     +-------------+------------------+-----------------------+
///     |   padding   | alignment_offset |                       |
///     |             |   payload_size   |        payload        |
///     +-------------+------------------+-----------------------+
///     <-------- alignment_offset ------>
///                                      <---- payload_size ----->
/// ```
///
/// Going back `alignment_offset` bytes from the returned pointer gives the
/// start of the block, and `alignment_offset + payload_size` is everything
/// that was taken from the free list.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Header {
    /// Bytes between the start of the block and the returned pointer.
    pub alignment_offset: usize,
    /// Usable bytes after the returned pointer.
    pub payload_size: usize,
}

/// Metadata of a stack allocation. Only the padding is needed to rewind.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StackHeader {
    /// Bytes between the previous top of the stack and the returned pointer.
    pub alignment_offset: usize,
}

/// A free span of an allocator's region, as reported by
/// [`crate::FreeListAllocator::free_blocks`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeBlock {
    /// Offset of the block from the start of the region.
    pub offset: usize,
    /// Size of the block in bytes.
    pub size: usize,
}

/// Writes `header` in the `size_of::<H>()` bytes right before `ptr`.
///
/// Returned pointers are only aligned to what the caller asked for, which can
/// be 1, so the header is written unaligned.
///
/// **SAFETY**: the bytes right before `ptr` must belong to the block being
/// handed out.
#[inline]
pub(crate) unsafe fn write_header<H: Copy>(ptr: NonNull<u8>, header: H) {
    unsafe {
        ptr.sub(mem::size_of::<H>())
            .cast::<H>()
            .as_ptr()
            .write_unaligned(header);
    }
}

/// Reads the header written by [`write_header`] in front of `ptr`.
///
/// **SAFETY**: `ptr` must have been returned by the allocator that wrote a
/// header of type `H` and must not have been freed yet.
#[inline]
pub(crate) unsafe fn read_header<H: Copy>(ptr: NonNull<u8>) -> H {
    unsafe {
        ptr.sub(mem::size_of::<H>())
            .cast::<H>()
            .as_ptr()
            .read_unaligned()
    }
}
