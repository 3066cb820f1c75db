//! Stack (LIFO) allocator.
//!
//! Works like [`crate::LinearAllocator`] but every allocation leaves a small
//! [`StackHeader`] right before the returned pointer, so the top of the stack
//! can be rewound to where it was before that allocation:
//!
//! ```text
//!             previous top       returned pointer
//!                  |                    |
//!                  v                    v
//!   +--------------+-------+------------+------------------+
//!   |  older ...   |  pad  |   header   |     payload      |
//!   +--------------+-------+------------+------------------+
//!                  <-- alignment_offset ->                 ^
//!                                                        top
//! ```
//!
//! Deallocation is only correct in LIFO order. Freeing out of order moves the
//! top to the wrong place and is not detected.

use std::ptr::NonNull;

use tracing::{debug, warn};

use crate::{
    AllocError, DEFAULT_REGION_SIZE, Result,
    align::align_adjustment_with_header,
    allocator::{Allocator, check_request},
    block::{STACK_HEADER_SIZE, StackHeader, read_header, write_header},
    region::Region,
};

/// Stack allocator over a single region. The top of the stack is always
/// `in_use` bytes past the start of the region.
#[derive(Debug)]
pub struct StackAllocator {
    region: Region,
}

impl Default for StackAllocator {
    fn default() -> Self {
        Self::new(DEFAULT_REGION_SIZE)
    }
}

impl StackAllocator {
    /// Creates an allocator owning `size` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero or the OS refuses to map the region.
    pub fn new(size: usize) -> Self {
        let mut region = Region::new();
        region.initialize(size);

        debug!(size, "stack allocator constructed");

        Self { region }
    }
}

impl Allocator for StackAllocator {
    fn allocate(&mut self, size: usize, alignment: usize) -> Result<NonNull<u8>> {
        check_request(size, alignment)?;

        debug!(in_use = self.region.in_use(), size, alignment, "stack allocate");

        if !self.region.is_initialized() {
            warn!(size, "stack allocate on a cleared allocator");
            return Err(AllocError::OutOfMemory);
        }

        let top = self.region.in_use();
        let adjustment =
            align_adjustment_with_header(self.region.ptr_at(top).addr().get(), alignment, STACK_HEADER_SIZE);

        let needed = match adjustment.checked_add(size) {
            Some(needed) if needed <= self.region.remaining() => needed,
            _ => {
                warn!(size, alignment, remaining = self.region.remaining(), "stack allocator out of memory");
                return Err(AllocError::OutOfMemory);
            }
        };

        let ptr = self.region.ptr_at(top + adjustment);
        unsafe {
            write_header(
                ptr,
                StackHeader {
                    alignment_offset: adjustment,
                },
            );
        }
        self.region.adjust_in_use(needed as isize);

        debug!(?ptr, adjustment, in_use = self.region.in_use(), "stack allocate complete");

        Ok(ptr)
    }

    unsafe fn deallocate(&mut self, ptr: *mut u8) -> Result<()> {
        let Some(ptr) = NonNull::new(ptr) else {
            debug!("stack deallocate: null pointer");
            return Err(AllocError::InvalidParam);
        };

        // Only pointers below the current top can have been handed out.
        let addr = ptr.addr().get();
        if !self.region.contains(addr) {
            debug!(?ptr, "stack deallocate: pointer outside of region");
            return Err(AllocError::InvalidParam);
        }

        let offset = self.region.offset_of(addr);
        if offset < STACK_HEADER_SIZE || offset >= self.region.in_use() {
            debug!(?ptr, offset, in_use = self.region.in_use(), "stack deallocate: pointer above top");
            return Err(AllocError::InvalidParam);
        }

        let header: StackHeader = unsafe { read_header(ptr) };
        let Some(new_top) = offset.checked_sub(header.alignment_offset) else {
            debug!(?ptr, ?header, "stack deallocate: corrupt header");
            return Err(AllocError::InvalidParam);
        };

        self.region
            .adjust_in_use(new_top as isize - self.region.in_use() as isize);

        debug!(?ptr, in_use = self.region.in_use(), "stack deallocate complete");

        Ok(())
    }

    fn enough_memory(&self, size: usize) -> bool {
        self.region.remaining() >= size
    }

    fn clear_memory(&mut self) -> Result<()> {
        debug!(in_use = self.region.in_use(), "stack clear");
        self.region.finalize();
        Ok(())
    }

    fn init_memory(&mut self, size: usize) -> Result<()> {
        if size == 0 {
            return Err(AllocError::InvalidParam);
        }

        debug!(size, "stack init");
        self.region.initialize(size);
        Ok(())
    }

    fn remaining_memory(&self) -> usize {
        self.region.remaining()
    }

    fn in_use_memory(&self) -> usize {
        self.region.in_use()
    }

    fn total_memory(&self) -> usize {
        self.region.total()
    }
}
