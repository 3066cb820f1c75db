//! Linear (bump) allocator.
//!
//! ```text
//!   +-----+-----+---+-------+------------------------------------+
//!   | A1  | A2  |pad|  A3   |            remaining               |
//!   +-----+-----+---+-------+------------------------------------+
//!   ^                       ^                                    ^
//!   start                 cursor                        start + total
//! ```
//!
//! Each allocation bumps the cursor forward, the only waste between
//! allocations is alignment padding. Single allocations can't be freed, the
//! whole region is released at once with [`Allocator::clear_memory`].

use std::ptr::NonNull;

use tracing::{debug, warn};

use crate::{
    AllocError, DEFAULT_REGION_SIZE, Result,
    align::align_adjustment,
    allocator::{Allocator, check_request},
    region::Region,
};

/// Bump allocator over a single region.
///
/// The cursor is not stored: it is always `in_use` bytes past the start of
/// the region.
#[derive(Debug)]
pub struct LinearAllocator {
    region: Region,
}

impl Default for LinearAllocator {
    fn default() -> Self {
        Self::new(DEFAULT_REGION_SIZE)
    }
}

impl LinearAllocator {
    /// Creates an allocator owning `size` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero or the OS refuses to map the region.
    pub fn new(size: usize) -> Self {
        let mut region = Region::new();
        region.initialize(size);

        debug!(size, "linear allocator constructed");

        Self { region }
    }
}

impl Allocator for LinearAllocator {
    fn allocate(&mut self, size: usize, alignment: usize) -> Result<NonNull<u8>> {
        check_request(size, alignment)?;

        debug!(in_use = self.region.in_use(), size, alignment, "linear allocate");

        if !self.region.is_initialized() {
            warn!(size, "linear allocate on a cleared allocator");
            return Err(AllocError::OutOfMemory);
        }

        let cursor = self.region.in_use();
        let adjustment = align_adjustment(self.region.ptr_at(cursor).addr().get(), alignment);

        let needed = match adjustment.checked_add(size) {
            Some(needed) if needed <= self.region.remaining() => needed,
            _ => {
                warn!(size, alignment, remaining = self.region.remaining(), "linear allocator out of memory");
                return Err(AllocError::OutOfMemory);
            }
        };

        let ptr = self.region.ptr_at(cursor + adjustment);
        self.region.adjust_in_use(needed as isize);

        debug!(?ptr, adjustment, in_use = self.region.in_use(), "linear allocate complete");

        Ok(ptr)
    }

    unsafe fn deallocate(&mut self, _ptr: *mut u8) -> Result<()> {
        warn!("linear allocator has no deallocation, clear the whole allocator instead");
        Err(AllocError::Unsupported)
    }

    fn enough_memory(&self, size: usize) -> bool {
        self.region.remaining() >= size
    }

    fn clear_memory(&mut self) -> Result<()> {
        debug!(in_use = self.region.in_use(), "linear clear");
        self.region.finalize();
        Ok(())
    }

    fn init_memory(&mut self, size: usize) -> Result<()> {
        if size == 0 {
            return Err(AllocError::InvalidParam);
        }

        debug!(size, "linear init");
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
