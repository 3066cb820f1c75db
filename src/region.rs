use std::ptr::NonNull;

use tracing::{debug, error};

use crate::{
    align::align_up,
    kernel::{page_size, request_memory, return_memory},
};

/// A contiguous chunk of memory owned by exactly one allocator.
///
/// The memory is requested from the OS with [`request_memory`] and given back
/// on [`Region::finalize`] or when the region is dropped. The OS hands out
/// whole pages, so the mapping may be longer than the region; only the first
/// [`Region::total`] bytes are ever given to callers.
///
/// ```text
///  start                                          start + total
///    |                                                  |
///    v                                                  v
///    +--------------------------+-----------------------+ - - - - +
///    |          in use          |       remaining       |  slack  |
///    +--------------------------+-----------------------+ - - - - +
///                                                       <- page rounding ->
/// ```
///
/// The region only does the bookkeeping of how many bytes are in use, the
/// allocators decide which bytes those are.
#[derive(Debug)]
pub struct Region {
    /// Start of the mapping, `None` while the region is not initialized.
    start: Option<NonNull<u8>>,
    /// Size of the region.
    size: usize,
    /// Length of the OS mapping (`size` rounded up to the page size).
    mapped: usize,
    /// Bytes currently charged to allocations.
    in_use: usize,
}

// The region exclusively owns its mapping.
unsafe impl Send for Region {}

impl Default for Region {
    fn default() -> Self {
        Self::new()
    }
}

impl Region {
    /// Creates a region that owns no memory yet.
    pub const fn new() -> Self {
        Self {
            start: None,
            size: 0,
            mapped: 0,
            in_use: 0,
        }
    }

    /// Acquires `size` bytes from the OS.
    ///
    /// # Panics
    ///
    /// Initializing a region that already owns memory, asking for zero bytes
    /// or the OS refusing the request are all fatal.
    pub fn initialize(&mut self, size: usize) {
        if self.start.is_some() {
            error!(size = self.size, "region initialized twice");
            panic!("region is already initialized, finalize it first");
        }

        if size == 0 {
            error!("region of zero bytes requested");
            panic!("region size must be greater than zero");
        }

        let mapped = align_up(size, page_size());

        // What should we do here? There is no way to recover from the OS
        // refusing us memory, so we treat it as an invariant violation.
        let Some(start) = (unsafe { request_memory(mapped) }) else {
            error!(size, mapped, "OS refused to map region");
            panic!("failed to acquire {size} bytes from the OS");
        };

        self.start = Some(start);
        self.size = size;
        self.mapped = mapped;
        self.in_use = 0;

        debug!(?start, size, mapped, "region initialized");
    }

    /// Returns the memory to the OS and zeroes the counters.
    ///
    /// Finalizing a region that owns no memory does nothing.
    pub fn finalize(&mut self) {
        let Some(start) = self.start.take() else {
            return;
        };

        unsafe { return_memory(start, self.mapped) };

        debug!(?start, size = self.size, in_use = self.in_use, "region finalized");

        self.size = 0;
        self.mapped = 0;
        self.in_use = 0;
    }

    /// Charges (`delta > 0`) or releases (`delta < 0`) bytes of the region.
    ///
    /// # Panics
    ///
    /// Panics if the in-use counter would go below zero or above
    /// [`Region::total`]. Allocators only ever release what they charged, so
    /// this is always a bug in the allocator and never bad caller input.
    pub fn adjust_in_use(&mut self, delta: isize) {
        match self.in_use.checked_add_signed(delta) {
            Some(in_use) if in_use <= self.size => self.in_use = in_use,
            _ => {
                error!(in_use = self.in_use, delta, total = self.size, "region accounting out of range");
                panic!(
                    "in-use adjustment of {delta} out of range (in use {}, total {})",
                    self.in_use, self.size
                );
            }
        }
    }

    /// Total size of the region in bytes, 0 when not initialized.
    #[inline]
    pub fn total(&self) -> usize {
        self.size
    }

    /// Bytes currently charged to allocations.
    #[inline]
    pub fn in_use(&self) -> usize {
        self.in_use
    }

    /// Bytes not charged to any allocation.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.size - self.in_use
    }

    /// Start of the region, `None` when not initialized.
    #[inline]
    pub fn start(&self) -> Option<NonNull<u8>> {
        self.start
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.start.is_some()
    }

    /// Tells whether `addr` lies inside `[start, start + total)`.
    pub fn contains(&self, addr: usize) -> bool {
        self.start
            .map(|start| start.addr().get())
            .is_some_and(|start| addr >= start && addr - start < self.size)
    }

    /// Pointer to the byte at `offset` from the start of the region.
    ///
    /// # Panics
    ///
    /// Panics if the region is not initialized or `offset` is past its end.
    pub(crate) fn ptr_at(&self, offset: usize) -> NonNull<u8> {
        let start = self.start.expect("region is not initialized");
        assert!(offset <= self.size, "offset {offset} outside of region");

        unsafe { start.add(offset) }
    }

    /// Offset of `addr` from the start of the region.
    pub(crate) fn offset_of(&self, addr: usize) -> usize {
        let start = self.start.expect("region is not initialized");
        addr - start.addr().get()
    }
}

impl Drop for Region {
    fn drop(&mut self) {
        self.finalize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_region_is_empty() {
        let region = Region::new();

        assert!(!region.is_initialized());
        assert_eq!(0, region.total());
        assert_eq!(0, region.in_use());
        assert_eq!(0, region.remaining());
        assert!(!region.contains(0));
    }

    #[test]
    fn initialize_and_finalize() {
        let mut region = Region::new();
        region.initialize(0x1000);

        assert!(region.is_initialized());
        assert_eq!(0x1000, region.total());
        assert_eq!(0x1000, region.remaining());

        let start = region.start().unwrap().addr().get();
        assert!(region.contains(start));
        assert!(region.contains(start + 0xfff));
        assert!(!region.contains(start + 0x1000));

        region.finalize();
        assert!(!region.is_initialized());
        assert_eq!(0, region.total());
        assert_eq!(0, region.remaining());
    }

    #[test]
    fn finalize_twice_is_a_no_op() {
        let mut region = Region::new();
        region.initialize(100);
        region.finalize();
        region.finalize();

        assert!(!region.is_initialized());
    }

    #[test]
    fn adjust_in_use_keeps_counters_balanced() {
        let mut region = Region::new();
        region.initialize(100);

        region.adjust_in_use(40);
        assert_eq!(40, region.in_use());
        assert_eq!(60, region.remaining());

        region.adjust_in_use(60);
        assert_eq!(0, region.remaining());

        region.adjust_in_use(-100);
        assert_eq!(0, region.in_use());
        assert_eq!(100, region.remaining());
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn adjust_in_use_over_total_is_fatal() {
        let mut region = Region::new();
        region.initialize(100);
        region.adjust_in_use(101);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn adjust_in_use_below_zero_is_fatal() {
        let mut region = Region::new();
        region.initialize(100);
        region.adjust_in_use(-1);
    }

    #[test]
    #[should_panic(expected = "already initialized")]
    fn initialize_twice_is_fatal() {
        let mut region = Region::new();
        region.initialize(100);
        region.initialize(100);
    }

    #[test]
    fn region_memory_is_usable() {
        let mut region = Region::new();
        region.initialize(64);

        unsafe {
            let ptr = region.ptr_at(63);
            ptr.write(7);
            assert_eq!(7, ptr.read());
            assert_eq!(63, region.offset_of(ptr.addr().get()));
        }
    }
}
