use std::{
    alloc::{GlobalAlloc, Layout},
    ptr::{self, NonNull},
};

use parking_lot::{Mutex, MutexGuard};

use crate::Allocator;

/// Wraps an allocator in a mutex so it can be shared between threads.
///
/// The allocators themselves do no locking at all, every call made through
/// the wrapper holds the lock for the whole operation.
///
/// `Locked` also implements [`GlobalAlloc`] on top of the wrapped allocator.
pub struct Locked<A> {
    inner: Mutex<A>,
}

impl<A> Locked<A> {
    pub const fn new(allocator: A) -> Self {
        Self {
            inner: Mutex::new(allocator),
        }
    }

    /// Locks the allocator for a sequence of calls.
    pub fn lock(&self) -> MutexGuard<'_, A> {
        self.inner.lock()
    }

    pub fn into_inner(self) -> A {
        self.inner.into_inner()
    }
}

unsafe impl<A: Allocator> GlobalAlloc for Locked<A> {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        self.inner
            .lock()
            .allocate(layout.size(), layout.align())
            .map_or(ptr::null_mut(), NonNull::as_ptr)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, _layout: Layout) {
        // `GlobalAlloc` has no way to report the error. Allocators that can't
        // free single blocks simply keep the memory until they are cleared.
        let _ = unsafe { self.inner.lock().deallocate(ptr) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FreeListAllocator, LinearAllocator};
    use std::thread;

    #[test]
    fn threads_share_one_allocator() {
        let allocator = Locked::new(FreeListAllocator::new(0x10000));

        thread::scope(|scope| {
            for id in 0..4u8 {
                let allocator = &allocator;
                scope.spawn(move || {
                    for round in 0..100 {
                        let layout = Layout::from_size_align(16 + round % 48, 8).unwrap();
                        unsafe {
                            let ptr = allocator.alloc(layout);
                            assert!(!ptr.is_null());

                            ptr::write_bytes(ptr, id, layout.size());
                            assert!((0..layout.size()).all(|i| *ptr.add(i) == id));

                            allocator.dealloc(ptr, layout);
                        }
                    }
                });
            }
        });

        let allocator = allocator.into_inner();
        assert_eq!(0, allocator.in_use_memory());
        assert_eq!(1, allocator.free_blocks().count());
    }

    #[test]
    fn exhausted_allocator_returns_null() {
        let allocator = Locked::new(LinearAllocator::new(64));
        let layout = Layout::from_size_align(65, 1).unwrap();

        assert!(unsafe { allocator.alloc(layout) }.is_null());
        assert_eq!(0, allocator.lock().in_use_memory());
    }

    #[test]
    fn boxed_values_through_global_alloc() {
        let allocator = Locked::new(FreeListAllocator::new(0x1000));
        let layout = Layout::new::<[u64; 4]>();

        unsafe {
            let ptr = allocator.alloc(layout).cast::<[u64; 4]>();
            ptr.write([1, 2, 3, 4]);
            assert_eq!([1, 2, 3, 4], *ptr);
            assert_eq!(0, ptr.addr() % layout.align());

            allocator.dealloc(ptr.cast(), layout);
        }

        assert_eq!(0, allocator.lock().in_use_memory());
    }
}
