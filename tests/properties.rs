//! Randomized allocate/deallocate sequences against every allocator.
//!
//! After every step the free-list allocator must keep its accounting balanced, keep its
//! free blocks sorted, disjoint and fully merged, and never hand out memory
//! that overlaps a live allocation.

use std::ptr::NonNull;

use proptest::prelude::*;
use regionalloc::{Allocator, FreeListAllocator, HEADER_ROOM, LinearAllocator, StackAllocator};

const REGION_SIZE: usize = 0x4000;

#[derive(Debug, Clone)]
enum Op {
    Allocate { size: usize, alignment: usize },
    /// Frees the live allocation at this index (modulo the number of live
    /// allocations).
    Free(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (1usize..600, prop::sample::select(vec![1usize, 2, 3, 4, 5, 8, 16, 32, 64, 128]))
            .prop_map(|(size, alignment)| Op::Allocate { size, alignment }),
        2 => any::<usize>().prop_map(Op::Free),
    ]
}

struct Live {
    ptr: NonNull<u8>,
    size: usize,
    tag: u8,
}

fn check_free_list(allocator: &FreeListAllocator) {
    let blocks: Vec<_> = allocator.free_blocks().collect();

    let free: usize = blocks.iter().map(|block| block.size).sum();
    assert_eq!(allocator.remaining_memory(), free);

    for pair in blocks.windows(2) {
        // Sorted, disjoint and never touching: touching blocks must have
        // been merged.
        assert!(pair[0].offset + pair[0].size < pair[1].offset, "{pair:?}");
    }

    if let Some(last) = blocks.last() {
        assert!(last.offset + last.size <= allocator.total_memory());
    }
}

fn overlaps(a: &Live, b: &Live) -> bool {
    let (a_start, b_start) = (a.ptr.as_ptr() as usize, b.ptr.as_ptr() as usize);
    a_start < b_start + b.size && b_start < a_start + a.size
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn free_list_invariants_hold(ops in proptest::collection::vec(op(), 1..120)) {
        let mut allocator = FreeListAllocator::new(REGION_SIZE);
        // Learn where the region starts from a probe allocation, then give it
        // back.
        let probe = allocator.allocate(1, 1).unwrap();
        let start = probe.as_ptr() as usize - HEADER_ROOM;
        unsafe { allocator.deallocate(probe.as_ptr()).unwrap() };

        let mut live: Vec<Live> = Vec::new();
        let mut next_tag = 0u8;

        for op in ops {
            match op {
                Op::Allocate { size, alignment } => {
                    let Ok(ptr) = allocator.allocate(size, alignment) else {
                        continue;
                    };

                    let addr = ptr.as_ptr() as usize;
                    prop_assert_eq!(0, addr % alignment);
                    prop_assert!(addr >= start && addr + size <= start + REGION_SIZE);

                    next_tag = next_tag.wrapping_add(1);
                    let block = Live { ptr, size, tag: next_tag };
                    prop_assert!(live.iter().all(|other| !overlaps(other, &block)));

                    unsafe { ptr.as_ptr().write_bytes(block.tag, size) };
                    live.push(block);
                }
                Op::Free(index) => {
                    if live.is_empty() {
                        continue;
                    }

                    let block = live.swap_remove(index % live.len());
                    let bytes = unsafe { std::slice::from_raw_parts(block.ptr.as_ptr(), block.size) };
                    prop_assert!(bytes.iter().all(|&byte| byte == block.tag));

                    unsafe { allocator.deallocate(block.ptr.as_ptr()).unwrap() };
                }
            }

            prop_assert_eq!(REGION_SIZE, allocator.in_use_memory() + allocator.remaining_memory());
            check_free_list(&allocator);
        }

        for block in live.drain(..) {
            unsafe { allocator.deallocate(block.ptr.as_ptr()).unwrap() };
        }

        prop_assert_eq!(0, allocator.in_use_memory());
        let blocks: Vec<_> = allocator.free_blocks().map(|block| (block.offset, block.size)).collect();
        prop_assert_eq!(vec![(0, REGION_SIZE)], blocks);
    }

    #[test]
    fn bump_allocators_stay_in_bounds(
        requests in proptest::collection::vec((1usize..300, 1usize..65), 1..80)
    ) {
        let mut linear = LinearAllocator::new(REGION_SIZE);
        let mut stack = StackAllocator::new(REGION_SIZE);
        let mut stacked = Vec::new();

        for &(size, alignment) in &requests {
            let before = linear.in_use_memory();
            match linear.allocate(size, alignment) {
                Ok(ptr) => {
                    prop_assert_eq!(0, ptr.as_ptr() as usize % alignment);
                    prop_assert!(linear.in_use_memory() >= before + size);
                }
                Err(_) => {
                    prop_assert_eq!(before, linear.in_use_memory());
                }
            }
            prop_assert_eq!(REGION_SIZE, linear.in_use_memory() + linear.remaining_memory());
        }

        for &(size, alignment) in &requests {
            let before = stack.in_use_memory();
            match stack.allocate(size, alignment) {
                Ok(ptr) => {
                    prop_assert_eq!(0, ptr.as_ptr() as usize % alignment);
                    prop_assert!(stack.in_use_memory() >= before + size);
                    stacked.push((ptr, before));
                }
                Err(_) => {
                    prop_assert_eq!(before, stack.in_use_memory());
                }
            }
            prop_assert_eq!(REGION_SIZE, stack.in_use_memory() + stack.remaining_memory());
        }

        // Unwinding the stack in LIFO order restores every intermediate top.
        while let Some((ptr, before)) = stacked.pop() {
            unsafe { stack.deallocate(ptr.as_ptr()).unwrap() };
            prop_assert_eq!(before, stack.in_use_memory());
        }
        prop_assert_eq!(0, stack.in_use_memory());
    }
}
