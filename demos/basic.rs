//! Walks through the three allocators, printing where each request lands.
//!
//! Run with `RUST_LOG=debug` to also see the allocators' own events.

use std::ptr::NonNull;

use regionalloc::{Allocator, AllocatorKind, FreeListAllocator};
use tracing_subscriber::EnvFilter;

fn log_alloc(addr: NonNull<u8>, size: usize, alignment: usize) {
    println!("Requested {size} bytes aligned to {alignment}");
    println!("Received this address: {addr:?}");
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut allocator = FreeListAllocator::new(4096);

    let addr1 = allocator.allocate(8, 8).unwrap();
    log_alloc(addr1, 8, 8);

    let addr2 = allocator.allocate(8, 1).unwrap();
    log_alloc(addr2, 8, 1);

    let addr3 = allocator.allocate(16, 16).unwrap();
    log_alloc(addr3, 16, 16);

    unsafe {
        allocator.deallocate(addr1.as_ptr()).unwrap();
        allocator.deallocate(addr3.as_ptr()).unwrap();
    }
    println!("Free blocks after two frees: {:?}", allocator.free_blocks().collect::<Vec<_>>());

    unsafe {
        allocator.deallocate(addr2.as_ptr()).unwrap();
    }
    println!("Free blocks after the last free: {:?}", allocator.free_blocks().collect::<Vec<_>>());

    for kind in [AllocatorKind::Linear, AllocatorKind::Stack] {
        let mut allocator = kind.build(256);

        while let Ok(addr) = allocator.allocate(40, 8) {
            log_alloc(addr, 40, 8);
        }

        println!(
            "{kind:?}: {} bytes in use, {} remaining",
            allocator.in_use_memory(),
            allocator.remaining_memory()
        );
    }
}
