//! Shares one free-list allocator between threads through [`Locked`] and its
//! `GlobalAlloc` implementation.

use std::{alloc::GlobalAlloc, alloc::Layout, thread};

use regionalloc::{FreeListAllocator, Locked};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let allocator = Locked::new(FreeListAllocator::new(64 * 1024));

    // Merge example
    let layout = Layout::new::<[u8; 64]>();
    unsafe {
        let a = allocator.alloc(layout);
        let b = allocator.alloc(layout);

        allocator.dealloc(a, layout);
        allocator.dealloc(b, layout);

        let c = allocator.alloc(Layout::new::<[u8; 128]>());
        if a == c {
            println!("Correctly reused at {c:p}");
        } else {
            println!("Not correctly reused. A was at {a:p} and C is at {c:p}");
        }
        allocator.dealloc(c, Layout::new::<[u8; 128]>());
    }

    // Thread example
    thread::scope(|scope| {
        for id in 0..2 {
            let allocator = &allocator;
            scope.spawn(move || unsafe {
                let layout = Layout::new::<u64>();
                let value = allocator.alloc(layout).cast::<u64>();
                value.write(222 + id);
                println!("Thread {id} wrote {} at {value:p}", value.read());
                allocator.dealloc(value.cast(), layout);
            });
        }
    });

    let allocator = allocator.into_inner();
    println!("Free blocks at exit: {:?}", allocator.free_blocks().collect::<Vec<_>>());
}
