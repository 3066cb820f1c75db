//! General purpose free-list allocator.
//!
//! The allocator keeps every free piece of its region in an address-ordered
//! [`FreeList`]. Allocation is first fit: the first free block that can hold
//! the request (plus alignment padding and header) is split, or consumed whole
//! if what would be left is too small to ever be useful. Deallocation puts the
//! block back in address order and merges it with its free neighbours right
//! away, so two free blocks are never adjacent.
//!
//! ```text
//!                                 Free List
//!
//!            +---------------------------------------+
//!            |                                       |
//! +----------|------+--------------+-----------------|--------------------+
//! |  used    | free |     used     |      used       | free               |
//! +-----------------+--------------+--------------------------------------+
//! ^ region start                                          region end ^
//! ```
//!
//! Free blocks store their list node in their own first bytes, the allocator
//! needs no memory besides its region.

use std::{mem, ptr::NonNull};

use tracing::{debug, warn};

use crate::{
    AllocError, DEFAULT_REGION_SIZE, Result,
    align::align_adjustment_with_header,
    allocator::{Allocator, check_request},
    block::{FreeBlock, HEADER_SIZE, Header, read_header, write_header},
    list::{List, Node},
    region::Region,
};

/// List node stored at the start of every free block. The data is the size
/// of the block, node included.
pub(crate) type FreeNode = Node<usize>;

const FREE_NODE_SIZE: usize = mem::size_of::<FreeNode>();

/// Bytes reserved in front of every payload.
///
/// The room must hold the allocation [`Header`], and also a [`FreeNode`]
/// because the block turns back into a free node when it is deallocated.
pub const HEADER_ROOM: usize = if HEADER_SIZE > FREE_NODE_SIZE {
    HEADER_SIZE
} else {
    FREE_NODE_SIZE
};

/// Smallest free block worth keeping: a header, a node and one byte. When a
/// split would leave less than this, the whole block goes to the allocation.
pub const MIN_BLOCK_SIZE: usize = HEADER_SIZE + FREE_NODE_SIZE + 1;

/// Linked list to keep track of free blocks, sorted by address.
///
/// We are going to use the first bytes of every free block as storage for its
/// node. We use this approach since, as the block is actually free, nobody
/// else is going to read or write those bytes:
///
/// ```text
/// +------------------------+ <--------+
/// |          next          |          |
/// +------------------------+          |
/// |          prev          |          |-------> FreeNode
/// +------------------------+          |
/// |          size          |          |
/// +------------------------+ <--------+
/// |                        |
/// |      Free Payload      |
/// |        (unused)        |
/// |          ...           |
/// +------------------------+
/// ```
///
/// The address order is what makes merging cheap: the only blocks a freed
/// block can touch are the list neighbours around its insertion point.
pub(crate) struct FreeList {
    /// Nodes of the list, one per free block.
    items: List<usize>,
}

/// Address of the block a node lives in.
#[inline]
fn addr(node: NonNull<FreeNode>) -> usize {
    node.addr().get()
}

impl FreeList {
    /// Creates a new empty list.
    pub const fn new() -> Self {
        Self { items: List::new() }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Forgets every free block.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Nodes from lowest to highest address, with the size of their block.
    pub fn blocks(&self) -> impl Iterator<Item = (NonNull<FreeNode>, usize)> + '_ {
        self.items
            .iter()
            .map(|node| (node, unsafe { Node::data(node) }))
    }

    /// Makes `size` bytes at `start` the only free block.
    ///
    /// **SAFETY**: `start..start + size` must be unused memory owned by the
    /// allocator and `size` at least `size_of::<FreeNode>()`.
    pub unsafe fn seed(&mut self, start: NonNull<u8>, size: usize) {
        self.items.clear();

        unsafe {
            let node = List::place(start, size);
            self.items.insert_tail(node);
        }
    }

    /// Takes the first `required` bytes of the block at `node` out of the
    /// list, returning how many bytes the allocation really gets.
    ///
    /// If what is left after `required` is smaller than [`MIN_BLOCK_SIZE`]
    /// the whole block is taken, so the result may be larger than `required`.
    /// Otherwise the rest becomes a new free node that takes the old node's
    /// place in the list, which keeps the address order without searching.
    ///
    /// **SAFETY**: `node` must be in this list and its block at least
    /// `required` bytes long.
    pub unsafe fn take(&mut self, node: NonNull<FreeNode>, required: usize) -> usize {
        unsafe {
            let size = Node::data(node);
            let leftover = size - required;

            if leftover < MIN_BLOCK_SIZE {
                self.items.remove(node);
                return size;
            }

            let rest = List::place(node.cast::<u8>().add(required), leftover);
            self.items.swap(node, rest);
        }

        required
    }

    /// Returns `size` bytes at `start` to the list, merging them with the
    /// free blocks right before and after if they touch.
    ///
    /// ```text
    ///    prev           start            next
    ///     |               |               |
    ///     v               v               v
    ///     +---------------+---------------+----------------+
    ///     |  free (prev)  |  being freed  |  free (next)   |
    ///     +---------------+---------------+----------------+
    /// ```
    ///
    /// **SAFETY**: `start..start + size` must be a block previously taken
    /// from this list and not returned since.
    pub unsafe fn release(&mut self, start: NonNull<u8>, size: usize) {
        let new_addr = start.addr().get();

        unsafe {
            // First block past the freed one. The one before it (or the tail if
            // there is none) is the only block that can end where we start.
            let next = self.items.find(|node, _| addr(node) > new_addr);
            let before = match next {
                Some(next) => Node::prev(next),
                None => self.items.last(),
            };

            let prev = before.filter(|&prev| addr(prev) + Node::data(prev) == new_addr);
            let touching_next = next.filter(|&next| new_addr + size == addr(next));

            match (prev, touching_next) {
                (None, None) => {
                    let node = List::place(start, size);
                    match (before, next) {
                        (_, Some(next)) => self.items.insert_before(next, node),
                        (Some(before), None) => self.items.insert_after(before, node),
                        (None, None) => self.items.insert_head(node),
                    }
                }
                (Some(prev), None) => {
                    Node::set_data(prev, Node::data(prev) + size);
                }
                (None, Some(next)) => {
                    let node = List::place(start, size + Node::data(next));
                    self.items.swap(next, node);
                }
                (Some(prev), Some(next)) => {
                    Node::set_data(prev, Node::data(prev) + size + Node::data(next));
                    self.items.remove(next);
                }
            }
        }
    }
}

/// First-fit allocator with block splitting and coalescing.
///
/// Every pointer it returns is preceded by a [`Header`] that remembers how far
/// back the block starts and how long it is, so [`Allocator::deallocate`]
/// needs nothing but the pointer.
pub struct FreeListAllocator {
    region: Region,
    free_list: FreeList,
}

// The free list only points into the region, which the allocator owns.
unsafe impl Send for FreeListAllocator {}

impl Default for FreeListAllocator {
    fn default() -> Self {
        Self::new(DEFAULT_REGION_SIZE)
    }
}

impl FreeListAllocator {
    /// Creates an allocator owning `size` bytes, all of them in one free
    /// block.
    ///
    /// # Panics
    ///
    /// Panics if `size` can't hold a single free node or the OS refuses to
    /// map the region.
    pub fn new(size: usize) -> Self {
        let mut allocator = Self {
            region: Region::new(),
            free_list: FreeList::new(),
        };

        if allocator.init_memory(size).is_err() {
            panic!("a free-list region needs at least {FREE_NODE_SIZE} bytes, got {size}");
        }

        debug!(size, "free-list allocator constructed");

        allocator
    }

    /// Free blocks in address order.
    pub fn free_blocks(&self) -> impl Iterator<Item = FreeBlock> + '_ {
        self.free_list.blocks().map(|(node, size)| FreeBlock {
            offset: self.region.offset_of(addr(node)),
            size,
        })
    }
}

impl std::fmt::Debug for FreeListAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FreeListAllocator")
            .field("region", &self.region)
            .field("free_blocks", &self.free_blocks().collect::<Vec<_>>())
            .finish()
    }
}

impl Allocator for FreeListAllocator {
    fn allocate(&mut self, size: usize, alignment: usize) -> Result<NonNull<u8>> {
        check_request(size, alignment)?;

        debug!(
            in_use = self.region.in_use(),
            size,
            alignment,
            free_blocks = self.free_list.len(),
            "free-list allocate"
        );

        // First fit. The padding depends on where each block starts, so it is
        // computed per candidate.
        let found = self.free_list.blocks().find_map(|(node, block_size)| {
            let adjustment = align_adjustment_with_header(addr(node), alignment, HEADER_ROOM);
            let required = size.checked_add(adjustment)?;

            (block_size >= required).then_some((node, adjustment, required))
        });

        let Some((node, adjustment, required)) = found else {
            warn!(size, alignment, remaining = self.region.remaining(), "free-list allocator out of memory");
            return Err(AllocError::OutOfMemory);
        };

        unsafe {
            let taken = self.free_list.take(node, required);
            let ptr = node.cast::<u8>().add(adjustment);

            write_header(
                ptr,
                Header {
                    alignment_offset: adjustment,
                    payload_size: taken - adjustment,
                },
            );

            self.region.adjust_in_use(taken as isize);

            debug!(?ptr, adjustment, taken, in_use = self.region.in_use(), "free-list allocate complete");

            Ok(ptr)
        }
    }

    unsafe fn deallocate(&mut self, ptr: *mut u8) -> Result<()> {
        let Some(ptr) = NonNull::new(ptr) else {
            debug!("free-list deallocate: null pointer");
            return Err(AllocError::InvalidParam);
        };

        if !self.region.contains(ptr.addr().get()) {
            debug!(?ptr, "free-list deallocate: pointer outside of region");
            return Err(AllocError::InvalidParam);
        }

        unsafe {
            let header: Header = read_header(ptr);
            let start = ptr.sub(header.alignment_offset);
            let size = header.alignment_offset + header.payload_size;

            self.free_list.release(start, size);
            self.region.adjust_in_use(-(size as isize));

            debug!(?ptr, size, in_use = self.region.in_use(), free_blocks = self.free_list.len(), "free-list deallocate complete");
        }

        Ok(())
    }

    fn enough_memory(&self, size: usize) -> bool {
        self.free_list.blocks().any(|(_, block_size)| block_size >= size)
    }

    fn clear_memory(&mut self) -> Result<()> {
        debug!(in_use = self.region.in_use(), "free-list clear");

        self.free_list.clear();
        self.region.finalize();
        Ok(())
    }

    fn init_memory(&mut self, size: usize) -> Result<()> {
        if size < FREE_NODE_SIZE {
            debug!(size, "free-list init: region can't hold a free node");
            return Err(AllocError::InvalidParam);
        }

        debug!(size, "free-list init");

        self.region.initialize(size);
        unsafe { self.free_list.seed(self.region.ptr_at(0), size) };
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
