//! Alignment helpers shared by every allocator.
//!
//! These are pure functions over plain addresses, they never touch memory.
//! [`align_adjustment`] and [`align_adjustment_with_header`] accept any
//! non-zero alignment, not only powers of two, because the allocators take the
//! alignment straight from the caller.

/// Rounds `to_be_aligned` up to a multiple of `alignment`.
///
/// `alignment` must be a power of two. This is used to round region sizes up
/// to a multiple of [`crate::kernel::page_size`].
pub fn align_up(to_be_aligned: usize, alignment: usize) -> usize {
    debug_assert!(alignment.is_power_of_two());
    (to_be_aligned + alignment - 1) & !(alignment - 1)
}

/// Number of bytes needed to move `address` forward to the next multiple of
/// `alignment`.
///
/// Returns 0 when `alignment` is 0 or `address` is already aligned.
pub fn align_adjustment(address: usize, alignment: usize) -> usize {
    if alignment == 0 {
        return 0;
    }

    let adjustment = alignment - address % alignment;
    if adjustment == alignment { 0 } else { adjustment }
}

/// Like [`align_adjustment`], but also leaves at least `header_size` bytes
/// between `address` and the aligned address so a header fits in front of it.
///
/// When the plain adjustment is too small for the header it grows by whole
/// multiples of `alignment`, so the result is still aligned.
///
/// ```text
///  address           aligned address
///     |                   |
///     v                   v
///     +---------+---------+-------------------
///     | padding | header  | payload ...
///     +---------+---------+-------------------
///     <---- adjustment --->
/// ```
pub fn align_adjustment_with_header(address: usize, alignment: usize, header_size: usize) -> usize {
    if alignment == 0 {
        return 0;
    }

    let mut adjustment = align_adjustment(address, alignment);

    if adjustment < header_size {
        let needed = header_size - adjustment;
        adjustment += alignment * needed.div_ceil(alignment);
    }

    adjustment
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem;

    #[test]
    fn align_pointer_size() {
        let aligments = vec![(1..8, 8), (9..16, 16), (17..24, 24), (25..32, 32)];

        for (sizes, expected) in aligments {
            for size in sizes {
                assert_eq!(expected, align_up(size, mem::size_of::<u64>()));
            }
        }
    }

    #[test]
    fn align_page_size() {
        // For testing purposes we are assuming the page size is 4096
        let aligments = vec![(1..4096, 4096), (4097..8192, 8192)];

        for (sizes, expected) in aligments {
            for size in sizes {
                assert_eq!(expected, align_up(size, 4096))
            }
        }
    }

    #[test]
    fn plain_adjustment() {
        let cases = [
            (0x102, 0x4, 2),
            (0x105, 0x2, 1),
            (0x111, 0x8, 7),
            (0x123, 0x10, 13),
            (0x245, 0x1, 0),
            (0x578, 0x8, 0),
            (0x632, 0x2, 0),
            (0x352, 0x0, 0),
        ];

        for (address, alignment, expected) in cases {
            assert_eq!(expected, align_adjustment(address, alignment), "{address:#x} / {alignment}");
        }
    }

    #[test]
    fn adjustment_leaves_room_for_header() {
        let cases = [
            (0x102, 0x4, 0x5, 6),
            (0x105, 0x2, 0x10, 17),
            (0x111, 0x8, 0x5, 7),
            (0x123, 0x10, 0x20, 45),
            (0x245, 0x1, 0x5, 5),
            (0x578, 0x8, 0x9, 16),
            (0x632, 0x2, 0x5, 6),
            (0x113, 0x1, 0x3, 3),
            (0x352, 0x0, 0x2, 0),
            (0x351, 0x4, 0x0, 3),
        ];

        for (address, alignment, header, expected) in cases {
            let adjustment = align_adjustment_with_header(address, alignment, header);
            assert_eq!(expected, adjustment, "{address:#x} / {alignment} / {header}");
            if alignment != 0 {
                assert_eq!(0, (address + adjustment) % alignment);
                assert!(adjustment >= header);
            }
        }
    }

    #[test]
    fn odd_alignment_is_supported() {
        assert_eq!(2, align_adjustment(10, 3));
        assert_eq!(8, align_adjustment_with_header(10, 3, 6));
    }
}
