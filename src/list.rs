use std::{marker::PhantomData, ptr::NonNull};

/// Non-null pointer to a [`Node<T>`].
pub(crate) type Link<T> = Option<NonNull<Node<T>>>;

/// A list node. Nodes live inside the memory they describe, so a node is
/// identified by its address.
///
/// Nodes are placed at whatever byte the allocator decides, which is not
/// necessarily aligned for `Node<T>`. That's why we never create references
/// to a node: every field is read and written with unaligned accesses.
#[repr(C)]
#[derive(Clone, Copy)]
pub(crate) struct Node<T> {
    /// Pointer to the next node of the list
    pub next: Link<T>,
    /// Pointer to the previous node of the list
    pub prev: Link<T>,
    /// Element of the node
    pub data: T,
}

/// Doubly linked intrusive list.
///
/// The list never allocates. Nodes are written by [`List::place`] at an
/// address chosen by the caller and then linked with one of the insert
/// methods. Keeping the list ordered is the caller's job.
pub(crate) struct List<T> {
    head: Link<T>,
    tail: Link<T>,
    len: usize,
    marker: PhantomData<T>,
}

/// Iterator over the nodes of a [`List`], from head to tail.
pub(crate) struct Iter<'a, T> {
    current: Link<T>,
    remaining: usize,
    marker: PhantomData<&'a T>,
}

impl<T: Copy> Node<T> {
    /// Reads the data stored in `node`.
    ///
    /// **SAFETY**: `node` must point to a node written by [`List::place`].
    #[inline]
    pub unsafe fn data(node: NonNull<Self>) -> T {
        unsafe { (&raw const (*node.as_ptr()).data).read_unaligned() }
    }

    /// Overwrites the data stored in `node`.
    ///
    /// **SAFETY**: same as [`Node::data`].
    #[inline]
    pub unsafe fn set_data(node: NonNull<Self>, data: T) {
        unsafe { (&raw mut (*node.as_ptr()).data).write_unaligned(data) }
    }

    #[inline]
    pub unsafe fn next(node: NonNull<Self>) -> Link<T> {
        unsafe { (&raw const (*node.as_ptr()).next).read_unaligned() }
    }

    #[inline]
    pub unsafe fn prev(node: NonNull<Self>) -> Link<T> {
        unsafe { (&raw const (*node.as_ptr()).prev).read_unaligned() }
    }

    #[inline]
    unsafe fn set_next(node: NonNull<Self>, next: Link<T>) {
        unsafe { (&raw mut (*node.as_ptr()).next).write_unaligned(next) }
    }

    #[inline]
    unsafe fn set_prev(node: NonNull<Self>, prev: Link<T>) {
        unsafe { (&raw mut (*node.as_ptr()).prev).write_unaligned(prev) }
    }
}

impl<T: Copy> List<T> {
    pub const fn new() -> Self {
        Self {
            head: None,
            tail: None,
            len: 0,
            marker: PhantomData,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn first(&self) -> Link<T> {
        self.head
    }

    #[inline]
    pub fn last(&self) -> Link<T> {
        self.tail
    }

    /// Forgets every node. The memory the nodes live in is not touched.
    pub fn clear(&mut self) {
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    /// Writes an unlinked node holding `data` at `addr`.
    ///
    /// It is very important for us that, because we are the actual memory
    /// allocator, this method can not make allocations itself. Therefor,
    /// it has to receive the `addr` where this node has to be written.
    ///
    /// **SAFETY**: Caller (we, as the allocator) must guarantee that
    /// `size_of::<Node<T>>()` bytes starting at `addr` are valid for writes
    /// and not used by anything else.
    pub unsafe fn place(addr: NonNull<u8>, data: T) -> NonNull<Node<T>> {
        let node = addr.cast::<Node<T>>();

        unsafe {
            node.as_ptr().write_unaligned(Node {
                next: None,
                prev: None,
                data,
            });
        }

        node
    }

    /// Links `node` as the new head.
    ///
    /// **SAFETY**: `node` must have been written by [`List::place`] and must
    /// not be linked in any list.
    pub unsafe fn insert_head(&mut self, node: NonNull<Node<T>>) {
        unsafe {
            Node::set_prev(node, None);
            Node::set_next(node, self.head);

            match self.head {
                Some(head) => Node::set_prev(head, Some(node)),
                None => self.tail = Some(node),
            }
        }

        self.head = Some(node);
        self.len += 1;
    }

    /// Links `node` as the new tail.
    ///
    /// **SAFETY**: same as [`List::insert_head`].
    pub unsafe fn insert_tail(&mut self, node: NonNull<Node<T>>) {
        unsafe {
            Node::set_next(node, None);
            Node::set_prev(node, self.tail);

            match self.tail {
                Some(tail) => Node::set_next(tail, Some(node)),
                None => self.head = Some(node),
            }
        }

        self.tail = Some(node);
        self.len += 1;
    }

    /// Links `node` right before `existing`.
    ///
    /// **SAFETY**: `existing` must be linked in this list, `node` must be
    /// placed and unlinked.
    pub unsafe fn insert_before(&mut self, existing: NonNull<Node<T>>, node: NonNull<Node<T>>) {
        unsafe {
            let Some(prev) = Node::prev(existing) else {
                self.insert_head(node);
                return;
            };

            Node::set_prev(node, Some(prev));
            Node::set_next(node, Some(existing));
            Node::set_next(prev, Some(node));
            Node::set_prev(existing, Some(node));
        }

        self.len += 1;
    }

    /// Links `node` right after `existing`.
    ///
    /// **SAFETY**: same as [`List::insert_before`].
    pub unsafe fn insert_after(&mut self, existing: NonNull<Node<T>>, node: NonNull<Node<T>>) {
        unsafe {
            let Some(next) = Node::next(existing) else {
                self.insert_tail(node);
                return;
            };

            Node::set_prev(node, Some(existing));
            Node::set_next(node, Some(next));
            Node::set_prev(next, Some(node));
            Node::set_next(existing, Some(node));
        }

        self.len += 1;
    }

    /// Unlinks `node`.
    ///
    /// **SAFETY**: `node` must be linked in this list.
    pub unsafe fn remove(&mut self, node: NonNull<Node<T>>) {
        unsafe {
            let prev = Node::prev(node);
            let next = Node::next(node);

            match prev {
                Some(prev) => Node::set_next(prev, next),
                None => self.head = next,
            }

            match next {
                Some(next) => Node::set_prev(next, prev),
                None => self.tail = prev,
            }

            Node::set_prev(node, None);
            Node::set_next(node, None);
        }

        self.len -= 1;
    }

    /// Puts `new` in the exact position `old` had. `old` is left unlinked and
    /// its memory is not touched anymore.
    ///
    /// This is what the allocator uses when a free block keeps its place in
    /// the list but its start address moves.
    ///
    /// **SAFETY**: `old` must be linked in this list, `new` must be placed,
    /// unlinked, and must not overlap `old`'s node.
    pub unsafe fn swap(&mut self, old: NonNull<Node<T>>, new: NonNull<Node<T>>) {
        unsafe {
            let prev = Node::prev(old);
            let next = Node::next(old);

            Node::set_prev(new, prev);
            Node::set_next(new, next);

            match prev {
                Some(prev) => Node::set_next(prev, Some(new)),
                None => self.head = Some(new),
            }

            match next {
                Some(next) => Node::set_prev(next, Some(new)),
                None => self.tail = Some(new),
            }
        }
    }

    /// Returns the first node, from head to tail, for which `predicate` holds.
    pub fn find(&self, mut predicate: impl FnMut(NonNull<Node<T>>, T) -> bool) -> Link<T> {
        self.iter()
            .find(|&node| predicate(node, unsafe { Node::data(node) }))
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            current: self.first(),
            remaining: self.len,
            marker: PhantomData,
        }
    }
}

impl<T: Copy> Iterator for Iter<'_, T> {
    type Item = NonNull<Node<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.current?;

        unsafe {
            self.current = Node::next(node);
        }
        self.remaining -= 1;

        Some(node)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T: Copy> IntoIterator for &'a List<T> {
    type Item = NonNull<Node<T>>;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
