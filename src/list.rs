//! A singly linked list that draws its node storage from an [`Allocator`].
//!
//! The list is the crate's reference consumer: every [`push_back`] obtains
//! exactly one node from the allocator, every [`pop_front`] returns one,
//! and dropping the list drains it so no node outlives it.
//!
//! [`push_back`]: List::push_back
//! [`pop_front`]: List::pop_front

use core::fmt;
use core::marker::PhantomData;
use core::ptr::NonNull;

use crate::allocator::{Allocator, Global};
use crate::error::AllocError;

/// One list node: a value and a link to its successor.
///
/// The fields are private; the type is public only so a pool can be
/// declared over it, making the pool's capacity count list entries:
///
/// ```
/// use fixedpool::prelude::*;
/// use fixedpool::list::Node;
///
/// let pool = Pool::new::<Node<i32>>(10);
/// let list = List::new_in(pool.allocator::<i32>());
/// # let _ = list;
/// ```
pub struct Node<T> {
    value: T,
    next: Option<NonNull<Node<T>>>,
}

impl<T: fmt::Debug> fmt::Debug for Node<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node").field("value", &self.value).finish()
    }
}

/// A singly linked list over an [`Allocator`].
///
/// The list exclusively owns its nodes: links are never exposed, and every
/// node is destroyed and returned to the allocator by [`pop_front`] or on
/// drop. Insertion is fallible because the allocator may be a fixed pool.
///
/// # Example
///
/// ```
/// use fixedpool::prelude::*;
/// use fixedpool::list::Node;
///
/// let pool = Pool::new::<Node<i32>>(3);
/// let mut list = List::new_in(pool.allocator::<i32>());
///
/// for i in 0..3 {
///     list.push_back(i).unwrap();
/// }
/// assert!(list.push_back(3).is_err());
///
/// assert_eq!(list.iter().copied().collect::<Vec<_>>(), [0, 1, 2]);
/// assert_eq!(list.pop_front(), Some(0));
/// ```
///
/// [`pop_front`]: List::pop_front
pub struct List<T, A: Allocator<T> = Global> {
    head: Option<NonNull<Node<T>>>,
    tail: Option<NonNull<Node<T>>>,
    len: usize,
    nodes: A::Rebound<Node<T>>,
    marker: PhantomData<T>,
}

impl<T> List<T, Global> {
    /// Creates an empty list backed by the system heap.
    pub fn new() -> Self {
        Self::new_in(Global)
    }
}

impl<T> Default for List<T, Global> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, A: Allocator<T>> List<T, A> {
    /// Creates an empty list that allocates its nodes through `allocator`.
    ///
    /// The allocator is rebound to the list's node type; a
    /// [`PoolAllocator`](crate::PoolAllocator) must therefore come from a
    /// pool whose slots can hold a [`Node<T>`].
    pub fn new_in(allocator: A) -> Self {
        Self {
            head: None,
            tail: None,
            len: 0,
            nodes: allocator.rebind::<Node<T>>(),
            marker: PhantomData,
        }
    }

    /// Appends `value` to the end of the list.
    ///
    /// Fails without modifying the list when the allocator cannot provide
    /// a node.
    pub fn push_back(&mut self, value: T) -> Result<(), AllocError> {
        let node = self.nodes.allocate(1)?;

        // Safety: node is valid for writes of one Node<T>
        unsafe { node.as_ptr().write(Node { value, next: None }) };

        match self.tail {
            // Safety: tail was allocated by push_back and is still owned
            // by the list
            Some(tail) => unsafe { (*tail.as_ptr()).next = Some(node) },
            None => self.head = Some(node),
        }
        self.tail = Some(node);
        self.len += 1;
        Ok(())
    }

    /// Removes the first element and returns it, or `None` if the list is
    /// empty. The node's storage goes back to the allocator.
    pub fn pop_front(&mut self) -> Option<T> {
        let head = self.head?;

        // Safety: head was initialized by push_back and is read at most
        // once, its storage is released immediately after
        let node = unsafe { head.as_ptr().read() };
        // Safety: head came from this list's allocator and is never
        // touched again
        unsafe { self.nodes.deallocate(head, 1) };

        self.head = node.next;
        if self.head.is_none() {
            self.tail = None;
        }
        self.len -= 1;
        Some(node.value)
    }

    /// Whether the list holds no elements.
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Number of elements in the list.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns the element at `index`, walking from the head.
    pub fn get(&self, index: usize) -> Option<&T> {
        let mut current = self.head;
        for _ in 0..index {
            // Safety: links only point at nodes owned by this list
            current = unsafe { current?.as_ref() }.next;
        }
        // Safety: as above, and the borrow is tied to &self
        current.map(|node| unsafe { &node.as_ref().value })
    }

    /// Iterates over the elements front to back.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            next: self.head,
            marker: PhantomData,
        }
    }
}

impl<T, A: Allocator<T>> Drop for List<T, A> {
    fn drop(&mut self) {
        while self.pop_front().is_some() {}
    }
}

impl<'a, T, A: Allocator<T>> IntoIterator for &'a List<T, A> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

impl<T: fmt::Debug, A: Allocator<T>> fmt::Debug for List<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Borrowing iterator over a [`List`], front to back.
pub struct Iter<'a, T> {
    next: Option<NonNull<Node<T>>>,
    marker: PhantomData<&'a Node<T>>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        // Safety: the node outlives 'a, the list it belongs to is borrowed
        // for 'a and never frees nodes while borrowed
        let node = unsafe { self.next?.as_ref() };
        self.next = node.next;
        Some(&node.value)
    }
}

impl<T> core::iter::FusedIterator for Iter<'_, T> {}

impl<T> fmt::Debug for Iter<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Iter").finish_non_exhaustive()
    }
}
