use core::alloc::Layout;
use core::marker::PhantomData;
use std::rc::Rc;

use crate::allocator::{slot_compatible, PoolAllocator};
use crate::observer::PoolObserver;
use crate::raw_pool::RawPool;

/// A fixed-capacity bump-pointer pool.
///
/// A pool owns one contiguous block of uninitialized storage, sized for a
/// fixed number of slots of the element type it was declared over. Typed
/// [`PoolAllocator`] handles obtained from [`allocator()`](Pool::allocator)
/// hand out sequential sub-ranges of the block; the block itself is created
/// lazily by the first allocation and freed when the pool (and every handle
/// onto it) is dropped.
///
/// The pool never grows, never chains a second block, and never reclaims
/// interior ranges: the bump cursor only moves forward, and only rewinds
/// (to zero) once every outstanding range has been returned, at which point
/// the same block starts a new generation.
///
/// When a pool backs a container, declare it over the container's node type
/// so the capacity counts whole container entries — see
/// [`list::Node`](crate::list::Node) and [`map::Entry`](crate::map::Entry).
///
/// # Example
///
/// ```
/// use fixedpool::prelude::*;
///
/// let pool = Pool::new::<u32>(3);
/// let allocator = pool.allocator::<u32>();
///
/// let range = allocator.allocate(3).unwrap();
/// assert!(allocator.allocate(1).is_err());
///
/// unsafe { allocator.deallocate(range, 3) };
/// assert_eq!(pool.in_use(), 0);
/// ```
#[derive(Debug)]
pub struct Pool {
    raw: Rc<RawPool>,
}

impl Pool {
    /// Creates a pool holding `capacity` slots of `T`.
    ///
    /// No memory is requested from the system until the first allocation.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero, `T` is zero-sized, or the block size
    /// overflows.
    pub fn new<T>(capacity: usize) -> Self {
        Self {
            raw: Rc::new(RawPool::new(Layout::new::<T>(), capacity, None)),
        }
    }

    /// Creates a pool that reports every state change to `observer`.
    ///
    /// # Panics
    ///
    /// Panics under the same conditions as [`new`](Self::new).
    pub fn with_observer<T>(capacity: usize, observer: Rc<dyn PoolObserver>) -> Self {
        Self {
            raw: Rc::new(RawPool::new(Layout::new::<T>(), capacity, Some(observer))),
        }
    }

    /// Returns a typed allocator handle over this pool.
    ///
    /// Handles are cheap to clone and all refer to the same pool record;
    /// two handles compare equal exactly when they share a pool.
    ///
    /// # Panics
    ///
    /// Panics if `U`'s alignment does not fit the pool's slot grid (an
    /// alignment larger than the slot stride or the block alignment).
    pub fn allocator<U>(&self) -> PoolAllocator<U> {
        assert!(
            slot_compatible::<U>(&self.raw),
            "element type is over-aligned for this pool's slots"
        );
        PoolAllocator {
            raw: self.raw.clone(),
            element: PhantomData,
        }
    }

    /// Fixed slot capacity of the pool.
    pub fn capacity(&self) -> usize {
        self.raw.capacity()
    }

    /// Slots handed out in the current generation.
    pub fn in_use(&self) -> usize {
        self.raw.used()
    }

    /// Allocated ranges that have not yet been returned.
    pub fn outstanding(&self) -> usize {
        self.raw.outstanding()
    }

    /// Whether the backing block has been created.
    pub fn has_block(&self) -> bool {
        self.raw.has_block()
    }

    /// Number of times the pool has been fully returned and reset.
    pub fn generation(&self) -> u64 {
        self.raw.generation()
    }
}
