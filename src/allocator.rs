//! Contains the [`Allocator`] contract and its two implementations.

use core::alloc::Layout;
use core::marker::PhantomData;
use core::mem;
use core::ptr::NonNull;
use std::alloc;
use std::rc::Rc;

use crate::error::AllocError;
use crate::raw_pool::RawPool;

/// The storage contract a container needs from its allocator.
///
/// An implementation hands out storage for `count` contiguous elements of
/// `T` and takes it back one range at a time. Cloning an allocator clones a
/// handle, never the storage it manages, so containers may freely copy
/// their allocator on assignment or swap and both copies resolve against
/// the same underlying pool.
///
/// [`rebind`](Allocator::rebind) produces an allocator for a different
/// element type over the same storage; containers use it to allocate their
/// internal node types rather than the user-visible value type.
pub trait Allocator<T>: Clone {
    /// The allocator type produced by rebinding to element type `U`.
    type Rebound<U>: Allocator<U>;

    /// Returns an allocator for `U` backed by the same storage.
    fn rebind<U>(&self) -> Self::Rebound<U>;

    /// Requests storage for `count` contiguous elements of `T`.
    ///
    /// The returned pointer is valid for reads and writes of `count`
    /// elements and stays valid until it is passed to
    /// [`deallocate`](Allocator::deallocate). The storage is uninitialized.
    fn allocate(&self, count: usize) -> Result<NonNull<T>, AllocError>;

    /// Returns a range previously obtained from [`allocate`](Allocator::allocate).
    ///
    /// # Safety
    ///
    /// `pointer` must have been returned by `allocate(count)` on an
    /// allocator sharing this allocator's storage, must not have been
    /// returned already, and no element in the range may be read or
    /// written afterwards. The range's elements are not dropped.
    unsafe fn deallocate(&self, pointer: NonNull<T>, count: usize);
}

/// Whether elements of type `U` can be placed on `raw`'s slot grid.
///
/// Ranges always start on a slot boundary, so `U` fits when every slot
/// boundary is aligned for it: its alignment must divide the slot stride
/// and not exceed the block alignment.
pub(crate) fn slot_compatible<U>(raw: &RawPool) -> bool {
    let align = mem::align_of::<U>();
    align <= raw.block_align() && raw.slot().size() % align == 0
}

/// A typed handle onto a [`Pool`](crate::Pool).
///
/// The handle is a reference to the pool record, not a copy of its state:
/// clones and rebound handles all advance one shared bump cursor. Two
/// handles compare equal exactly when they refer to the same pool,
/// whatever their element types.
///
/// Element counts are converted to whole slots of the pool's declared
/// element type. For that type the conversion is the identity; a rebound
/// type consumes as many slots as its elements span.
pub struct PoolAllocator<T> {
    pub(crate) raw: Rc<RawPool>,
    pub(crate) element: PhantomData<fn() -> T>,
}

impl<T> PoolAllocator<T> {
    /// Slots spanned by `count` contiguous elements of `T`.
    fn slots_for(&self, count: usize) -> usize {
        let stride = self.raw.slot().size();
        let bytes = count.saturating_mul(mem::size_of::<T>());
        bytes / stride + usize::from(bytes % stride != 0)
    }
}

impl<T> Allocator<T> for PoolAllocator<T> {
    type Rebound<U> = PoolAllocator<U>;

    /// Returns a handle for `U` over the same pool.
    ///
    /// # Panics
    ///
    /// Panics if `U`'s alignment does not fit the pool's slot grid.
    fn rebind<U>(&self) -> PoolAllocator<U> {
        assert!(
            slot_compatible::<U>(&self.raw),
            "element type is over-aligned for this pool's slots"
        );
        PoolAllocator {
            raw: self.raw.clone(),
            element: PhantomData,
        }
    }

    fn allocate(&self, count: usize) -> Result<NonNull<T>, AllocError> {
        self.raw.allocate(self.slots_for(count)).map(NonNull::cast)
    }

    unsafe fn deallocate(&self, pointer: NonNull<T>, _count: usize) {
        self.raw.deallocate(pointer.cast());
    }
}

impl<T> Clone for PoolAllocator<T> {
    fn clone(&self) -> Self {
        Self {
            raw: self.raw.clone(),
            element: PhantomData,
        }
    }
}

impl<T, U> PartialEq<PoolAllocator<U>> for PoolAllocator<T> {
    fn eq(&self, other: &PoolAllocator<U>) -> bool {
        Rc::ptr_eq(&self.raw, &other.raw)
    }
}

impl<T> Eq for PoolAllocator<T> {}

impl<T> core::fmt::Debug for PoolAllocator<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("PoolAllocator").field(&self.raw).finish()
    }
}

/// The system heap as an [`Allocator`], for running pool-aware containers
/// without a pool.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Global;

impl<T> Allocator<T> for Global {
    type Rebound<U> = Global;

    fn rebind<U>(&self) -> Global {
        Global
    }

    fn allocate(&self, count: usize) -> Result<NonNull<T>, AllocError> {
        let layout = Layout::array::<T>(count).map_err(|_| AllocError::OutOfMemory {
            requested: count,
            available: 0,
        })?;

        if layout.size() == 0 {
            return Ok(NonNull::dangling());
        }

        // Safety: layout size is non-zero
        NonNull::new(unsafe { alloc::alloc(layout) })
            .map(NonNull::cast)
            .ok_or(AllocError::OutOfMemory {
                requested: count,
                available: 0,
            })
    }

    unsafe fn deallocate(&self, pointer: NonNull<T>, count: usize) {
        if let Ok(layout) = Layout::array::<T>(count) {
            if layout.size() != 0 {
                // Safety: pointer came from alloc::alloc with this layout,
                // per the trait contract
                unsafe { alloc::dealloc(pointer.cast().as_ptr(), layout) }
            }
        }
    }
}
