use core::alloc::Layout;
use core::cell::Cell;
use core::ptr::NonNull;
use std::alloc;
use std::rc::Rc;

use crate::error::AllocError;
use crate::observer::{PoolEvent, PoolObserver};

// Matches the alignment the system allocator already guarantees for most
// sizes, and covers every rebound element type up to 16-byte alignment.
const MIN_BLOCK_ALIGN: usize = 16;

/// The shared pool record: one fixed-capacity block of slots, a bump
/// cursor, and a count of outstanding ranges.
///
/// Typed handles ([`PoolAllocator`](crate::PoolAllocator)) and the owning
/// [`Pool`](crate::Pool) all reference one `RawPool` through an `Rc`, so
/// copying a handle never duplicates pool state.
///
/// The block is created lazily by the first allocation and retained until
/// the `RawPool` is dropped. When the last outstanding range is returned,
/// the cursor rewinds to zero and a new generation begins in the same
/// block, so addresses repeat across generations.
pub(crate) struct RawPool {
    /// Layout of one slot, padded to its own alignment.
    slot: Layout,
    /// Layout of the whole block, computed once at construction.
    block: Layout,
    /// Fixed slot capacity, at least 1.
    capacity: usize,
    base: Cell<Option<NonNull<u8>>>,
    /// Slots handed out in the current generation.
    used: Cell<usize>,
    /// Allocate calls not yet matched by an in-block deallocate call.
    outstanding: Cell<usize>,
    generation: Cell<u64>,
    observer: Option<Rc<dyn PoolObserver>>,
}

impl RawPool {
    /// Creates a pool record for `capacity` slots of layout `slot`.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero, `slot` is zero-sized, or the block
    /// size overflows `isize`.
    pub(crate) fn new(
        slot: Layout,
        capacity: usize,
        observer: Option<Rc<dyn PoolObserver>>,
    ) -> Self {
        assert!(capacity > 0, "pool capacity must be at least one slot");
        let slot = slot.pad_to_align();
        assert!(slot.size() > 0, "pool slots must have a non-zero size");

        let bytes = slot
            .size()
            .checked_mul(capacity)
            .expect("pool block size overflows");
        let block = Layout::from_size_align(bytes, slot.align().max(MIN_BLOCK_ALIGN))
            .expect("pool block layout is invalid");

        Self {
            slot,
            block,
            capacity,
            base: Cell::new(None),
            used: Cell::new(0),
            outstanding: Cell::new(0),
            generation: Cell::new(0),
            observer,
        }
    }

    pub(crate) fn slot(&self) -> Layout {
        self.slot
    }

    pub(crate) fn block_align(&self) -> usize {
        self.block.align()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn used(&self) -> usize {
        self.used.get()
    }

    pub(crate) fn outstanding(&self) -> usize {
        self.outstanding.get()
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation.get()
    }

    pub(crate) fn has_block(&self) -> bool {
        self.base.get().is_some()
    }

    /// Hands out `slots` contiguous slots, bumping the cursor.
    ///
    /// The capacity check runs before the block is created, so an
    /// oversized request on a fresh pool leaves it blockless.
    pub(crate) fn allocate(&self, slots: usize) -> Result<NonNull<u8>, AllocError> {
        if slots > self.capacity {
            return Err(AllocError::CapacityExceeded {
                requested: slots,
                capacity: self.capacity,
            });
        }

        let base = match self.base.get() {
            Some(base) => base,
            None => self.allocate_block(slots)?,
        };

        let used = self.used.get();
        if used + slots > self.capacity {
            return Err(AllocError::OutOfMemory {
                requested: slots,
                available: self.capacity - used,
            });
        }

        // Safety: used + slots <= capacity, so the offset stays within the
        // block whose size is capacity * slot.size()
        let pointer = unsafe { NonNull::new_unchecked(base.as_ptr().add(used * self.slot.size())) };

        self.used.set(used + slots);
        self.outstanding.set(self.outstanding.get() + 1);
        self.emit(PoolEvent::Allocated {
            slots,
            used: used + slots,
        });
        Ok(pointer)
    }

    /// Returns a range previously handed out by [`allocate`](Self::allocate).
    ///
    /// Pointers outside the current block are ignored. When the last
    /// outstanding range comes back, the cursor rewinds and the next
    /// generation starts in the same block.
    pub(crate) fn deallocate(&self, pointer: NonNull<u8>) {
        let Some(base) = self.base.get() else {
            return;
        };

        let start = base.as_ptr() as usize;
        let addr = pointer.as_ptr() as usize;
        if addr < start || addr > start + self.block.size() {
            return;
        }

        let outstanding = self.outstanding.get();
        if outstanding == 0 {
            return;
        }

        self.outstanding.set(outstanding - 1);
        self.emit(PoolEvent::Deallocated {
            outstanding: outstanding - 1,
        });

        if outstanding == 1 {
            self.used.set(0);
            let generation = self.generation.get() + 1;
            self.generation.set(generation);
            self.emit(PoolEvent::Reset { generation });
        }
    }

    fn allocate_block(&self, requested: usize) -> Result<NonNull<u8>, AllocError> {
        // Safety: block layout size is never 0, capacity and slot size are
        // both non-zero
        let pointer = NonNull::new(unsafe { alloc::alloc(self.block) }).ok_or(
            AllocError::OutOfMemory {
                requested,
                available: self.capacity,
            },
        )?;

        self.base.set(Some(pointer));
        self.emit(PoolEvent::BlockAllocated {
            slots: self.capacity,
            bytes: self.block.size(),
        });
        Ok(pointer)
    }

    fn emit(&self, event: PoolEvent) {
        if let Some(observer) = &self.observer {
            observer.on_event(&event);
        }
    }
}

impl Drop for RawPool {
    fn drop(&mut self) {
        if let Some(base) = self.base.get() {
            // Safety: base was returned by alloc::alloc with this exact
            // layout and is freed only here
            unsafe { alloc::dealloc(base.as_ptr(), self.block) }
        }
    }
}

impl core::fmt::Debug for RawPool {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RawPool")
            .field("slot", &self.slot)
            .field("capacity", &self.capacity)
            .field("used", &self.used.get())
            .field("outstanding", &self.outstanding.get())
            .field("generation", &self.generation.get())
            .field("has_block", &self.base.get().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool_of_u64(capacity: usize) -> RawPool {
        RawPool::new(Layout::new::<u64>(), capacity, None)
    }

    #[test]
    fn sequential_fill_returns_increasing_addresses() {
        let pool = pool_of_u64(4);
        let mut last = None;
        for _ in 0..4 {
            let ptr = pool.allocate(1).unwrap();
            if let Some(last) = last {
                assert!(ptr.as_ptr() > last);
            }
            last = Some(ptr.as_ptr());
        }
        assert_eq!(
            pool.allocate(1),
            Err(AllocError::OutOfMemory {
                requested: 1,
                available: 0
            })
        );
    }

    #[test]
    fn oversized_request_leaves_pool_blockless() {
        let pool = pool_of_u64(4);
        assert_eq!(
            pool.allocate(5),
            Err(AllocError::CapacityExceeded {
                requested: 5,
                capacity: 4
            })
        );
        assert!(!pool.has_block());
        assert_eq!(pool.used(), 0);
    }

    #[test]
    fn block_is_created_once_and_reused_across_generations() {
        let pool = pool_of_u64(2);
        let first = pool.allocate(2).unwrap();
        pool.deallocate(first);

        assert_eq!(pool.used(), 0);
        assert_eq!(pool.generation(), 1);
        assert!(pool.has_block());

        let second = pool.allocate(1).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn foreign_pointer_is_a_no_op() {
        let pool = pool_of_u64(2);
        let live = pool.allocate(1).unwrap();

        let mut elsewhere = 0u64;
        pool.deallocate(NonNull::from(&mut elsewhere).cast());

        assert_eq!(pool.used(), 1);
        assert_eq!(pool.outstanding(), 1);
        assert!(pool.has_block());

        pool.deallocate(live);
        assert_eq!(pool.outstanding(), 0);
    }

    #[test]
    fn reset_waits_for_every_outstanding_range() {
        let pool = pool_of_u64(4);
        let a = pool.allocate(2).unwrap();
        let b = pool.allocate(2).unwrap();

        pool.deallocate(b);
        assert_eq!(pool.used(), 4, "cursor never rewinds mid-generation");
        assert_eq!(pool.outstanding(), 1);
        assert_eq!(pool.generation(), 0);

        pool.deallocate(a);
        assert_eq!(pool.used(), 0);
        assert_eq!(pool.generation(), 1);
    }

    #[test]
    #[should_panic(expected = "at least one slot")]
    fn zero_capacity_is_rejected() {
        pool_of_u64(0);
    }

    #[test]
    #[should_panic(expected = "non-zero size")]
    fn zero_sized_slots_are_rejected() {
        RawPool::new(Layout::new::<()>(), 4, None);
    }
}
