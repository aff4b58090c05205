//! Observer hooks for tracing pool activity.
//!
//! The pool itself never prints; it reports each state change to an
//! optional [`PoolObserver`] attached at construction. [`TracingObserver`]
//! forwards events to the [`tracing`] ecosystem, while
//! [`RecordingObserver`] buffers them for inspection in tests or tooling.

use core::cell::RefCell;

/// One observable state change of a pool.
///
/// All counts are in pool slots.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PoolEvent {
    /// The backing block was created (lazily, on the first allocation).
    BlockAllocated {
        /// Slot capacity of the block.
        slots: usize,
        /// Size of the block in bytes.
        bytes: usize,
    },
    /// A range of slots was handed out.
    Allocated {
        /// Slots consumed by this request.
        slots: usize,
        /// Slots in use after the request.
        used: usize,
    },
    /// A previously allocated range was returned.
    Deallocated {
        /// Live ranges remaining after the return.
        outstanding: usize,
    },
    /// Every outstanding range was returned; the bump cursor was rewound
    /// and the block retained for the next generation.
    Reset {
        /// Generation number the pool just entered.
        generation: u64,
    },
}

/// Receives [`PoolEvent`]s from a pool.
pub trait PoolObserver {
    /// Called synchronously for every state change, in order.
    fn on_event(&self, event: &PoolEvent);
}

/// A [`PoolObserver`] that emits every event as a [`tracing`] event at
/// `TRACE` level, under the `fixedpool` target.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl PoolObserver for TracingObserver {
    fn on_event(&self, event: &PoolEvent) {
        match *event {
            PoolEvent::BlockAllocated { slots, bytes } => {
                tracing::trace!(target: "fixedpool", slots, bytes, "block allocated");
            }
            PoolEvent::Allocated { slots, used } => {
                tracing::trace!(target: "fixedpool", slots, used, "range allocated");
            }
            PoolEvent::Deallocated { outstanding } => {
                tracing::trace!(target: "fixedpool", outstanding, "range returned");
            }
            PoolEvent::Reset { generation } => {
                tracing::trace!(target: "fixedpool", generation, "pool reset");
            }
        }
    }
}

/// A [`PoolObserver`] that appends every event to an in-memory buffer.
///
/// # Example
///
/// ```
/// use std::rc::Rc;
/// use fixedpool::{Allocator, Pool, PoolEvent, RecordingObserver};
///
/// let recorder = Rc::new(RecordingObserver::default());
/// let pool = Pool::with_observer::<u64>(4, recorder.clone());
/// let allocator = pool.allocator::<u64>();
///
/// let range = allocator.allocate(2).unwrap();
/// assert_eq!(
///     recorder.events().last(),
///     Some(&PoolEvent::Allocated { slots: 2, used: 2 })
/// );
/// # unsafe { allocator.deallocate(range, 2) };
/// ```
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: RefCell<Vec<PoolEvent>>,
}

impl RecordingObserver {
    /// Creates an observer with an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every event observed so far, oldest first.
    pub fn events(&self) -> Vec<PoolEvent> {
        self.events.borrow().clone()
    }

    /// Clears the buffer.
    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl PoolObserver for RecordingObserver {
    fn on_event(&self, event: &PoolEvent) {
        self.events.borrow_mut().push(*event);
    }
}
