#![doc = include_str!("../README.md")]
#![deny(missing_debug_implementations)]
#![deny(missing_docs)]
#![deny(unsafe_op_in_unsafe_fn)]

mod allocator;
mod error;
mod observer;
mod pool;
mod raw_pool;

pub mod list;
pub mod map;

pub use allocator::{Allocator, Global, PoolAllocator};
pub use error::AllocError;
pub use list::List;
pub use map::OrderedMap;
pub use observer::{PoolEvent, PoolObserver, RecordingObserver, TracingObserver};
pub use pool::Pool;

/// Re-exports the types most users need.
pub mod prelude {
    pub use crate::allocator::{Allocator, Global, PoolAllocator};
    pub use crate::error::AllocError;
    pub use crate::list::List;
    pub use crate::map::OrderedMap;
    pub use crate::pool::Pool;
}
