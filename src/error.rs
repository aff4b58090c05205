//! Contains the [`AllocError`] type returned by failed allocation requests.

use thiserror::Error;

/// The reason an allocation request against a pool could not be served.
///
/// Both variants are terminal for the operation that triggered them: the
/// pool never retries, grows, or falls back to another storage source.
/// Containers built on top of a pool propagate the error to their caller
/// as an insertion failure.
///
/// The counts carried by each variant are denominated in pool slots. For
/// the element type a pool was declared over, one slot holds exactly one
/// element, so the counts match the element counts passed to
/// [`Allocator::allocate`](crate::Allocator::allocate).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum AllocError {
    /// A single request asked for more slots than the pool could ever
    /// hold, independent of how many are currently in use.
    #[error("requested {requested} slots from a pool of {capacity}")]
    CapacityExceeded {
        /// Slots the request asked for.
        requested: usize,
        /// Fixed slot capacity of the pool.
        capacity: usize,
    },

    /// The backing block could not be obtained from the system, or the
    /// current block has insufficient remaining room for the request.
    #[error("pool exhausted: requested {requested} slots, {available} available")]
    OutOfMemory {
        /// Slots the request asked for.
        requested: usize,
        /// Slots still unallocated in the current block.
        available: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::AllocError;

    #[test]
    fn display_names_the_counts() {
        let err = AllocError::CapacityExceeded {
            requested: 11,
            capacity: 10,
        };
        assert_eq!(err.to_string(), "requested 11 slots from a pool of 10");

        let err = AllocError::OutOfMemory {
            requested: 1,
            available: 0,
        };
        assert_eq!(
            err.to_string(),
            "pool exhausted: requested 1 slots, 0 available"
        );
    }
}
