//! End-to-end scenarios: the pool driving its two consumers, and
//! pool-contract properties quantified over capacities.

use std::rc::Rc;

use proptest::prelude::*;

use fixedpool::list::Node;
use fixedpool::map::Entry;
use fixedpool::prelude::*;
use fixedpool::{PoolEvent, RecordingObserver};

fn factorial(n: i32) -> i32 {
    if n <= 1 {
        1
    } else {
        factorial(n - 1) * n
    }
}

#[test]
fn capacity_ten_list_holds_exactly_ten_values() {
    let pool = Pool::new::<Node<i32>>(10);
    let mut list = List::new_in(pool.allocator::<i32>());

    for i in 0..10 {
        list.push_back(i).unwrap();
    }
    assert!(matches!(
        list.push_back(10),
        Err(AllocError::OutOfMemory { .. })
    ));

    assert_eq!(
        list.iter().copied().collect::<Vec<_>>(),
        (0..10).collect::<Vec<_>>()
    );

    while list.pop_front().is_some() {}
    assert!(list.is_empty());
    assert_eq!(pool.outstanding(), 0);
}

#[test]
fn capacity_ten_map_holds_exactly_ten_factorials() {
    let pool = Pool::new::<Entry<i32, i32>>(10);
    let mut map = OrderedMap::new_in(pool.allocator::<(i32, i32)>());

    for key in 0..10 {
        map.insert(key, factorial(key)).unwrap();
    }
    assert!(matches!(
        map.insert(10, 0),
        Err(AllocError::OutOfMemory { .. })
    ));

    assert_eq!(map.len(), 10);
    assert_eq!(map.get(&9), Some(&362880));

    let pairs: Vec<(i32, i32)> = map.iter().map(|(k, v)| (*k, *v)).collect();
    let expected: Vec<(i32, i32)> = (0..10).map(|k| (k, factorial(k))).collect();
    assert_eq!(pairs, expected);

    // Replacing an existing key needs no new entry even on a full pool.
    assert_eq!(map.insert(5, -1).unwrap(), Some(factorial(5)));
}

#[test]
fn consumers_run_on_the_system_heap_too() {
    let mut list = List::new();
    let mut map = OrderedMap::new();
    for i in 0..100 {
        list.push_back(i).unwrap();
        map.insert(i, factorial(i % 10)).unwrap();
    }
    assert_eq!(list.len(), 100);
    assert_eq!(map.len(), 100);
}

#[test]
fn observer_sees_the_whole_story() {
    let recorder = Rc::new(RecordingObserver::new());
    let pool = Pool::with_observer::<u64>(2, recorder.clone());
    let allocator = pool.allocator::<u64>();

    let a = allocator.allocate(1).unwrap();
    let b = allocator.allocate(1).unwrap();
    unsafe {
        allocator.deallocate(a, 1);
        allocator.deallocate(b, 1);
    }

    assert_eq!(
        recorder.events(),
        [
            PoolEvent::BlockAllocated {
                slots: 2,
                bytes: 16
            },
            PoolEvent::Allocated { slots: 1, used: 1 },
            PoolEvent::Allocated { slots: 1, used: 2 },
            PoolEvent::Deallocated { outstanding: 1 },
            PoolEvent::Deallocated { outstanding: 0 },
            PoolEvent::Reset { generation: 1 },
        ]
    );
}

proptest! {
    /// A fresh pool of capacity `n` serves exactly `n` single-element
    /// allocations, at strictly increasing non-overlapping addresses.
    #[test]
    fn pool_serves_exactly_its_capacity(n in 1usize..48) {
        let pool = Pool::new::<u64>(n);
        let allocator = pool.allocator::<u64>();

        let mut ranges = Vec::with_capacity(n);
        for _ in 0..n {
            ranges.push(allocator.allocate(1).unwrap());
        }
        for pair in ranges.windows(2) {
            prop_assert_eq!(unsafe { pair[0].as_ptr().add(1) }, pair[1].as_ptr());
        }

        prop_assert_eq!(
            allocator.allocate(1),
            Err(AllocError::OutOfMemory { requested: 1, available: 0 })
        );

        for range in ranges {
            unsafe { allocator.deallocate(range, 1) };
        }
        prop_assert_eq!(pool.outstanding(), 0);
    }

    /// A request larger than the whole pool is rejected up front and does
    /// not create the backing block.
    #[test]
    fn oversized_requests_never_touch_the_system(n in 1usize..48, extra in 1usize..16) {
        let pool = Pool::new::<u64>(n);
        let allocator = pool.allocator::<u64>();

        prop_assert_eq!(
            allocator.allocate(n + extra),
            Err(AllocError::CapacityExceeded { requested: n + extra, capacity: n })
        );
        prop_assert!(!pool.has_block());
    }

    /// Returning every range rewinds the pool: the next generation starts
    /// at the same base address.
    #[test]
    fn full_release_starts_a_new_generation_in_the_same_block(n in 1usize..48) {
        let pool = Pool::new::<u64>(n);
        let allocator = pool.allocator::<u64>();

        let first = allocator.allocate(n).unwrap();
        unsafe { allocator.deallocate(first, n) };
        prop_assert_eq!(pool.generation(), 1);

        let second = allocator.allocate(1).unwrap();
        prop_assert_eq!(first, second);
        unsafe { allocator.deallocate(second, 1) };
    }

    /// Any push_back sequence drains in insertion order.
    #[test]
    fn list_drains_in_insertion_order(values in proptest::collection::vec(any::<i16>(), 0..64)) {
        let mut list = List::new();
        for value in &values {
            list.push_back(*value).unwrap();
        }

        prop_assert_eq!(list.iter().copied().collect::<Vec<_>>(), values.clone());

        let mut drained = Vec::with_capacity(values.len());
        while let Some(value) = list.pop_front() {
            drained.push(value);
        }
        prop_assert_eq!(drained, values);
        prop_assert!(list.is_empty());
    }
}
