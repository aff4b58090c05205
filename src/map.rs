//! A minimal ordered map that draws its entry storage from an
//! [`Allocator`].
//!
//! Entries form a singly linked chain kept sorted by key, which is as much
//! map as the allocator demo needs: every insertion of a new key allocates
//! exactly one entry, iteration is in ascending key order, and the map
//! returns every entry to its allocator on drop.

use core::cmp::Ordering;
use core::fmt;
use core::marker::PhantomData;
use core::mem;
use core::ptr::NonNull;

use crate::allocator::{Allocator, Global};
use crate::error::AllocError;

/// One map entry: a key, its value, and a link to the next entry in key
/// order.
///
/// Public so a pool can be declared over it, making the pool's capacity
/// count map entries — see [`OrderedMap`].
pub struct Entry<K, V> {
    key: K,
    value: V,
    next: Option<NonNull<Entry<K, V>>>,
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Entry<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("key", &self.key)
            .field("value", &self.value)
            .finish()
    }
}

/// An ordered map over an [`Allocator`].
///
/// Inserting a new key is fallible because the allocator may be a fixed
/// pool; replacing the value of an existing key allocates nothing and
/// cannot fail.
///
/// # Example
///
/// ```
/// use fixedpool::prelude::*;
/// use fixedpool::map::Entry;
///
/// let pool = Pool::new::<Entry<i32, i32>>(2);
/// let mut map = OrderedMap::new_in(pool.allocator::<(i32, i32)>());
///
/// map.insert(2, 20).unwrap();
/// map.insert(1, 10).unwrap();
/// assert!(map.insert(3, 30).is_err());
///
/// let pairs: Vec<_> = map.iter().map(|(k, v)| (*k, *v)).collect();
/// assert_eq!(pairs, [(1, 10), (2, 20)]);
/// ```
pub struct OrderedMap<K, V, A: Allocator<(K, V)> = Global> {
    head: Option<NonNull<Entry<K, V>>>,
    len: usize,
    entries: A::Rebound<Entry<K, V>>,
    marker: PhantomData<(K, V)>,
}

impl<K: Ord, V> OrderedMap<K, V, Global> {
    /// Creates an empty map backed by the system heap.
    pub fn new() -> Self {
        Self::new_in(Global)
    }
}

impl<K: Ord, V> Default for OrderedMap<K, V, Global> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord, V, A: Allocator<(K, V)>> OrderedMap<K, V, A> {
    /// Creates an empty map that allocates its entries through `allocator`.
    ///
    /// The allocator is rebound to the map's entry type; a
    /// [`PoolAllocator`](crate::PoolAllocator) must therefore come from a
    /// pool whose slots can hold an [`Entry<K, V>`].
    pub fn new_in(allocator: A) -> Self {
        Self {
            head: None,
            len: 0,
            entries: allocator.rebind::<Entry<K, V>>(),
            marker: PhantomData,
        }
    }

    /// Inserts `key` with `value`, keeping entries sorted by key.
    ///
    /// Returns the previous value if the key was already present. Fails
    /// without modifying the map when a new entry is needed and the
    /// allocator cannot provide one.
    pub fn insert(&mut self, key: K, value: V) -> Result<Option<V>, AllocError> {
        let mut link = &mut self.head;
        while let Some(mut current) = *link {
            // Safety: entries are owned by the map, and link chasing never
            // aliases: each iteration moves the borrow one entry forward
            let entry = unsafe { current.as_mut() };
            match entry.key.cmp(&key) {
                Ordering::Less => link = &mut entry.next,
                Ordering::Equal => return Ok(Some(mem::replace(&mut entry.value, value))),
                Ordering::Greater => break,
            }
        }

        let entry = self.entries.allocate(1)?;
        // Safety: entry is valid for writes of one Entry<K, V>
        unsafe {
            entry.as_ptr().write(Entry {
                key,
                value,
                next: *link,
            });
        }
        *link = Some(entry);
        self.len += 1;
        Ok(None)
    }

    /// Returns the value stored for `key`.
    pub fn get(&self, key: &K) -> Option<&V> {
        let mut current = self.head;
        while let Some(entry) = current {
            // Safety: entries are owned by the map, borrow tied to &self
            let entry = unsafe { entry.as_ref() };
            match entry.key.cmp(key) {
                Ordering::Less => current = entry.next,
                Ordering::Equal => return Some(&entry.value),
                Ordering::Greater => return None,
            }
        }
        None
    }

    /// Whether `key` is present.
    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Whether the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Number of entries in the map.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Iterates over `(key, value)` pairs in ascending key order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            next: self.head,
            marker: PhantomData,
        }
    }
}

impl<K, V, A: Allocator<(K, V)>> Drop for OrderedMap<K, V, A> {
    fn drop(&mut self) {
        let mut current = self.head.take();
        while let Some(entry) = current {
            // Safety: each entry is read exactly once and its storage
            // released immediately after, dropping the key and value
            let owned = unsafe { entry.as_ptr().read() };
            // Safety: entry came from this map's allocator
            unsafe { self.entries.deallocate(entry, 1) };
            current = owned.next;
        }
    }
}

impl<'a, K: Ord, V, A: Allocator<(K, V)>> IntoIterator for &'a OrderedMap<K, V, A> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

impl<K: fmt::Debug + Ord, V: fmt::Debug, A: Allocator<(K, V)>> fmt::Debug for OrderedMap<K, V, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Borrowing iterator over an [`OrderedMap`], in ascending key order.
pub struct Iter<'a, K, V> {
    next: Option<NonNull<Entry<K, V>>>,
    marker: PhantomData<&'a Entry<K, V>>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<(&'a K, &'a V)> {
        // Safety: the entry outlives 'a, the map it belongs to is borrowed
        // for 'a and never frees entries while borrowed
        let entry = unsafe { self.next?.as_ref() };
        self.next = entry.next;
        Some((&entry.key, &entry.value))
    }
}

impl<K, V> core::iter::FusedIterator for Iter<'_, K, V> {}

impl<K, V> fmt::Debug for Iter<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Iter").finish_non_exhaustive()
    }
}
