//! Generational handle pool.
//!
//! [`HandlePool<T>`] is a dense slot allocator that hands out [`Handle<T>`]s.
//! Storage is a plain `Vec` of slots plus a parallel generation array and a
//! LIFO free list:
//!
//! - `insert` reuses the most recently freed slot, or appends a new slot,
//!   growing storage by roughly 1.5x when full.
//! - `remove` is O(1): the value is taken out, the slot's generation is bumped
//!   and the index is pushed on the free list. Storage is never compacted.
//! - `get` resolves a handle only if its index is in range and its generation
//!   matches the slot's current generation, so stale handles resolve to `None`
//!   even after the slot has been reused.
//!
//! The pool has no internal synchronization. It is owned by exactly one
//! device or registry and mutated from one thread.
//!
//! # Example
//!
//! ```
//! use ember_core::pool::HandlePool;
//!
//! let mut pool = HandlePool::new();
//! let a = pool.insert("albedo");
//! assert_eq!(pool.get(a), Some(&"albedo"));
//!
//! pool.remove(a);
//! let b = pool.insert("normal"); // reuses the slot
//! assert_eq!(a.index(), b.index());
//! assert_eq!(pool.get(a), None); // stale generation
//! ```

use std::ops::{Index, IndexMut};

use crate::handle::{Handle, MAX_GENERATION, MAX_INDEX};

/// Generation assigned to a slot the first time it is used.
pub const FIRST_GENERATION: u16 = 1;

const MIN_GROWTH: usize = 4;

/// Generation of a slot that is never handed out again.
const RETIRED_GENERATION: u16 = u16::MAX;

/// Generational slot allocator.
#[derive(Debug, Clone)]
pub struct HandlePool<T> {
    /// Slot storage. `None` marks a free (or retired) slot.
    values: Vec<Option<T>>,
    /// Current generation of every slot.
    generations: Vec<u16>,
    /// Indices of free slots, reused LIFO.
    free: Vec<u64>,
    /// Number of live values.
    len: usize,
}

impl<T> Default for HandlePool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> HandlePool<T> {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self {
            values: Vec::new(),
            generations: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    /// Create an empty pool with room for `capacity` slots.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
            generations: Vec::with_capacity(capacity),
            free: Vec::new(),
            len: 0,
        }
    }

    /// Insert a value and return its handle.
    pub fn insert(&mut self, value: T) -> Handle<T> {
        let index = self.acquire_slot();
        self.values[index as usize] = Some(value);
        self.len += 1;
        Handle::new(index, self.generations[index as usize])
    }

    /// Insert a value built from the handle it is about to receive.
    ///
    /// Useful for values that need to know their own handle.
    pub fn insert_with(&mut self, build: impl FnOnce(Handle<T>) -> T) -> Handle<T> {
        let index = self.acquire_slot();
        let handle = Handle::new(index, self.generations[index as usize]);
        self.values[index as usize] = Some(build(handle));
        self.len += 1;
        handle
    }

    /// Insert a default-constructed value for in-place initialization.
    pub fn insert_default(&mut self) -> (Handle<T>, &mut T)
    where
        T: Default,
    {
        let index = self.acquire_slot();
        self.len += 1;
        let generation = self.generations[index as usize];
        let value = self.values[index as usize].insert(T::default());
        (Handle::new(index, generation), value)
    }

    /// Resolve a handle.
    ///
    /// Returns `None` for the invalid sentinel, out-of-range indices, stale
    /// generations and removed values.
    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        let index = self.live_index(handle)?;
        self.values[index].as_ref()
    }

    /// Resolve a handle mutably.
    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        let index = self.live_index(handle)?;
        self.values[index].as_mut()
    }

    /// Resolve two distinct handles mutably at once.
    ///
    /// Returns `None` if either handle is stale or both refer to the same slot.
    pub fn get2_mut(&mut self, a: Handle<T>, b: Handle<T>) -> Option<(&mut T, &mut T)> {
        let ia = self.live_index(a)?;
        let ib = self.live_index(b)?;
        if ia == ib {
            return None;
        }
        let (va, vb) = if ia < ib {
            let (left, right) = self.values.split_at_mut(ib);
            (&mut left[ia], &mut right[0])
        } else {
            let (left, right) = self.values.split_at_mut(ia);
            (&mut right[0], &mut left[ib])
        };
        Some((va.as_mut()?, vb.as_mut()?))
    }

    /// Check whether a handle resolves to a live value.
    pub fn contains(&self, handle: Handle<T>) -> bool {
        self.get(handle).is_some()
    }

    /// Remove a value, invalidating every outstanding handle to its slot.
    ///
    /// Returns the removed value, or `None` if the handle was already stale.
    pub fn remove(&mut self, handle: Handle<T>) -> Option<T> {
        let index = self.live_index(handle)?;
        let value = self.values[index].take()?;
        self.len -= 1;
        self.release_slot(index);
        Some(value)
    }

    /// Remove every value, keeping slot storage for reuse.
    ///
    /// The free stack is rebuilt so that later inserts fill slots in index
    /// order, as they would in a fresh pool.
    pub fn clear(&mut self) {
        self.free.clear();
        for index in (0..self.values.len()).rev() {
            let reusable = if self.values[index].take().is_some() {
                self.bump_generation(index)
            } else {
                self.generations[index] != RETIRED_GENERATION
            };
            if reusable {
                self.free.push(index as u64);
            }
        }
        self.len = 0;
    }

    /// Number of live values.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the pool holds no live values.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots ever allocated (live, free and retired).
    pub fn slot_count(&self) -> usize {
        self.values.len()
    }

    /// Allocated slot capacity of the backing storage.
    pub fn capacity(&self) -> usize {
        self.values.capacity()
    }

    /// Current generation of a slot, if the slot exists.
    pub fn generation_of(&self, index: u64) -> Option<u16> {
        self.generations.get(index as usize).copied()
    }

    /// Iterate over live values with their handles, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> + '_ {
        self.values
            .iter()
            .zip(&self.generations)
            .enumerate()
            .filter_map(|(index, (value, &generation))| {
                value
                    .as_ref()
                    .map(|v| (Handle::new(index as u64, generation), v))
            })
    }

    /// Iterate mutably over live values with their handles, in slot order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Handle<T>, &mut T)> + '_ {
        self.values
            .iter_mut()
            .zip(&self.generations)
            .enumerate()
            .filter_map(|(index, (value, &generation))| {
                value
                    .as_mut()
                    .map(|v| (Handle::new(index as u64, generation), v))
            })
    }

    /// Handles of every live value, in slot order.
    pub fn handles(&self) -> impl Iterator<Item = Handle<T>> + '_ {
        self.iter().map(|(handle, _)| handle)
    }

    fn live_index(&self, handle: Handle<T>) -> Option<usize> {
        if handle.is_invalid() {
            return None;
        }
        let index = handle.index() as usize;
        let generation = *self.generations.get(index)?;
        (generation == handle.generation()).then_some(index)
    }

    fn acquire_slot(&mut self) -> u64 {
        if let Some(index) = self.free.pop() {
            return index;
        }

        let index = self.values.len() as u64;
        assert!(index <= MAX_INDEX, "handle pool exhausted its index space");

        if self.values.len() == self.values.capacity() {
            let additional = (self.values.capacity() / 2).max(MIN_GROWTH);
            self.values.reserve_exact(additional);
            self.generations.reserve_exact(additional);
        }

        self.values.push(None);
        self.generations.push(FIRST_GENERATION);
        index
    }

    fn release_slot(&mut self, index: usize) {
        if self.bump_generation(index) {
            self.free.push(index as u64);
        }
    }

    /// Invalidate a slot's handles. Returns false if the slot was retired.
    fn bump_generation(&mut self, index: usize) -> bool {
        let generation = self.generations[index];
        if generation >= MAX_GENERATION {
            // Bumping would wrap and let stale handles alias.
            self.generations[index] = RETIRED_GENERATION;
            log::debug!("HandlePool: retiring slot {index} after {generation} generations");
            return false;
        }
        self.generations[index] = generation + 1;
        true
    }
}

impl<T> Index<Handle<T>> for HandlePool<T> {
    type Output = T;

    /// Resolve a handle, panicking on stale or invalid handles.
    ///
    /// A stale handle here is a use-after-free in calling code.
    fn index(&self, handle: Handle<T>) -> &T {
        match self.get(handle) {
            Some(value) => value,
            None => panic!("stale or invalid handle {handle:?}"),
        }
    }
}

impl<T> IndexMut<Handle<T>> for HandlePool<T> {
    fn index_mut(&mut self, handle: Handle<T>) -> &mut T {
        match self.get_mut(handle) {
            Some(value) => value,
            None => panic!("stale or invalid handle {handle:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_insert_get() {
        let mut pool = HandlePool::new();
        let a = pool.insert(10);
        let b = pool.insert(20);

        assert_eq!(pool.get(a), Some(&10));
        assert_eq!(pool.get(b), Some(&20));
        assert_eq!(pool.len(), 2);
        assert_eq!(a.generation(), FIRST_GENERATION);
    }

    #[test]
    fn test_remove_invalidates_handle() {
        let mut pool = HandlePool::new();
        let a = pool.insert(1);

        assert_eq!(pool.remove(a), Some(1));
        assert_eq!(pool.get(a), None);
        assert_eq!(pool.remove(a), None);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_stale_handle_after_slot_reuse() {
        let mut pool = HandlePool::new();
        let a = pool.insert("first");
        pool.remove(a);
        let b = pool.insert("second");

        assert_eq!(a.index(), b.index());
        assert_ne!(a.generation(), b.generation());
        assert_eq!(pool.get(a), None);
        assert_eq!(pool.get(b), Some(&"second"));
    }

    #[test]
    fn test_free_list_is_lifo() {
        let mut pool = HandlePool::new();
        let a = pool.insert(0);
        let b = pool.insert(1);
        let _c = pool.insert(2);

        pool.remove(a);
        pool.remove(b);

        assert_eq!(pool.insert(3).index(), b.index());
        assert_eq!(pool.insert(4).index(), a.index());
    }

    #[test]
    fn test_invalid_sentinel_never_resolves() {
        let mut pool = HandlePool::new();
        pool.insert(5);
        assert_eq!(pool.get(Handle::INVALID), None);
        assert_eq!(pool.get(Handle::default()), None);
    }

    #[test]
    fn test_out_of_range_index() {
        let pool: HandlePool<u32> = HandlePool::new();
        assert_eq!(pool.get(Handle::new(3, FIRST_GENERATION)), None);
    }

    #[test]
    fn test_insert_default_in_place() {
        let mut pool: HandlePool<Vec<u32>> = HandlePool::new();
        let (handle, value) = pool.insert_default();
        value.push(7);
        assert_eq!(pool.get(handle), Some(&vec![7]));
    }

    #[test]
    fn test_insert_with_sees_own_handle() {
        let mut pool: HandlePool<(Handle<()>, u32)> = HandlePool::new();
        let handle = pool.insert_with(|h| (h.cast(), 9));
        assert_eq!(pool[handle].0, handle.cast());
    }

    #[test]
    fn test_distinct_handles() {
        let mut pool = HandlePool::new();
        let handles: HashSet<_> = (0..100).map(|i| pool.insert(i)).collect();
        assert_eq!(handles.len(), 100);
        for handle in &handles {
            assert!(pool.contains(*handle));
        }
    }

    #[test]
    fn test_generations_never_repeat_for_a_slot() {
        let mut pool = HandlePool::new();
        let mut seen = HashSet::new();
        let mut handle = pool.insert(0u32);
        seen.insert(handle);

        for i in 1..50 {
            pool.remove(handle);
            handle = pool.insert(i);
            assert!(seen.insert(handle), "handle {handle:?} reused");
        }
    }

    #[test]
    fn test_growth_keeps_handles_valid() {
        let mut pool = HandlePool::with_capacity(2);
        let handles: Vec<_> = (0..64).map(|i| pool.insert(i)).collect();
        for (i, handle) in handles.iter().enumerate() {
            assert_eq!(pool[*handle], i);
        }
        assert!(pool.capacity() >= 64);
    }

    #[test]
    fn test_clear_keeps_storage_and_invalidates() {
        let mut pool = HandlePool::new();
        let a = pool.insert(1);
        let b = pool.insert(2);
        let slots = pool.slot_count();

        pool.clear();

        assert!(pool.is_empty());
        assert_eq!(pool.slot_count(), slots);
        assert_eq!(pool.get(a), None);
        assert_eq!(pool.get(b), None);

        let c = pool.insert(3);
        assert!(c.index() < slots as u64);
    }

    #[test]
    fn test_clear_refills_in_index_order() {
        let mut pool = HandlePool::new();
        let fresh: Vec<_> = (0..4).map(|i| pool.insert(i)).collect();
        pool.remove(fresh[2]);

        pool.clear();
        let refilled: Vec<_> = (0..4).map(|i| pool.insert(i)).collect();
        for (old, new) in fresh.iter().zip(&refilled) {
            assert_eq!(old.index(), new.index());
        }
        assert_eq!(pool.slot_count(), 4);
    }

    #[test]
    fn test_iter_skips_removed() {
        let mut pool = HandlePool::new();
        let a = pool.insert('a');
        let b = pool.insert('b');
        let c = pool.insert('c');
        pool.remove(b);

        let live: Vec<_> = pool.iter().collect();
        assert_eq!(live, vec![(a, &'a'), (c, &'c')]);
    }

    #[test]
    fn test_get2_mut() {
        let mut pool = HandlePool::new();
        let a = pool.insert(1);
        let b = pool.insert(2);

        let (va, vb) = pool.get2_mut(a, b).unwrap();
        std::mem::swap(va, vb);

        assert_eq!(pool[a], 2);
        assert_eq!(pool[b], 1);
        assert!(pool.get2_mut(a, a).is_none());
    }

    #[test]
    fn test_slot_retired_at_max_generation() {
        let mut pool = HandlePool::new();
        let mut handle = pool.insert(0u32);
        let index = handle.index();

        while pool.generation_of(index).unwrap() < MAX_GENERATION {
            pool.remove(handle);
            handle = pool.insert(0);
            assert_eq!(handle.index(), index);
        }

        pool.remove(handle);
        let next = pool.insert(1);
        assert_ne!(next.index(), index);
        assert_eq!(pool.get(handle), None);
    }

    #[test]
    #[should_panic(expected = "stale or invalid handle")]
    fn test_index_stale_panics() {
        let mut pool = HandlePool::new();
        let a = pool.insert(1);
        pool.remove(a);
        let _ = pool[a];
    }
}
