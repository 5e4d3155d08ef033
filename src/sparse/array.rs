use core::fmt;
use core::ops::{Index, IndexMut};

use super::{Iter, IterMut, SparseRange};
use crate::entity::{EntityRef, EntitySet};
use crate::{GrowthPolicy, SlotIndex, Stats};

/// Growing slot storage.
///
/// This behaves like a [`SparseRange`] with no capacity ceiling: when a value
/// is added while every slot is in use, the storage is replaced by a larger
/// range according to the array's [`GrowthPolicy`]. Growing relocates every
/// value but keeps all indices and the free chain intact. It is the only
/// operation that moves values in memory.
///
/// ```
/// use sparsepool::SparseArray;
///
/// let mut array: SparseArray<u32> = SparseArray::with_capacity(2);
/// let indices: Vec<_> = (0..10).map(|i| array.add(i * i)).collect();
/// assert!(array.capacity() >= 10);
/// assert_eq!(array[indices[7]], 49);
/// ```
pub struct SparseArray<T, K: EntityRef = SlotIndex> {
    range: SparseRange<T, K>,
    policy: GrowthPolicy,
    stats: Stats,
}

impl<T, K: EntityRef> SparseArray<T, K> {
    /// Creates an empty array which allocates on the first insertion.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty array with room for `capacity` values before it has
    /// to grow.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_policy(capacity, GrowthPolicy::default())
    }

    /// Creates an empty array with a custom growth policy.
    #[must_use]
    pub fn with_policy(capacity: usize, policy: GrowthPolicy) -> Self {
        Self {
            range: SparseRange::new(capacity),
            policy,
            stats: Stats::default(),
        }
    }

    /// Number of slots that can still be filled without growing.
    #[inline]
    fn spare(&self) -> usize {
        self.range.capacity() - self.range.len() - self.range.retired_count()
    }

    /// Makes sure that `additional` more values can be added without
    /// growing.
    pub fn reserve(&mut self, additional: usize) {
        let spare = self.spare();
        if spare < additional {
            let capacity = self.range.capacity();
            let wanted = capacity + (additional - spare);
            self.grow_to(self.policy.next_capacity(capacity).max(wanted));
        }
    }

    fn grow_to(&mut self, capacity: usize) {
        let capacity = capacity.min(K::index_limit());
        debug_assert!(
            capacity > self.range.capacity(),
            "SparseArray can't grow past {} slots",
            self.range.capacity()
        );
        trace!(
            "Growing sparse array from {} to {capacity} slots with {} values",
            self.range.capacity(),
            self.range.len()
        );
        stat!(self.stats, grows);
        stat!(self.stats, relocated_elements, self.range.len());

        let mut range = SparseRange::new(capacity);
        self.range.move_to(&mut range);
        self.range = range;
    }

    /// Adds a value and returns its index, growing the array if it is full.
    #[inline]
    pub fn add(&mut self, value: T) -> K {
        self.add_with(|_| value)
    }

    /// Adds the value returned by `f`, which receives the index the value
    /// will be stored at.
    pub fn add_with(&mut self, f: impl FnOnce(K) -> T) -> K {
        if self.range.is_full() {
            self.grow_to(self.policy.next_capacity(self.range.capacity()));
        }
        let reused = self.range.first_free().is_some();
        let index = self.range.add_with(f);
        stat!(self.stats, adds);
        if reused {
            stat!(self.stats, reused_slots);
        } else {
            stat!(self.stats, fresh_slots);
        }
        index
    }

    /// Removes the value at `index`, returning it if the slot was occupied.
    pub fn try_remove(&mut self, index: K) -> Option<T> {
        let value = self.range.try_remove(index)?;
        stat!(self.stats, removes);
        Some(value)
    }

    /// Removes the value at `index`.
    ///
    /// Panics if the slot isn't occupied.
    #[track_caller]
    pub fn remove(&mut self, index: K) -> T {
        stat!(self.stats, removes);
        self.range.remove(index)
    }

    /// Removes the value at `index` and takes the slot out of use for good.
    ///
    /// Panics if the slot isn't occupied.
    #[track_caller]
    pub fn retire(&mut self, index: K) -> T {
        trace!("Retiring slot {}", index.index());
        stat!(self.stats, retired_slots);
        self.range.retire(index)
    }

    /// Drops every value, keeping the current capacity. Retired slots stay
    /// retired.
    pub fn clear(&mut self) {
        stat!(self.stats, clears);
        self.range.clear();
    }

    /// Returns whether the next insertion will have to grow the array.
    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.range.is_full()
    }

    /// See [`SparseRange::dead_slots`].
    #[must_use]
    pub fn dead_slots(&self) -> EntitySet<K> {
        self.range.dead_slots()
    }

    /// Number of values in the array.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.range.len()
    }

    /// Returns whether the array holds no values.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    /// Number of slots in the current storage, including retired ones.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.range.capacity()
    }

    /// Returns whether the slot at `index` holds a value.
    #[inline]
    #[must_use]
    pub fn contains(&self, index: K) -> bool {
        self.range.contains(index)
    }

    /// Returns the value at `index`, if the slot is occupied.
    #[inline]
    #[must_use]
    pub fn get(&self, index: K) -> Option<&T> {
        self.range.get(index)
    }

    /// Returns the value at `index` mutably, if the slot is occupied.
    #[inline]
    pub fn get_mut(&mut self, index: K) -> Option<&mut T> {
        self.range.get_mut(index)
    }

    /// Iterates over the occupied slots in index order.
    #[inline]
    #[must_use]
    pub fn iter(&self) -> Iter<'_, K, T> {
        self.range.iter()
    }

    /// Iterates mutably over the occupied slots in index order.
    #[inline]
    pub fn iter_mut(&mut self) -> IterMut<'_, K, T> {
        self.range.iter_mut()
    }

    /// The growth policy used when the array fills up.
    #[inline]
    #[must_use]
    pub fn policy(&self) -> GrowthPolicy {
        self.policy
    }

    /// Statistics collected since the array was created.
    #[inline]
    #[must_use]
    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    #[inline]
    pub(crate) fn stats_mut(&mut self) -> &mut Stats {
        &mut self.stats
    }

    /// The current backing range.
    #[inline]
    #[must_use]
    pub fn as_range(&self) -> &SparseRange<T, K> {
        &self.range
    }
}

impl<T, K: EntityRef> Default for SparseArray<T, K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone, K: EntityRef> Clone for SparseArray<T, K> {
    fn clone(&self) -> Self {
        Self {
            range: self.range.clone(),
            policy: self.policy,
            stats: self.stats.clone(),
        }
    }
}

impl<T, K: EntityRef> Index<K> for SparseArray<T, K> {
    type Output = T;

    #[inline]
    #[track_caller]
    fn index(&self, index: K) -> &T {
        &self.range[index]
    }
}

impl<T, K: EntityRef> IndexMut<K> for SparseArray<T, K> {
    #[inline]
    #[track_caller]
    fn index_mut(&mut self, index: K) -> &mut T {
        &mut self.range[index]
    }
}

impl<'a, T, K: EntityRef> IntoIterator for &'a SparseArray<T, K> {
    type Item = (K, &'a T);
    type IntoIter = Iter<'a, K, T>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: fmt::Debug, K: EntityRef + fmt::Debug> fmt::Debug for SparseArray<T, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.range, f)
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;

    #[test]
    fn clone_adds_without_moving() {
        let mut array: SparseArray<u64> = SparseArray::with_capacity(8);
        let first = array.add(1);
        let mut copy = array.clone();
        let before: *const u64 = &copy[first];
        for value in 2..8 {
            copy.add(value);
        }
        assert_eq!(copy.capacity(), 8);
        assert!(core::ptr::eq(before, &copy[first]));
    }

    #[test]
    fn growth_preserves_contents() {
        let mut array: SparseArray<u32> = SparseArray::new();
        assert_eq!(array.capacity(), 0);
        let indices: Vec<_> = (0..20).map(|i| array.add(i)).collect();
        assert_eq!(array.len(), 20);
        for (i, &index) in indices.iter().enumerate() {
            assert_eq!(array[index], i as u32);
        }
    }

    #[test]
    fn growth_follows_policy() {
        let mut array: SparseArray<u8> = SparseArray::new();
        let mut seen = Vec::new();
        for i in 0..10 {
            array.add(i);
            if seen.last() != Some(&array.capacity()) {
                seen.push(array.capacity());
            }
        }
        assert_eq!(seen, [4, 6, 9, 13]);
    }

    #[test]
    fn growth_keeps_free_chain() {
        let mut array: SparseArray<u8> = SparseArray::with_capacity(3);
        let a = array.add(0);
        let b = array.add(1);
        array.add(2);
        array.remove(a);
        array.remove(b);
        array.reserve(4);
        assert!(array.capacity() >= 5);
        assert_eq!(array.add(3), b);
        assert_eq!(array.add(4), a);
        assert_eq!(array.add(5), SlotIndex::new(3));
    }

    #[test]
    fn reserve_accounts_for_retired_slots() {
        let mut array: SparseArray<u8> = SparseArray::with_capacity(4);
        let a = array.add(0);
        array.retire(a);
        array.reserve(3);
        assert_eq!(array.capacity(), 4);
        array.reserve(4);
        assert!(array.capacity() >= 5);
        for i in 0..4 {
            assert_ne!(array.add(i), a);
        }
    }

    #[test]
    #[cfg(feature = "stats")]
    fn stats_count_growth() {
        let mut array: SparseArray<u8> = SparseArray::with_capacity(1);
        let a = array.add(0);
        array.add(1);
        array.remove(a);
        array.add(2);
        let stats = array.stats();
        assert_eq!(stats.grows, 1);
        assert_eq!(stats.relocated_elements, 1);
        assert_eq!(stats.reused_slots, 1);
        assert_eq!(stats.fresh_slots, 2);
    }
}
