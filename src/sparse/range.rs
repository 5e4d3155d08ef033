use alloc::vec::Vec;
use core::ops::{Index, IndexMut};
use core::{fmt, mem};

use super::{Iter, IterMut, Slot};
use crate::SlotIndex;
use crate::entity::{EntityRef, EntitySet, PackedOption};

/// Fixed-capacity slot storage.
///
/// Adding a value reuses the most recently vacated slot if there is one, and
/// otherwise materializes the next untouched slot. Indices are stable: a value
/// stays at the index it was added at until it is removed.
///
/// A range never grows. Adding to a full range is a contract violation which
/// is only caught in debug builds; [`SparseArray`] is the growing variant.
///
/// ```
/// use sparsepool::SparseRange;
///
/// let mut range: SparseRange<&str> = SparseRange::new(4);
/// let a = range.add("a");
/// let b = range.add("b");
/// assert_eq!(range.remove(a), "a");
///
/// // The most recently vacated slot is reused first.
/// assert_eq!(range.add("c"), a);
/// assert_eq!(range[b], "b");
/// assert_eq!(range.len(), 2);
/// ```
///
/// [`SparseArray`]: crate::SparseArray
pub struct SparseRange<T, K: EntityRef = SlotIndex> {
    /// Materialized slots. Never longer than `capacity`, and allocated up
    /// front so that adding never moves existing values.
    slots: Vec<Slot<K, T>>,

    capacity: usize,

    /// Head of the free chain.
    first_free: PackedOption<K>,

    /// Number of occupied slots.
    len: usize,

    /// Number of retired slots.
    retired: usize,
}

impl<T, K: EntityRef> SparseRange<T, K> {
    /// Creates an empty range with room for `capacity` values.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        debug_assert!(
            capacity <= K::index_limit(),
            "capacity {capacity} exceeds the index type's limit"
        );
        Self {
            slots: Vec::with_capacity(capacity),
            capacity,
            first_free: PackedOption::default(),
            len: 0,
            retired: 0,
        }
    }

    /// Adds a value and returns its index.
    ///
    /// The range must not be full; this is only checked in debug builds.
    #[inline]
    pub fn add(&mut self, value: T) -> K {
        self.add_with(|_| value)
    }

    /// Adds the value returned by `f`, which receives the index the value
    /// will be stored at.
    pub fn add_with(&mut self, f: impl FnOnce(K) -> T) -> K {
        let index = match self.first_free.expand() {
            Some(index) => {
                // The slot stays on the chain until `f` has returned.
                let value = f(index);
                let slot = &mut self.slots[index.index()];
                let Slot::Free(next) = *slot else {
                    unreachable!("free chain reaches slot {} which isn't free", index.index());
                };
                self.first_free = next;
                *slot = Slot::Occupied(value);
                index
            }
            None => {
                debug_assert!(
                    self.slots.len() < self.capacity,
                    "SparseRange is full ({} slots)",
                    self.capacity
                );
                let index = K::new(self.slots.len());
                let value = f(index);
                self.slots.push(Slot::Occupied(value));
                index
            }
        };
        self.len += 1;
        index
    }

    /// Takes the value out of an occupied slot, leaving `vacant` in its place.
    fn take(&mut self, index: K, vacant: Slot<K, T>) -> Option<T> {
        let slot = self.slots.get_mut(index.index())?;
        if !matches!(slot, Slot::Occupied(_)) {
            return None;
        }
        let Slot::Occupied(value) = mem::replace(slot, vacant) else {
            unreachable!();
        };
        self.len -= 1;
        Some(value)
    }

    /// Removes the value at `index`, returning it if the slot was occupied.
    ///
    /// The slot becomes the head of the free chain, so it is the next one to
    /// be reused.
    pub fn try_remove(&mut self, index: K) -> Option<T> {
        let value = self.take(index, Slot::Free(self.first_free))?;
        self.first_free = index.into();
        Some(value)
    }

    /// Removes the value at `index`.
    ///
    /// Panics if the slot isn't occupied.
    #[track_caller]
    pub fn remove(&mut self, index: K) -> T {
        match self.try_remove(index) {
            Some(value) => value,
            None => panic!("removing slot {} which isn't occupied", index.index()),
        }
    }

    /// Removes the value at `index` and takes the slot out of use for good.
    ///
    /// The slot is never reused, not even after [`SparseRange::clear`].
    /// Panics if the slot isn't occupied.
    #[track_caller]
    pub fn retire(&mut self, index: K) -> T {
        match self.take(index, Slot::Retired) {
            Some(value) => {
                self.retired += 1;
                value
            }
            None => panic!("retiring slot {} which isn't occupied", index.index()),
        }
    }

    /// Returns whether no further value can be added.
    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.first_free.is_none() && self.slots.len() == self.capacity
    }

    /// Drops every value.
    ///
    /// Retired slots stay retired; every other materialized slot becomes
    /// vacant, with the free chain in ascending index order. Calling this on
    /// an empty range does nothing.
    pub fn clear(&mut self) {
        // Slots above the last retired one can go back to being untouched.
        let keep = self
            .slots
            .iter()
            .rposition(|slot| matches!(slot, Slot::Retired))
            .map_or(0, |pos| pos + 1);
        self.slots.truncate(keep);

        let mut next = PackedOption::default();
        for (i, slot) in self.slots.iter_mut().enumerate().rev() {
            if !matches!(slot, Slot::Retired) {
                *slot = Slot::Free(next);
                next = K::new(i).into();
            }
        }
        self.first_free = next;
        self.len = 0;
    }

    /// Returns the set of slots which are available for reuse: the ones on
    /// the free chain plus every untouched slot.
    ///
    /// This walks the whole chain and allocates a bit set covering the
    /// capacity, so it's meant for diagnostics rather than hot paths.
    #[must_use]
    pub fn dead_slots(&self) -> EntitySet<K> {
        let mut dead = EntitySet::with_max_index(self.capacity);
        let mut next = self.first_free;
        while let Some(index) = next.expand() {
            dead.insert(index);
            next = match self.slots[index.index()] {
                Slot::Free(next) => next,
                _ => break,
            };
        }
        for i in self.slots.len()..self.capacity {
            dead.insert(K::new(i));
        }
        dead
    }

    /// Moves every value and the free chain into `dst`, preserving indices.
    ///
    /// `dst` must be empty and at least as large as `self`. Afterwards `self`
    /// is empty and has no materialized slots.
    pub fn move_to(&mut self, dst: &mut SparseRange<T, K>) {
        debug_assert!(dst.slots.is_empty(), "moving into a non-empty range");
        debug_assert!(
            dst.capacity >= self.capacity,
            "moving {} slots into a range of {}",
            self.capacity,
            dst.capacity
        );
        dst.slots.append(&mut self.slots);
        dst.first_free = mem::take(&mut self.first_free);
        dst.len = mem::take(&mut self.len);
        dst.retired = mem::take(&mut self.retired);
    }

    /// Number of values in the range.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns whether the range holds no values.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total number of slots, including retired ones.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of retired slots.
    #[inline]
    #[must_use]
    pub fn retired_count(&self) -> usize {
        self.retired
    }

    /// Returns whether the slot at `index` holds a value.
    #[inline]
    #[must_use]
    pub fn contains(&self, index: K) -> bool {
        matches!(self.slots.get(index.index()), Some(Slot::Occupied(_)))
    }

    /// Returns whether the slot at `index` has been retired.
    #[inline]
    #[must_use]
    pub fn is_retired(&self, index: K) -> bool {
        matches!(self.slots.get(index.index()), Some(Slot::Retired))
    }

    /// Returns the value at `index`, if the slot is occupied.
    #[inline]
    #[must_use]
    pub fn get(&self, index: K) -> Option<&T> {
        match self.slots.get(index.index())? {
            Slot::Occupied(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the value at `index` mutably, if the slot is occupied.
    #[inline]
    pub fn get_mut(&mut self, index: K) -> Option<&mut T> {
        match self.slots.get_mut(index.index())? {
            Slot::Occupied(value) => Some(value),
            _ => None,
        }
    }

    /// Iterates over the occupied slots in index order.
    #[inline]
    #[must_use]
    pub fn iter(&self) -> Iter<'_, K, T> {
        Iter::new(&self.slots, self.len)
    }

    /// Iterates mutably over the occupied slots in index order.
    #[inline]
    pub fn iter_mut(&mut self) -> IterMut<'_, K, T> {
        IterMut::new(&mut self.slots, self.len)
    }

    /// Materialized slots, for validation.
    #[inline]
    pub(crate) fn slots(&self) -> &[Slot<K, T>] {
        &self.slots
    }

    /// Head of the free chain, for validation.
    #[inline]
    pub(crate) fn first_free(&self) -> Option<K> {
        self.first_free.expand()
    }
}

impl<T, K: EntityRef> Index<K> for SparseRange<T, K> {
    type Output = T;

    #[inline]
    #[track_caller]
    fn index(&self, index: K) -> &T {
        match self.get(index) {
            Some(value) => value,
            None => panic!("slot {} isn't occupied", index.index()),
        }
    }
}

impl<T, K: EntityRef> IndexMut<K> for SparseRange<T, K> {
    #[inline]
    #[track_caller]
    fn index_mut(&mut self, index: K) -> &mut T {
        match self.get_mut(index) {
            Some(value) => value,
            None => panic!("slot {} isn't occupied", index.index()),
        }
    }
}

impl<'a, T, K: EntityRef> IntoIterator for &'a SparseRange<T, K> {
    type Item = (K, &'a T);
    type IntoIter = Iter<'a, K, T>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: Clone, K: EntityRef> Clone for SparseRange<T, K> {
    fn clone(&self) -> Self {
        // Adding to the copy must never move its values.
        let mut slots = Vec::with_capacity(self.capacity);
        slots.extend(self.slots.iter().cloned());
        Self {
            slots,
            capacity: self.capacity,
            first_free: self.first_free,
            len: self.len,
            retired: self.retired,
        }
    }
}

impl<T: fmt::Debug, K: EntityRef + fmt::Debug> fmt::Debug for SparseRange<T, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use alloc::vec::Vec;

    use super::*;

    fn slot(index: usize) -> SlotIndex {
        SlotIndex::new(index)
    }

    #[test]
    fn reuse_is_lifo() {
        let mut range: SparseRange<u32> = SparseRange::new(8);
        for value in 0..4 {
            assert_eq!(range.add(value), slot(value as usize));
        }
        range.remove(slot(1));
        range.remove(slot(3));
        assert_eq!(range.add(10), slot(3));
        assert_eq!(range.add(11), slot(1));
        assert_eq!(range.add(12), slot(4));
        assert_eq!(range.len(), 5);
    }

    #[test]
    fn add_with_sees_its_index() {
        let mut range: SparseRange<usize> = SparseRange::new(4);
        range.add(0);
        let index = range.add_with(|index| index.index() * 10);
        assert_eq!(range[index], 10);
    }

    #[test]
    fn clone_keeps_values_in_place() {
        let mut range: SparseRange<u64> = SparseRange::new(8);
        let first = range.add(7);
        let mut copy = range.clone();
        assert_eq!(copy.capacity(), 8);
        let before: *const u64 = &copy[first];
        for value in 0..6 {
            copy.add(value);
        }
        assert_eq!(copy.len(), 7);
        assert!(core::ptr::eq(before, &copy[first]));
        assert_eq!(copy[first], 7);
        assert_eq!(range.len(), 1);
    }

    #[test]
    fn fills_up() {
        let mut range: SparseRange<()> = SparseRange::new(2);
        assert!(!range.is_full());
        let a = range.add(());
        range.add(());
        assert!(range.is_full());
        range.remove(a);
        assert!(!range.is_full());
        assert_eq!(range.try_remove(a), None);
    }

    #[test]
    #[should_panic(expected = "isn't occupied")]
    fn remove_vacant_panics() {
        let mut range: SparseRange<u8> = SparseRange::new(2);
        let a = range.add(1);
        range.remove(a);
        range.remove(a);
    }

    #[test]
    fn dead_slots_cover_chain_and_tail() {
        let mut range: SparseRange<u8> = SparseRange::new(6);
        for value in 0..4 {
            range.add(value);
        }
        range.remove(slot(0));
        range.remove(slot(2));
        let dead: Vec<_> = range.dead_slots().iter().map(EntityRef::index).collect();
        assert_eq!(dead, [0, 2, 4, 5]);
    }

    #[test]
    fn clear_is_idempotent() {
        let tracker = Rc::new(());
        let mut range: SparseRange<Rc<()>> = SparseRange::new(4);
        for _ in 0..3 {
            range.add(tracker.clone());
        }
        range.remove(slot(1));
        assert_eq!(Rc::strong_count(&tracker), 3);

        range.clear();
        assert!(range.is_empty());
        assert_eq!(Rc::strong_count(&tracker), 1);
        range.clear();
        assert!(range.is_empty());
        assert_eq!(Rc::strong_count(&tracker), 1);
        assert_eq!(range.dead_slots().count(), 4);
    }

    #[test]
    fn retired_slots_survive_clear() {
        let mut range: SparseRange<u8> = SparseRange::new(4);
        for value in 0..3 {
            range.add(value);
        }
        assert_eq!(range.retire(slot(1)), 1);
        assert!(range.is_retired(slot(1)));
        assert_eq!(range.len(), 2);

        range.clear();
        assert!(range.is_retired(slot(1)));
        assert_eq!(range.retired_count(), 1);
        assert_eq!(range.add(7), slot(0));
        assert_eq!(range.add(8), slot(2));
        assert_eq!(range.add(9), slot(3));
        assert!(range.is_full());
    }

    #[test]
    fn move_to_preserves_indices_and_chain() {
        let mut small: SparseRange<u32> = SparseRange::new(3);
        for value in 0..3 {
            small.add(value);
        }
        small.remove(slot(1));

        let mut large = SparseRange::new(6);
        small.move_to(&mut large);
        assert!(small.is_empty());
        assert_eq!(large.len(), 2);
        assert_eq!(large[slot(0)], 0);
        assert_eq!(large[slot(2)], 2);
        assert_eq!(large.add(5), slot(1));
        assert_eq!(large.add(6), slot(3));

        let values: Vec<_> = large.iter().map(|(_, &v)| v).collect();
        assert_eq!(values, [0, 5, 2, 6]);
    }
}
