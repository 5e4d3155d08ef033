//! Sets of slot indices.

use alloc::vec;
use alloc::vec::Vec;
use core::fmt;
use core::marker::PhantomData;

use super::EntityRef;

/// Word type used in the bit set.
type Word = usize;

/// A set of slot indices implemented as a bit vector.
///
/// Sparse storage does not keep a liveness bitmap while it runs; this set is
/// how one is materialized on demand (see [`SparseRange::dead_slots`]).
///
/// [`SparseRange::dead_slots`]: crate::SparseRange::dead_slots
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct EntitySet<T>
where
    T: EntityRef,
{
    storage: Vec<Word>,
    marker: PhantomData<T>,
}

impl<T> EntitySet<T>
where
    T: EntityRef,
{
    /// Creates an empty set.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            storage: vec![],
            marker: PhantomData,
        }
    }

    /// Create a new set large enough to hold indices below `max_index`.
    #[must_use]
    pub fn with_max_index(max_index: usize) -> Self {
        let mut set = Self::new();
        set.grow_to(max_index);
        set
    }

    #[inline]
    fn index(entity: T) -> (usize, u32) {
        (
            entity.index() / Word::BITS as usize,
            entity.index() as u32 % Word::BITS,
        )
    }

    /// Returns whether the set contains the given index.
    ///
    /// Indices beyond the size of the set are never contained.
    #[inline]
    pub fn contains(&self, entity: T) -> bool {
        let (idx, bit) = Self::index(entity);
        self.storage
            .get(idx)
            .is_some_and(|&word| word & (1 << bit) != 0)
    }

    /// Inserts an element into the set, returning whether it was newly added.
    #[inline]
    #[track_caller]
    pub fn insert(&mut self, entity: T) -> bool {
        let (idx, bit) = Self::index(entity);
        let newly_added = self.storage[idx] & (1 << bit) == 0;
        self.storage[idx] |= 1 << bit;
        newly_added
    }

    /// Removes an element from the set.
    #[inline]
    #[track_caller]
    pub fn remove(&mut self, entity: T) {
        let (idx, bit) = Self::index(entity);
        self.storage[idx] &= !(1 << bit);
    }

    /// Resizes the set to be large enough to hold indices below `max_index`.
    ///
    /// Any existing elements are not modified.
    #[inline]
    pub fn grow_to(&mut self, max_index: usize) {
        let words = max_index.div_ceil(Word::BITS as usize);
        if words > self.storage.len() {
            self.storage.resize(words, 0);
        }
    }

    /// Returns whether the set contains no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.storage.iter().all(|&word| word == 0)
    }

    /// Returns the number of elements in the set.
    #[inline]
    pub fn count(&self) -> usize {
        self.storage
            .iter()
            .map(|word| word.count_ones() as usize)
            .sum()
    }

    /// Returns an iterator over all the elements in the set, starting from the
    /// lowest index.
    #[inline]
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            current_word: 0,
            next_index: 0,
            set: self,
        }
    }
}

impl<'a, T> IntoIterator for &'a EntitySet<T>
where
    T: EntityRef,
{
    type Item = T;

    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T> Default for EntitySet<T>
where
    T: EntityRef,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for EntitySet<T>
where
    T: EntityRef + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Iterator over the elements in an [`EntitySet`].
pub struct Iter<'a, T>
where
    T: EntityRef,
{
    current_word: Word,
    next_index: usize,
    set: &'a EntitySet<T>,
}

impl<T> Iterator for Iter<'_, T>
where
    T: EntityRef,
{
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        while self.current_word == 0 {
            self.current_word = *self.set.storage.get(self.next_index)?;
            self.next_index += 1;
        }

        let low_bit = self.current_word.trailing_zeros();
        self.current_word &= self.current_word - 1;
        let bit = (self.next_index - 1) * Word::BITS as usize + low_bit as usize;
        Some(T::new(bit))
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;
    use crate::SlotIndex;

    #[test]
    fn insert_iterate_remove() {
        let mut set = EntitySet::with_max_index(130);
        assert!(set.is_empty());
        assert!(set.insert(SlotIndex::new(129)));
        assert!(set.insert(SlotIndex::new(3)));
        assert!(!set.insert(SlotIndex::new(3)));
        assert_eq!(set.count(), 2);
        assert!(!set.contains(SlotIndex::new(4000)));

        let items: Vec<_> = set.iter().map(|i| i.index()).collect();
        assert_eq!(items, [3, 129]);

        set.remove(SlotIndex::new(3));
        assert!(!set.contains(SlotIndex::new(3)));
        set.remove(SlotIndex::new(129));
        assert!(set.is_empty());
    }
}
