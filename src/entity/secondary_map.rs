//! Dense side tables keyed by slot index.

use alloc::vec::Vec;
use core::fmt;
use core::marker::PhantomData;
use core::ops::{Index, IndexMut};

use super::EntityRef;
use super::iter::{Iter, IterMut};

/// A mapping `K -> V` for densely indexed slots.
///
/// Pools use this to keep per-slot metadata (such as generation counters)
/// next to their primary storage. The map does not track whether a key has
/// been written: it is grown with a default value up to the highest index
/// that has been handed out, and entries are never removed individually.
#[derive(Clone, Hash, PartialEq, Eq)]
pub struct SecondaryMap<K, V>
where
    K: EntityRef,
{
    elems: Vec<V>,
    marker: PhantomData<K>,
}

impl<K, V> SecondaryMap<K, V>
where
    K: EntityRef,
{
    /// Create a new empty map.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            elems: Vec::new(),
            marker: PhantomData,
        }
    }

    /// Create a new map large enough to hold keys with an index below
    /// `max_index`, filled with default values.
    #[inline]
    #[must_use]
    pub fn with_max_index(max_index: usize) -> Self
    where
        V: Default,
    {
        let mut map = Self::new();
        map.grow_to(max_index);
        map
    }

    /// Resizes the map to be large enough to hold keys with an index below
    /// `max_index`.
    ///
    /// Existing values are not modified. New values are constructed with the
    /// [`Default`] trait.
    #[inline]
    pub fn grow_to(&mut self, max_index: usize)
    where
        V: Default,
    {
        self.grow_to_with(max_index, V::default);
    }

    /// Resizes the map to be large enough to hold keys with an index below
    /// `max_index`, constructing new values by calling `f`.
    #[inline]
    pub fn grow_to_with(&mut self, max_index: usize, f: impl FnMut() -> V) {
        if self.elems.len() < max_index {
            self.elems.resize_with(max_index, f);
        }
    }

    /// Removes every entry, keeping the allocation.
    #[inline]
    pub fn clear(&mut self) {
        self.elems.clear();
    }

    /// Number of keys covered by the map.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.elems.len()
    }

    /// Returns whether the map covers no keys at all.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }

    /// Get the value at `k` if the map covers it.
    #[inline]
    pub fn get(&self, k: K) -> Option<&V> {
        self.elems.get(k.index())
    }

    /// Get the value at `k` if the map covers it, mutable version.
    #[inline]
    pub fn get_mut(&mut self, k: K) -> Option<&mut V> {
        self.elems.get_mut(k.index())
    }

    /// Iterate over all the keys and values in this map.
    #[inline]
    #[must_use]
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(self.elems.iter())
    }

    /// Iterate over all the keys and values in this map, mutable edition.
    #[inline]
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut::new(self.elems.iter_mut())
    }
}

impl<K, V> Default for SecondaryMap<K, V>
where
    K: EntityRef,
{
    #[inline]
    fn default() -> SecondaryMap<K, V> {
        SecondaryMap::new()
    }
}

impl<K, V> Index<K> for SecondaryMap<K, V>
where
    K: EntityRef,
{
    type Output = V;

    #[inline]
    #[track_caller]
    fn index(&self, k: K) -> &V {
        &self.elems[k.index()]
    }
}

impl<K, V> IndexMut<K> for SecondaryMap<K, V>
where
    K: EntityRef,
{
    #[inline]
    #[track_caller]
    fn index_mut(&mut self, k: K) -> &mut V {
        &mut self.elems[k.index()]
    }
}

impl<'a, K, V> IntoIterator for &'a SecondaryMap<K, V>
where
    K: EntityRef,
{
    type Item = (K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V> fmt::Debug for SecondaryMap<K, V>
where
    K: EntityRef + fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SlotIndex;

    #[test]
    fn grow_keeps_existing_values() {
        let mut map: SecondaryMap<SlotIndex, u32> = SecondaryMap::with_max_index(2);
        map[SlotIndex::new(1)] = 7;
        map.grow_to(4);
        map.grow_to(1);
        assert_eq!(map.len(), 4);
        assert_eq!(map[SlotIndex::new(1)], 7);
        assert_eq!(map.get(SlotIndex::new(3)), Some(&0));
        assert_eq!(map.get(SlotIndex::new(4)), None);

        for (_, value) in map.iter_mut() {
            *value += 1;
        }
        let sum: u32 = map.iter().map(|(_, &v)| v).sum();
        assert_eq!(sum, 8 + 3);
    }
}
