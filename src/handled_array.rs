//! Growing slot storage addressed by generational handles.

use core::fmt;
use core::ops::{Index, IndexMut};

use crate::entity::{EntityRef, SecondaryMap};
use crate::id::{Generation, Id};
use crate::sparse::SparseArray;
use crate::{GrowthPolicy, SlotIndex, Stats};

/// A [`SparseArray`] whose elements are addressed by [`Id`] handles.
///
/// Every slot carries a generation which is bumped each time the slot is
/// vacated. A handle records the generation its slot had when the handle was
/// issued, so handles to removed elements can be told apart from handles to
/// whatever later reuses the slot. Slots whose generation is exhausted are
/// retired instead of being reused.
///
/// Handles are typed by the element type: an `Id` issued by a
/// `SparseHandledArray<Mesh>` can't be used with a `SparseHandledArray<Light>`.
///
/// Indexing with `array[id]` only compares generations in debug builds; in
/// release builds a stale handle whose slot has been reused returns the new
/// element. Use [`SparseHandledArray::get`] when a handle may be stale.
/// Indexing a vacant slot always panics.
///
/// ```
/// use sparsepool::SparseHandledArray;
///
/// struct Light {
///     intensity: f32,
/// }
///
/// let mut lights: SparseHandledArray<Light> = SparseHandledArray::new();
/// let key = lights.add(Light { intensity: 1.0 });
/// lights[key].intensity = 0.5;
///
/// let removed = lights.remove(key);
/// assert_eq!(removed.map(|light| light.intensity), Some(0.5));
/// assert!(lights.get(key).is_none());
/// assert!(lights.is_empty());
/// ```
pub struct SparseHandledArray<T, K: EntityRef = SlotIndex, G: Generation = u32> {
    storage: SparseArray<T, K>,

    /// Current generation of every slot that has ever been materialized.
    generations: SecondaryMap<K, G>,
}

impl<T, K: EntityRef, G: Generation> SparseHandledArray<T, K, G> {
    /// Creates an empty array which allocates on the first insertion.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty array with room for `capacity` elements before it
    /// has to grow.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_policy(capacity, GrowthPolicy::default())
    }

    /// Creates an empty array with a custom growth policy.
    #[must_use]
    pub fn with_policy(capacity: usize, policy: GrowthPolicy) -> Self {
        Self {
            storage: SparseArray::with_policy(capacity, policy),
            generations: SecondaryMap::new(),
        }
    }

    /// Adds an element and returns a handle to it.
    #[inline]
    pub fn add(&mut self, value: T) -> Id<K, G, T> {
        self.add_with(|_| value)
    }

    /// Adds the element returned by `f`, which receives the handle the
    /// element will be reachable through.
    pub fn add_with(&mut self, f: impl FnOnce(Id<K, G, T>) -> T) -> Id<K, G, T> {
        let generations = &mut self.generations;
        let index = self.storage.add_with(|index| {
            generations.grow_to(index.index() + 1);
            f(Id::new(index, generations[index]))
        });
        Id::new(index, self.generations[index])
    }

    /// Adds an element and returns both its handle and a reference to it.
    pub fn emplace(&mut self, value: T) -> (Id<K, G, T>, &mut T) {
        let id = self.add(value);
        (id, &mut self.storage[id.value()])
    }

    /// Removes the element `id` refers to.
    ///
    /// Returns `None` and leaves the array untouched if `id` is stale or null.
    pub fn remove(&mut self, id: Id<K, G, T>) -> Option<T> {
        if !self.is_valid_id(id) {
            trace!(
                "Ignoring removal through stale handle to slot {}v{}",
                id.value().index(),
                id.generation()
            );
            stat!(self.storage.stats_mut(), stale_removes);
            return None;
        }

        let index = id.value();
        match id.generation().next() {
            Some(next) => {
                self.generations[index] = next;
                Some(self.storage.remove(index))
            }
            None => {
                self.generations[index] = G::NULL;
                Some(self.storage.retire(index))
            }
        }
    }

    /// Returns whether `id` refers to a live element.
    #[inline]
    #[must_use]
    pub fn is_valid_id(&self, id: Id<K, G, T>) -> bool {
        id.generation() != G::NULL
            && self.generations.get(id.value()) == Some(&id.generation())
            && self.storage.contains(id.value())
    }

    /// Returns the element `id` refers to, or `None` if `id` is stale.
    #[inline]
    #[must_use]
    pub fn get(&self, id: Id<K, G, T>) -> Option<&T> {
        if self.is_valid_id(id) {
            self.storage.get(id.value())
        } else {
            None
        }
    }

    /// Returns the element `id` refers to mutably, or `None` if `id` is
    /// stale.
    #[inline]
    pub fn get_mut(&mut self, id: Id<K, G, T>) -> Option<&mut T> {
        if self.is_valid_id(id) {
            self.storage.get_mut(id.value())
        } else {
            None
        }
    }

    /// Returns the element in the slot at `index`, ignoring generations.
    ///
    /// Panics if the slot isn't occupied.
    #[inline]
    #[track_caller]
    #[must_use]
    pub fn by_index(&self, index: K) -> &T {
        &self.storage[index]
    }

    /// Returns the element in the slot at `index` mutably, ignoring
    /// generations.
    ///
    /// Panics if the slot isn't occupied.
    #[inline]
    #[track_caller]
    pub fn by_index_mut(&mut self, index: K) -> &mut T {
        &mut self.storage[index]
    }

    /// Returns the current generation of the slot at `index`.
    ///
    /// Slots that have never been used are at generation 0. Retired slots
    /// report [`Generation::NULL`].
    #[inline]
    #[must_use]
    pub fn generation(&self, index: K) -> G {
        self.generations.get(index).copied().unwrap_or_default()
    }

    /// Returns a handle to the element in the slot at `index`, if any.
    #[inline]
    #[must_use]
    pub fn id_at(&self, index: K) -> Option<Id<K, G, T>> {
        if self.storage.contains(index) {
            Some(Id::new(index, self.generations[index]))
        } else {
            None
        }
    }

    /// Number of live elements.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Returns whether there are no live elements.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Number of slots in the current storage, including retired ones.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.storage.capacity()
    }

    /// Makes sure that `additional` more elements can be added without
    /// moving the existing ones.
    #[inline]
    pub fn reserve(&mut self, additional: usize) {
        self.storage.reserve(additional);
    }

    /// Removes every element.
    ///
    /// The generation of every live slot is bumped, so all handles issued so
    /// far become stale.
    pub fn clear(&mut self) {
        for (index, generation) in self.generations.iter_mut() {
            if !self.storage.contains(index) {
                continue;
            }
            match generation.next() {
                Some(next) => *generation = next,
                None => {
                    *generation = G::NULL;
                    self.storage.retire(index);
                }
            }
        }
        self.storage.clear();
    }

    /// Iterates over the live elements and their handles, in slot order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (Id<K, G, T>, &T)> {
        let generations = &self.generations;
        self.storage
            .iter()
            .map(move |(index, value)| (Id::new(index, generations[index]), value))
    }

    /// Iterates mutably over the live elements and their handles, in slot
    /// order.
    pub fn iter_mut(&mut self) -> impl ExactSizeIterator<Item = (Id<K, G, T>, &mut T)> {
        let generations = &self.generations;
        self.storage
            .iter_mut()
            .map(move |(index, value)| (Id::new(index, generations[index]), value))
    }

    /// Iterates over the handles of the live elements, in slot order.
    pub fn ids(&self) -> impl ExactSizeIterator<Item = Id<K, G, T>> {
        self.iter().map(|(id, _)| id)
    }

    /// Removes every element for which `f` returns `false`.
    pub fn retain(&mut self, mut f: impl FnMut(Id<K, G, T>, &mut T) -> bool) {
        for i in 0..self.storage.capacity() {
            let Some(id) = self.id_at(K::new(i)) else {
                continue;
            };
            if !f(id, &mut self.storage[id.value()]) {
                self.remove(id);
            }
        }
    }

    /// Statistics collected since the array was created.
    #[inline]
    #[must_use]
    pub fn stats(&self) -> &Stats {
        self.storage.stats()
    }

    /// The underlying storage, addressed by raw index.
    #[inline]
    #[must_use]
    pub fn storage(&self) -> &SparseArray<T, K> {
        &self.storage
    }

    #[inline]
    pub(crate) fn generations(&self) -> &SecondaryMap<K, G> {
        &self.generations
    }
}

impl<T, K: EntityRef, G: Generation> Default for SparseHandledArray<T, K, G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone, K: EntityRef, G: Generation> Clone for SparseHandledArray<T, K, G> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            generations: self.generations.clone(),
        }
    }
}

impl<T, K: EntityRef, G: Generation> Index<Id<K, G, T>> for SparseHandledArray<T, K, G> {
    type Output = T;

    #[inline]
    #[track_caller]
    fn index(&self, id: Id<K, G, T>) -> &T {
        debug_assert!(
            self.generations.get(id.value()) == Some(&id.generation()),
            "stale handle to slot {}v{}",
            id.value().index(),
            id.generation()
        );
        &self.storage[id.value()]
    }
}

impl<T, K: EntityRef, G: Generation> IndexMut<Id<K, G, T>> for SparseHandledArray<T, K, G> {
    #[inline]
    #[track_caller]
    fn index_mut(&mut self, id: Id<K, G, T>) -> &mut T {
        debug_assert!(
            self.generations.get(id.value()) == Some(&id.generation()),
            "stale handle to slot {}v{}",
            id.value().index(),
            id.generation()
        );
        &mut self.storage[id.value()]
    }
}

impl<T, K, G> fmt::Debug for SparseHandledArray<T, K, G>
where
    T: fmt::Debug,
    K: EntityRef + fmt::Display,
    G: Generation,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::vec::Vec;
    use alloc::{format, vec};

    use super::*;

    #[test]
    fn add_lookup_remove() {
        let mut names: SparseHandledArray<String> = SparseHandledArray::new();
        let id = names.add(String::from("x"));
        assert_eq!(names[id], "x");
        assert_eq!(names.remove(id).as_deref(), Some("x"));
        assert!(!names.is_valid_id(id));
        assert_eq!(names.remove(id), None);
        assert!(!names.is_valid_id(Id::null()));
    }

    #[test]
    fn reused_slot_gets_new_generation() {
        let mut array: SparseHandledArray<u32> = SparseHandledArray::new();
        let old = array.add(1);
        array.remove(old);
        let new = array.add(2);
        assert_eq!(old.value(), new.value());
        assert!(new.generation() > old.generation());
        assert_eq!(array.get(old), None);
        assert_eq!(array.get(new), Some(&2));
        assert_eq!(array.generation(new.value()), 1);
    }

    #[test]
    fn handles_survive_growth() {
        let mut array: SparseHandledArray<usize> = SparseHandledArray::with_capacity(2);
        let ids: Vec<_> = (0..50).map(|i| array.add(i)).collect();
        assert!(array.capacity() >= 50);
        for (i, &id) in ids.iter().enumerate() {
            assert!(array.is_valid_id(id));
            assert_eq!(array[id], i);
        }
    }

    #[test]
    fn reserve_keeps_elements_in_place() {
        let mut array: SparseHandledArray<u64> = SparseHandledArray::new();
        let first = array.add(1);
        array.reserve(10);
        assert!(array.capacity() >= 11);
        let capacity = array.capacity();
        let before: *const u64 = &array[first];
        let ids: Vec<_> = (0..10).map(|i| array.add(i)).collect();
        assert_eq!(array.capacity(), capacity);
        assert!(core::ptr::eq(before, &array[first]));
        assert!(ids.iter().all(|&id| array.is_valid_id(id)));
    }

    #[test]
    fn add_with_and_emplace() {
        let mut array: SparseHandledArray<String, SlotIndex, u16> = SparseHandledArray::new();
        let id = array.add_with(|id| format!("{id}"));
        assert_eq!(array[id], "slot0v0");

        let (id, value) = array.emplace(String::from("a"));
        value.push('b');
        assert_eq!(array.get(id).map(String::as_str), Some("ab"));
        assert_eq!(array.by_index(id.value()), "ab");
        assert_eq!(array.id_at(id.value()), Some(id));
        assert_eq!(array.id_at(SlotIndex::new(5)), None);
    }

    #[test]
    fn clear_invalidates_every_handle() {
        let mut array: SparseHandledArray<u8> = SparseHandledArray::new();
        let a = array.add(1);
        let b = array.add(2);
        array.remove(b);
        array.clear();
        assert!(array.is_empty());
        assert!(!array.is_valid_id(a));
        assert_eq!(array.generation(a.value()), 1);
        assert_eq!(array.generation(b.value()), 1);

        array.clear();
        assert!(array.is_empty());
        assert_eq!(array.generation(a.value()), 1);
    }

    #[test]
    fn exhausted_slot_is_retired() {
        let mut array: SparseHandledArray<u8, SlotIndex, u8> = SparseHandledArray::new();
        let mut id = array.add(0);
        let index = id.value();
        for _ in 0..254 {
            array.remove(id);
            id = array.add(0);
            assert_eq!(id.value(), index);
        }
        assert_eq!(id.generation(), 254);
        array.remove(id);
        assert_eq!(array.generation(index), u8::NULL);
        assert!(array.storage().as_range().is_retired(index));

        let next = array.add(0);
        assert_ne!(next.value(), index);
        assert!(!array.is_valid_id(id));
        assert_eq!(array.get(Id::new(index, u8::NULL)), None);
    }

    #[test]
    fn iteration_and_retain() {
        let mut array: SparseHandledArray<u32> = SparseHandledArray::new();
        let ids: Vec<_> = (0..6).map(|i| array.add(i)).collect();
        array.remove(ids[2]);

        let values: Vec<_> = array.iter().map(|(_, &v)| v).collect();
        assert_eq!(values, [0, 1, 3, 4, 5]);
        assert_eq!(array.ids().count(), 5);

        for (_, value) in array.iter_mut() {
            *value *= 10;
        }
        array.retain(|_, value| *value % 20 == 0);
        let left: Vec<_> = array.ids().collect();
        assert_eq!(left, vec![ids[0], ids[4]]);
        assert_eq!(array[ids[4]], 40);
        assert!(!array.is_valid_id(ids[1]));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "stale handle")]
    fn index_with_stale_handle_asserts() {
        let mut array: SparseHandledArray<u32> = SparseHandledArray::new();
        let old = array.add(1);
        array.remove(old);
        array.add(2);
        let _value = array[old];
    }

    #[test]
    #[should_panic(expected = "isn't occupied")]
    fn index_vacant_slot_panics() {
        let mut array: SparseHandledArray<u32> = SparseHandledArray::new();
        array.add(0);
        let _ = array.by_index(SlotIndex::new(3));
    }
}
