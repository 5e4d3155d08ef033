//! Id allocation with per-slot generation checks.

use core::fmt;

use crate::entity::{EntityRef, SecondaryMap};
use crate::id::{Generation, Id};
use crate::index_allocator::IndexAllocator;
use crate::{PoolError, SlotIndex};

/// Allocator of generational [`Id`]s.
///
/// This wraps an [`IndexAllocator`] and keeps a generation counter for every
/// raw index it has handed out. Freeing an id bumps the generation of its
/// index, which makes every other copy of the id stale. Stale ids are never
/// an error: [`CheckedIdAllocator::is_id`] returns `false` for them and
/// [`CheckedIdAllocator::deallocate`] ignores them, so freeing an id twice is
/// harmless.
///
/// An index whose generation is exhausted is retired: it stays allocated in
/// the underlying `IndexAllocator` forever and counts towards
/// [`used_count`](Self::used_count).
///
/// ```
/// use sparsepool::CheckedIdAllocator;
///
/// let mut ids: CheckedIdAllocator = CheckedIdAllocator::new(8);
/// let first = ids.allocate();
/// ids.deallocate(first);
/// let second = ids.allocate();
/// assert_eq!(first.value(), second.value());
/// assert!(second.generation() > first.generation());
/// assert!(!ids.is_id(first));
///
/// // Freeing a stale id does nothing.
/// ids.deallocate(first);
/// assert!(ids.is_id(second));
/// ```
pub struct CheckedIdAllocator<K: EntityRef = SlotIndex, G: Generation = u32, Tag = ()> {
    allocator: IndexAllocator<K>,

    /// Current generation of every index below the highest one handed out.
    generations: SecondaryMap<K, G>,

    /// Number of indices retired because their generation ran out.
    retired: usize,

    marker: core::marker::PhantomData<fn() -> Tag>,
}

impl<K: EntityRef, G: Generation, Tag> CheckedIdAllocator<K, G, Tag> {
    /// Creates an allocator for ids with an index in `[0, max_count)`.
    #[must_use]
    pub fn new(max_count: usize) -> Self {
        Self {
            allocator: IndexAllocator::new(max_count),
            generations: SecondaryMap::new(),
            retired: 0,
            marker: core::marker::PhantomData,
        }
    }

    /// Changes the capacity ceiling. See [`IndexAllocator::set_max_count`].
    pub fn set_max_count(&mut self, max_count: usize) {
        self.allocator.set_max_count(max_count);
    }

    #[inline]
    fn issue(&mut self, index: K) -> Id<K, G, Tag> {
        self.generations.grow_to(index.index() + 1);
        Id::new(index, self.generations[index])
    }

    /// Allocates an id, preferring a previously freed index.
    ///
    /// Panics in debug builds if all ids are in use.
    #[inline]
    pub fn allocate(&mut self) -> Id<K, G, Tag> {
        let index = self.allocator.allocate();
        self.issue(index)
    }

    /// Allocates an id, returning an error if all ids are in use.
    #[inline]
    pub fn try_allocate(&mut self) -> Result<Id<K, G, Tag>, PoolError> {
        let index = self.allocator.try_allocate()?;
        Ok(self.issue(index))
    }

    /// Allocates the id with the smallest free index.
    pub fn allocate_first(&mut self) -> Id<K, G, Tag> {
        let index = self.allocator.allocate_first();
        self.issue(index)
    }

    /// Frees an id.
    ///
    /// Does nothing if `id` is stale or null.
    pub fn deallocate(&mut self, id: Id<K, G, Tag>) {
        if !self.is_id(id) {
            trace!(
                "Ignoring deallocation of stale id {}v{}",
                id.value().index(),
                id.generation()
            );
            return;
        }

        let index = id.value();
        match id.generation().next() {
            Some(next) => {
                self.generations[index] = next;
                self.allocator.deallocate(index);
            }
            None => {
                // Keep the index allocated so it is never reissued.
                self.generations[index] = G::NULL;
                self.retired += 1;
                trace!("Retiring index {} with exhausted generation", index.index());
            }
        }
    }

    /// Frees every id.
    ///
    /// Generations are bumped rather than reset so that ids issued before the
    /// call stay invalid. Retired indices stay retired.
    pub fn clear(&mut self) {
        let mut top = 0;
        for (index, generation) in self.generations.iter_mut() {
            if *generation != G::NULL && self.allocator.is_id(index) {
                *generation = generation.next().unwrap_or_else(|| {
                    self.retired += 1;
                    G::NULL
                });
            }
            if *generation == G::NULL {
                top = index.index() + 1;
            }
        }

        // Rebuild the allocator so that only retired indices stay in use.
        self.allocator.clear();
        if top != 0 {
            let range = self.allocator.allocate_first_range(top);
            for index in range.iter() {
                if self.generations[index] != G::NULL {
                    self.allocator.deallocate(index);
                }
            }
        }
    }

    /// Returns whether `id` is currently allocated with a matching generation.
    #[must_use]
    pub fn is_id(&self, id: Id<K, G, Tag>) -> bool {
        if id.generation() == G::NULL {
            return false;
        }
        self.generations
            .get(id.value())
            .is_some_and(|&generation| generation == id.generation())
            && self.allocator.is_id(id.value())
    }

    /// Returns whether the raw index is currently allocated, regardless of
    /// generation. Retired indices count as allocated.
    #[must_use]
    pub fn slot_has_id(&self, index: K) -> bool {
        self.allocator.is_id(index)
    }

    /// Returns the current generation of `index`.
    ///
    /// Indices that have never been allocated are at generation 0. Retired
    /// indices report [`Generation::NULL`].
    #[must_use]
    pub fn generation(&self, index: K) -> G {
        self.generations.get(index).copied().unwrap_or_default()
    }

    /// Number of raw indices in use, including retired ones.
    #[inline]
    #[must_use]
    pub fn used_count(&self) -> usize {
        self.allocator.used_count()
    }

    /// Number of indices retired because their generation ran out.
    #[inline]
    #[must_use]
    pub fn retired_count(&self) -> usize {
        self.retired
    }

    /// The high-water mark of the underlying [`IndexAllocator`].
    #[inline]
    #[must_use]
    pub fn count(&self) -> usize {
        self.allocator.count()
    }

    /// The capacity ceiling.
    #[inline]
    #[must_use]
    pub fn max_count(&self) -> usize {
        self.allocator.max_count()
    }

    /// Returns whether every id is in use.
    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.allocator.is_full()
    }

    /// The underlying raw index allocator.
    #[inline]
    #[must_use]
    pub fn index_allocator(&self) -> &IndexAllocator<K> {
        &self.allocator
    }
}

impl<K: EntityRef, G: Generation, Tag> Default for CheckedIdAllocator<K, G, Tag> {
    fn default() -> Self {
        Self::new(K::index_limit())
    }
}

impl<K: EntityRef + fmt::Debug, G: Generation, Tag> fmt::Debug for CheckedIdAllocator<K, G, Tag> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckedIdAllocator")
            .field("allocator", &self.allocator)
            .field("generations", &self.generations)
            .field("retired", &self.retired)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Buffers;

    type BufferIds = CheckedIdAllocator<SlotIndex, u32, Buffers>;

    #[test]
    fn generation_bumps_on_reuse() {
        let mut ids = BufferIds::new(4);
        let id1 = ids.allocate();
        ids.deallocate(id1);
        let id2 = ids.allocate();
        assert_eq!(id1.value(), id2.value());
        assert!(id2.generation() > id1.generation());
        assert_ne!(id1, id2);
        assert!(!ids.is_id(id1));
        assert!(ids.is_id(id2));
        assert_eq!(ids.generation(id2.value()), 1);
    }

    #[test]
    fn stale_and_null_deallocate_is_noop() {
        let mut ids = BufferIds::new(4);
        let a = ids.allocate();
        let b = ids.allocate();
        ids.deallocate(a);
        ids.deallocate(a);
        ids.deallocate(Id::null());
        assert_eq!(ids.used_count(), 1);
        assert!(ids.is_id(b));
        assert!(!ids.is_id(Id::null()));
    }

    #[test]
    fn slot_has_id_ignores_generation() {
        let mut ids = BufferIds::new(4);
        let a = ids.allocate();
        ids.deallocate(a);
        let b = ids.allocate();
        assert!(!ids.is_id(a));
        assert!(ids.slot_has_id(a.value()));
        assert_eq!(b.value(), a.value());
        assert!(!ids.slot_has_id(SlotIndex::new(3)));
    }

    #[test]
    fn allocate_first_uses_lowest_index() {
        let mut ids = BufferIds::new(8);
        let a = ids.allocate();
        let b = ids.allocate();
        let _c = ids.allocate();
        ids.deallocate(b);
        ids.deallocate(a);
        let first = ids.allocate_first();
        assert_eq!(first.value(), a.value());
        assert_eq!(first.generation(), 1);
    }

    #[test]
    fn exhausted_generation_retires_index() {
        let mut ids: CheckedIdAllocator<SlotIndex, u8> = CheckedIdAllocator::new(2);
        let mut id = ids.allocate();
        let index = id.value();
        for _ in 0..254 {
            ids.deallocate(id);
            id = ids.allocate();
            assert_eq!(id.value(), index);
        }
        assert_eq!(id.generation(), 254);
        ids.deallocate(id);
        assert_eq!(ids.retired_count(), 1);
        assert_eq!(ids.generation(index), u8::NULL);
        assert!(ids.slot_has_id(index));

        let next = ids.allocate();
        assert_ne!(next.value(), index);
        assert!(ids.is_full());
        assert!(ids.try_allocate().is_err());
    }

    #[test]
    fn clear_invalidates_and_keeps_retired() {
        let mut ids: CheckedIdAllocator<SlotIndex, u8> = CheckedIdAllocator::new(4);
        let a = ids.allocate();
        let b = ids.allocate();
        let _c = ids.allocate();
        ids.deallocate(b);
        ids.clear();
        assert!(!ids.is_id(a));
        assert_eq!(ids.used_count(), 0);
        assert_eq!(ids.generation(a.value()), 1);
        // Already free, so not bumped again.
        assert_eq!(ids.generation(b.value()), 1);

        let again = ids.allocate_first();
        assert_eq!(again.value(), a.value());
        assert_eq!(again.generation(), 1);
    }

    #[test]
    fn clear_retires_exhausted_live_slots() {
        let mut ids: CheckedIdAllocator<SlotIndex, u8> = CheckedIdAllocator::new(4);
        let mut id = ids.allocate();
        let _other = ids.allocate();
        for _ in 0..254 {
            ids.deallocate(id);
            id = ids.allocate_first();
        }
        assert_eq!(id.generation(), 254);
        ids.clear();
        assert_eq!(ids.retired_count(), 1);
        assert_eq!(ids.used_count(), 1);
        assert!(ids.slot_has_id(id.value()));
        assert!(!ids.slot_has_id(SlotIndex::new(1)));
        assert_eq!(ids.allocate_first().value(), SlotIndex::new(1));
    }
}
