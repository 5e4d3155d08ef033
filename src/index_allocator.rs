//! Free-list allocation of raw integer ids.

use core::fmt;

use smallvec::SmallVec;

use crate::entity::{EntityRange, EntityRef};
use crate::{PoolError, SlotIndex};

/// Allocator of unique ids in the range `[0, max_count)`.
///
/// Ids which have been freed are reused before any new id is handed out. The
/// allocator tracks a high-water mark (`count`): every id at or above it has
/// never been allocated, and every freed id below it sits in an unordered
/// free list. Freeing the id just below the high-water mark lowers the mark
/// instead, and keeps lowering it for as long as the id below it is also
/// free. This keeps the mark compact when ids are freed in roughly reverse
/// allocation order.
///
/// Exceeding `max_count` or freeing an id twice are contract violations which
/// are only checked in debug builds. [`IndexAllocator::try_allocate`] is the
/// checked alternative for callers that can't size the allocator up front.
///
/// ```
/// use sparsepool::{IndexAllocator, SlotIndex};
///
/// let mut ids: IndexAllocator<SlotIndex> = IndexAllocator::new(16);
/// let a = ids.allocate();
/// let b = ids.allocate();
/// ids.deallocate(a);
/// assert_eq!(ids.allocate_first(), a);
/// assert!(ids.is_id(b));
/// ```
#[derive(Clone)]
pub struct IndexAllocator<K: EntityRef = SlotIndex> {
    /// Smallest id which has never been handed out.
    count: usize,

    /// Capacity ceiling.
    max_count: usize,

    /// Previously freed ids, all below `count`. Order is irrelevant.
    free_list: SmallVec<[K; 8]>,
}

impl<K: EntityRef> IndexAllocator<K> {
    /// Creates an allocator for ids in `[0, max_count)`.
    #[must_use]
    pub fn new(max_count: usize) -> Self {
        debug_assert!(
            max_count <= K::index_limit(),
            "max_count {max_count} exceeds the index type's limit"
        );
        Self {
            count: 0,
            max_count,
            free_list: SmallVec::new(),
        }
    }

    /// Changes the capacity ceiling.
    ///
    /// The new ceiling must not be below the current high-water mark.
    pub fn set_max_count(&mut self, max_count: usize) {
        debug_assert!(max_count >= self.count);
        debug_assert!(max_count <= K::index_limit());
        self.max_count = max_count;
    }

    /// Allocates an id, preferring a previously freed one.
    ///
    /// Which freed id is reused is unspecified. Panics in debug builds if all
    /// ids are in use.
    #[inline]
    pub fn allocate(&mut self) -> K {
        if let Some(id) = self.free_list.pop() {
            return id;
        }
        debug_assert!(
            self.count < self.max_count,
            "IndexAllocator exhausted its {} ids",
            self.max_count
        );
        let id = K::new(self.count);
        self.count += 1;
        id
    }

    /// Allocates an id, returning an error instead of asserting if all ids
    /// are in use.
    #[inline]
    pub fn try_allocate(&mut self) -> Result<K, PoolError> {
        if self.is_full() {
            return Err(PoolError::CapacityExhausted {
                max_count: self.max_count,
            });
        }
        Ok(self.allocate())
    }

    /// Allocates the smallest id which is currently free.
    ///
    /// This scans the whole free list.
    pub fn allocate_first(&mut self) -> K {
        let lowest = self
            .free_list
            .iter()
            .enumerate()
            .min_by_key(|(_, id)| id.index())
            .map(|(pos, _)| pos);
        match lowest {
            Some(pos) => self.free_list.swap_remove(pos),
            None => self.allocate(),
        }
    }

    /// Allocates `len` consecutive ids, returning the lowest run of ids which
    /// are all currently free.
    ///
    /// The free list is sorted in place as a side effect. If no run of freed
    /// ids is long enough, the ids are taken from above the high-water mark.
    pub fn allocate_first_range(&mut self, len: usize) -> EntityRange<K> {
        if len == 0 {
            let at = K::new(self.count);
            return EntityRange::new(at, at);
        }

        if self.free_list.len() >= len {
            self.free_list.sort_unstable_by_key(|id| id.index());

            // Free ids are distinct, so a window of sorted ids is a run of
            // consecutive values exactly when its ends are `len - 1` apart.
            let run = self
                .free_list
                .windows(len)
                .position(|window| window[len - 1].index() - window[0].index() == len - 1);
            if let Some(pos) = run {
                let from = self.free_list[pos];
                self.free_list.drain(pos..pos + len);
                trace!("Reused free run of {len} ids at {}", from.index());
                return EntityRange::with_len(from, len);
            }
        }

        // The id just below the high-water mark is never free, so a run can't
        // straddle the mark.
        debug_assert!(
            self.count + len <= self.max_count,
            "IndexAllocator can't fit {len} more ids"
        );
        let from = K::new(self.count);
        self.count += len;
        EntityRange::with_len(from, len)
    }

    /// Frees an id for reuse.
    ///
    /// `id` must currently be allocated; this is only checked in debug builds.
    pub fn deallocate(&mut self, id: K) {
        debug_assert!(
            self.is_id(id),
            "deallocating id {} which isn't allocated",
            id.index()
        );

        if id.index() + 1 != self.count {
            self.free_list.push(id);
            return;
        }

        // Lower the high-water mark past any freed ids directly below it.
        self.count -= 1;
        while let Some(pos) = self
            .free_list
            .iter()
            .position(|free| free.index() + 1 == self.count)
        {
            self.free_list.swap_remove(pos);
            self.count -= 1;
        }
    }

    /// Frees every id at once.
    pub fn clear(&mut self) {
        self.count = 0;
        self.free_list.clear();
    }

    /// Returns whether `id` is currently allocated.
    ///
    /// This scans the whole free list.
    #[must_use]
    pub fn is_id(&self, id: K) -> bool {
        id.index() < self.count && !self.free_list.contains(&id)
    }

    /// Number of ids currently allocated.
    #[inline]
    #[must_use]
    pub fn used_count(&self) -> usize {
        self.count - self.free_list.len()
    }

    /// The high-water mark: the smallest id which has never been allocated
    /// since it was last freed from the top.
    #[inline]
    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }

    /// The capacity ceiling.
    #[inline]
    #[must_use]
    pub fn max_count(&self) -> usize {
        self.max_count
    }

    /// Returns whether no id is currently allocated.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns whether every id is in use.
    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.free_list.is_empty() && self.count == self.max_count
    }

    /// The currently freed ids below the high-water mark, in no particular
    /// order.
    #[inline]
    #[must_use]
    pub fn free_ids(&self) -> &[K] {
        &self.free_list
    }
}

impl<K: EntityRef> Default for IndexAllocator<K> {
    /// Creates an allocator covering every index the index type can represent.
    fn default() -> Self {
        Self::new(K::index_limit())
    }
}

impl<K: EntityRef + fmt::Debug> fmt::Debug for IndexAllocator<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexAllocator")
            .field("count", &self.count)
            .field("max_count", &self.max_count)
            .field("free_list", &self.free_list.as_slice())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;

    fn id(index: usize) -> SlotIndex {
        SlotIndex::new(index)
    }

    fn allocator_with(count: usize) -> IndexAllocator {
        let mut ids = IndexAllocator::new(16);
        for _ in 0..count {
            ids.allocate();
        }
        ids
    }

    #[test]
    fn allocates_sequentially_then_reuses() {
        let mut ids = allocator_with(3);
        assert_eq!(ids.count(), 3);
        ids.deallocate(id(1));
        assert_eq!(ids.used_count(), 2);
        assert_eq!(ids.allocate(), id(1));
        assert_eq!(ids.allocate(), id(3));
    }

    #[test]
    fn allocate_first_returns_minimum() {
        let mut ids = allocator_with(2);
        ids.deallocate(id(0));
        assert_eq!(ids.allocate_first(), id(0));

        let mut ids = allocator_with(6);
        ids.deallocate(id(4));
        ids.deallocate(id(1));
        ids.deallocate(id(2));
        assert_eq!(ids.allocate_first(), id(1));
        assert_eq!(ids.allocate_first(), id(2));
        assert_eq!(ids.allocate_first(), id(4));
        assert_eq!(ids.allocate_first(), id(6));
    }

    #[test]
    fn allocate_first_range_takes_lowest_run() {
        // Keep 5 allocated so that 0..5 stay in the free list.
        let mut ids = allocator_with(6);
        for i in [3, 0, 4, 2, 1] {
            ids.deallocate(id(i));
        }
        let range = ids.allocate_first_range(3);
        assert_eq!(range.from, id(0));
        assert_eq!(range.len(), 3);
        let mut free: Vec<_> = ids.free_ids().iter().map(|i| i.index()).collect();
        free.sort_unstable();
        assert_eq!(free, [3, 4]);
    }

    #[test]
    fn allocate_first_range_skips_short_runs() {
        let mut ids = allocator_with(8);
        for i in [0, 2, 3, 5, 6] {
            ids.deallocate(id(i));
        }
        assert_eq!(ids.allocate_first_range(2).from, id(2));
        assert_eq!(ids.allocate_first_range(2).from, id(5));
        // Only 0 is left free, so the next run comes from the top.
        let range = ids.allocate_first_range(2);
        assert_eq!(range.from, id(8));
        assert_eq!(ids.count(), 10);
        assert!(ids.allocate_first_range(0).is_empty());
    }

    #[test]
    fn deallocate_top_cascades() {
        let mut ids = allocator_with(5);
        ids.deallocate(id(3));
        assert_eq!(ids.count(), 5);
        ids.deallocate(id(4));
        assert_eq!(ids.count(), 3);
        assert!(ids.free_ids().is_empty());

        ids.deallocate(id(0));
        ids.deallocate(id(1));
        ids.deallocate(id(2));
        assert_eq!(ids.count(), 0);
        assert!(ids.is_empty());
    }

    #[test]
    fn round_trip_is_not_id() {
        let mut ids = allocator_with(2);
        let fresh = ids.allocate();
        assert!(ids.is_id(fresh));
        ids.deallocate(fresh);
        assert!(!ids.is_id(fresh));
        assert!(!ids.is_id(id(15)));
    }

    #[test]
    fn capacity_ceiling() {
        let mut ids: IndexAllocator = IndexAllocator::new(2);
        assert_eq!(ids.try_allocate(), Ok(id(0)));
        assert_eq!(ids.try_allocate(), Ok(id(1)));
        assert!(ids.is_full());
        assert_eq!(
            ids.try_allocate(),
            Err(PoolError::CapacityExhausted { max_count: 2 })
        );

        ids.set_max_count(3);
        assert!(!ids.is_full());
        assert_eq!(ids.allocate(), id(2));

        ids.clear();
        assert_eq!(ids.used_count(), 0);
        assert_eq!(ids.allocate(), id(0));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "isn't allocated")]
    fn double_free_asserts() {
        let mut ids = allocator_with(3);
        ids.deallocate(id(1));
        ids.deallocate(id(1));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "exhausted its 2 ids")]
    fn allocate_past_capacity_asserts() {
        let mut ids: IndexAllocator = IndexAllocator::new(2);
        ids.allocate();
        ids.allocate();
        ids.allocate();
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "can't fit 3 more ids")]
    fn allocate_range_past_capacity_asserts() {
        let mut ids: IndexAllocator = IndexAllocator::new(4);
        ids.allocate_first_range(2);
        ids.allocate_first_range(3);
    }
}
