//! Id allocator validation.

use anyhow::{Result, ensure};

use crate::CheckedIdAllocator;
use crate::IndexAllocator;
use crate::entity::{EntityRef, EntitySet};
use crate::id::Generation;

/// Checks the internal invariants of an [`IndexAllocator`].
pub fn validate_index_allocator<K: EntityRef>(allocator: &IndexAllocator<K>) -> Result<()> {
    let count = allocator.count();
    ensure!(
        count <= allocator.max_count(),
        "High-water mark {count} is above the capacity ceiling {}",
        allocator.max_count()
    );
    ensure!(
        allocator.max_count() <= K::index_limit(),
        "Capacity ceiling {} is above the index limit {}",
        allocator.max_count(),
        K::index_limit()
    );

    let mut seen = EntitySet::with_max_index(count);
    for &id in allocator.free_ids() {
        ensure!(
            id.index() < count,
            "Free id {} is not below the high-water mark {count}",
            id.index()
        );
        ensure!(seen.insert(id), "Id {} is freed twice", id.index());
    }

    // Freeing the top id lowers the mark instead, so it can never be free.
    if count != 0 {
        ensure!(
            !seen.contains(K::new(count - 1)),
            "Id {} below the high-water mark is in the free list",
            count - 1
        );
    }
    Ok(())
}

/// Checks the internal invariants of a [`CheckedIdAllocator`].
pub fn validate_checked_ids<K: EntityRef, G: Generation, Tag>(
    ids: &CheckedIdAllocator<K, G, Tag>,
) -> Result<()> {
    validate_index_allocator(ids.index_allocator())?;

    let mut retired = 0;
    for i in 0..ids.count() {
        let index = K::new(i);
        if ids.generation(index) != G::NULL {
            continue;
        }
        ensure!(
            ids.slot_has_id(index),
            "Retired index {i} is not held by the allocator"
        );
        retired += 1;
    }
    ensure!(
        retired == ids.retired_count(),
        "Found {retired} retired indices, expected {}",
        ids.retired_count()
    );
    ensure!(
        ids.used_count() >= retired,
        "Used count {} is below the retired count {retired}",
        ids.used_count()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SlotIndex;

    #[test]
    fn accepts_reachable_states() {
        let mut ids: IndexAllocator = IndexAllocator::new(8);
        validate_index_allocator(&ids).unwrap();
        for _ in 0..5 {
            ids.allocate();
        }
        ids.deallocate(SlotIndex::new(1));
        ids.deallocate(SlotIndex::new(4));
        validate_index_allocator(&ids).unwrap();
        ids.allocate_first_range(2);
        validate_index_allocator(&ids).unwrap();

        let mut checked: CheckedIdAllocator<SlotIndex, u8> = CheckedIdAllocator::new(4);
        let mut id = checked.allocate();
        checked.allocate();
        for _ in 0..255 {
            checked.deallocate(id);
            id = checked.allocate_first();
        }
        validate_checked_ids(&checked).unwrap();
        checked.clear();
        validate_checked_ids(&checked).unwrap();
    }
}
