//! Sparse storage validation.

use anyhow::{Result, bail, ensure};

use crate::entity::{EntityRef, EntitySet};
use crate::id::Generation;
use crate::sparse::Slot;
use crate::{SparseArray, SparseHandledArray, SparseRange};

/// Checks the internal invariants of a [`SparseRange`].
///
/// This walks the free chain and makes sure that it visits every vacant slot
/// exactly once, and that the occupancy counters match the slots.
pub fn validate_sparse_range<T, K: EntityRef>(range: &SparseRange<T, K>) -> Result<()> {
    let slots = range.slots();
    ensure!(
        slots.len() <= range.capacity(),
        "{} slots materialized in a range of capacity {}",
        slots.len(),
        range.capacity()
    );

    let mut chained = EntitySet::with_max_index(slots.len());
    let mut next = range.first_free();
    while let Some(index) = next {
        let i = index.index();
        ensure!(i < slots.len(), "Free chain reaches untouched slot {i}");
        ensure!(chained.insert(index), "Free chain loops back to slot {i}");
        next = match slots[i] {
            Slot::Free(next) => next.expand(),
            Slot::Occupied(_) => bail!("Free chain reaches occupied slot {i}"),
            Slot::Retired => bail!("Free chain reaches retired slot {i}"),
        };
    }

    let (mut occupied, mut retired) = (0, 0);
    for (i, slot) in slots.iter().enumerate() {
        match slot {
            Slot::Free(_) => {
                ensure!(
                    chained.contains(K::new(i)),
                    "Vacant slot {i} is not on the free chain"
                );
            }
            Slot::Occupied(_) => occupied += 1,
            Slot::Retired => retired += 1,
        }
    }
    ensure!(
        occupied == range.len(),
        "Found {occupied} occupied slots, expected {}",
        range.len()
    );
    ensure!(
        retired == range.retired_count(),
        "Found {retired} retired slots, expected {}",
        range.retired_count()
    );
    Ok(())
}

/// Checks the internal invariants of a [`SparseArray`].
pub fn validate_sparse_array<T, K: EntityRef>(array: &SparseArray<T, K>) -> Result<()> {
    ensure!(
        array.capacity() <= K::index_limit(),
        "Capacity {} is above the index limit {}",
        array.capacity(),
        K::index_limit()
    );
    validate_sparse_range(array.as_range())
}

/// Checks the internal invariants of a [`SparseHandledArray`].
///
/// In addition to the storage checks, every materialized slot must have a
/// generation, and a slot is retired exactly when its generation is the null
/// generation.
pub fn validate_handled_array<T, K: EntityRef, G: Generation>(
    array: &SparseHandledArray<T, K, G>,
) -> Result<()> {
    validate_sparse_array(array.storage())?;

    let generations = array.generations();
    let slots = array.storage().as_range().slots();
    ensure!(
        generations.len() >= slots.len(),
        "Only {} generations for {} slots",
        generations.len(),
        slots.len()
    );
    for (i, slot) in slots.iter().enumerate() {
        let generation = generations[K::new(i)];
        let retired = matches!(slot, Slot::Retired);
        ensure!(
            retired == (generation == G::NULL),
            "Slot {i} has generation {generation} but retired is {retired}"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SlotIndex;

    #[test]
    fn accepts_reachable_states() {
        let mut range: SparseRange<u8> = SparseRange::new(5);
        validate_sparse_range(&range).unwrap();
        for value in 0..4 {
            range.add(value);
        }
        range.remove(SlotIndex::new(2));
        range.remove(SlotIndex::new(0));
        range.retire(SlotIndex::new(3));
        validate_sparse_range(&range).unwrap();
        range.clear();
        validate_sparse_range(&range).unwrap();

        let mut array: SparseHandledArray<u8, SlotIndex, u8> = SparseHandledArray::new();
        let mut id = array.add(0);
        for value in 0..10 {
            array.add(value);
        }
        for _ in 0..255 {
            array.remove(id);
            id = array.add(1);
        }
        validate_handled_array(&array).unwrap();
        array.clear();
        validate_handled_array(&array).unwrap();
    }
}
