//! Checks `SparseArray` against a map from index to value.

#![no_main]

use std::collections::BTreeMap;

use libfuzzer_sys::fuzz_target;
use sparsepool::debug_utils::{self, DisplaySlots};
use sparsepool::{SlotIndex, SparseArray};
use sparsepool_fuzz::{MAX_SLOTS, StorageOp, TestCase, pick};

fuzz_target!(|t: TestCase<StorageOp>| {
    let mut array: SparseArray<u32, SlotIndex> =
        SparseArray::with_policy(t.initial_capacity, t.policy);
    let mut model: BTreeMap<SlotIndex, u32> = BTreeMap::new();
    let mut indices: Vec<SlotIndex> = vec![];
    for op in t.ops {
        match op {
            StorageOp::Add(value) => {
                if model.len() < MAX_SLOTS {
                    let index = array.add(value);
                    assert!(model.insert(index, value).is_none());
                    indices.push(index);
                }
            }
            StorageOp::Remove(selector) => {
                if indices.is_empty() {
                    continue;
                }
                let index = indices[selector as usize % indices.len()];
                assert_eq!(array.try_remove(index), model.remove(&index));
            }
            StorageOp::Get(selector) => {
                if indices.is_empty() {
                    continue;
                }
                let index = indices[selector as usize % indices.len()];
                assert_eq!(array.get(index), model.get(&index));
            }
            StorageOp::Reserve(additional) => {
                let additional = additional as usize % 16;
                if model.len() + additional <= MAX_SLOTS {
                    let capacity = array.capacity();
                    array.reserve(additional);
                    assert!(array.capacity() >= capacity);
                    assert!(array.capacity() - array.len() >= additional);
                }
            }
            StorageOp::Increment(selector) => {
                let live: Vec<_> = model.keys().copied().collect();
                if let Some(index) = pick(&live, selector) {
                    array[index] = array[index].wrapping_add(1);
                    let value = model.get_mut(&index).unwrap();
                    *value = value.wrapping_add(1);
                }
            }
            StorageOp::Clear => {
                array.clear();
                model.clear();
            }
            StorageOp::Retain(modulus) => {
                // Plain arrays have no retain, so emulate it by index.
                let modulus = u32::from(modulus.max(1));
                model.retain(|&index, value| {
                    let keep = *value % modulus == 0;
                    if !keep {
                        array.remove(index);
                    }
                    keep
                });
            }
        }
        log::trace!("Slots:\n{}", DisplaySlots(array.as_range()));
        debug_utils::validate_sparse_array(&array).unwrap();
        assert_eq!(array.len(), model.len());
        assert!(array.iter().map(|(i, v)| (i, *v)).eq(model.iter().map(|(&i, &v)| (i, v))));
    }
});
