//! Checks `SparseHandledArray` with 8-bit generations against a map from
//! handle to value.

#![no_main]

use std::collections::BTreeMap;

use libfuzzer_sys::fuzz_target;
use sparsepool::{Id, SlotIndex, SparseHandledArray, debug_utils};
use sparsepool_fuzz::{MAX_SLOTS, StorageOp, TestCase, pick};

type Handle = Id<SlotIndex, u8, u32>;

fuzz_target!(|t: TestCase<StorageOp>| {
    let mut array: SparseHandledArray<u32, SlotIndex, u8> =
        SparseHandledArray::with_policy(t.initial_capacity, t.policy);
    let mut model: BTreeMap<Handle, u32> = BTreeMap::new();
    let mut issued: Vec<Handle> = vec![];
    for op in t.ops {
        match op {
            StorageOp::Add(value) => {
                if model.len() < MAX_SLOTS {
                    let id = array.add(value);
                    assert!(!issued.contains(&id), "{id} was issued before");
                    model.insert(id, value);
                    issued.push(id);
                }
            }
            StorageOp::Remove(selector) => {
                if let Some(id) = pick(&issued, selector) {
                    assert_eq!(array.remove(id), model.remove(&id));
                    assert!(!array.is_valid_id(id));
                }
            }
            StorageOp::Get(selector) => {
                if let Some(id) = pick(&issued, selector) {
                    assert_eq!(array.get(id), model.get(&id));
                }
            }
            StorageOp::Reserve(additional) => {
                let additional = additional as usize % 16;
                if model.len() + additional <= MAX_SLOTS {
                    let capacity = array.capacity();
                    array.reserve(additional);
                    assert!(array.capacity() >= capacity);
                    let retired = array.storage().as_range().retired_count();
                    assert!(array.capacity() - array.len() - retired >= additional);
                }
            }
            StorageOp::Increment(selector) => {
                // Unchecked indexing agrees with the model for live handles.
                let live: Vec<_> = model.keys().copied().collect();
                if let Some(id) = pick(&live, selector) {
                    array[id] = array[id].wrapping_add(1);
                    let value = model.get_mut(&id).unwrap();
                    *value = value.wrapping_add(1);
                    assert_eq!(array.by_index(id.value()), &model[&id]);
                }
            }
            StorageOp::Clear => {
                array.clear();
                model.clear();
            }
            StorageOp::Retain(modulus) => {
                let modulus = u32::from(modulus.max(1));
                array.retain(|_, value| *value % modulus == 0);
                model.retain(|_, value| *value % modulus == 0);
            }
        }
        debug_utils::validate_handled_array(&array).unwrap();
        assert_eq!(array.len(), model.len());
        assert!(array.iter().map(|(id, v)| (id, *v)).eq(model.iter().map(|(&id, &v)| (id, v))));
    }
});
