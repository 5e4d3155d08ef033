//! Checks `CheckedIdAllocator` with 8-bit generations, so that generations
//! run out and indices get retired.

#![no_main]

use libfuzzer_sys::fuzz_target;
use sparsepool::{CheckedIdAllocator, Id, SlotIndex, debug_utils};
use sparsepool_fuzz::{AllocatorOp, MAX_SLOTS, pick};

type Ids = CheckedIdAllocator<SlotIndex, u8>;

fuzz_target!(|ops: Vec<AllocatorOp>| {
    // Ensure the logger is initialized.
    let _ = pretty_env_logger::try_init();

    let mut ids = Ids::new(MAX_SLOTS);
    let mut live: Vec<Id<SlotIndex, u8>> = vec![];
    let mut stale: Vec<Id<SlotIndex, u8>> = vec![];
    for op in ops {
        match op {
            AllocatorOp::Allocate => {
                if let Ok(id) = ids.try_allocate() {
                    assert!(!stale.contains(&id), "{id} was issued before");
                    live.push(id);
                }
            }
            AllocatorOp::AllocateFirst => {
                if !ids.is_full() {
                    let id = ids.allocate_first();
                    assert!(!stale.contains(&id), "{id} was issued before");
                    live.push(id);
                }
            }
            AllocatorOp::AllocateRange(selector) => {
                // Freeing a stale id must not change anything.
                if let Some(id) = pick(&stale, selector) {
                    let used = ids.used_count();
                    ids.deallocate(id);
                    assert_eq!(used, ids.used_count());
                }
            }
            AllocatorOp::Deallocate(selector) => {
                if let Some(id) = pick(&live, selector) {
                    live.retain(|&i| i != id);
                    ids.deallocate(id);
                    assert!(!ids.is_id(id));
                    stale.push(id);
                }
            }
            AllocatorOp::Clear => {
                ids.clear();
                stale.append(&mut live);
            }
        }
        debug_utils::validate_checked_ids(&ids).unwrap();
        assert_eq!(ids.used_count(), live.len() + ids.retired_count());
        for &id in &live {
            assert!(ids.is_id(id));
        }
        for &id in &stale {
            assert!(!ids.is_id(id));
        }
    }
});
