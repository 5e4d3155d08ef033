//! Checks `IndexAllocator` against a set of live ids.

#![no_main]

use libfuzzer_sys::fuzz_target;
use sparsepool::debug_utils::{self, DisplayIndexAllocator};
use sparsepool::{IndexAllocator, SlotIndex};
use sparsepool_fuzz::{AllocatorOp, MAX_SLOTS, pick};

fuzz_target!(|ops: Vec<AllocatorOp>| {
    // Ensure the logger is initialized.
    let _ = pretty_env_logger::try_init();

    let mut ids: IndexAllocator<SlotIndex> = IndexAllocator::new(MAX_SLOTS);
    let mut live: Vec<SlotIndex> = vec![];
    for op in ops {
        log::trace!("{op:?} on {}", DisplayIndexAllocator(&ids));
        match op {
            AllocatorOp::Allocate => {
                if let Ok(id) = ids.try_allocate() {
                    assert!(!live.contains(&id));
                    live.push(id);
                }
            }
            AllocatorOp::AllocateFirst => {
                if !ids.is_full() {
                    let id = ids.allocate_first();
                    let lowest_free = (0..MAX_SLOTS)
                        .map(SlotIndex::new)
                        .find(|i| !live.contains(i));
                    assert_eq!(Some(id), lowest_free);
                    live.push(id);
                }
            }
            AllocatorOp::AllocateRange(len) => {
                let len = len as usize % 4;
                // Only take ranges that would fit above the high-water mark.
                if ids.count() + len > ids.max_count() {
                    continue;
                }
                let range = ids.allocate_first_range(len);
                assert_eq!(range.len(), len);
                for id in range.iter() {
                    assert!(!live.contains(&id));
                    live.push(id);
                }
            }
            AllocatorOp::Deallocate(selector) => {
                if let Some(id) = pick(&live, selector) {
                    live.retain(|&i| i != id);
                    ids.deallocate(id);
                    assert!(!ids.is_id(id));
                }
            }
            AllocatorOp::Clear => {
                ids.clear();
                live.clear();
            }
        }
        assert_eq!(ids.used_count(), live.len());
        debug_utils::validate_index_allocator(&ids).unwrap();
        for &id in &live {
            assert!(ids.is_id(id), "{} should be allocated", id.index());
        }
    }
});
