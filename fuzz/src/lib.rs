use arbitrary::{Arbitrary, Result, Unstructured};
use sparsepool::GrowthPolicy;

/// Upper bound on the number of slots used by the fuzz targets.
pub const MAX_SLOTS: usize = 64;

/// An operation on an id allocator.
///
/// Operands that refer to existing ids are indices into the list of ids the
/// target has seen, so that most operations hit real ids.
#[derive(Arbitrary, Debug, Clone, Copy)]
pub enum AllocatorOp {
    Allocate,
    AllocateFirst,
    AllocateRange(u8),
    Deallocate(u8),
    Clear,
}

/// An operation on sparse storage.
#[derive(Arbitrary, Debug, Clone, Copy)]
pub enum StorageOp {
    Add(u32),
    Remove(u8),
    Get(u8),
    Reserve(u8),
    /// Bumps the value of a live element through `IndexMut`.
    Increment(u8),
    Clear,
    Retain(u8),
}

/// Common implementation of a test case used by the storage fuzz targets.
#[derive(Debug)]
pub struct TestCase<Op> {
    pub initial_capacity: usize,
    pub policy: GrowthPolicy,
    pub ops: Vec<Op>,
}

impl<'a, Op: Arbitrary<'a>> Arbitrary<'a> for TestCase<Op> {
    fn arbitrary(u: &mut Unstructured<'a>) -> Result<Self> {
        // Ensure the logger is initialized.
        let _ = pretty_env_logger::try_init();

        Ok(Self {
            initial_capacity: u.int_in_range(0..=8)?,
            policy: u.arbitrary()?,
            ops: u.arbitrary()?,
        })
    }
}

/// Picks an element of `items` using an arbitrary byte as selector.
pub fn pick<T: Copy>(items: &[T], selector: u8) -> Option<T> {
    if items.is_empty() {
        None
    } else {
        Some(items[selector as usize % items.len()])
    }
}
