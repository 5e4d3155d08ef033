//! Generational, handle-based object pools.
//!
//! This crate is compatible with `#![no_std]` and only requires `alloc`.
//!
//! # Overview
//!
//! The pools are layered, from the leaves up:
//!
//! - [`IndexAllocator`] hands out unique integer ids in `[0, max_count)`,
//!   reusing freed ids before growing its high-water mark.
//! - [`CheckedIdAllocator`] adds a generation counter per id and hands out
//!   [`Id`] handles which can be checked for staleness.
//! - [`SparseRange`] is fixed-capacity slot storage which threads its free
//!   chain through the vacant slots themselves.
//! - [`SparseArray`] wraps a `SparseRange` and grows it when full.
//! - [`SparseHandledArray`] combines `SparseArray` storage with per-slot
//!   generations, giving O(1) handle-based add, remove and lookup.
//!
//! All index types implement [`EntityRef`](entity::EntityRef); new ones are
//! declared with [`entity_def!`]. [`SlotIndex`] is the default.
//!
//! ```
//! use sparsepool::SparseHandledArray;
//!
//! let mut names: SparseHandledArray<&str> = SparseHandledArray::new();
//! let alice = names.add("alice");
//! let bob = names.add("bob");
//! assert_eq!(names[alice], "alice");
//!
//! assert_eq!(names.remove(alice), Some("alice"));
//! assert!(!names.is_valid_id(alice));
//! assert_eq!(names.remove(alice), None);
//!
//! // The vacated slot is reused, but under a new generation.
//! let carol = names.add("carol");
//! assert_eq!(carol.value(), alice.value());
//! assert_ne!(carol, alice);
//! assert_eq!(names.get(bob), Some(&"bob"));
//! ```
//!
//! # Checked and unchecked access
//!
//! Contract violations such as double frees or exceeding a capacity ceiling
//! are caught with `debug_assert!` only. Element access by [`Id`] through
//! `Index`/`IndexMut` does not compare generations in release builds; use
//! [`SparseHandledArray::get`] when a handle may be stale. Either way, safe
//! code can never observe a vacant slot: such accesses panic.
//!
//! # Generation exhaustion
//!
//! The largest value of a [`Generation`] type is reserved as the null
//! generation. A slot whose generation would reach it is retired and never
//! handed out again, so a stale handle can never come back to life.
//!
//! # Validation
//!
//! The functions in [`debug_utils`] check the structural invariants of every
//! pool type. They are relatively expensive and meant for tests and fuzzing.

#![no_std]
#![warn(rust_2018_idioms, missing_docs)]
#![allow(
    clippy::cast_possible_truncation,
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::doc_markdown
)]
#![warn(
    clippy::explicit_iter_loop,
    clippy::range_plus_one,
    clippy::map_unwrap_or,
    clippy::cloned_instead_of_copied,
    clippy::semicolon_if_nothing_returned,
    clippy::must_use_candidate,
    clippy::uninlined_format_args,
    clippy::ignored_unit_patterns
)]

extern crate alloc;

use core::fmt;

// Even when trace logging is disabled, the trace macro has a significant
// performance cost so we disable it in release builds.
macro_rules! trace {
    ($($tt:tt)*) => {
        if cfg!(feature = "trace-log") {
            ::log::trace!($($tt)*);
        }
    };
}

// Macro for collecting statistics. Compiles to nothing without the `stats`
// feature.
macro_rules! stat {
    ($stats:expr, $field:ident) => {
        if cfg!(feature = "stats") {
            $stats.$field += 1;
        }
    };
    ($stats:expr, $field:ident, $count:expr) => {
        if cfg!(feature = "stats") {
            $stats.$field += $count;
        }
    };
}

#[macro_use]
pub mod entity;

pub mod debug_utils;

mod checked_id;
mod handled_array;
mod id;
mod index_allocator;
pub mod sparse;

pub use checked_id::CheckedIdAllocator;
pub use handled_array::SparseHandledArray;
pub use id::{Generation, Id};
pub use index_allocator::IndexAllocator;
pub use sparse::{SparseArray, SparseRange};

entity_def! {
    /// Default index type used by all pools.
    pub entity SlotIndex(u32, "slot");
}

#[cfg(feature = "arbitrary")]
impl<'a> arbitrary::Arbitrary<'a> for SlotIndex {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        let limit = <Self as entity::EntityRef>::index_limit();
        Ok(Self::new(u.choose_index(limit)?))
    }
}

/// Controls how a [`SparseArray`] grows when it runs out of slots.
///
/// The new capacity is `max(min_capacity, capacity * numerator / denominator)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GrowthPolicy {
    /// Smallest capacity allocated by a growing array.
    pub min_capacity: usize,

    /// Numerator of the growth factor.
    pub numerator: usize,

    /// Denominator of the growth factor.
    pub denominator: usize,
}

impl Default for GrowthPolicy {
    /// Grow by a factor of 1.5, to at least 4 slots.
    #[inline]
    fn default() -> Self {
        Self {
            min_capacity: 4,
            numerator: 3,
            denominator: 2,
        }
    }
}

impl GrowthPolicy {
    /// Returns the capacity that follows `capacity`.
    ///
    /// The result is always strictly larger than `capacity`.
    #[inline]
    #[must_use]
    pub fn next_capacity(&self, capacity: usize) -> usize {
        debug_assert!(self.denominator != 0);
        let scaled = capacity.saturating_mul(self.numerator) / self.denominator;
        scaled.max(self.min_capacity).max(capacity + 1)
    }
}

#[cfg(feature = "arbitrary")]
impl<'a> arbitrary::Arbitrary<'a> for GrowthPolicy {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        let denominator = u.int_in_range(1..=4)?;
        Ok(Self {
            min_capacity: u.int_in_range(0..=8)?,
            numerator: u.int_in_range(denominator..=4 * denominator)?,
            denominator,
        })
    }
}

/// Error returned by the checked allocation functions.
///
/// The unchecked functions treat the same conditions as contract violations
/// and only catch them with debug assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum PoolError {
    /// Every id below the allocator's maximum count is in use.
    CapacityExhausted {
        /// The capacity ceiling that was hit.
        max_count: usize,
    },
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolError::CapacityExhausted { max_count } => {
                write!(f, "all {max_count} ids of the allocator are in use")
            }
        }
    }
}

impl core::error::Error for PoolError {}

/// Statistics collected by the sparse storage types.
///
/// This is an opaque type since the set of statistics may change between
/// versions. Counters are only updated when the `stats` feature is enabled.
///
/// The only supported operations on this type are:
/// * Default initialization
/// * Printing with `Debug` or `Display`
#[derive(Debug, Default, Clone)]
pub struct Stats {
    adds: usize,
    reused_slots: usize,
    fresh_slots: usize,
    removes: usize,
    stale_removes: usize,
    retired_slots: usize,
    grows: usize,
    relocated_elements: usize,
    clears: usize,
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:#?}")
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;

    use super::*;

    #[test]
    fn growth_policy_default_sequence() {
        let policy = GrowthPolicy::default();
        assert_eq!(policy.next_capacity(0), 4);
        assert_eq!(policy.next_capacity(4), 6);
        assert_eq!(policy.next_capacity(6), 9);
        assert_eq!(policy.next_capacity(9), 13);
    }

    #[test]
    fn growth_policy_always_grows() {
        let policy = GrowthPolicy {
            min_capacity: 0,
            numerator: 1,
            denominator: 1,
        };
        assert_eq!(policy.next_capacity(0), 1);
        assert_eq!(policy.next_capacity(5), 6);
    }

    #[test]
    fn error_display() {
        let err = PoolError::CapacityExhausted { max_count: 8 };
        assert_eq!(err.to_string(), "all 8 ids of the allocator are in use");
    }
}
