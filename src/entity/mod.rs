//! Every pool in this crate hands out "entities": newtype wrappers around
//! integers which represent an index into slot storage.
//!
//! These types implement the [`EntityRef`] trait which allows them to be
//! converted to and from `usize`, but they will generally contain a smaller
//! integer type internally to reduce memory usage. The largest value of that
//! integer is reserved (see [`ReservedValue`]) and is never a valid index.
//!
//! This module provides the supporting data structures:
//!
//! - [`SecondaryMap<K, V>`] associates per-slot metadata (such as generation
//!   counters) with indices. It is a wrapper around a `Vec<V>` indexed by `K`.
//! - [`EntitySet<T>`] represents a set of indices, implemented using a
//!   resizable heap-allocated bitset.
//! - [`PackedOption<T>`] provides a compact representation of an `Option<T>`
//!   by encoding `None` using the reserved value.
//! - [`EntityRange<T>`] is a half-open range of consecutive indices.
//!
//! New index types are declared with [`entity_def!`](crate::entity_def).

pub mod base;
pub mod iter;
pub mod packed_option;
pub mod secondary_map;
pub mod set;

pub use base::{EntityRange, EntityRef};
pub use packed_option::{PackedOption, ReservedValue};
pub use secondary_map::SecondaryMap;
pub use set::EntitySet;
