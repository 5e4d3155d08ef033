//! Slot storage with the free chain threaded through vacant slots.
//!
//! A [`SparseRange`] owns a fixed number of slots. Every slot is either
//! occupied by a value, vacant, or retired. Vacant slots form a singly linked
//! LIFO chain: each one stores the index of the next vacant slot, so finding
//! a slot to reuse needs no auxiliary structure. Slots past the highest one
//! ever used are not materialized at all until they are first handed out.
//!
//! [`SparseArray`] wraps a range and replaces it with a larger one whenever it
//! fills up, relocating every element and the free chain with
//! [`SparseRange::move_to`].

use core::iter::Enumerate;
use core::slice;

use crate::entity::{EntityRef, PackedOption};

mod array;
mod range;

pub use array::SparseArray;
pub use range::SparseRange;

/// State of a single materialized slot.
#[derive(Clone)]
pub(crate) enum Slot<K: EntityRef, T> {
    /// Vacant, linked to the next vacant slot in the chain.
    Free(PackedOption<K>),

    /// Holds a live value.
    Occupied(T),

    /// Permanently out of use.
    Retired,
}

/// Iterator over the occupied slots of a sparse storage, in index order.
pub struct Iter<'a, K: EntityRef, T> {
    slots: Enumerate<slice::Iter<'a, Slot<K, T>>>,
    remaining: usize,
}

impl<'a, K: EntityRef, T> Iter<'a, K, T> {
    #[inline]
    pub(crate) fn new(slots: &'a [Slot<K, T>], len: usize) -> Self {
        Self {
            slots: slots.iter().enumerate(),
            remaining: len,
        }
    }
}

impl<'a, K: EntityRef, T> Iterator for Iter<'a, K, T> {
    type Item = (K, &'a T);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        for (i, slot) in self.slots.by_ref() {
            if let Slot::Occupied(value) = slot {
                self.remaining -= 1;
                return Some((K::new(i), value));
            }
        }
        None
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K: EntityRef, T> ExactSizeIterator for Iter<'_, K, T> {}

/// Mutable iterator over the occupied slots of a sparse storage, in index
/// order.
pub struct IterMut<'a, K: EntityRef, T> {
    slots: Enumerate<slice::IterMut<'a, Slot<K, T>>>,
    remaining: usize,
}

impl<'a, K: EntityRef, T> IterMut<'a, K, T> {
    #[inline]
    pub(crate) fn new(slots: &'a mut [Slot<K, T>], len: usize) -> Self {
        Self {
            slots: slots.iter_mut().enumerate(),
            remaining: len,
        }
    }
}

impl<'a, K: EntityRef, T> Iterator for IterMut<'a, K, T> {
    type Item = (K, &'a mut T);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        for (i, slot) in self.slots.by_ref() {
            if let Slot::Occupied(value) = slot {
                self.remaining -= 1;
                return Some((K::new(i), value));
            }
        }
        None
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K: EntityRef, T> ExactSizeIterator for IterMut<'_, K, T> {}
