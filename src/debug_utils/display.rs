//! Human-readable dumps of pool internals.

use core::cell::Cell;
use core::fmt;

use crate::IndexAllocator;
use crate::SparseRange;
use crate::entity::EntityRef;
use crate::sparse::Slot;

/// Helper type to display a separated list of displayable values.
pub(crate) struct DisplayIter<T> {
    iter: Cell<Option<T>>,
    separator: &'static str,
}

impl<T: IntoIterator> fmt::Display for DisplayIter<T>
where
    T::Item: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The iterator can only be consumed once.
        let Some(iter) = self.iter.take() else {
            return Ok(());
        };
        for (i, val) in iter.into_iter().enumerate() {
            if i == 0 {
                write!(f, "{val}")?;
            } else {
                write!(f, "{} {val}", self.separator)?;
            }
        }
        Ok(())
    }
}

pub(crate) fn display_iter<I: IntoIterator<Item = impl fmt::Display>>(
    iter: I,
    separator: &'static str,
) -> DisplayIter<I> {
    DisplayIter {
        iter: Cell::new(Some(iter)),
        separator,
    }
}

/// Wrapper around an [`IndexAllocator`] whose [`Display`] implementation
/// shows the high-water mark and the free list.
///
/// [`Display`]: core::fmt::Display
pub struct DisplayIndexAllocator<'a, K: EntityRef>(pub &'a IndexAllocator<K>);

impl<K: EntityRef + fmt::Display> fmt::Display for DisplayIndexAllocator<'_, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "count {} of {}, free [{}]",
            self.0.count(),
            self.0.max_count(),
            display_iter(self.0.free_ids(), ",")
        )
    }
}

/// Wrapper around a [`SparseRange`] whose [`Display`] implementation dumps
/// the state of every materialized slot, one per line, followed by the free
/// chain.
///
/// ```
/// use sparsepool::SparseRange;
/// use sparsepool::debug_utils::DisplaySlots;
///
/// let mut range: SparseRange<char> = SparseRange::new(4);
/// let a = range.add('a');
/// range.add('b');
/// range.remove(a);
/// assert_eq!(
///     DisplaySlots(&range).to_string(),
///     "slot0: free\nslot1: live\nfree chain: slot0\n"
/// );
/// ```
///
/// [`Display`]: core::fmt::Display
pub struct DisplaySlots<'a, T, K: EntityRef>(pub &'a SparseRange<T, K>);

impl<T, K: EntityRef + fmt::Display> fmt::Display for DisplaySlots<'_, T, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots = self.0.slots();
        for (i, slot) in slots.iter().enumerate() {
            let state = match slot {
                Slot::Free(_) => "free",
                Slot::Occupied(_) => "live",
                Slot::Retired => "retired",
            };
            writeln!(f, "{}: {state}", K::new(i))?;
        }

        // Bounded walk so that a corrupted chain can still be printed.
        let mut chain = alloc::vec::Vec::new();
        let mut next = self.0.first_free();
        while let Some(index) = next {
            if chain.len() > slots.len() {
                break;
            }
            chain.push(index);
            next = match slots.get(index.index()) {
                Some(Slot::Free(next)) => next.expand(),
                _ => None,
            };
        }
        writeln!(f, "free chain: {}", display_iter(chain, " ->"))
    }
}
