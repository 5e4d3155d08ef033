//! Space-efficient `Option` for index types.
//!
//! Free chains are threaded through vacant slots, so every vacant slot stores
//! an optional "next" index. Packing that option into the index's reserved
//! value keeps a vacant slot no larger than the index itself.

use core::fmt;

/// Types that have a reserved value which does not represent a valid value.
pub trait ReservedValue {
    /// Create an instance of the reserved value.
    fn reserved_value() -> Self;

    /// Checks whether value is the reserved one.
    fn is_reserved_value(&self) -> bool;
}

/// Packed representation of `Option<T>` for types implementing [`ReservedValue`].
///
/// ```
/// use sparsepool::entity::{PackedOption, ReservedValue};
/// use sparsepool::SlotIndex;
///
/// let next: PackedOption<SlotIndex> = Some(SlotIndex::new(7)).into();
/// assert_eq!(next.expand(), Some(SlotIndex::new(7)));
///
/// let end = PackedOption::<SlotIndex>::default();
/// assert!(end.is_none());
/// assert!(SlotIndex::reserved_value().is_reserved_value());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct PackedOption<T: ReservedValue>(T);

impl<T: ReservedValue> PackedOption<T> {
    /// Returns `true` if the packed option is a `None` value.
    #[inline]
    pub fn is_none(&self) -> bool {
        self.0.is_reserved_value()
    }

    /// Returns `true` if the packed option is a `Some` value.
    #[inline]
    pub fn is_some(&self) -> bool {
        !self.0.is_reserved_value()
    }

    /// Expands the packed option into a normal `Option`.
    #[inline]
    pub fn expand(self) -> Option<T> {
        if self.is_none() { None } else { Some(self.0) }
    }

    /// Unwraps a packed `Some` value or panics.
    #[track_caller]
    #[inline]
    pub fn unwrap(self) -> T {
        self.expand().unwrap()
    }
}

impl<T: ReservedValue> Default for PackedOption<T> {
    /// Create a default packed option representing `None`.
    #[inline]
    fn default() -> Self {
        Self(T::reserved_value())
    }
}

impl<T: ReservedValue> From<T> for PackedOption<T> {
    /// Convert `t` into a packed `Some(x)`.
    #[inline]
    fn from(t: T) -> Self {
        debug_assert!(
            !t.is_reserved_value(),
            "Can't make a PackedOption from the reserved value."
        );
        Self(t)
    }
}

impl<T: ReservedValue> From<Option<T>> for PackedOption<T> {
    /// Convert an option into its packed equivalent.
    #[inline]
    fn from(opt: Option<T>) -> Self {
        match opt {
            None => Self::default(),
            Some(t) => t.into(),
        }
    }
}

impl<T: ReservedValue> From<PackedOption<T>> for Option<T> {
    #[inline]
    fn from(opt: PackedOption<T>) -> Self {
        opt.expand()
    }
}

impl<T> fmt::Debug for PackedOption<T>
where
    T: ReservedValue + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "None")
        } else {
            write!(f, "Some({:?})", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::format;

    use super::*;
    use crate::SlotIndex;

    #[test]
    fn packs_chain_links() {
        let head: PackedOption<SlotIndex> = SlotIndex::new(3).into();
        assert!(head.is_some());
        assert_eq!(head.expand(), Some(SlotIndex::new(3)));
        assert_eq!(format!("{head:?}"), "Some(slot3)");

        let end = PackedOption::from(None::<SlotIndex>);
        assert!(end.is_none());
        assert_eq!(end, PackedOption::default());
        assert_eq!(end.expand(), None);
        assert_eq!(format!("{end:?}"), "None");
    }
}
