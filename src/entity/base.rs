//! Base definitions for index types.

use core::fmt;

use super::packed_option::ReservedValue;

/// A typed wrapper around an integer slot index.
///
/// Every pool in this crate is generic over its index type so that indices
/// from unrelated pools can't be mixed up. The reserved value of the type
/// (see [`ReservedValue`]) is never handed out as a real index: pools use it
/// to terminate free chains and to build the null [`Id`].
///
/// [`Id`]: crate::Id
pub trait EntityRef: Copy + Eq + ReservedValue {
    /// Creates a new index from a raw `usize`.
    fn new(index: usize) -> Self;

    /// Returns the raw `usize` that was used to create this index.
    fn index(self) -> usize;

    /// Returns the number of indices of this type that pools may hand out.
    ///
    /// The two largest representable values are excluded: the largest is the
    /// reserved value, and the one below it is kept free so that the
    /// exclusive end of any range of valid indices is still representable.
    #[inline]
    fn index_limit() -> usize {
        Self::reserved_value().index() - 1
    }
}

/// A sequential range of indices.
///
/// A range is considered empty if the index of `from` is greater than or equal
/// to the index of `to`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct EntityRange<T: EntityRef> {
    /// Inclusive lower bound of the range.
    pub from: T,

    /// Exclusive upper bound of the range.
    pub to: T,
}

impl<T: EntityRef + fmt::Display> fmt::Display for EntityRange<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.from, self.to)
    }
}

impl<T: EntityRef> EntityRange<T> {
    /// Creates a new range.
    #[inline]
    pub const fn new(from: T, to: T) -> Self {
        Self { from, to }
    }

    /// Creates the range `[from, from + len)`.
    #[inline]
    pub fn with_len(from: T, len: usize) -> Self {
        Self {
            from,
            to: T::new(from.index() + len),
        }
    }

    /// Returns whether the range is empty.
    #[inline]
    pub fn is_empty(self) -> bool {
        self.to.index() <= self.from.index()
    }

    /// Number of elements in the range.
    #[inline]
    pub fn len(self) -> usize {
        self.to.index().saturating_sub(self.from.index())
    }

    /// Iterator over the elements in the range.
    #[inline]
    pub fn iter(self) -> impl DoubleEndedIterator<Item = T> + ExactSizeIterator {
        (self.from.index()..self.to.index()).map(|i| T::new(i))
    }
}

/// Defines new index types along with their trait implementations.
///
/// ```
/// sparsepool::entity_def! {
///     /// Index of a texture slot.
///     pub entity TextureIndex(u16, "tex");
/// }
///
/// use sparsepool::entity::EntityRef;
/// let index = TextureIndex::new(3);
/// assert_eq!(index.index(), 3);
/// assert_eq!(format!("{index}"), "tex3");
/// ```
#[macro_export]
macro_rules! entity_def {
    ($($(#[$attr:meta])* $vis:vis entity $name:ident($int:ident);)*) => {
        $(
            $(#[$attr])*
            #[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
            $vis struct $name($int);

            // Inherent copies of the EntityRef methods that are const.
            impl $name {
                /// Creates a new index from a raw `usize`.
                #[inline]
                #[allow(dead_code)]
                $vis const fn new(index: usize) -> Self {
                    debug_assert!(index < ($int::MAX as usize));
                    Self(index as $int)
                }

                /// Returns the raw `usize` that was used to create this index.
                #[inline]
                #[allow(dead_code)]
                $vis const fn index(self) -> usize {
                    self.0 as usize
                }
            }

            impl $crate::entity::EntityRef for $name {
                #[inline]
                fn new(index: usize) -> Self {
                    debug_assert!(index < ($int::MAX as usize));
                    $name(index as $int)
                }

                #[inline]
                fn index(self) -> usize {
                    self.0 as usize
                }
            }

            impl $crate::entity::ReservedValue for $name {
                #[inline]
                fn reserved_value() -> Self {
                    Self($int::MAX)
                }

                #[inline]
                fn is_reserved_value(&self) -> bool {
                    self.0 == $int::MAX
                }
            }
        )*
    };

    // Same as above but also provides Display/Debug impls.
    ($($(#[$attr:meta])* $vis:vis entity $name:ident($int:ident, $display_prefix:expr);)*) => {
        $crate::entity_def! {
            $($(#[$attr])* $vis entity $name($int);)*
        }
        $(
            impl core::fmt::Display for $name {
                fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                    if $crate::entity::ReservedValue::is_reserved_value(self) {
                        write!(f, concat!($display_prefix, "-none"))
                    } else {
                        write!(f, concat!($display_prefix, "{}"), self.0)
                    }
                }
            }

            impl core::fmt::Debug for $name {
                fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                    core::fmt::Display::fmt(self, f)
                }
            }
        )*
    };
}

#[cfg(test)]
mod tests {
    use alloc::format;
    use alloc::vec::Vec;

    use super::*;

    crate::entity_def! {
        entity Small(u8, "s");
    }

    #[test]
    fn reserved_value_is_max() {
        assert_eq!(Small::index_limit(), 254);
        assert!(Small::reserved_value().is_reserved_value());
        assert!(!Small::new(254).is_reserved_value());
        assert_eq!(format!("{}", Small::reserved_value()), "s-none");
    }

    #[test]
    fn range_queries() {
        let range = EntityRange::with_len(Small::new(2), 3);
        assert_eq!(range.len(), 3);
        let items: Vec<_> = range.iter().map(Small::index).collect();
        assert_eq!(items, [2, 3, 4]);
        assert_eq!(format!("{range}"), "s2..s5");

        let empty = EntityRange::new(Small::new(4), Small::new(4));
        assert!(empty.is_empty());
        assert_eq!(empty.len(), 0);
    }
}
