//! Generation counters and generational handles.
//!
//! An [`Id`] names a slot together with the generation the slot had when the
//! handle was issued. Every time a slot is vacated its generation is bumped,
//! so any copy of an old handle stops matching and can be detected as stale
//! in O(1).

use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;

use crate::entity::{EntityRef, ReservedValue};

/// An unsigned integer used as a per-slot generation counter.
///
/// The largest value of the type is reserved as the null generation and is
/// never carried by a live slot. A slot whose generation can't be bumped any
/// further without reaching it gets retired instead of being reused.
pub trait Generation: Copy + Eq + Ord + Default + fmt::Debug + fmt::Display {
    /// The reserved null generation.
    const NULL: Self;

    /// Returns the generation following `self`, or `None` if that would be
    /// the null generation.
    fn next(self) -> Option<Self>;
}

macro_rules! generation_impl {
    ($($int:ident)*) => {
        $(
            impl Generation for $int {
                const NULL: Self = $int::MAX;

                #[inline]
                fn next(self) -> Option<Self> {
                    debug_assert!(self != Self::NULL);
                    let next = self + 1;
                    if next == Self::NULL { None } else { Some(next) }
                }
            }
        )*
    };
}

generation_impl!(u8 u16 u32 u64);

/// A generational handle to a slot.
///
/// `Tag` is a phantom parameter: handles issued by pools with different tags
/// are different types, so they can't be passed to the wrong pool. It costs
/// nothing at runtime and imposes no bounds on the tag type.
///
/// Copying a handle does not keep the slot alive. The pool owns the slot; a
/// handle is only a way to look it up.
pub struct Id<K, G = u32, Tag = ()> {
    value: K,
    generation: G,
    marker: PhantomData<fn() -> Tag>,
}

impl<K: EntityRef, G: Generation, Tag> Id<K, G, Tag> {
    /// Creates a handle from a raw index and generation.
    #[inline]
    pub fn new(value: K, generation: G) -> Self {
        Self {
            value,
            generation,
            marker: PhantomData,
        }
    }

    /// The null handle. No pool ever considers it valid.
    #[inline]
    pub fn null() -> Self {
        Self::new(K::reserved_value(), G::NULL)
    }

    /// Returns whether this is the null handle.
    #[inline]
    pub fn is_null(&self) -> bool {
        self.value.is_reserved_value() && self.generation == G::NULL
    }

    /// The raw slot index.
    #[inline]
    pub fn value(&self) -> K {
        self.value
    }

    /// The generation of the slot when this handle was issued.
    #[inline]
    pub fn generation(&self) -> G {
        self.generation
    }
}

impl<K: EntityRef, G: Generation, Tag> Default for Id<K, G, Tag> {
    #[inline]
    fn default() -> Self {
        Self::null()
    }
}

impl<K: EntityRef, G: Generation, Tag> ReservedValue for Id<K, G, Tag> {
    #[inline]
    fn reserved_value() -> Self {
        Self::null()
    }

    #[inline]
    fn is_reserved_value(&self) -> bool {
        self.is_null()
    }
}

// Manual impls so that `Tag` needs no bounds.
impl<K: Copy, G: Copy, Tag> Clone for Id<K, G, Tag> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<K: Copy, G: Copy, Tag> Copy for Id<K, G, Tag> {}

impl<K: PartialEq, G: PartialEq, Tag> PartialEq for Id<K, G, Tag> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value && self.generation == other.generation
    }
}

impl<K: Eq, G: Eq, Tag> Eq for Id<K, G, Tag> {}

impl<K: Hash, G: Hash, Tag> Hash for Id<K, G, Tag> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
        self.generation.hash(state);
    }
}

impl<K: Ord, G: Ord, Tag> PartialOrd for Id<K, G, Tag> {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K: Ord, G: Ord, Tag> Ord for Id<K, G, Tag> {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.value
            .cmp(&other.value)
            .then_with(|| self.generation.cmp(&other.generation))
    }
}

impl<K: EntityRef + fmt::Display, G: Generation, Tag> fmt::Display for Id<K, G, Tag> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "null")
        } else {
            write!(f, "{}v{}", self.value, self.generation)
        }
    }
}

impl<K: EntityRef + fmt::Display, G: Generation, Tag> fmt::Debug for Id<K, G, Tag> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(feature = "arbitrary")]
impl<'a, K, G, Tag> arbitrary::Arbitrary<'a> for Id<K, G, Tag>
where
    K: EntityRef,
    G: Generation + arbitrary::Arbitrary<'a>,
{
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        if u.ratio(1, 16)? {
            return Ok(Self::null());
        }
        // Keep indices small so that they hit real slots most of the time.
        let value = K::new(u.choose_index(K::index_limit().min(256))?);
        let generation = u.arbitrary::<G>()?;
        if generation == G::NULL {
            return Ok(Self::new(value, G::default()));
        }
        Ok(Self::new(value, generation))
    }
}

#[cfg(test)]
mod tests {
    use alloc::format;

    use super::*;
    use crate::SlotIndex;

    struct Meshes;

    #[test]
    fn generation_stops_before_null() {
        assert_eq!(0u8.next(), Some(1));
        assert_eq!(253u8.next(), Some(254));
        assert_eq!(254u8.next(), None);
        assert_eq!(u32::NULL, u32::MAX);
    }

    #[test]
    fn null_and_display() {
        let null: Id<SlotIndex, u16, Meshes> = Id::null();
        assert!(null.is_null());
        assert_eq!(Id::default(), null);
        assert_eq!(format!("{null}"), "null");

        let id: Id<SlotIndex, u16, Meshes> = Id::new(SlotIndex::new(4), 2);
        assert!(!id.is_null());
        assert_eq!(id.value(), SlotIndex::new(4));
        assert_eq!(id.generation(), 2);
        assert_eq!(format!("{id:?}"), "slot4v2");
        assert!(id < Id::new(SlotIndex::new(4), 3));
        assert!(id > Id::new(SlotIndex::new(3), 9));
    }
}
