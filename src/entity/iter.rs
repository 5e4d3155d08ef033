//! Iterator types shared by the index-keyed maps.

use core::iter::Enumerate;
use core::marker::PhantomData;
use core::slice;

use super::EntityRef;

/// Iterator over all the keys and values of a [`SecondaryMap`].
///
/// [`SecondaryMap`]: super::SecondaryMap
pub struct Iter<'a, K: EntityRef, V> {
    enumerate: Enumerate<slice::Iter<'a, V>>,
    marker: PhantomData<K>,
}

impl<'a, K: EntityRef, V> Iter<'a, K, V> {
    #[inline]
    pub(crate) fn new(iter: slice::Iter<'a, V>) -> Self {
        Self {
            enumerate: iter.enumerate(),
            marker: PhantomData,
        }
    }
}

impl<'a, K: EntityRef, V> Iterator for Iter<'a, K, V> {
    type Item = (K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.enumerate.next().map(|(i, v)| (K::new(i), v))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.enumerate.size_hint()
    }
}

impl<K: EntityRef, V> DoubleEndedIterator for Iter<'_, K, V> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        self.enumerate.next_back().map(|(i, v)| (K::new(i), v))
    }
}

impl<K: EntityRef, V> ExactSizeIterator for Iter<'_, K, V> {}

/// Mutable iterator over all the keys and values of a [`SecondaryMap`].
///
/// [`SecondaryMap`]: super::SecondaryMap
pub struct IterMut<'a, K: EntityRef, V> {
    enumerate: Enumerate<slice::IterMut<'a, V>>,
    marker: PhantomData<K>,
}

impl<'a, K: EntityRef, V> IterMut<'a, K, V> {
    #[inline]
    pub(crate) fn new(iter: slice::IterMut<'a, V>) -> Self {
        Self {
            enumerate: iter.enumerate(),
            marker: PhantomData,
        }
    }
}

impl<'a, K: EntityRef, V> Iterator for IterMut<'a, K, V> {
    type Item = (K, &'a mut V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.enumerate.next().map(|(i, v)| (K::new(i), v))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.enumerate.size_hint()
    }
}

impl<K: EntityRef, V> DoubleEndedIterator for IterMut<'_, K, V> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        self.enumerate.next_back().map(|(i, v)| (K::new(i), v))
    }
}

impl<K: EntityRef, V> ExactSizeIterator for IterMut<'_, K, V> {}
