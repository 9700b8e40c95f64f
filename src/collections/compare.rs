//! Key ordering strategies.
//!
//! A [`KeyComparator`] decides where a key lives in an
//! [`OrderedMap`](super::OrderedMap) and whether two keys in the same
//! [`UnorderedMap`](super::UnorderedMap) bucket are the same key.
//!
//! Any `Fn(&K, &K) -> Ordering` closure is a comparator, so most callers
//! never implement the trait by hand:
//!
//! ```rust
//! use std::cmp::Ordering;
//! use tessera::collections::{KeyComparator, NaturalOrder};
//!
//! let by_length = |lhs: &&str, rhs: &&str| lhs.len().cmp(&rhs.len());
//! assert_eq!(by_length.compare(&"ab", &"c"), Ordering::Greater);
//! assert_eq!(NaturalOrder.compare(&"ab", &"c"), Ordering::Less);
//! ```

use std::cmp::Ordering;

/// A total order over keys of type `K`.
///
/// For an ordered map the order must be strict and stable for the whole
/// lifetime of the map. For a hash map the comparator only has to agree
/// with the hasher: keys that compare `Equal` must hash identically.
pub trait KeyComparator<K: ?Sized> {
    /// Compares two keys.
    fn compare(&self, lhs: &K, rhs: &K) -> Ordering;
}

/// The key type's own [`Ord`] implementation.
///
/// This is the default comparator of both map types.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct NaturalOrder;

impl<K: Ord + ?Sized> KeyComparator<K> for NaturalOrder {
    #[inline]
    fn compare(&self, lhs: &K, rhs: &K) -> Ordering {
        lhs.cmp(rhs)
    }
}

/// Inverts another comparator.
///
/// # Examples
///
/// ```rust
/// use tessera::collections::{NaturalOrder, OrderedMap, ReverseOrder};
///
/// let mut map = OrderedMap::with_comparator(ReverseOrder(NaturalOrder));
/// map.put(1, "one");
/// map.put(2, "two");
/// assert_eq!(map.minimum().map(|pair| pair.key), Some(2));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ReverseOrder<C>(pub C);

impl<K: ?Sized, C: KeyComparator<K>> KeyComparator<K> for ReverseOrder<C> {
    #[inline]
    fn compare(&self, lhs: &K, rhs: &K) -> Ordering {
        self.0.compare(rhs, lhs)
    }
}

impl<K: ?Sized, F> KeyComparator<K> for F
where
    F: Fn(&K, &K) -> Ordering,
{
    #[inline]
    fn compare(&self, lhs: &K, rhs: &K) -> Ordering {
        self(lhs, rhs)
    }
}
