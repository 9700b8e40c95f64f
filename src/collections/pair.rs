//! Key/value pair shared by both map types.

use std::fmt;

/// A key together with its value.
///
/// Both [`OrderedMap`](super::OrderedMap) and
/// [`UnorderedMap`](super::UnorderedMap) store their entries as pairs and
/// hand out references to them from `minimum`, `maximum`, `predecessor`,
/// `successor` and the embedded cursor.
///
/// # Examples
///
/// ```rust
/// use tessera::collections::Pair;
///
/// let pair = Pair::new("answer", 42);
/// assert_eq!(pair.as_tuple(), (&"answer", &42));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct Pair<K, V> {
    /// The key.
    pub key: K,
    /// The value stored under `key`.
    pub value: V,
}

impl<K, V> Pair<K, V> {
    /// Creates a pair.
    #[inline]
    pub const fn new(key: K, value: V) -> Self {
        Self { key, value }
    }

    /// Borrows both halves as a tuple.
    #[inline]
    pub const fn as_tuple(&self) -> (&K, &V) {
        (&self.key, &self.value)
    }

    /// Splits the pair into its key and value.
    #[inline]
    pub fn into_tuple(self) -> (K, V) {
        (self.key, self.value)
    }
}

impl<K, V> From<(K, V)> for Pair<K, V> {
    fn from((key, value): (K, V)) -> Self {
        Self::new(key, value)
    }
}

impl<K: fmt::Display, V: fmt::Display> fmt::Display for Pair<K, V> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "({}, {})", self.key, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_into_tuple_round_trips_through_from() {
        let pair = Pair::from((1, "one"));
        assert_eq!(pair.into_tuple(), (1, "one"));
    }

    #[rstest]
    fn test_display() {
        assert_eq!(format!("{}", Pair::new("a", 1)), "(a, 1)");
    }
}
