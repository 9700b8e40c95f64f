//! Hash map based on separate chaining.
//!
//! This module provides [`UnorderedMap`], a mutable hash map whose buckets
//! hold singly linked chains of entries. Entries live in a slab and chains
//! link them by index, so growing the bucket array relinks entries without
//! moving any key or value.
//!
//! # Growth
//!
//! Bucket counts follow a fixed table of primes, each roughly twice the
//! previous one, starting at 769. Once the table is exhausted the bucket
//! count triples. The map grows right before inserting a new key while it
//! already holds `floor(bucket_count * 0.75)` entries.
//!
//! # Examples
//!
//! ```rust
//! use tessera::collections::{Murmur3, UnorderedMap};
//!
//! let mut map = UnorderedMap::with_hasher(Murmur3);
//! map.put("apple".to_string(), 3);
//! map.put("pear".to_string(), 5);
//!
//! assert_eq!(map.get("apple"), Some(&3));
//! assert!(map.contain("pear"));
//! assert!(map.remove("pear"));
//! assert_eq!(map.size(), 1);
//! ```

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::iter::{FromIterator, FusedIterator};

use super::cleanup::CleanupHooks;
use super::compare::{KeyComparator, NaturalOrder};
use super::hash::{IdentityHash, KeyHasher};
use super::{Pair, PutOutcome};
use crate::error::CollectionError;

// =============================================================================
// Constants
// =============================================================================

/// Bucket counts used for growth, in order.
const BUCKET_PRIMES: [usize; 22] = [
    769,
    1_543,
    3_079,
    6_151,
    12_289,
    24_593,
    49_157,
    98_317,
    196_613,
    393_241,
    786_433,
    1_572_869,
    3_145_739,
    6_291_469,
    12_582_917,
    25_165_843,
    50_331_653,
    100_663_319,
    201_326_611,
    402_653_189,
    805_306_457,
    1_610_612_741,
];

/// Growth factor once [`BUCKET_PRIMES`] is exhausted.
const FALLBACK_GROWTH: usize = 3;

/// End-of-chain marker.
const NIL: usize = usize::MAX;

static_assertions::const_assert!(rehash_threshold(BUCKET_PRIMES[0]) > 0);
static_assertions::assert_not_impl_any!(UnorderedMap<u32, u32>: Send, Sync);

/// `floor(bucket_count * 0.75)` without intermediate overflow.
const fn rehash_threshold(bucket_count: usize) -> usize {
    bucket_count / 4 * 3 + bucket_count % 4 * 3 / 4
}

/// Bucket count following `current`, or `None` if it overflows.
fn next_bucket_count(current: usize) -> Option<usize> {
    BUCKET_PRIMES
        .iter()
        .copied()
        .find(|&prime| prime > current)
        .or_else(|| current.checked_mul(FALLBACK_GROWTH))
}

#[inline]
fn bucket_of(hash: u32, bucket_count: usize) -> usize {
    hash as usize % bucket_count
}

// =============================================================================
// Entry Definition
// =============================================================================

/// A slab slot. Live slots link their chain through `next`; vacant slots
/// link the free list through it.
#[derive(Debug)]
struct Entry<K, V> {
    pair: Option<Pair<K, V>>,
    next: usize,
}

#[derive(Clone, Copy, Debug)]
struct Cursor {
    bucket: usize,
    node: usize,
}

impl Cursor {
    const fn exhausted() -> Self {
        Self {
            bucket: 0,
            node: NIL,
        }
    }
}

// =============================================================================
// UnorderedMap Definition
// =============================================================================

/// A mutable hash map with separate chaining.
///
/// `H` turns keys into bucket indices and `C` decides whether two keys in
/// one chain are the same key. They must agree: keys that compare
/// [`Ordering::Equal`] must hash identically. The defaults,
/// [`IdentityHash`] and [`NaturalOrder`], suit integer keys; other keys
/// need a hasher such as [`Murmur3`](super::Murmur3) or
/// [`StdHash`](super::StdHash).
///
/// # Time Complexity
///
/// | Operation          | Complexity            |
/// |--------------------|-----------------------|
/// | `put`              | O(1) average, amortized |
/// | `get` / `contain`  | O(1) average          |
/// | `remove`           | O(1) average          |
/// | `size`             | O(1)                  |
/// | growth             | O(N + buckets)        |
///
/// # Iteration
///
/// Like [`OrderedMap`](super::OrderedMap), the map embeds one cursor,
/// driven by [`first`](Self::first) and [`next`](Self::next). It visits
/// buckets in index order and each chain from its head. Inserting a new
/// key, removing, growing or clearing exhausts it.
///
/// # Examples
///
/// ```rust
/// use tessera::collections::UnorderedMap;
///
/// let mut map = UnorderedMap::new();
/// map.put(2, 20);
/// map.put(2, 9000);
/// assert_eq!(map.get(&2), Some(&9000));
/// assert_eq!(map.size(), 1);
/// ```
pub struct UnorderedMap<K, V, H = IdentityHash, C = NaturalOrder> {
    entries: Vec<Entry<K, V>>,
    /// Head of the vacant-slot list.
    vacant: usize,
    buckets: Vec<usize>,
    threshold: usize,
    /// Bucket count to grow to from the current one.
    next_buckets: fn(usize) -> Option<usize>,
    length: usize,
    hasher: H,
    comparator: C,
    hooks: CleanupHooks<K, V>,
    cursor: Cursor,
}

impl<K, V> UnorderedMap<K, V> {
    /// Creates an empty map with the identity hash and natural ordering.
    ///
    /// The map starts with 769 buckets.
    #[must_use]
    pub fn new() -> Self {
        Self::with_hasher_and_comparator(IdentityHash, NaturalOrder)
    }
}

impl<K, V, H> UnorderedMap<K, V, H> {
    /// Creates an empty map using `hasher` and natural ordering.
    #[must_use]
    pub fn with_hasher(hasher: H) -> Self {
        Self::with_hasher_and_comparator(hasher, NaturalOrder)
    }
}

impl<K, V, C> UnorderedMap<K, V, IdentityHash, C> {
    /// Creates an empty map using the identity hash and `comparator`.
    #[must_use]
    pub fn with_comparator(comparator: C) -> Self {
        Self::with_hasher_and_comparator(IdentityHash, comparator)
    }
}

impl<K, V, H, C> UnorderedMap<K, V, H, C> {
    /// Creates an empty map using `hasher` and `comparator`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tessera::collections::{UnorderedMap, djb2};
    ///
    /// let same_ignoring_case =
    ///     |lhs: &String, rhs: &String| lhs.to_lowercase().cmp(&rhs.to_lowercase());
    /// let hash_ignoring_case = |key: &String| djb2(key.to_lowercase().as_bytes());
    ///
    /// let mut map = UnorderedMap::with_hasher_and_comparator(hash_ignoring_case, same_ignoring_case);
    /// map.put("Key".to_string(), 1);
    /// map.put("KEY".to_string(), 2);
    /// assert_eq!(map.size(), 1);
    /// assert_eq!(map.get(&"key".to_string()), Some(&2));
    /// ```
    #[must_use]
    pub fn with_hasher_and_comparator(hasher: H, comparator: C) -> Self {
        let bucket_count = BUCKET_PRIMES[0];
        Self {
            entries: Vec::new(),
            vacant: NIL,
            buckets: vec![NIL; bucket_count],
            threshold: rehash_threshold(bucket_count),
            next_buckets: next_bucket_count,
            length: 0,
            hasher,
            comparator,
            hooks: CleanupHooks::new(),
            cursor: Cursor::exhausted(),
        }
    }

    /// Returns the number of entries in the map.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.length
    }

    /// Returns the number of entries in the map. Same as [`len`](Self::len).
    #[inline]
    #[must_use]
    pub const fn size(&self) -> usize {
        self.length
    }

    /// Returns `true` if the map contains no entries.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Returns the current number of buckets.
    #[inline]
    #[must_use]
    pub const fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Returns the hasher.
    #[inline]
    pub const fn hasher(&self) -> &H {
        &self.hasher
    }

    /// Returns the comparator.
    #[inline]
    pub const fn comparator(&self) -> &C {
        &self.comparator
    }

    /// Replaces the comparator.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::ComparatorOnPopulatedMap`] when the map
    /// holds entries, since two stored keys could become equal.
    pub fn set_comparator(&mut self, comparator: C) -> Result<(), CollectionError> {
        if self.length > 0 {
            return Err(CollectionError::ComparatorOnPopulatedMap { len: self.length });
        }
        self.comparator = comparator;
        Ok(())
    }

    /// Installs the hook that receives every key leaving the map.
    pub fn set_clean_key<F>(&mut self, hook: F)
    where
        F: FnMut(K) + 'static,
    {
        self.hooks.set_key(hook);
    }

    /// Installs the hook that receives every value leaving the map.
    pub fn set_clean_value<F>(&mut self, hook: F)
    where
        F: FnMut(V) + 'static,
    {
        self.hooks.set_value(hook);
    }

    /// Removes every entry, passing each one to the cleanup hooks.
    ///
    /// The bucket count is kept.
    pub fn clear(&mut self) {
        if !self.hooks.is_empty() {
            for entry in &mut self.entries {
                if let Some(pair) = entry.pair.take() {
                    self.hooks.release(pair);
                }
            }
        }
        self.entries.clear();
        self.buckets.fill(NIL);
        self.vacant = NIL;
        self.length = 0;
        self.cursor = Cursor::exhausted();
    }

    // -------------------------------------------------------------------------
    // Embedded cursor
    // -------------------------------------------------------------------------

    /// Positions the embedded cursor on the first entry.
    pub fn first(&mut self) {
        self.cursor = self.seek_from(0);
    }

    /// Returns the entry under the embedded cursor and advances it.
    ///
    /// Returns `None` once every bucket has been visited.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tessera::collections::UnorderedMap;
    ///
    /// let mut map: UnorderedMap<u32, u32> = (0..5).map(|key| (key, key * key)).collect();
    /// map.first();
    /// let mut total = 0;
    /// while let Some(pair) = map.next() {
    ///     total += pair.value;
    /// }
    /// assert_eq!(total, 30);
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<&Pair<K, V>> {
        let node = self.cursor.node;
        if node == NIL {
            return None;
        }
        let following = self.entries[node].next;
        self.cursor = if following == NIL {
            self.seek_from(self.cursor.bucket + 1)
        } else {
            Cursor {
                bucket: self.cursor.bucket,
                node: following,
            }
        };
        self.entries[node].pair.as_ref()
    }

    /// Cursor on the head of the first non-empty bucket at or after `bucket`.
    fn seek_from(&self, bucket: usize) -> Cursor {
        self.buckets
            .iter()
            .enumerate()
            .skip(bucket)
            .find(|&(_, &head)| head != NIL)
            .map_or_else(Cursor::exhausted, |(bucket, &node)| Cursor { bucket, node })
    }

    // -------------------------------------------------------------------------
    // Borrowing iterators
    // -------------------------------------------------------------------------

    /// Returns an iterator over the entries in bucket order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tessera::collections::UnorderedMap;
    ///
    /// let map: UnorderedMap<u32, char> = [(1, 'a'), (2, 'b')].into_iter().collect();
    /// let mut keys: Vec<u32> = map.keys().copied().collect();
    /// keys.sort_unstable();
    /// assert_eq!(keys, vec![1, 2]);
    /// assert_eq!(map.iter().len(), 2);
    /// ```
    pub fn iter(&self) -> UnorderedMapIterator<'_, K, V, H, C> {
        let start = self.seek_from(0);
        UnorderedMapIterator {
            map: self,
            bucket: start.bucket,
            node: start.node,
            remaining: self.length,
        }
    }

    /// Returns an iterator over the keys.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|(key, _)| key)
    }

    /// Returns an iterator over the values.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, value)| value)
    }

    // -------------------------------------------------------------------------
    // Slab and bucket helpers
    // -------------------------------------------------------------------------

    fn allocate(&mut self, pair: Pair<K, V>, next: usize) -> Result<usize, CollectionError> {
        if self.vacant != NIL {
            let slot = self.vacant;
            self.vacant = self.entries[slot].next;
            self.entries[slot] = Entry {
                pair: Some(pair),
                next,
            };
            return Ok(slot);
        }
        self.entries
            .try_reserve(1)
            .map_err(|source| CollectionError::allocation(1, &source))?;
        self.entries.push(Entry {
            pair: Some(pair),
            next,
        });
        Ok(self.entries.len() - 1)
    }

    fn vacate(&mut self, slot: usize) -> Option<Pair<K, V>> {
        let entry = &mut self.entries[slot];
        let pair = entry.pair.take();
        entry.next = self.vacant;
        self.vacant = slot;
        pair
    }

    /// Links every live entry into `buckets`, which must be all `NIL`, and
    /// installs it as the bucket array.
    fn relink(&mut self, mut buckets: Vec<usize>)
    where
        H: KeyHasher<K>,
    {
        let bucket_count = buckets.len();
        for (slot, entry) in self.entries.iter_mut().enumerate() {
            if let Some(pair) = entry.pair.as_ref() {
                let bucket = bucket_of(self.hasher.hash(&pair.key), bucket_count);
                entry.next = buckets[bucket];
                buckets[bucket] = slot;
            }
        }
        self.buckets = buckets;
        self.threshold = rehash_threshold(bucket_count);
        self.cursor = Cursor::exhausted();
    }

    /// Moves to the next bucket count.
    ///
    /// The new bucket array is reserved before any entry is touched, so a
    /// failure leaves the table as it was.
    fn grow(&mut self) -> Result<(), CollectionError>
    where
        H: KeyHasher<K>,
    {
        let current = self.buckets.len();
        let target = (self.next_buckets)(current).ok_or(CollectionError::CapacityOverflow { current })?;

        let mut buckets = Vec::new();
        buckets
            .try_reserve_exact(target)
            .map_err(|source| CollectionError::allocation(target, &source))?;
        buckets.resize(target, NIL);

        self.relink(buckets);
        tracing::debug!(
            from = current,
            to = target,
            entries = self.length,
            "rehashed unordered map"
        );
        Ok(())
    }

    /// Slot holding `key` in the chain of `bucket`, and the slot before it.
    fn locate<Q>(&self, bucket: usize, key: &Q) -> Option<(usize, usize)>
    where
        K: Borrow<Q>,
        C: KeyComparator<Q>,
        Q: ?Sized,
    {
        let mut previous = NIL;
        let mut current = self.buckets[bucket];
        while current != NIL {
            let entry = &self.entries[current];
            if let Some(pair) = entry.pair.as_ref()
                && self.comparator.compare(key, pair.key.borrow()) == Ordering::Equal
            {
                return Some((previous, current));
            }
            previous = current;
            current = entry.next;
        }
        None
    }

    fn search<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        H: KeyHasher<Q>,
        C: KeyComparator<Q>,
        Q: ?Sized,
    {
        let bucket = bucket_of(self.hasher.hash(key), self.buckets.len());
        self.locate(bucket, key).map(|(_, slot)| slot)
    }
}

impl<K, V, H: KeyHasher<K>, C> UnorderedMap<K, V, H, C> {
    /// Replaces the hasher and redistributes every entry over the current
    /// buckets.
    ///
    /// No entry is moved in memory; chains are rebuilt in place.
    pub fn set_hasher(&mut self, hasher: H) {
        self.hasher = hasher;
        let mut buckets = std::mem::take(&mut self.buckets);
        buckets.fill(NIL);
        self.relink(buckets);
    }
}

impl<K, V, H: KeyHasher<K>, C: KeyComparator<K>> UnorderedMap<K, V, H, C> {
    /// Inserts a key-value pair, replacing the entry whose key compares
    /// equal.
    ///
    /// A new key may first grow the table. If growth fails the insert goes
    /// ahead on the current buckets, which only lengthens chains.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::AllocationFailed`] when the entry itself
    /// could not be allocated. The map is unchanged in that case.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tessera::collections::{PutOutcome, UnorderedMap};
    ///
    /// let mut map = UnorderedMap::new();
    /// assert_eq!(map.try_put(7_u32, "seven"), Ok(PutOutcome::Inserted));
    /// assert_eq!(map.try_put(7_u32, "sept"), Ok(PutOutcome::Replaced));
    /// ```
    pub fn try_put(&mut self, key: K, value: V) -> Result<PutOutcome, CollectionError> {
        let hash = self.hasher.hash(&key);
        let bucket = bucket_of(hash, self.buckets.len());
        if let Some((_, slot)) = self.locate(bucket, &key) {
            let replaced = self.entries[slot].pair.replace(Pair::new(key, value));
            if let Some(replaced) = replaced {
                self.hooks.release(replaced);
            }
            return Ok(PutOutcome::Replaced);
        }

        if self.length >= self.threshold
            && let Err(error) = self.grow()
        {
            tracing::warn!(
                %error,
                buckets = self.buckets.len(),
                entries = self.length,
                "growth abandoned, inserting into current buckets"
            );
        }

        let bucket = bucket_of(hash, self.buckets.len());
        let slot = self.allocate(Pair::new(key, value), self.buckets[bucket])?;
        self.buckets[bucket] = slot;
        self.length += 1;
        self.cursor = Cursor::exhausted();
        Ok(PutOutcome::Inserted)
    }

    /// Inserts a key-value pair, replacing the entry whose key compares
    /// equal. Returns `false` only when allocation failed.
    pub fn put(&mut self, key: K, value: V) -> bool {
        self.try_put(key, value).is_ok()
    }
}

impl<K, V, H, C> UnorderedMap<K, V, H, C> {
    /// Returns a reference to the value stored under `key`.
    #[must_use]
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        H: KeyHasher<Q>,
        C: KeyComparator<Q>,
        Q: ?Sized,
    {
        let slot = self.search(key)?;
        self.entries[slot].pair.as_ref().map(|pair| &pair.value)
    }

    /// Returns a mutable reference to the value stored under `key`.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        H: KeyHasher<Q>,
        C: KeyComparator<Q>,
        Q: ?Sized,
    {
        let slot = self.search(key)?;
        self.entries[slot].pair.as_mut().map(|pair| &mut pair.value)
    }

    /// Returns `true` if the map contains `key`.
    #[must_use]
    pub fn contain<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        H: KeyHasher<Q>,
        C: KeyComparator<Q>,
        Q: ?Sized,
    {
        self.search(key).is_some()
    }

    /// Returns `true` if the map contains `key`. Same as
    /// [`contain`](Self::contain).
    #[must_use]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        H: KeyHasher<Q>,
        C: KeyComparator<Q>,
        Q: ?Sized,
    {
        self.contain(key)
    }

    /// Removes the entry stored under `key`, passing its key and value to
    /// the cleanup hooks. Returns `false` if the key is absent.
    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        H: KeyHasher<Q>,
        C: KeyComparator<Q>,
        Q: ?Sized,
    {
        let bucket = bucket_of(self.hasher.hash(key), self.buckets.len());
        let Some((previous, slot)) = self.locate(bucket, key) else {
            return false;
        };

        let following = self.entries[slot].next;
        if previous == NIL {
            self.buckets[bucket] = following;
        } else {
            self.entries[previous].next = following;
        }
        if let Some(removed) = self.vacate(slot) {
            self.hooks.release(removed);
        }
        self.length -= 1;
        self.cursor = Cursor::exhausted();
        true
    }
}

// =============================================================================
// Iterator Implementation
// =============================================================================

/// An iterator over key-value pairs of an [`UnorderedMap`], in bucket order.
pub struct UnorderedMapIterator<'a, K, V, H, C> {
    map: &'a UnorderedMap<K, V, H, C>,
    bucket: usize,
    node: usize,
    remaining: usize,
}

impl<'a, K, V, H, C> Iterator for UnorderedMapIterator<'a, K, V, H, C> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.node == NIL {
            return None;
        }
        let entry = &self.map.entries[self.node];
        if entry.next == NIL {
            let after = self.map.seek_from(self.bucket + 1);
            self.bucket = after.bucket;
            self.node = after.node;
        } else {
            self.node = entry.next;
        }
        self.remaining -= 1;
        entry.pair.as_ref().map(Pair::as_tuple)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V, H, C> ExactSizeIterator for UnorderedMapIterator<'_, K, V, H, C> {
    fn len(&self) -> usize {
        self.remaining
    }
}

impl<K, V, H, C> FusedIterator for UnorderedMapIterator<'_, K, V, H, C> {}

// =============================================================================
// Standard Trait Implementations
// =============================================================================

impl<K, V, H, C> Drop for UnorderedMap<K, V, H, C> {
    fn drop(&mut self) {
        if !self.hooks.is_empty() {
            self.clear();
        }
    }
}

impl<K, V, H: Default, C: Default> Default for UnorderedMap<K, V, H, C> {
    fn default() -> Self {
        Self::with_hasher_and_comparator(H::default(), C::default())
    }
}

impl<K, V, H, C> FromIterator<(K, V)> for UnorderedMap<K, V, H, C>
where
    H: KeyHasher<K> + Default,
    C: KeyComparator<K> + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::default();
        map.extend(iter);
        map
    }
}

impl<K, V, H: KeyHasher<K>, C: KeyComparator<K>> Extend<(K, V)> for UnorderedMap<K, V, H, C> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.put(key, value);
        }
    }
}

impl<'a, K, V, H, C> IntoIterator for &'a UnorderedMap<K, V, H, C> {
    type Item = (&'a K, &'a V);
    type IntoIter = UnorderedMapIterator<'a, K, V, H, C>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K: fmt::Debug, V: fmt::Debug, H, C> fmt::Debug for UnorderedMap<K, V, H, C> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_map().entries(self.iter()).finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collections::Murmur3;
    use rstest::rstest;
    use std::cell::Cell;
    use std::rc::Rc;

    fn chain_lengths<K, V, H, C>(map: &UnorderedMap<K, V, H, C>) -> Vec<usize> {
        map.buckets
            .iter()
            .map(|&head| {
                let mut length = 0;
                let mut node = head;
                while node != NIL {
                    length += 1;
                    node = map.entries[node].next;
                }
                length
            })
            .collect()
    }

    #[rstest]
    #[case(769, 576)]
    #[case(1_543, 1_157)]
    #[case(4, 3)]
    #[case(3, 2)]
    #[case(usize::MAX, usize::MAX / 4 * 3 + 2)]
    fn test_rehash_threshold(#[case] buckets: usize, #[case] expected: usize) {
        assert_eq!(rehash_threshold(buckets), expected);
    }

    #[rstest]
    #[case(769, Some(1_543))]
    #[case(800_000, Some(1_572_869))]
    #[case(1_610_612_741, Some(4_831_838_223))]
    #[case(usize::MAX, None)]
    fn test_next_bucket_count(#[case] current: usize, #[case] expected: Option<usize>) {
        assert_eq!(next_bucket_count(current), expected);
    }

    #[rstest]
    fn test_growth_happens_at_threshold() {
        let mut map: UnorderedMap<u32, u32> = UnorderedMap::new();
        for key in 0..576 {
            map.put(key, key);
        }
        assert_eq!(map.bucket_count(), 769);
        map.put(1_000, 0);
        assert_eq!(map.bucket_count(), 1_543);
        assert_eq!(map.len(), 577);
    }

    fn no_next_count(_current: usize) -> Option<usize> {
        None
    }

    fn unreservable_count(_current: usize) -> Option<usize> {
        Some(usize::MAX)
    }

    #[rstest]
    #[case::overflow(no_next_count, CollectionError::CapacityOverflow { current: 769 })]
    #[case::reservation(unreservable_count, CollectionError::AllocationFailed { requested: usize::MAX })]
    fn test_failed_growth_inserts_into_current_buckets(
        #[case] next_buckets: fn(usize) -> Option<usize>,
        #[case] expected: CollectionError,
    ) {
        let mut map: UnorderedMap<u32, u32> = (0..576).map(|key| (key, key * 2)).collect();
        map.next_buckets = next_buckets;
        let buckets_before = map.buckets.clone();

        assert_eq!(map.grow(), Err(expected));
        assert_eq!(map.buckets, buckets_before);
        assert_eq!(map.threshold, 576);

        assert_eq!(map.try_put(576, 1_152), Ok(PutOutcome::Inserted));
        assert_eq!(map.bucket_count(), 769);
        assert_eq!(map.threshold, 576);
        assert_eq!(map.len(), 577);
        for (bucket, (&before, &after)) in buckets_before.iter().zip(&map.buckets).enumerate() {
            if bucket == 576 {
                assert_eq!(map.entries[after].next, before);
            } else {
                assert_eq!(after, before);
            }
        }
        for key in 0..=576 {
            assert_eq!(map.get(&key), Some(&(key * 2)));
        }

        map.next_buckets = next_bucket_count;
        map.put(577, 0);
        assert_eq!(map.bucket_count(), 1_543);
        assert_eq!(map.len(), 578);
    }

    #[rstest]
    fn test_replacement_does_not_grow() {
        let mut map: UnorderedMap<u32, u32> = (0..576).map(|key| (key, key)).collect();
        assert_eq!(map.try_put(0, 1), Ok(PutOutcome::Replaced));
        assert_eq!(map.bucket_count(), 769);
    }

    #[rstest]
    fn test_growth_relinks_without_moving_entries() {
        let mut map: UnorderedMap<u32, u32> = (0..576).map(|key| (key, key * 3)).collect();
        let slab_before = map.entries.len();
        map.put(576, 0);
        assert_eq!(map.entries.len(), slab_before + 1);
        assert_eq!(chain_lengths(&map).iter().sum::<usize>(), 577);
        for key in 0..576 {
            assert_eq!(map.get(&key), Some(&(key * 3)));
        }
    }

    #[rstest]
    fn test_new_entries_go_to_chain_head() {
        let mut map: UnorderedMap<u32, &str> = UnorderedMap::new();
        map.put(5, "first");
        map.put(5 + 769, "second");
        map.first();
        assert_eq!(map.next().map(|pair| pair.value), Some("second"));
        assert_eq!(map.next().map(|pair| pair.value), Some("first"));
        assert!(map.next().is_none());
    }

    #[rstest]
    fn test_remove_from_middle_of_chain() {
        let mut map: UnorderedMap<u32, u32> = UnorderedMap::new();
        for key in [3, 3 + 769, 3 + 2 * 769] {
            map.put(key, key);
        }
        assert_eq!(chain_lengths(&map)[3], 3);
        assert!(map.remove(&(3 + 769)));
        assert_eq!(chain_lengths(&map)[3], 2);
        assert!(map.contain(&3));
        assert!(map.contain(&(3 + 2 * 769)));
        assert!(!map.contain(&(3 + 769)));
    }

    #[rstest]
    fn test_vacant_slots_are_reused() {
        let mut map: UnorderedMap<u32, u32> = (0..10).map(|key| (key, key)).collect();
        assert!(map.remove(&4));
        assert!(map.remove(&8));
        map.put(40, 40);
        map.put(80, 80);
        assert_eq!(map.entries.len(), 10);
    }

    #[rstest]
    fn test_set_hasher_redistributes_in_place() {
        let mut map = UnorderedMap::with_hasher((|key: &u32| *key) as fn(&u32) -> u32);
        for key in 0..100_u32 {
            map.put(key, key);
        }
        map.set_hasher(|_: &u32| 0);
        assert_eq!(chain_lengths(&map)[0], 100);
        assert_eq!(map.bucket_count(), 769);
        for key in 0..100 {
            assert_eq!(map.get(&key), Some(&key));
        }
    }

    #[rstest]
    fn test_set_comparator_only_on_empty_map() {
        let mut map: UnorderedMap<u32, ()> = UnorderedMap::new();
        assert!(map.set_comparator(NaturalOrder).is_ok());
        map.put(1, ());
        assert_eq!(
            map.set_comparator(NaturalOrder),
            Err(CollectionError::ComparatorOnPopulatedMap { len: 1 })
        );
    }

    #[rstest]
    fn test_cursor_is_exhausted_by_growth() {
        let mut map: UnorderedMap<u32, u32> = (0..576).map(|key| (key, key)).collect();
        map.first();
        assert!(map.next().is_some());
        map.put(576, 576);
        assert!(map.next().is_none());
    }

    #[rstest]
    fn test_cursor_survives_replacement() {
        let mut map: UnorderedMap<u32, u32> = (0..3).map(|key| (key, key)).collect();
        map.first();
        assert_eq!(map.next().map(|pair| pair.key), Some(0));
        map.put(2, 20);
        assert_eq!(map.next().map(|pair| pair.key), Some(1));
        assert_eq!(map.next().map(|pair| pair.value), Some(20));
    }

    #[rstest]
    fn test_empty_map_cursor() {
        let mut map: UnorderedMap<u32, u32> = UnorderedMap::new();
        map.first();
        assert!(map.next().is_none());
        assert_eq!(map.iter().count(), 0);
    }

    #[rstest]
    fn test_string_keys_with_murmur() {
        let mut map = UnorderedMap::with_hasher(Murmur3);
        for word in ["alpha", "beta", "gamma"] {
            map.put(word.to_string(), word.len());
        }
        assert_eq!(map.get("gamma"), Some(&5));
        assert_eq!(map.get_mut("beta").map(|value| std::mem::replace(value, 0)), Some(4));
        assert_eq!(map.get("beta"), Some(&0));
    }

    #[rstest]
    fn test_drop_releases_remaining_entries() {
        let released = Rc::new(Cell::new(0));
        let counter = Rc::clone(&released);
        let mut map: UnorderedMap<u32, String> = UnorderedMap::new();
        map.set_clean_value(move |_value: String| counter.set(counter.get() + 1));
        for key in 0..20 {
            map.put(key, key.to_string());
        }
        map.remove(&0);
        assert_eq!(released.get(), 1);
        drop(map);
        assert_eq!(released.get(), 20);
    }

    #[rstest]
    fn test_debug_format() {
        let map: UnorderedMap<u32, &str> = [(1, "one")].into_iter().collect();
        assert_eq!(format!("{map:?}"), r#"{1: "one"}"#);
    }
}
