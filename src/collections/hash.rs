//! Hashing strategies for [`UnorderedMap`](super::UnorderedMap).
//!
//! A [`KeyHasher`] turns a key into a 32-bit hash; the map reduces it
//! modulo its bucket count. Four strategies are provided:
//!
//! - [`IdentityHash`]: the key's integer value, the default
//! - [`Murmur3`]: `MurmurHash3` (32-bit) over the key's bytes
//! - [`Djb2`]: Bernstein's `hash * 33 + byte` string hash
//! - [`StdHash`]: any [`BuildHasher`], folded down to 32 bits
//!
//! Closures of type `Fn(&K) -> u32` are hashers as well.
//!
//! # Examples
//!
//! ```rust
//! use tessera::collections::{Djb2, KeyHasher, Murmur3, djb2, murmur3_32};
//!
//! assert_eq!(djb2(b"abc"), 193_485_963);
//! assert_eq!(Djb2.hash("abc"), djb2(b"abc"));
//! assert_eq!(Murmur3.hash("abc"), murmur3_32(b"abc"));
//! ```

use std::hash::{BuildHasher, Hash};

// =============================================================================
// Hash Functions
// =============================================================================

const MURMUR_SEED: u32 = 0xdead_beef;
const MURMUR_C1: u32 = 0xcc9e_2d51;
const MURMUR_C2: u32 = 0x1b87_3593;
const MURMUR_R1: u32 = 15;
const MURMUR_R2: u32 = 13;
const MURMUR_M: u32 = 5;
const MURMUR_N: u32 = 0xe654_6b64;

const DJB2_SEED: u32 = 5381;

#[inline]
const fn murmur_scramble(block: u32) -> u32 {
    block
        .wrapping_mul(MURMUR_C1)
        .rotate_left(MURMUR_R1)
        .wrapping_mul(MURMUR_C2)
}

/// `MurmurHash3` 32-bit variant over an arbitrary byte span.
///
/// Blocks are read little-endian and the seed is `0xdeadbeef`. An empty
/// span hashes to `0`.
///
/// # Examples
///
/// ```rust
/// use tessera::collections::murmur3_32;
///
/// assert_eq!(murmur3_32(b""), 0);
/// assert_eq!(murmur3_32(b"hello"), 0xb774_8c4e);
/// ```
#[must_use]
pub fn murmur3_32(bytes: &[u8]) -> u32 {
    if bytes.is_empty() {
        return 0;
    }

    let mut blocks = bytes.chunks_exact(4);
    let mut hash = MURMUR_SEED;
    for block in blocks.by_ref() {
        let block = u32::from_le_bytes([block[0], block[1], block[2], block[3]]);
        hash ^= murmur_scramble(block);
        hash = hash
            .rotate_left(MURMUR_R2)
            .wrapping_mul(MURMUR_M)
            .wrapping_add(MURMUR_N);
    }

    let tail = blocks.remainder();
    if !tail.is_empty() {
        let remaining = tail
            .iter()
            .rev()
            .fold(0_u32, |accumulator, &byte| (accumulator << 8) | u32::from(byte));
        hash ^= murmur_scramble(remaining);
    }

    // Only the low 32 bits of the length take part, as in the reference.
    #[allow(clippy::cast_possible_truncation)]
    let length = bytes.len() as u32;
    hash ^= length;
    hash ^= hash >> 16;
    hash = hash.wrapping_mul(0x85eb_ca6b);
    hash ^= hash >> 13;
    hash = hash.wrapping_mul(0xc2b2_ae35);
    hash ^ (hash >> 16)
}

/// The djb2 string hash: `hash = hash * 33 + byte`, starting from 5381.
///
/// Bytes are treated as unsigned.
///
/// # Examples
///
/// ```rust
/// use tessera::collections::djb2;
///
/// assert_eq!(djb2(b""), 5381);
/// assert_eq!(djb2(b"a"), 177_670);
/// ```
#[must_use]
pub fn djb2(bytes: &[u8]) -> u32 {
    bytes.iter().fold(DJB2_SEED, |hash, &byte| {
        (hash << 5).wrapping_add(hash).wrapping_add(u32::from(byte))
    })
}

// =============================================================================
// KeyHasher
// =============================================================================

/// Computes the hash of a key.
///
/// Keys that compare equal under the map's comparator must produce the
/// same hash.
pub trait KeyHasher<K: ?Sized> {
    /// Returns the 32-bit hash of `key`.
    fn hash(&self, key: &K) -> u32;
}

impl<K: ?Sized, F> KeyHasher<K> for F
where
    F: Fn(&K) -> u32,
{
    #[inline]
    fn hash(&self, key: &K) -> u32 {
        self(key)
    }
}

/// Keys whose hash is their own integer value.
///
/// Implemented for the primitive integers, `char` and `bool`. Wider
/// integers are truncated to their low 32 bits and signed integers are
/// reinterpreted, so `-1_i32` hashes to `u32::MAX`.
pub trait IdentityKey {
    /// The key reinterpreted as an unsigned 32-bit integer.
    fn identity(&self) -> u32;
}

macro_rules! impl_identity_key {
    ($($key:ty),* $(,)?) => {
        $(
            impl IdentityKey for $key {
                #[inline]
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_lossless
                )]
                fn identity(&self) -> u32 {
                    *self as u32
                }
            }
        )*
    };
}

impl_identity_key!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, char);

impl IdentityKey for bool {
    #[inline]
    fn identity(&self) -> u32 {
        u32::from(*self)
    }
}

impl<T: IdentityKey + ?Sized> IdentityKey for &T {
    #[inline]
    fn identity(&self) -> u32 {
        (**self).identity()
    }
}

/// Hashes an integer-like key to its own value.
///
/// This is the default hasher of [`UnorderedMap`](super::UnorderedMap). It
/// is only a good choice when keys are small integers or otherwise already
/// well distributed; strings and structs need [`Murmur3`], [`Djb2`] or
/// [`StdHash`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IdentityHash;

impl<K: IdentityKey + ?Sized> KeyHasher<K> for IdentityHash {
    #[inline]
    fn hash(&self, key: &K) -> u32 {
        key.identity()
    }
}

/// [`murmur3_32`] over the key's bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Murmur3;

impl<K: AsRef<[u8]> + ?Sized> KeyHasher<K> for Murmur3 {
    #[inline]
    fn hash(&self, key: &K) -> u32 {
        murmur3_32(key.as_ref())
    }
}

/// [`djb2`] over the key's bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Djb2;

impl<K: AsRef<[u8]> + ?Sized> KeyHasher<K> for Djb2 {
    #[inline]
    fn hash(&self, key: &K) -> u32 {
        djb2(key.as_ref())
    }
}

/// Adapts a standard [`BuildHasher`] to [`KeyHasher`].
///
/// The 64-bit output is folded to 32 bits by xoring its halves.
///
/// # Examples
///
/// ```rust
/// use std::collections::hash_map::RandomState;
/// use tessera::collections::{StdHash, UnorderedMap};
///
/// let mut map = UnorderedMap::with_hasher(StdHash(RandomState::new()));
/// map.put("key".to_string(), 1);
/// assert_eq!(map.get("key"), Some(&1));
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct StdHash<S>(pub S);

impl<K: Hash + ?Sized, S: BuildHasher> KeyHasher<K> for StdHash<S> {
    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    fn hash(&self, key: &K) -> u32 {
        let hash = self.0.hash_one(key);
        (hash ^ (hash >> 32)) as u32
    }
}

/// [`StdHash`] backed by `rustc-hash`'s Fx algorithm.
#[cfg(feature = "fxhash")]
pub type FxHash = StdHash<rustc_hash::FxBuildHasher>;

/// [`StdHash`] backed by `ahash`, randomly keyed per map.
#[cfg(feature = "ahash")]
pub type AHash = StdHash<ahash::RandomState>;

// =============================================================================
// Tests
// =============================================================================
