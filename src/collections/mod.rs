//! Mutable in-memory containers.
//!
//! This module provides single-threaded containers that own their storage
//! and hand every key and value that leaves them to optional cleanup hooks:
//!
//! - [`OrderedMap`]: Ordered map (Red-Black Tree)
//! - [`UnorderedMap`]: Hash map (separate chaining, prime bucket counts)
//! - [`BlockDeque`]: Double-ended queue stored in fixed-size blocks
//!
//! Ordering and hashing are pluggable through [`KeyComparator`] and
//! [`KeyHasher`]; closures work for both.
//!
//! # Examples
//!
//! ## `OrderedMap`
//!
//! ```rust
//! use tessera::collections::OrderedMap;
//!
//! let mut map = OrderedMap::new();
//! for (key, value) in [(5, "five"), (1, "one"), (3, "three")] {
//!     map.put(key, value);
//! }
//! assert_eq!(map.minimum().map(|pair| pair.value), Some("one"));
//! assert_eq!(map.predecessor(&5).map(|pair| pair.key), Some(3));
//! ```
//!
//! ## `UnorderedMap`
//!
//! ```rust
//! use tessera::collections::UnorderedMap;
//!
//! let mut map = UnorderedMap::new();
//! for key in 0..1_000_u32 {
//!     map.put(key, key * 2);
//! }
//! assert!(map.bucket_count() > 769);
//! assert_eq!(map.get(&999), Some(&1_998));
//! ```
//!
//! ## `BlockDeque`
//!
//! ```rust
//! use tessera::collections::BlockDeque;
//!
//! let mut deque = BlockDeque::new();
//! deque.push_back(2);
//! deque.push_front(1);
//! assert_eq!(deque.front(), Some(&1));
//! assert_eq!(deque.pop_back(), Some(2));
//! ```
//!
//! ## Cleanup hooks
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use tessera::collections::OrderedMap;
//!
//! let released = Rc::new(RefCell::new(Vec::new()));
//! let log = Rc::clone(&released);
//!
//! let mut map = OrderedMap::new();
//! map.set_clean_value(move |value: String| log.borrow_mut().push(value));
//! map.put(1, "old".to_string());
//! map.put(1, "new".to_string());
//! assert_eq!(*released.borrow(), vec!["old".to_string()]);
//! ```

mod cleanup;
mod compare;
mod deque;
mod hash;
mod ordered_map;
mod pair;
mod unordered_map;

pub use cleanup::Cleanup;
pub use compare::{KeyComparator, NaturalOrder, ReverseOrder};
pub use deque::{
    BlockDeque, BlockDequeIntoIterator, BlockDequeIterator, BlockDequeIteratorMut, DEFAULT_BLOCK_SIZE,
};
#[cfg(feature = "ahash")]
pub use hash::AHash;
#[cfg(feature = "fxhash")]
pub use hash::FxHash;
pub use hash::{Djb2, IdentityHash, IdentityKey, KeyHasher, Murmur3, StdHash, djb2, murmur3_32};
pub use ordered_map::{OrderedMap, OrderedMapIterator};
pub use pair::Pair;
pub use unordered_map::{UnorderedMap, UnorderedMapIterator};

/// What a successful `try_put` did.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PutOutcome {
    /// The key was new; the map grew by one entry.
    Inserted,
    /// An equal key was present; its pair was replaced and released.
    Replaced,
}
