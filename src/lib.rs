//! # tessera
//!
//! Embeddable data-structure primitives with caller-supplied ordering,
//! hashing and cleanup strategies.
//!
//! ## Overview
//!
//! - **Ordered map**: a red-black tree kept in a node arena with a sentinel
//!   node standing in for every missing link
//! - **Unordered map**: a separate-chaining hash table with prime-sized
//!   bucket arrays and incremental growth
//! - **Block deque**: a double-ended queue stored in fixed-size blocks
//! - **Text**: a borrowed string view with scanning helpers and a string
//!   builder
//!
//! Both maps carry an embedded single-cursor iterator (`first` / `next`)
//! as well as ordinary borrowing iterators.
//!
//! ## Feature Flags
//!
//! - `collections`: maps, deque and hash functions
//! - `text`: string view and string builder
//! - `fxhash`: `FxHash` adapter backed by `rustc-hash`
//! - `ahash`: `AHash` adapter backed by `ahash`
//! - `full`: Enable all features
//!
//! ## Example
//!
//! ```rust
//! use tessera::prelude::*;
//!
//! let mut map = OrderedMap::new();
//! map.put(3, "three");
//! map.put(1, "one");
//! map.put(2, "two");
//!
//! assert_eq!(map.minimum().map(|pair| pair.key), Some(1));
//! assert_eq!(map.successor(&2).map(|pair| pair.value), Some("three"));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_closure_for_method_calls)]

/// Prelude module for convenient imports.
///
/// Re-exports commonly used types and traits.
///
/// # Usage
///
/// ```rust
/// use tessera::prelude::*;
/// ```
pub mod prelude {

    #[cfg(feature = "collections")]
    pub use crate::collections::*;

    #[cfg(feature = "text")]
    pub use crate::text::*;

    pub use crate::error::CollectionError;
}

pub mod error;

#[cfg(feature = "collections")]
pub mod collections;

#[cfg(feature = "text")]
pub mod text;

pub use error::CollectionError;
