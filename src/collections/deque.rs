//! Double-ended queue stored in fixed-size blocks.
//!
//! [`BlockDeque`] keeps its elements in a ring of equally sized blocks.
//! Pushing at either end fills the current end block and allocates a new
//! one only when that block is full, so existing elements never move
//! during a push. Blocks that no longer hold live elements are released
//! right away.
//!
//! # Examples
//!
//! ```rust
//! use tessera::collections::BlockDeque;
//!
//! let mut deque: BlockDeque<i32> = (1..=3).collect();
//! deque.push_front(0);
//! deque.insert(2, 10).unwrap();
//!
//! assert_eq!(deque.iter().copied().collect::<Vec<_>>(), vec![0, 1, 10, 2, 3]);
//! assert_eq!(deque.erase(0), Ok(0));
//! assert_eq!(deque[1], 10);
//! ```

use std::cmp::Ordering;
use std::collections::VecDeque;
use std::collections::vec_deque;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::{Flatten, FromIterator, FusedIterator};
use std::ops::{Index, IndexMut};

use crate::error::CollectionError;

/// Slots per block when none is given.
pub const DEFAULT_BLOCK_SIZE: usize = 64;

type Block<T> = Vec<Option<T>>;

/// A double-ended queue made of fixed-size blocks.
///
/// The front element lives at offset `head` of the first block; element
/// `i` lives at offset `head + i` counted across blocks. Slots outside the
/// live range are always `None`.
///
/// # Time Complexity
///
/// | Operation              | Complexity |
/// |------------------------|------------|
/// | `push_*` / `pop_*`     | O(1) amortized |
/// | `get` / `at` / index   | O(1)       |
/// | `insert` / `erase`     | O(min(i, N - i)) |
/// | `resize` / `assign`    | O(N)       |
pub struct BlockDeque<T> {
    blocks: VecDeque<Block<T>>,
    block_size: usize,
    head: usize,
    length: usize,
}

impl<T> BlockDeque<T> {
    /// Creates an empty deque with blocks of [`DEFAULT_BLOCK_SIZE`] slots.
    ///
    /// No block is allocated until the first push.
    #[must_use]
    pub fn new() -> Self {
        Self::with_block_size(DEFAULT_BLOCK_SIZE)
    }

    /// Creates an empty deque with blocks of `block_size` slots.
    ///
    /// A block size of zero is treated as one.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tessera::collections::BlockDeque;
    ///
    /// let mut deque = BlockDeque::with_block_size(4);
    /// deque.extend(0..9);
    /// assert_eq!(deque.block_size(), 4);
    /// assert!(deque.block_count() >= 3);
    /// ```
    #[must_use]
    pub fn with_block_size(block_size: usize) -> Self {
        let block_size = block_size.max(1);
        Self {
            blocks: VecDeque::new(),
            block_size,
            head: block_size / 2,
            length: 0,
        }
    }

    /// Returns the number of elements.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.length
    }

    /// Returns `true` if the deque holds no elements.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Returns the number of slots per block.
    #[inline]
    #[must_use]
    pub const fn block_size(&self) -> usize {
        self.block_size
    }

    /// Returns the number of blocks currently allocated.
    #[inline]
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    // -------------------------------------------------------------------------
    // End operations
    // -------------------------------------------------------------------------

    /// Prepends an element.
    pub fn push_front(&mut self, item: T) {
        if self.length == 0 && !self.blocks.is_empty() {
            self.head = self.block_size;
        }
        if self.head == 0 {
            self.allocate_front();
            self.head = self.block_size;
        }
        if self.blocks.is_empty() {
            self.allocate_back();
        }
        self.head -= 1;
        self.length += 1;
        *self.slot_mut(0) = Some(item);
    }

    /// Appends an element.
    pub fn push_back(&mut self, item: T) {
        let offset = self.head + self.length;
        if offset / self.block_size == self.blocks.len() {
            self.allocate_back();
        }
        self.length += 1;
        *self.slot_mut(self.length - 1) = Some(item);
    }

    /// Removes and returns the first element.
    pub fn pop_front(&mut self) -> Option<T> {
        if self.length == 0 {
            return None;
        }
        let item = self.slot_mut(0).take();
        self.head += 1;
        self.length -= 1;
        self.release_unused();
        item
    }

    /// Removes and returns the last element.
    pub fn pop_back(&mut self) -> Option<T> {
        if self.length == 0 {
            return None;
        }
        let item = self.slot_mut(self.length - 1).take();
        self.length -= 1;
        self.release_unused();
        item
    }

    /// Returns the first element.
    #[must_use]
    pub fn front(&self) -> Option<&T> {
        self.get(0)
    }

    /// Returns the last element.
    #[must_use]
    pub fn back(&self) -> Option<&T> {
        self.length.checked_sub(1).and_then(|index| self.get(index))
    }

    // -------------------------------------------------------------------------
    // Positional access
    // -------------------------------------------------------------------------

    /// Returns the element at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.length {
            return None;
        }
        let offset = self.head + index;
        self.blocks[offset / self.block_size][offset % self.block_size].as_ref()
    }

    /// Returns a mutable reference to the element at `index`.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        if index >= self.length {
            return None;
        }
        self.slot_mut(index).as_mut()
    }

    /// Returns the element at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::IndexOutOfBounds`] when `index >= len`.
    pub fn at(&self, index: usize) -> Result<&T, CollectionError> {
        self.get(index).ok_or(CollectionError::IndexOutOfBounds {
            index,
            len: self.length,
        })
    }

    /// Inserts `item` so that it ends up at `index`, shifting the shorter
    /// side of the deque by one.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::IndexOutOfBounds`] when `index > len`;
    /// `item` is dropped in that case.
    pub fn insert(&mut self, index: usize, item: T) -> Result<(), CollectionError> {
        if index > self.length {
            return Err(CollectionError::IndexOutOfBounds {
                index,
                len: self.length,
            });
        }
        if index < self.length / 2 {
            self.push_front(item);
            for position in 0..index {
                self.swap_slots(position, position + 1);
            }
        } else {
            self.push_back(item);
            for position in (index..self.length - 1).rev() {
                self.swap_slots(position, position + 1);
            }
        }
        Ok(())
    }

    /// Removes and returns the element at `index`, shifting the shorter
    /// side of the deque by one.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::IndexOutOfBounds`] when `index >= len`.
    pub fn erase(&mut self, index: usize) -> Result<T, CollectionError> {
        let len = self.length;
        if index >= len {
            return Err(CollectionError::IndexOutOfBounds { index, len });
        }
        let removed = if index < len / 2 {
            for position in (0..index).rev() {
                self.swap_slots(position, position + 1);
            }
            self.pop_front()
        } else {
            for position in index..len - 1 {
                self.swap_slots(position, position + 1);
            }
            self.pop_back()
        };
        removed.ok_or_else(|| CollectionError::IndexOutOfBounds { index, len })
    }

    // -------------------------------------------------------------------------
    // Bulk operations
    // -------------------------------------------------------------------------

    /// Grows or shrinks the deque at the back to `new_len` elements,
    /// filling with values produced by `fill`.
    pub fn resize_with<F>(&mut self, new_len: usize, mut fill: F)
    where
        F: FnMut() -> T,
    {
        while self.length > new_len {
            self.pop_back();
        }
        while self.length < new_len {
            self.push_back(fill());
        }
    }

    /// Exchanges the contents of two deques, block sizes included.
    pub const fn swap(&mut self, other: &mut Self) {
        std::mem::swap(self, other);
    }

    /// Releases every block that holds no live element.
    pub fn shrink_to_fit(&mut self) {
        if self.length == 0 {
            let released = self.blocks.len();
            self.blocks.clear();
            if released > 0 {
                tracing::trace!(released, "released idle deque blocks");
            }
        }
        self.release_unused();
        self.blocks.shrink_to_fit();
    }

    /// Removes every element, keeping at most one block.
    pub fn clear(&mut self) {
        self.blocks.truncate(1);
        if let Some(block) = self.blocks.front_mut() {
            block.iter_mut().for_each(|slot| *slot = None);
        }
        self.length = 0;
        self.head = self.block_size / 2;
    }

    /// Returns a front-to-back iterator.
    pub fn iter(&self) -> BlockDequeIterator<'_, T> {
        BlockDequeIterator {
            slots: self.blocks.iter().flatten(),
            remaining: self.length,
        }
    }

    /// Returns a front-to-back iterator that allows modifying each element.
    pub fn iter_mut(&mut self) -> BlockDequeIteratorMut<'_, T> {
        BlockDequeIteratorMut {
            slots: self.blocks.iter_mut().flatten(),
            remaining: self.length,
        }
    }

    // -------------------------------------------------------------------------
    // Block management
    // -------------------------------------------------------------------------

    fn new_block(&self) -> Block<T> {
        let mut block = Vec::with_capacity(self.block_size);
        block.resize_with(self.block_size, || None);
        block
    }

    fn allocate_front(&mut self) {
        let block = self.new_block();
        self.blocks.push_front(block);
        tracing::trace!(blocks = self.blocks.len(), "allocated deque block at front");
    }

    fn allocate_back(&mut self) {
        let block = self.new_block();
        self.blocks.push_back(block);
        tracing::trace!(blocks = self.blocks.len(), "allocated deque block at back");
    }

    /// Drops blocks outside the live range. An empty deque keeps at most
    /// one block and recenters on it.
    fn release_unused(&mut self) {
        if self.length == 0 {
            self.blocks.truncate(1);
            self.head = self.block_size / 2;
            return;
        }
        while self.head >= self.block_size {
            self.blocks.pop_front();
            self.head -= self.block_size;
            tracing::trace!(blocks = self.blocks.len(), "released deque block at front");
        }
        let needed = (self.head + self.length).div_ceil(self.block_size);
        while self.blocks.len() > needed {
            self.blocks.pop_back();
            tracing::trace!(blocks = self.blocks.len(), "released deque block at back");
        }
    }

    fn slot_mut(&mut self, index: usize) -> &mut Option<T> {
        let offset = self.head + index;
        &mut self.blocks[offset / self.block_size][offset % self.block_size]
    }

    fn swap_slots(&mut self, first: usize, second: usize) {
        let first_item = self.slot_mut(first).take();
        let second_item = self.slot_mut(second).take();
        *self.slot_mut(first) = second_item;
        *self.slot_mut(second) = first_item;
    }
}

impl<T: Clone> BlockDeque<T> {
    /// Grows or shrinks the deque at the back to `new_len` elements,
    /// filling with clones of `value`.
    pub fn resize(&mut self, new_len: usize, value: T) {
        self.resize_with(new_len, || value.clone());
    }

    /// Replaces the contents with `count` clones of `value`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tessera::collections::BlockDeque;
    ///
    /// let mut deque: BlockDeque<char> = "abc".chars().collect();
    /// deque.assign(2, 'z');
    /// assert_eq!(deque.iter().collect::<String>(), "zz");
    /// ```
    pub fn assign(&mut self, count: usize, value: T) {
        self.clear();
        self.resize(count, value);
    }
}

// =============================================================================
// Iterator Implementation
// =============================================================================

/// A front-to-back iterator over a [`BlockDeque`].
pub struct BlockDequeIterator<'a, T> {
    slots: Flatten<vec_deque::Iter<'a, Block<T>>>,
    remaining: usize,
}

impl<'a, T> Iterator for BlockDequeIterator<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let item = self.slots.by_ref().find_map(Option::as_ref)?;
        self.remaining -= 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> DoubleEndedIterator for BlockDequeIterator<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let item = self.slots.by_ref().rev().find_map(Option::as_ref)?;
        self.remaining -= 1;
        Some(item)
    }
}

impl<T> ExactSizeIterator for BlockDequeIterator<'_, T> {}

impl<T> FusedIterator for BlockDequeIterator<'_, T> {}

/// A front-to-back iterator over mutable references into a [`BlockDeque`].
pub struct BlockDequeIteratorMut<'a, T> {
    slots: Flatten<vec_deque::IterMut<'a, Block<T>>>,
    remaining: usize,
}

impl<'a, T> Iterator for BlockDequeIteratorMut<'a, T> {
    type Item = &'a mut T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let item = self.slots.by_ref().find_map(Option::as_mut)?;
        self.remaining -= 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> DoubleEndedIterator for BlockDequeIteratorMut<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let item = self.slots.by_ref().rev().find_map(Option::as_mut)?;
        self.remaining -= 1;
        Some(item)
    }
}

impl<T> ExactSizeIterator for BlockDequeIteratorMut<'_, T> {}

impl<T> FusedIterator for BlockDequeIteratorMut<'_, T> {}

/// An owning front-to-back iterator over a [`BlockDeque`].
pub struct BlockDequeIntoIterator<T> {
    deque: BlockDeque<T>,
}

impl<T> Iterator for BlockDequeIntoIterator<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.deque.pop_front()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.deque.len(), Some(self.deque.len()))
    }
}

impl<T> DoubleEndedIterator for BlockDequeIntoIterator<T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.deque.pop_back()
    }
}

impl<T> ExactSizeIterator for BlockDequeIntoIterator<T> {}

impl<T> FusedIterator for BlockDequeIntoIterator<T> {}

// =============================================================================
// Standard Trait Implementations
// =============================================================================

impl<T> Default for BlockDeque<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Clone for BlockDeque<T> {
    fn clone(&self) -> Self {
        let mut cloned = Self::with_block_size(self.block_size);
        cloned.extend(self.iter().cloned());
        cloned
    }
}

impl<T> FromIterator<T> for BlockDeque<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut deque = Self::new();
        deque.extend(iter);
        deque
    }
}

impl<T> Extend<T> for BlockDeque<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            self.push_back(item);
        }
    }
}

impl<T> IntoIterator for BlockDeque<T> {
    type Item = T;
    type IntoIter = BlockDequeIntoIterator<T>;

    fn into_iter(self) -> Self::IntoIter {
        BlockDequeIntoIterator { deque: self }
    }
}

impl<'a, T> IntoIterator for &'a BlockDeque<T> {
    type Item = &'a T;
    type IntoIter = BlockDequeIterator<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T> IntoIterator for &'a mut BlockDeque<T> {
    type Item = &'a mut T;
    type IntoIter = BlockDequeIteratorMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<T> Index<usize> for BlockDeque<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        let len = self.length;
        self.get(index)
            .unwrap_or_else(|| panic!("index {index} is out of bounds for length {len}"))
    }
}

impl<T> IndexMut<usize> for BlockDeque<T> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        let len = self.length;
        self.get_mut(index)
            .unwrap_or_else(|| panic!("index {index} is out of bounds for length {len}"))
    }
}

impl<T: PartialEq> PartialEq for BlockDeque<T> {
    fn eq(&self, other: &Self) -> bool {
        self.length == other.length && self.iter().eq(other.iter())
    }
}

impl<T: Eq> Eq for BlockDeque<T> {}

impl<T: PartialOrd> PartialOrd for BlockDeque<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.iter().partial_cmp(other.iter())
    }
}

impl<T: Ord> Ord for BlockDeque<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.iter().cmp(other.iter())
    }
}

impl<T: Hash> Hash for BlockDeque<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.length.hash(state);
        for item in self {
            item.hash(state);
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for BlockDeque<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_list().entries(self.iter()).finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    fn test_new_allocates_lazily() {
        let deque: BlockDeque<u8> = BlockDeque::new();
        assert_eq!(deque.block_count(), 0);
        assert_eq!(deque.head, DEFAULT_BLOCK_SIZE / 2);
    }

    #[rstest]
    fn test_front_pushes_start_mid_block() {
        let mut deque = BlockDeque::with_block_size(8);
        for item in 0..4 {
            deque.push_front(item);
        }
        assert_eq!(deque.block_count(), 1);
        deque.push_front(4);
        assert_eq!(deque.block_count(), 2);
        assert_eq!(deque.iter().copied().collect::<Vec<_>>(), vec![4, 3, 2, 1, 0]);
    }

    #[rstest]
    #[case::single_slot_blocks(1)]
    #[case::small_blocks(3)]
    #[case::default_blocks(DEFAULT_BLOCK_SIZE)]
    fn test_blocks_are_released_when_drained(#[case] block_size: usize) {
        let mut deque = BlockDeque::with_block_size(block_size);
        for item in 0..100 {
            deque.push_back(item);
            deque.push_front(item);
        }
        let expected_blocks = (deque.head + deque.len()).div_ceil(block_size);
        assert_eq!(deque.block_count(), expected_blocks);

        while deque.len() > 1 {
            deque.pop_front();
            deque.pop_back();
            assert!(deque.block_count() <= deque.len().div_ceil(block_size) + 1);
        }
        deque.pop_back();
        assert!(deque.block_count() <= 1);
        deque.shrink_to_fit();
        assert_eq!(deque.block_count(), 0);
    }

    #[rstest]
    #[case::single_slot_blocks(1)]
    #[case::small_blocks(4)]
    fn test_push_front_after_draining_reuses_block(#[case] block_size: usize) {
        let mut deque = BlockDeque::with_block_size(block_size);
        deque.push_back(1);
        assert_eq!(deque.pop_back(), Some(1));
        assert_eq!(deque.block_count(), 1);
        deque.push_front(2);
        assert_eq!(deque.block_count(), 1);
        assert_eq!(deque.front(), Some(&2));
        assert_eq!(deque.back(), Some(&2));
        assert_eq!(deque.pop_front(), Some(2));
        assert_eq!(deque.block_count(), 1);
    }

    #[rstest]
    fn test_erase_every_position() {
        for index in 0..7 {
            let mut deque: BlockDeque<usize> = BlockDeque::with_block_size(3);
            deque.extend(0..7);
            assert_eq!(deque.erase(index), Ok(index));
            let expected: Vec<usize> = (0..7).filter(|item| *item != index).collect();
            assert_eq!(deque.iter().copied().collect::<Vec<_>>(), expected);
        }
    }

    #[rstest]
    fn test_insert_and_erase_both_halves() {
        let mut deque: BlockDeque<i32> = BlockDeque::with_block_size(2);
        deque.extend(0..10);
        deque.insert(1, 100).unwrap();
        deque.insert(9, 900).unwrap();
        deque.insert(deque.len(), 1_000).unwrap();
        assert_eq!(
            deque.iter().copied().collect::<Vec<_>>(),
            vec![0, 100, 1, 2, 3, 4, 5, 6, 7, 900, 8, 9, 1_000]
        );
        assert_eq!(deque.erase(1), Ok(100));
        assert_eq!(deque.erase(8), Ok(900));
        assert_eq!(deque.erase(10), Ok(1_000));
        assert_eq!(deque.iter().copied().collect::<Vec<_>>(), (0..10).collect::<Vec<_>>());
    }

    #[rstest]
    fn test_out_of_bounds_positions() {
        let mut deque: BlockDeque<i32> = (0..3).collect();
        assert_eq!(
            deque.insert(4, 0),
            Err(CollectionError::IndexOutOfBounds { index: 4, len: 3 })
        );
        assert_eq!(
            deque.erase(3),
            Err(CollectionError::IndexOutOfBounds { index: 3, len: 3 })
        );
        assert_eq!(
            deque.at(7),
            Err(CollectionError::IndexOutOfBounds { index: 7, len: 3 })
        );
        assert_eq!(deque.len(), 3);
    }

    #[rstest]
    #[should_panic(expected = "index 5 is out of bounds for length 2")]
    fn test_index_panics_past_end() {
        let deque: BlockDeque<i32> = (0..2).collect();
        let _ = deque[5];
    }

    #[rstest]
    fn test_clear_keeps_one_block() {
        let mut deque: BlockDeque<String> = BlockDeque::with_block_size(4);
        deque.extend((0..20).map(|item| item.to_string()));
        deque.clear();
        assert!(deque.is_empty());
        assert_eq!(deque.block_count(), 1);
        deque.push_back("again".to_string());
        assert_eq!(deque.front().map(String::as_str), Some("again"));
    }

    proptest! {
        #[test]
        fn prop_matches_vec_deque(
            block_size in 1_usize..9,
            operations in prop::collection::vec((0_u8..6, any::<i32>(), any::<usize>()), 0..200)
        ) {
            let mut deque = BlockDeque::with_block_size(block_size);
            let mut model = VecDeque::new();

            for (kind, value, position) in operations {
                match kind {
                    0 => { deque.push_back(value); model.push_back(value); }
                    1 => { deque.push_front(value); model.push_front(value); }
                    2 => { prop_assert_eq!(deque.pop_back(), model.pop_back()); }
                    3 => { prop_assert_eq!(deque.pop_front(), model.pop_front()); }
                    4 => {
                        let index = position % (model.len() + 1);
                        prop_assert!(deque.insert(index, value).is_ok());
                        model.insert(index, value);
                    }
                    _ => {
                        if !model.is_empty() {
                            let index = position % model.len();
                            prop_assert_eq!(deque.erase(index).ok(), model.remove(index));
                        }
                    }
                }
                prop_assert_eq!(deque.len(), model.len());
                let needed = (deque.head + deque.len()).div_ceil(block_size).max(1);
                prop_assert!(deque.block_count() <= needed);
            }

            prop_assert!(deque.iter().eq(model.iter()));
            prop_assert!(deque.iter().rev().eq(model.iter().rev()));
        }
    }
}
