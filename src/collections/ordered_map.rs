//! Ordered map based on a Red-Black Tree.
//!
//! This module provides [`OrderedMap`], a mutable ordered map whose nodes
//! live in an arena. Slot `0` of the arena is a sentinel node that stands
//! in for every missing child and for the root's parent.
//!
//! # Overview
//!
//! - O(log N) put, get, find, remove
//! - O(log N) minimum/maximum and predecessor/successor
//! - O(1) size
//! - In-order traversal without an auxiliary stack, following parent links
//!
//! The ordering is supplied by a [`KeyComparator`]; the default is the key's
//! own [`Ord`]. Optional cleanup hooks receive every key and value that
//! leaves the map.
//!
//! # Examples
//!
//! ```rust
//! use tessera::collections::OrderedMap;
//!
//! let mut map = OrderedMap::new();
//! map.put("2", 20);
//! map.put("1", 10);
//! map.put("3", 30);
//!
//! assert_eq!(map.minimum().map(|pair| pair.as_tuple()), Some((&"1", &10)));
//! assert_eq!(map.successor(&"2").map(|pair| pair.value), Some(30));
//!
//! // The embedded cursor walks the map in order.
//! map.first();
//! let mut values = Vec::new();
//! while let Some(pair) = map.next() {
//!     values.push(pair.value);
//! }
//! assert_eq!(values, vec![10, 20, 30]);
//! ```
//!
//! # Internal Structure
//!
//! The Red-Black Tree maintains the following invariants:
//! 1. Every node is either red or black
//! 2. The root and the sentinel are black
//! 3. Red nodes have only black children
//! 4. Every path from a node to a descendant sentinel has the same number
//!    of black nodes
//!
//! These invariants ensure the tree height is O(log N).

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::iter::{FromIterator, FusedIterator};

use super::cleanup::CleanupHooks;
use super::compare::{KeyComparator, NaturalOrder};
use super::{Pair, PutOutcome};
use crate::error::CollectionError;

// =============================================================================
// Node Definition
// =============================================================================

/// Arena slot of the sentinel node.
const SENTINEL: usize = 0;

static_assertions::assert_not_impl_any!(OrderedMap<i32, i32>: Send, Sync);

/// The color of a Red-Black Tree node.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Color {
    Red,
    Black,
}

/// A child position, used to express the mirrored fixup cases once.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Side {
    Left,
    Right,
}

impl Side {
    const fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

/// State of the embedded cursor: how the walk arrived at the current node.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Direction {
    DownLeft,
    DownRight,
    UpLeft,
    UpRight,
}

/// Internal node structure for the Red-Black Tree.
///
/// Vacant slots keep `pair == None` and thread the free list through
/// `right`. The sentinel also has no pair.
#[derive(Debug)]
struct Node<K, V> {
    color: Color,
    parent: usize,
    left: usize,
    right: usize,
    pair: Option<Pair<K, V>>,
}

impl<K, V> Node<K, V> {
    const fn sentinel() -> Self {
        Self {
            color: Color::Black,
            parent: SENTINEL,
            left: SENTINEL,
            right: SENTINEL,
            pair: None,
        }
    }

    const fn new_red(pair: Pair<K, V>, parent: usize) -> Self {
        Self {
            color: Color::Red,
            parent,
            left: SENTINEL,
            right: SENTINEL,
            pair: Some(pair),
        }
    }

    const fn child(&self, side: Side) -> usize {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Cursor {
    node: usize,
    direction: Direction,
}

impl Cursor {
    const fn exhausted() -> Self {
        Self {
            node: SENTINEL,
            direction: Direction::DownLeft,
        }
    }
}

// =============================================================================
// OrderedMap Definition
// =============================================================================

/// A mutable ordered map based on a Red-Black Tree.
///
/// Keys are ordered by the comparator `C`, which defaults to
/// [`NaturalOrder`]. Inserting a key that compares equal to a stored one
/// replaces the stored pair; the old key and value are passed to the
/// cleanup hooks, if installed.
///
/// # Time Complexity
///
/// | Operation                   | Complexity |
/// |-----------------------------|------------|
/// | `new`                       | O(1)       |
/// | `put`                       | O(log N)   |
/// | `get` / `find`              | O(log N)   |
/// | `remove`                    | O(log N)   |
/// | `minimum` / `maximum`       | O(log N)   |
/// | `predecessor` / `successor` | O(log N)   |
/// | `next` / `reverse_next`     | O(1) amortized |
/// | `size`                      | O(1)       |
///
/// # Iteration
///
/// The map embeds one cursor, driven by [`first`](Self::first),
/// [`next`](Self::next) and [`reverse_next`](Self::reverse_next). Only one
/// such traversal is in flight per map; calling `first` again abandons the
/// previous one, and any insertion of a new key or removal exhausts it.
/// Independent traversals are available through [`iter`](Self::iter).
///
/// # Examples
///
/// ```rust
/// use tessera::collections::OrderedMap;
///
/// let mut map = OrderedMap::new();
/// assert!(map.put(2, "two"));
/// assert!(map.put(1, "one"));
///
/// assert_eq!(map.get(&1), Some(&"one"));
/// assert!(map.find(&2));
/// assert!(map.remove(&2));
/// assert!(!map.remove(&2));
/// assert_eq!(map.size(), 1);
/// ```
pub struct OrderedMap<K, V, C = NaturalOrder> {
    /// Node arena; slot `SENTINEL` is the shared leaf.
    nodes: Vec<Node<K, V>>,
    /// Head of the free-slot list threaded through `Node::right`.
    vacant: usize,
    root: usize,
    length: usize,
    comparator: C,
    hooks: CleanupHooks<K, V>,
    cursor: Cursor,
}

impl<K, V> OrderedMap<K, V> {
    /// Creates a new empty map ordered by the keys' [`Ord`] implementation.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tessera::collections::OrderedMap;
    ///
    /// let map: OrderedMap<i32, String> = OrderedMap::new();
    /// assert!(map.is_empty());
    /// ```
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_comparator(NaturalOrder)
    }
}

impl<K, V, C> OrderedMap<K, V, C> {
    /// Creates a new empty map ordered by `comparator`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tessera::collections::OrderedMap;
    ///
    /// let mut map = OrderedMap::with_comparator(|lhs: &i32, rhs: &i32| rhs.cmp(lhs));
    /// map.put(1, 'a');
    /// map.put(2, 'b');
    /// assert_eq!(map.minimum().map(|pair| pair.key), Some(2));
    /// ```
    #[must_use]
    pub fn with_comparator(comparator: C) -> Self {
        Self {
            nodes: vec![Node::sentinel()],
            vacant: SENTINEL,
            root: SENTINEL,
            length: 0,
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

    /// Returns the comparator ordering this map.
    #[inline]
    pub const fn comparator(&self) -> &C {
        &self.comparator
    }

    /// Replaces the comparator.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::ComparatorOnPopulatedMap`] when the map
    /// holds entries, since their placement depends on the old ordering.
    pub fn set_comparator(&mut self, comparator: C) -> Result<(), CollectionError> {
        if self.length > 0 {
            return Err(CollectionError::ComparatorOnPopulatedMap { len: self.length });
        }
        self.comparator = comparator;
        Ok(())
    }

    /// Installs the hook that receives every key leaving the map.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::cell::Cell;
    /// use std::rc::Rc;
    /// use tessera::collections::OrderedMap;
    ///
    /// let released = Rc::new(Cell::new(0));
    /// let counter = Rc::clone(&released);
    ///
    /// let mut map = OrderedMap::new();
    /// map.set_clean_key(move |_key: i32| counter.set(counter.get() + 1));
    /// map.put(1, "one");
    /// map.put(1, "uno");
    /// assert_eq!(released.get(), 1);
    /// drop(map);
    /// assert_eq!(released.get(), 2);
    /// ```
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

    /// Returns the entry with the smallest key.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tessera::collections::OrderedMap;
    ///
    /// let map: OrderedMap<i32, i32> = [(3, 30), (1, 10)].into_iter().collect();
    /// assert_eq!(map.minimum().map(|pair| pair.as_tuple()), Some((&1, &10)));
    /// ```
    #[must_use]
    pub fn minimum(&self) -> Option<&Pair<K, V>> {
        self.pair_at(self.extreme(self.root, Side::Left))
    }

    /// Returns the entry with the largest key.
    #[must_use]
    pub fn maximum(&self) -> Option<&Pair<K, V>> {
        self.pair_at(self.extreme(self.root, Side::Right))
    }

    /// Removes every entry, passing each one to the cleanup hooks.
    pub fn clear(&mut self) {
        if self.hooks.is_empty() {
            self.nodes.truncate(1);
        } else {
            for node in self.nodes.iter_mut().skip(1) {
                if let Some(pair) = node.pair.take() {
                    self.hooks.release(pair);
                }
            }
            self.nodes.truncate(1);
        }
        self.nodes[SENTINEL] = Node::sentinel();
        self.vacant = SENTINEL;
        self.root = SENTINEL;
        self.length = 0;
        self.cursor = Cursor::exhausted();
    }

    // -------------------------------------------------------------------------
    // Embedded cursor
    // -------------------------------------------------------------------------

    /// Resets the embedded cursor to the start of a new traversal.
    ///
    /// Follow with repeated calls to [`next`](Self::next) for ascending
    /// order or [`reverse_next`](Self::reverse_next) for descending order.
    pub const fn first(&mut self) {
        self.cursor = Cursor {
            node: self.root,
            direction: Direction::DownLeft,
        };
    }

    /// Returns the next entry in ascending key order and advances the
    /// embedded cursor.
    ///
    /// Returns `None` once the traversal is exhausted; it stays exhausted
    /// until [`first`](Self::first) is called again.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<&Pair<K, V>> {
        let yielded = self.advance_cursor(Side::Left);
        self.pair_at(yielded)
    }

    /// Returns the next entry in descending key order and advances the
    /// embedded cursor.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tessera::collections::OrderedMap;
    ///
    /// let mut map: OrderedMap<i32, i32> = (1..=3).map(|key| (key, key * 10)).collect();
    /// map.first();
    /// let mut values = Vec::new();
    /// while let Some(pair) = map.reverse_next() {
    ///     values.push(pair.value);
    /// }
    /// assert_eq!(values, vec![30, 20, 10]);
    /// ```
    pub fn reverse_next(&mut self) -> Option<&Pair<K, V>> {
        let yielded = self.advance_cursor(Side::Right);
        self.pair_at(yielded)
    }

    /// One step of the stackless walk. `near` is the side visited first:
    /// `Left` for ascending order, `Right` for descending order.
    ///
    /// Returns the node to yield, or the sentinel when exhausted.
    fn advance_cursor(&mut self, near: Side) -> usize {
        let far = near.opposite();
        let yield_on = Self::arrival_from(near);
        let mut current = self.cursor.node;
        let mut direction = self.cursor.direction;

        while current != SENTINEL {
            match direction {
                Direction::DownLeft | Direction::DownRight => {
                    let child = self.nodes[current].child(near);
                    if child != SENTINEL {
                        current = child;
                        direction = Self::descent_into(near);
                        continue;
                    }
                    self.cursor = self.cursor_after(current, far);
                    return current;
                }
                arrived if arrived == yield_on => {
                    self.cursor = self.cursor_after(current, far);
                    return current;
                }
                _ => {
                    let (parent, arrived) = self.climb(current);
                    current = parent;
                    if let Some(arrived) = arrived {
                        direction = arrived;
                    }
                }
            }
        }

        self.cursor.node = SENTINEL;
        SENTINEL
    }

    /// Cursor position after yielding `node`: descend into its `far`
    /// subtree, or climb to its parent.
    fn cursor_after(&self, node: usize, far: Side) -> Cursor {
        let child = self.nodes[node].child(far);
        if child != SENTINEL {
            return Cursor {
                node: child,
                direction: Self::descent_into(far),
            };
        }
        let (parent, arrived) = self.climb(node);
        Cursor {
            node: parent,
            direction: arrived.unwrap_or(self.cursor.direction),
        }
    }

    /// Moves from `node` to its parent, reporting which child it came from.
    fn climb(&self, node: usize) -> (usize, Option<Direction>) {
        let parent = self.nodes[node].parent;
        if parent == SENTINEL {
            return (SENTINEL, None);
        }
        let arrived = if self.nodes[parent].left == node {
            Direction::UpLeft
        } else {
            Direction::UpRight
        };
        (parent, Some(arrived))
    }

    const fn descent_into(side: Side) -> Direction {
        match side {
            Side::Left => Direction::DownLeft,
            Side::Right => Direction::DownRight,
        }
    }

    const fn arrival_from(side: Side) -> Direction {
        match side {
            Side::Left => Direction::UpLeft,
            Side::Right => Direction::UpRight,
        }
    }

    // -------------------------------------------------------------------------
    // Borrowing iterators
    // -------------------------------------------------------------------------

    /// Returns an iterator over the entries in ascending key order.
    ///
    /// Unlike the embedded cursor, any number of these iterators may run
    /// at once. The iterator is double-ended.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tessera::collections::OrderedMap;
    ///
    /// let map: OrderedMap<i32, char> = [(2, 'b'), (1, 'a'), (3, 'c')].into_iter().collect();
    /// let keys: Vec<&i32> = map.iter().map(|(key, _)| key).collect();
    /// assert_eq!(keys, vec![&1, &2, &3]);
    ///
    /// let last = map.iter().next_back();
    /// assert_eq!(last, Some((&3, &'c')));
    /// ```
    pub fn iter(&self) -> OrderedMapIterator<'_, K, V, C> {
        OrderedMapIterator {
            map: self,
            front: self.extreme(self.root, Side::Left),
            back: self.extreme(self.root, Side::Right),
            remaining: self.length,
        }
    }

    /// Returns an iterator over the keys in ascending order.
    pub fn keys(&self) -> impl DoubleEndedIterator<Item = &K> {
        self.iter().map(|(key, _)| key)
    }

    /// Returns an iterator over the values in ascending key order.
    pub fn values(&self) -> impl DoubleEndedIterator<Item = &V> {
        self.iter().map(|(_, value)| value)
    }

    // -------------------------------------------------------------------------
    // Structural helpers
    // -------------------------------------------------------------------------

    #[inline]
    fn pair_at(&self, node: usize) -> Option<&Pair<K, V>> {
        self.nodes[node].pair.as_ref()
    }

    #[inline]
    fn color(&self, node: usize) -> Color {
        self.nodes[node].color
    }

    #[inline]
    fn set_color(&mut self, node: usize, color: Color) {
        self.nodes[node].color = color;
    }

    #[inline]
    fn parent(&self, node: usize) -> usize {
        self.nodes[node].parent
    }

    #[inline]
    fn child(&self, node: usize, side: Side) -> usize {
        self.nodes[node].child(side)
    }

    #[inline]
    fn set_child(&mut self, node: usize, side: Side, child: usize) {
        match side {
            Side::Left => self.nodes[node].left = child,
            Side::Right => self.nodes[node].right = child,
        }
    }

    /// Which side of its parent `node` hangs from.
    #[inline]
    fn side_of(&self, node: usize) -> Side {
        if self.child(self.parent(node), Side::Left) == node {
            Side::Left
        } else {
            Side::Right
        }
    }

    /// Follows `side` links from `node` to the end; the sentinel maps to itself.
    fn extreme(&self, mut node: usize, side: Side) -> usize {
        loop {
            let next = self.child(node, side);
            if next == SENTINEL {
                return node;
            }
            node = next;
        }
    }

    /// In-order neighbor of `node` on `side` (`Right` = successor).
    fn neighbor(&self, mut node: usize, side: Side) -> usize {
        let child = self.child(node, side);
        if child != SENTINEL {
            return self.extreme(child, side.opposite());
        }
        let mut parent = self.parent(node);
        while parent != SENTINEL && node == self.child(parent, side) {
            node = parent;
            parent = self.parent(parent);
        }
        parent
    }

    /// Points `parent`'s link that held `old` at `new`; a sentinel parent
    /// means `old` was the root.
    fn replace_child(&mut self, parent: usize, old: usize, new: usize) {
        if parent == SENTINEL {
            self.root = new;
        } else if self.child(parent, Side::Left) == old {
            self.set_child(parent, Side::Left, new);
        } else {
            self.set_child(parent, Side::Right, new);
        }
    }

    /// Rotates the subtree rooted at `node` towards `side`: the child on
    /// the opposite side takes `node`'s place and `node` becomes its
    /// `side` child.
    fn rotate(&mut self, node: usize, side: Side) {
        let pivot = self.child(node, side.opposite());
        let inner = self.child(pivot, side);

        self.set_child(node, side.opposite(), inner);
        if inner != SENTINEL {
            self.nodes[inner].parent = node;
        }

        let parent = self.parent(node);
        self.nodes[pivot].parent = parent;
        self.replace_child(parent, node, pivot);

        self.set_child(pivot, side, node);
        self.nodes[node].parent = pivot;
    }

    /// Restores the red-black invariants after `node` was linked in red.
    fn insert_fixup(&mut self, mut node: usize) {
        while self.color(self.parent(node)) == Color::Red {
            let parent = self.parent(node);
            let grandparent = self.parent(parent);
            let side = self.side_of(parent);
            let uncle = self.child(grandparent, side.opposite());

            if self.color(uncle) == Color::Red {
                // Case 1: red uncle, push the red up.
                self.set_color(parent, Color::Black);
                self.set_color(uncle, Color::Black);
                self.set_color(grandparent, Color::Red);
                node = grandparent;
                continue;
            }

            if node == self.child(parent, side.opposite()) {
                // Case 2: inner grandchild, rotate into case 3.
                node = parent;
                self.rotate(node, side);
            }

            // Case 3: outer grandchild.
            let parent = self.parent(node);
            let grandparent = self.parent(parent);
            self.set_color(parent, Color::Black);
            self.set_color(grandparent, Color::Red);
            self.rotate(grandparent, side.opposite());
        }
        let root = self.root;
        self.set_color(root, Color::Black);
    }

    /// Restores the black-height after a black node was spliced out above
    /// `node`, which may be the sentinel.
    fn delete_fixup(&mut self, mut node: usize) {
        while node != self.root && self.color(node) == Color::Black {
            let parent = self.parent(node);
            let side = self.side_of(node);
            let mut sibling = self.child(parent, side.opposite());

            if self.color(sibling) == Color::Red {
                // Case 1: red sibling.
                self.set_color(sibling, Color::Black);
                self.set_color(parent, Color::Red);
                self.rotate(parent, side);
                sibling = self.child(self.parent(node), side.opposite());
            }

            let near = self.child(sibling, side);
            let far = self.child(sibling, side.opposite());
            if self.color(near) == Color::Black && self.color(far) == Color::Black {
                // Case 2: black sibling with two black children.
                self.set_color(sibling, Color::Red);
                node = self.parent(node);
                continue;
            }

            if self.color(far) == Color::Black {
                // Case 3: black sibling with a red near child.
                self.set_color(near, Color::Black);
                self.set_color(sibling, Color::Red);
                self.rotate(sibling, side.opposite());
                sibling = self.child(self.parent(node), side.opposite());
            }

            // Case 4: black sibling with a red far child.
            let parent = self.parent(node);
            self.set_color(sibling, self.color(parent));
            self.set_color(parent, Color::Black);
            let far = self.child(sibling, side.opposite());
            self.set_color(far, Color::Black);
            self.rotate(parent, side);
            node = self.root;
        }
        self.set_color(node, Color::Black);
    }

    /// Places `pair` in a vacant slot or a new one at the end of the arena.
    fn allocate(&mut self, pair: Pair<K, V>, parent: usize) -> Result<usize, CollectionError> {
        if self.vacant != SENTINEL {
            let slot = self.vacant;
            self.vacant = self.nodes[slot].right;
            self.nodes[slot] = Node::new_red(pair, parent);
            return Ok(slot);
        }
        self.nodes
            .try_reserve(1)
            .map_err(|source| CollectionError::allocation(1, &source))?;
        self.nodes.push(Node::new_red(pair, parent));
        Ok(self.nodes.len() - 1)
    }

    /// Empties `slot`, links it into the free list and returns its pair.
    fn vacate(&mut self, slot: usize) -> Option<Pair<K, V>> {
        let node = &mut self.nodes[slot];
        let pair = node.pair.take();
        node.color = Color::Black;
        node.parent = SENTINEL;
        node.left = SENTINEL;
        node.right = self.vacant;
        self.vacant = slot;
        pair
    }

    /// Unlinks the live node `target` and rebalances.
    fn delete_node(&mut self, target: usize) {
        let left = self.child(target, Side::Left);
        let right = self.child(target, Side::Right);

        let (child, spliced_color) = if left != SENTINEL && right != SENTINEL {
            // Two children: the successor's pair moves up into `target` and
            // the successor's slot is the one spliced out.
            let successor = self.extreme(right, Side::Left);
            let child = self.child(successor, Side::Right);
            let parent = self.parent(successor);
            self.nodes[child].parent = parent;
            self.replace_child(parent, successor, child);

            let spliced_color = self.color(successor);
            let moved = self.vacate(successor);
            let removed = std::mem::replace(&mut self.nodes[target].pair, moved);
            if let Some(removed) = removed {
                self.hooks.release(removed);
            }
            (child, spliced_color)
        } else {
            let child = if left == SENTINEL { right } else { left };
            let parent = self.parent(target);
            self.nodes[child].parent = parent;
            self.replace_child(parent, target, child);

            let spliced_color = self.color(target);
            if let Some(removed) = self.vacate(target) {
                self.hooks.release(removed);
            }
            (child, spliced_color)
        };

        self.length -= 1;
        if spliced_color == Color::Black {
            self.delete_fixup(child);
        }
        self.nodes[SENTINEL].parent = SENTINEL;
    }
}

impl<K, V, C: KeyComparator<K>> OrderedMap<K, V, C> {
    /// Inserts a key-value pair, replacing the entry whose key compares
    /// equal.
    ///
    /// On replacement the old key and value go to the cleanup hooks and the
    /// tree is not rebalanced.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::AllocationFailed`] when a new node could
    /// not be allocated. The map is unchanged in that case.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tessera::collections::{OrderedMap, PutOutcome};
    ///
    /// let mut map = OrderedMap::new();
    /// assert_eq!(map.try_put(1, "one"), Ok(PutOutcome::Inserted));
    /// assert_eq!(map.try_put(1, "uno"), Ok(PutOutcome::Replaced));
    /// assert_eq!(map.get(&1), Some(&"uno"));
    /// ```
    pub fn try_put(&mut self, key: K, value: V) -> Result<PutOutcome, CollectionError> {
        let mut parent = SENTINEL;
        let mut side = Side::Left;
        let mut current = self.root;

        while let Some(pair) = self.nodes[current].pair.as_ref() {
            parent = current;
            match self.comparator.compare(&key, &pair.key) {
                Ordering::Less => side = Side::Left,
                Ordering::Greater => side = Side::Right,
                Ordering::Equal => {
                    let replaced = self.nodes[current].pair.replace(Pair::new(key, value));
                    if let Some(replaced) = replaced {
                        self.hooks.release(replaced);
                    }
                    return Ok(PutOutcome::Replaced);
                }
            }
            current = self.child(current, side);
        }

        let node = self.allocate(Pair::new(key, value), parent)?;
        if parent == SENTINEL {
            self.root = node;
        } else {
            self.set_child(parent, side, node);
        }
        self.length += 1;
        self.insert_fixup(node);
        self.cursor = Cursor::exhausted();
        Ok(PutOutcome::Inserted)
    }

    /// Inserts a key-value pair, replacing the entry whose key compares
    /// equal. Returns `false` only when allocation failed.
    pub fn put(&mut self, key: K, value: V) -> bool {
        self.try_put(key, value).is_ok()
    }
}

impl<K, V, C> OrderedMap<K, V, C> {
    /// Arena slot holding `key`, or the sentinel.
    fn search<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        C: KeyComparator<Q>,
        Q: ?Sized,
    {
        let mut current = self.root;
        while let Some(pair) = self.pair_at(current) {
            current = match self.comparator.compare(key, pair.key.borrow()) {
                Ordering::Less => self.child(current, Side::Left),
                Ordering::Greater => self.child(current, Side::Right),
                Ordering::Equal => return current,
            };
        }
        SENTINEL
    }

    /// Returns a reference to the value stored under `key`.
    ///
    /// The key may be any borrowed form of the map's key type, provided the
    /// comparator orders the borrowed form consistently.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tessera::collections::OrderedMap;
    ///
    /// let mut map = OrderedMap::new();
    /// map.put("hello".to_string(), 42);
    /// assert_eq!(map.get("hello"), Some(&42));
    /// assert_eq!(map.get("world"), None);
    /// ```
    #[must_use]
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        C: KeyComparator<Q>,
        Q: ?Sized,
    {
        self.pair_at(self.search(key)).map(|pair| &pair.value)
    }

    /// Returns a mutable reference to the value stored under `key`.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        C: KeyComparator<Q>,
        Q: ?Sized,
    {
        let node = self.search(key);
        self.nodes[node].pair.as_mut().map(|pair| &mut pair.value)
    }

    /// Returns `true` if the map contains `key`.
    #[must_use]
    pub fn find<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        C: KeyComparator<Q>,
        Q: ?Sized,
    {
        self.search(key) != SENTINEL
    }

    /// Returns `true` if the map contains `key`. Same as [`find`](Self::find).
    #[must_use]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        C: KeyComparator<Q>,
        Q: ?Sized,
    {
        self.find(key)
    }

    /// Removes the entry stored under `key`, passing its key and value to
    /// the cleanup hooks. Returns `false` if the key is absent.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tessera::collections::OrderedMap;
    ///
    /// let mut map: OrderedMap<i32, i32> = (0..10).map(|key| (key, key)).collect();
    /// assert!(map.remove(&4));
    /// assert!(!map.remove(&4));
    /// assert_eq!(map.size(), 9);
    /// ```
    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        C: KeyComparator<Q>,
        Q: ?Sized,
    {
        let target = self.search(key);
        if target == SENTINEL {
            return false;
        }
        self.delete_node(target);
        self.cursor = Cursor::exhausted();
        true
    }

    /// Returns the entry immediately before `key`.
    ///
    /// Returns `None` when `key` is absent or is the smallest key.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tessera::collections::OrderedMap;
    ///
    /// let map: OrderedMap<i32, i32> = [(1, 10), (2, 20), (3, 30)].into_iter().collect();
    /// assert_eq!(map.predecessor(&2).map(|pair| pair.value), Some(10));
    /// assert!(map.predecessor(&1).is_none());
    /// assert!(map.predecessor(&7).is_none());
    /// ```
    #[must_use]
    pub fn predecessor<Q>(&self, key: &Q) -> Option<&Pair<K, V>>
    where
        K: Borrow<Q>,
        C: KeyComparator<Q>,
        Q: ?Sized,
    {
        let node = self.search(key);
        if node == SENTINEL {
            return None;
        }
        self.pair_at(self.neighbor(node, Side::Left))
    }

    /// Returns the entry immediately after `key`.
    ///
    /// Returns `None` when `key` is absent or is the largest key.
    #[must_use]
    pub fn successor<Q>(&self, key: &Q) -> Option<&Pair<K, V>>
    where
        K: Borrow<Q>,
        C: KeyComparator<Q>,
        Q: ?Sized,
    {
        let node = self.search(key);
        if node == SENTINEL {
            return None;
        }
        self.pair_at(self.neighbor(node, Side::Right))
    }
}

// =============================================================================
// Iterator Implementation
// =============================================================================

/// An iterator over key-value pairs of an [`OrderedMap`], in key order.
pub struct OrderedMapIterator<'a, K, V, C> {
    map: &'a OrderedMap<K, V, C>,
    front: usize,
    back: usize,
    remaining: usize,
}

impl<'a, K, V, C> Iterator for OrderedMapIterator<'a, K, V, C> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.front;
        self.front = self.map.neighbor(node, Side::Right);
        self.remaining -= 1;
        self.map.pair_at(node).map(Pair::as_tuple)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V, C> DoubleEndedIterator for OrderedMapIterator<'_, K, V, C> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.back;
        self.back = self.map.neighbor(node, Side::Left);
        self.remaining -= 1;
        self.map.pair_at(node).map(Pair::as_tuple)
    }
}

impl<K, V, C> ExactSizeIterator for OrderedMapIterator<'_, K, V, C> {
    fn len(&self) -> usize {
        self.remaining
    }
}

impl<K, V, C> FusedIterator for OrderedMapIterator<'_, K, V, C> {}

// =============================================================================
// Standard Trait Implementations
// =============================================================================

impl<K, V, C> Drop for OrderedMap<K, V, C> {
    fn drop(&mut self) {
        if !self.hooks.is_empty() {
            self.clear();
        }
    }
}

impl<K, V, C: Default> Default for OrderedMap<K, V, C> {
    fn default() -> Self {
        Self::with_comparator(C::default())
    }
}

impl<K, V, C: KeyComparator<K> + Default> FromIterator<(K, V)> for OrderedMap<K, V, C> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::default();
        map.extend(iter);
        map
    }
}

impl<K, V, C: KeyComparator<K>> Extend<(K, V)> for OrderedMap<K, V, C> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.put(key, value);
        }
    }
}

impl<'a, K, V, C> IntoIterator for &'a OrderedMap<K, V, C> {
    type Item = (&'a K, &'a V);
    type IntoIter = OrderedMapIterator<'a, K, V, C>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K: fmt::Debug, V: fmt::Debug, C> fmt::Debug for OrderedMap<K, V, C> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_map().entries(self.iter()).finish()
    }
}

impl<K: fmt::Display, V: fmt::Display, C> fmt::Display for OrderedMap<K, V, C> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{{")?;
        for (index, (key, value)) in self.iter().enumerate() {
            if index > 0 {
                write!(formatter, ", ")?;
            }
            write!(formatter, "{key}: {value}")?;
        }
        write!(formatter, "}}")
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
    use std::cell::RefCell;
    use std::collections::BTreeMap;
    use std::rc::Rc;

    impl<K, V, C: KeyComparator<K>> OrderedMap<K, V, C> {
        /// Walks the whole tree and panics on any broken invariant.
        /// Returns the black-height of the root.
        fn assert_invariants(&self) -> usize {
            assert_eq!(self.color(SENTINEL), Color::Black, "sentinel must be black");
            assert_eq!(self.color(self.root), Color::Black, "root must be black");
            assert_eq!(self.parent(self.root), SENTINEL, "root must hang from the sentinel");
            let (black_height, count) = self.check_subtree(self.root);
            assert_eq!(count, self.length, "length must match live node count");
            black_height
        }

        fn check_subtree(&self, node: usize) -> (usize, usize) {
            if node == SENTINEL {
                return (1, 0);
            }
            let left = self.child(node, Side::Left);
            let right = self.child(node, Side::Right);
            let key = &self.pair_at(node).expect("live node").key;

            if self.color(node) == Color::Red {
                assert_eq!(self.color(left), Color::Black, "red node with red left child");
                assert_eq!(self.color(right), Color::Black, "red node with red right child");
            }
            for (child, expected) in [(left, Ordering::Less), (right, Ordering::Greater)] {
                if child != SENTINEL {
                    assert_eq!(self.parent(child), node, "broken parent link");
                    let child_key = &self.pair_at(child).expect("live node").key;
                    assert_eq!(self.comparator.compare(child_key, key), expected);
                }
            }

            let (left_height, left_count) = self.check_subtree(left);
            let (right_height, right_count) = self.check_subtree(right);
            assert_eq!(left_height, right_height, "black-height mismatch");
            let own = usize::from(self.color(node) == Color::Black);
            (left_height + own, left_count + right_count + 1)
        }
    }

    fn collect_forward<K: Clone, V: Clone, C>(map: &mut OrderedMap<K, V, C>) -> Vec<(K, V)> {
        map.first();
        let mut entries = Vec::new();
        while let Some(pair) = map.next() {
            entries.push((pair.key.clone(), pair.value.clone()));
        }
        entries
    }

    fn collect_reverse<K: Clone, V: Clone, C>(map: &mut OrderedMap<K, V, C>) -> Vec<(K, V)> {
        map.first();
        let mut entries = Vec::new();
        while let Some(pair) = map.reverse_next() {
            entries.push((pair.key.clone(), pair.value.clone()));
        }
        entries
    }

    // =========================================================================
    // Display Tests
    // =========================================================================

    #[rstest]
    fn test_display_empty_map() {
        let map: OrderedMap<i32, String> = OrderedMap::new();
        assert_eq!(format!("{map}"), "{}");
    }

    #[rstest]
    fn test_display_sorted() {
        let map: OrderedMap<i32, &str> = [(3, "three"), (1, "one"), (2, "two")]
            .into_iter()
            .collect();
        assert_eq!(format!("{map}"), "{1: one, 2: two, 3: three}");
        assert_eq!(format!("{map:?}"), r#"{1: "one", 2: "two", 3: "three"}"#);
    }

    // =========================================================================
    // Structure Tests
    // =========================================================================

    #[rstest]
    fn test_empty_map_has_no_extremes() {
        let mut map: OrderedMap<i32, i32> = OrderedMap::new();
        assert!(map.minimum().is_none());
        assert!(map.maximum().is_none());
        map.first();
        assert!(map.next().is_none());
        assert!(map.reverse_next().is_none());
        assert_eq!(map.assert_invariants(), 1);
    }

    #[rstest]
    #[case::ascending((0..64).collect())]
    #[case::descending((0..64).rev().collect())]
    #[case::zigzag((0..32).flat_map(|index| [index, 63 - index]).collect())]
    fn test_invariants_hold_after_each_insert(#[case] keys: Vec<i32>) {
        let mut map = OrderedMap::new();
        for key in keys {
            assert!(map.put(key, key * 10));
            map.assert_invariants();
        }
        assert_eq!(map.len(), 64);
        let keys: Vec<i32> = map.keys().copied().collect();
        assert_eq!(keys, (0..64).collect::<Vec<_>>());
    }

    #[rstest]
    fn test_replacement_does_not_restructure() {
        let mut map: OrderedMap<i32, i32> = (0..16).map(|key| (key, key)).collect();
        let root_before = map.root;
        assert_eq!(map.try_put(7, 700), Ok(PutOutcome::Replaced));
        assert_eq!(map.root, root_before);
        assert_eq!(map.get(&7), Some(&700));
        assert_eq!(map.len(), 16);
    }

    #[rstest]
    fn test_removed_slots_are_reused() {
        let mut map: OrderedMap<i32, i32> = (0..8).map(|key| (key, key)).collect();
        let arena = map.nodes.len();
        assert!(map.remove(&3));
        assert!(map.remove(&5));
        map.put(30, 30);
        map.put(50, 50);
        assert_eq!(map.nodes.len(), arena);
        map.assert_invariants();
    }

    #[rstest]
    fn test_remove_every_shape() {
        // Leaf, single child, two children with the successor as direct
        // right child, and two children with a deeper successor.
        let mut map: OrderedMap<i32, i32> = [50, 30, 70, 20, 40, 60, 80, 65, 10]
            .into_iter()
            .map(|key| (key, key))
            .collect();
        for key in [10, 20, 70, 50, 30, 65, 40, 60, 80] {
            assert!(map.remove(&key), "removing {key}");
            map.assert_invariants();
            assert!(!map.find(&key));
        }
        assert!(map.is_empty());
        assert_eq!(map.root, SENTINEL);
    }

    // =========================================================================
    // Cursor Tests
    // =========================================================================

    #[rstest]
    fn test_cursor_needs_first() {
        let mut map: OrderedMap<i32, i32> = (0..3).map(|key| (key, key)).collect();
        assert!(map.next().is_none());
        map.first();
        assert_eq!(map.next().map(|pair| pair.key), Some(0));
    }

    #[rstest]
    fn test_cursor_stays_exhausted() {
        let mut map: OrderedMap<i32, i32> = (0..3).map(|key| (key, key)).collect();
        assert_eq!(collect_forward(&mut map).len(), 3);
        assert!(map.next().is_none());
        assert!(map.next().is_none());
    }

    #[rstest]
    fn test_cursor_exhausted_by_structural_change() {
        let mut map: OrderedMap<i32, i32> = (0..3).map(|key| (key, key)).collect();
        map.first();
        assert!(map.next().is_some());
        map.put(10, 10);
        assert!(map.next().is_none());
    }

    #[rstest]
    fn test_first_restarts_traversal() {
        let mut map: OrderedMap<i32, i32> = (0..5).map(|key| (key, key)).collect();
        map.first();
        map.next();
        map.next();
        let restarted = collect_forward(&mut map);
        assert_eq!(restarted.len(), 5);
    }

    // =========================================================================
    // Cleanup Tests
    // =========================================================================

    #[rstest]
    fn test_two_children_removal_releases_removed_pair() {
        let released = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&released);
        let mut map = OrderedMap::new();
        map.set_clean_key(move |key: i32| log.borrow_mut().push(key));
        for key in [2, 1, 3] {
            map.put(key, ());
        }

        assert!(map.remove(&2));

        assert_eq!(*RefCell::borrow(&released), vec![2]);
        assert_eq!(map.minimum().map(|pair| pair.key), Some(1));
        assert_eq!(map.maximum().map(|pair| pair.key), Some(3));
    }

    #[rstest]
    fn test_clear_releases_every_pair_once() {
        let released = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&released);
        let mut map = OrderedMap::new();
        map.set_clean_value(move |value: i32| log.borrow_mut().push(value));
        for key in 0..10 {
            map.put(key, key * 2);
        }

        map.clear();
        assert!(map.is_empty());
        drop(map);

        let mut values = RefCell::borrow(&released).clone();
        values.sort_unstable();
        assert_eq!(values, (0..10).map(|key| key * 2).collect::<Vec<_>>());
    }

    // =========================================================================
    // Property Tests
    // =========================================================================

    #[derive(Clone, Debug)]
    enum Operation {
        Put(i16, i32),
        Remove(i16),
    }

    fn operation() -> impl Strategy<Value = Operation> {
        prop_oneof![
            3 => (any::<i16>().prop_map(|key| key % 128), any::<i32>())
                .prop_map(|(key, value)| Operation::Put(key, value)),
            2 => any::<i16>().prop_map(|key| Operation::Remove(key % 128)),
        ]
    }

    proptest! {
        #[test]
        fn prop_matches_btreemap_and_keeps_invariants(
            operations in prop::collection::vec(operation(), 0..300)
        ) {
            let mut map = OrderedMap::new();
            let mut model = BTreeMap::new();

            for operation in operations {
                match operation {
                    Operation::Put(key, value) => {
                        map.put(key, value);
                        model.insert(key, value);
                    }
                    Operation::Remove(key) => {
                        prop_assert_eq!(map.remove(&key), model.remove(&key).is_some());
                    }
                }
                map.assert_invariants();
            }

            prop_assert_eq!(map.len(), model.len());
            let expected: Vec<(i16, i32)> = model.iter().map(|(key, value)| (*key, *value)).collect();
            prop_assert_eq!(collect_forward(&mut map), expected.clone());
            let mut reversed = expected.clone();
            reversed.reverse();
            prop_assert_eq!(collect_reverse(&mut map), reversed.clone());

            let borrowed: Vec<(i16, i32)> = map.iter().map(|(key, value)| (*key, *value)).collect();
            prop_assert_eq!(borrowed, expected);
            let borrowed_back: Vec<(i16, i32)> =
                map.iter().rev().map(|(key, value)| (*key, *value)).collect();
            prop_assert_eq!(borrowed_back, reversed);
        }

        #[test]
        fn prop_neighbors_match_btreemap(keys in prop::collection::btree_set(any::<i32>(), 1..100)) {
            let map: OrderedMap<i32, ()> = keys.iter().map(|key| (*key, ())).collect();
            for key in &keys {
                let before = keys.range(..*key).next_back();
                let after = keys.range((std::ops::Bound::Excluded(*key), std::ops::Bound::Unbounded)).next();
                prop_assert_eq!(map.predecessor(key).map(|pair| &pair.key), before);
                prop_assert_eq!(map.successor(key).map(|pair| &pair.key), after);
            }
        }
    }
}
