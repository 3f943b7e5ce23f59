//! # Index - ordered in-memory indexes
//!
//! The in-memory half of a Shoal segment. Two ordered structures share one
//! logical contract (insert, point lookup, bound search, bidirectional
//! cursors):
//!
//! - [`BTree`]: a concurrent linked-leaf B+tree. Any number of threads may
//!   call [`BTree::add_or_update`] while any number of cursors scan it.
//! - [`SkipList`]: a single-writer probabilistic list with rank access.
//!
//! Ordering is never assumed: every index is built with a [`Comparer`].
//!
//! ## Leaf chain
//!
//! ```text
//!                 ┌──────────────┐
//!                 │ interior     │   separators only
//!                 └──┬───────┬───┘
//!                    v       v
//!  head ──► [1 3 5] ⇄ [7 9] ⇄ [11 13 17] ──► None
//! ```
//!
//! Nodes are never removed from the chain. A split only moves the upper half
//! of a leaf into a new right sibling, so keys migrate rightwards and a cursor
//! holding a stale leaf can always re-find its place by walking right.
//!
//! ## Example
//!
//! ```rust
//! use index::{Ascending, BTree, SeekableCursor};
//!
//! let tree = BTree::new(Ascending);
//! tree.try_insert(2, "b");
//! tree.try_insert(1, "a");
//!
//! let mut cursor = tree.cursor();
//! assert!(cursor.next());
//! assert_eq!(cursor.current_key(), Some(&1));
//! ```

mod btree;
mod comparer;
mod cursor;
mod skiplist;

pub use btree::{BTree, LeafNode};
pub use comparer::{Ascending, Comparer, Descending};
pub use cursor::{BTreeCursor, Iter};
pub use skiplist::{IndexedReader, SkipList, SkipListCursor, SkipListNode};

use thiserror::Error;

/// Which callback of [`BTree::add_or_update`] ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOrUpdateResult {
    /// The key was absent and a new entry was created.
    Added,
    /// The key was present and its value was updated in place.
    Updated,
}

/// Errors reported by index cursors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IndexError {
    /// A bound seek found no element on the requested side of the key.
    #[error("no element satisfies the seek bound")]
    OutOfRange,
}

/// A bidirectional cursor over an ordered index.
///
/// A cursor has two sentinel positions, one step outside the data on each
/// side. A failed [`next`](Self::next) parks the cursor past the end and a
/// failed [`prev`](Self::prev) parks it before the beginning; stepping back
/// from a sentinel re-enters at the nearest element. A fresh cursor behaves
/// as both sentinels at once.
pub trait SeekableCursor<K, V> {
    /// Moves to the next element. Returns `false` (and parks past the end) if
    /// there is none.
    fn next(&mut self) -> bool;

    /// Moves to the previous element. Returns `false` (and parks before the
    /// beginning) if there is none.
    fn prev(&mut self) -> bool;

    /// Positions on the smallest element. Returns `false` if the index is empty.
    fn seek_begin(&mut self) -> bool;

    /// Positions on the largest element. Returns `false` if the index is empty.
    fn seek_end(&mut self) -> bool;

    /// Positions on the smallest element `>= key`.
    ///
    /// Returns [`IndexError::OutOfRange`] and leaves the cursor untouched when
    /// every element is smaller than `key`.
    fn seek_to_first_greater_or_equal(&mut self, key: &K) -> Result<(), IndexError>;

    /// Positions on the largest element `<= key`.
    ///
    /// Returns [`IndexError::OutOfRange`] and leaves the cursor untouched when
    /// every element is greater than `key`.
    fn seek_to_last_smaller_or_equal(&mut self, key: &K) -> Result<(), IndexError>;

    /// Key under the cursor, or `None` on a sentinel.
    fn current_key(&self) -> Option<&K>;

    /// Value under the cursor, or `None` on a sentinel.
    fn current_value(&self) -> Option<&V>;
}

#[cfg(test)]
mod tests;
