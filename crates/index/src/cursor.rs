use std::cmp::Ordering;
use std::sync::Arc;

use crate::btree::{BTree, LeafRef};
use crate::{Comparer, IndexError, SeekableCursor};

/// Where the cursor last landed. `offset` is a hint: a concurrent insert or
/// split may have shifted `key` since, so every step re-validates it.
struct Position<K, V> {
    leaf: LeafRef<K, V>,
    offset: usize,
    key: K,
    value: V,
}

enum State<K, V> {
    Unpositioned,
    BeforeBegin,
    PastEnd,
    At(Position<K, V>),
}

/// A cursor over a [`BTree`].
///
/// Cursors are cheap, single-owner and safe to run while other threads
/// insert. Each step re-locates the cursor by key rather than by offset, so
/// the sequence of yielded keys is strictly monotonic even if leaves split
/// underneath. Entries present when the scan started are always reached;
/// entries inserted during the scan may or may not be.
pub struct BTreeCursor<'t, K, V, C> {
    tree: &'t BTree<K, V, C>,
    state: State<K, V>,
}

impl<'t, K, V, C> BTreeCursor<'t, K, V, C>
where
    K: Clone,
    V: Clone,
    C: Comparer<K>,
{
    pub(crate) fn new(tree: &'t BTree<K, V, C>) -> Self {
        Self {
            tree,
            state: State::Unpositioned,
        }
    }

    fn land(&mut self, found: Option<Position<K, V>>, miss: State<K, V>) -> bool {
        match found {
            Some(position) => {
                self.state = State::At(position);
                true
            }
            None => {
                self.state = miss;
                false
            }
        }
    }

    fn first(&self) -> Option<Position<K, V>> {
        settle_forward(self.tree.head(), None, |_| false)
    }

    fn last(&self) -> Option<Position<K, V>> {
        settle_backward(self.tree.last_leaf(), None, |_| true)
    }
}

impl<'t, K, V, C> SeekableCursor<K, V> for BTreeCursor<'t, K, V, C>
where
    K: Clone,
    V: Clone,
    C: Comparer<K>,
{
    fn next(&mut self) -> bool {
        let found = match &self.state {
            State::PastEnd => return false,
            State::Unpositioned | State::BeforeBegin => self.first(),
            State::At(at) => {
                let cmp = self.tree.comparer();
                settle_forward(Arc::clone(&at.leaf), Some(at.offset + 1), |k| {
                    cmp.compare(k, &at.key) != Ordering::Greater
                })
            }
        };
        self.land(found, State::PastEnd)
    }

    fn prev(&mut self) -> bool {
        let found = match &self.state {
            State::BeforeBegin => return false,
            State::Unpositioned | State::PastEnd => self.last(),
            State::At(at) => {
                let cmp = self.tree.comparer();
                settle_backward(Arc::clone(&at.leaf), Some(at.offset), |k| {
                    cmp.compare(k, &at.key) == Ordering::Less
                })
            }
        };
        self.land(found, State::BeforeBegin)
    }

    fn seek_begin(&mut self) -> bool {
        let found = self.first();
        self.land(found, State::Unpositioned)
    }

    fn seek_end(&mut self) -> bool {
        let found = self.last();
        self.land(found, State::Unpositioned)
    }

    fn seek_to_first_greater_or_equal(&mut self, key: &K) -> Result<(), IndexError> {
        let cmp = self.tree.comparer();
        let found = settle_forward(self.tree.leaf_for(key), None, |k| {
            cmp.compare(k, key) == Ordering::Less
        })
        .ok_or(IndexError::OutOfRange)?;
        self.state = State::At(found);
        Ok(())
    }

    fn seek_to_last_smaller_or_equal(&mut self, key: &K) -> Result<(), IndexError> {
        let cmp = self.tree.comparer();
        let found = settle_backward(self.tree.leaf_for(key), None, |k| {
            cmp.compare(k, key) != Ordering::Greater
        })
        .ok_or(IndexError::OutOfRange)?;
        self.state = State::At(found);
        Ok(())
    }

    fn current_key(&self) -> Option<&K> {
        match &self.state {
            State::At(at) => Some(&at.key),
            _ => None,
        }
    }

    fn current_value(&self) -> Option<&V> {
        match &self.state {
            State::At(at) => Some(&at.value),
            _ => None,
        }
    }
}

/// Number of leading keys that are `before` the bound. `hint` is trusted
/// only if it checks out against its neighbours.
fn locate<K, F: Fn(&K) -> bool>(keys: &[K], hint: Option<usize>, before: &F) -> usize {
    match hint {
        Some(h)
            if h <= keys.len()
                && (h == 0 || before(&keys[h - 1]))
                && (h == keys.len() || !before(&keys[h])) =>
        {
            h
        }
        _ => keys.partition_point(|k| before(k)),
    }
}

/// First entry that is not `before` the bound, starting at `leaf` and
/// walking right.
fn settle_forward<K, V, F>(
    mut leaf: LeafRef<K, V>,
    mut hint: Option<usize>,
    before: F,
) -> Option<Position<K, V>>
where
    K: Clone,
    V: Clone,
    F: Fn(&K) -> bool,
{
    loop {
        let next = {
            let guard = leaf.read();
            let idx = locate(&guard.keys, hint.take(), &before);
            if idx < guard.keys.len() {
                return Some(Position {
                    leaf: Arc::clone(&leaf),
                    offset: idx,
                    key: guard.keys[idx].clone(),
                    value: guard.values[idx].clone(),
                });
            }
            guard.next.clone()
        };
        leaf = next?;
    }
}

/// Last entry that is `before` the bound, starting at `leaf`.
///
/// Splits can carry qualifying keys into right siblings the caller has not
/// seen, so when every key here qualifies the right sibling is checked first.
fn settle_backward<K, V, F>(
    mut leaf: LeafRef<K, V>,
    mut hint: Option<usize>,
    before: F,
) -> Option<Position<K, V>>
where
    K: Clone,
    V: Clone,
    F: Fn(&K) -> bool,
{
    loop {
        let step = {
            let guard = leaf.read();
            let idx = locate(&guard.keys, hint.take(), &before);
            let migrated = if idx == guard.keys.len() {
                guard
                    .next
                    .as_ref()
                    .filter(|next| next.read().keys.first().is_some_and(|k| before(k)))
                    .cloned()
            } else {
                None
            };
            match migrated {
                Some(next) => next,
                None if idx > 0 => {
                    return Some(Position {
                        leaf: Arc::clone(&leaf),
                        offset: idx - 1,
                        key: guard.keys[idx - 1].clone(),
                        value: guard.values[idx - 1].clone(),
                    });
                }
                None => guard.previous.upgrade()?,
            }
        };
        leaf = step;
    }
}

/// Ascending iterator over a [`BTree`], yielding cloned entries.
pub struct Iter<'t, K, V, C> {
    cursor: BTreeCursor<'t, K, V, C>,
}

impl<'t, K, V, C> Iter<'t, K, V, C> {
    pub(crate) fn new(cursor: BTreeCursor<'t, K, V, C>) -> Self {
        Self { cursor }
    }
}

impl<'t, K, V, C> Iterator for Iter<'t, K, V, C>
where
    K: Clone,
    V: Clone,
    C: Comparer<K>,
{
    type Item = (K, V);

    fn next(&mut self) -> Option<(K, V)> {
        if !SeekableCursor::next(&mut self.cursor) {
            return None;
        }
        match &self.cursor.state {
            State::At(at) => Some((at.key.clone(), at.value.clone())),
            _ => None,
        }
    }
}
