//! Indexable skip list.
//!
//! Nodes live in an arena (`Vec`) and link to each other by index. Every
//! forward link also records its width (how many level-0 steps it spans),
//! which turns rank lookups into an O(log n) descent.
//!
//! ```text
//! level 2:  HEAD ───────────(3)───────────► 30 ──(2)──► NIL
//! level 1:  HEAD ──(1)──► 10 ──(2)────────► 30 ──(2)──► NIL
//! level 0:  HEAD ──(1)──► 10 ──(1)──► 20 ──(1)──► 30 ──(1)──► 40 ──(1)──► NIL
//! ```
//!
//! Widths to NIL are kept as if NIL sat at position `len + 1`.

use std::cmp::Ordering;

use config::DEFAULT_SKIP_LIST_MAX_LEVEL;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{Comparer, IndexError, SeekableCursor};

struct Tower {
    forward: Vec<Option<usize>>,
    width: Vec<usize>,
}

struct SkipNode<K, V> {
    key: K,
    value: V,
    tower: Tower,
    previous: Option<usize>,
}

/// A probabilistic ordered map with rank access.
///
/// Single writer: inserts take `&mut self`. Share it behind a lock (or use
/// [`crate::BTree`]) when several threads need to write.
pub struct SkipList<K, V, C> {
    nodes: Vec<SkipNode<K, V>>,
    head: Tower,
    tail: Option<usize>,
    max_level: usize,
    comparer: C,
    rng: StdRng,
}

impl<K, V, C: Comparer<K>> SkipList<K, V, C> {
    /// Creates an empty list whose towers are at most `max_level` high.
    ///
    /// Callers usually size this as `log2(expected_len) + 1`.
    pub fn new(comparer: C, max_level: usize) -> Self {
        Self::with_rng(comparer, max_level, StdRng::from_entropy())
    }

    /// A list sized for up to roughly 65K elements.
    pub fn with_default_height(comparer: C) -> Self {
        Self::new(comparer, DEFAULT_SKIP_LIST_MAX_LEVEL)
    }

    /// Like [`new`](Self::new) but with reproducible tower heights.
    pub fn with_seed(comparer: C, max_level: usize, seed: u64) -> Self {
        Self::with_rng(comparer, max_level, StdRng::seed_from_u64(seed))
    }

    fn with_rng(comparer: C, max_level: usize, rng: StdRng) -> Self {
        let max_level = max_level.max(1);
        Self {
            nodes: Vec::new(),
            head: Tower {
                forward: vec![None; max_level],
                width: vec![1; max_level],
            },
            tail: None,
            max_level,
            comparer,
            rng,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Tallest tower this list will build.
    pub fn max_level(&self) -> usize {
        self.max_level
    }

    /// Inserts or overwrites. Returns the previous value if the key existed.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let (update, rank) = self.predecessors(&key);
        if let Some(found) = self.successor_if_equal(update[0], &key) {
            return Some(std::mem::replace(&mut self.nodes[found].value, value));
        }
        self.link(key, value, &update, &rank);
        None
    }

    /// Inserts only if absent. Returns `false` when the key already exists.
    pub fn try_insert(&mut self, key: K, value: V) -> bool {
        let (update, rank) = self.predecessors(&key);
        if self.successor_if_equal(update[0], &key).is_some() {
            return false;
        }
        self.link(key, value, &update, &rank);
        true
    }

    /// Point lookup.
    pub fn get(&self, key: &K) -> Option<&V> {
        let at = self.last_before(|k| self.comparer.compare(k, key) == Ordering::Less);
        self.successor_if_equal(at, key)
            .map(|index| &self.nodes[index].value)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Smallest node.
    pub fn first_node(&self) -> Option<SkipListNode<'_, K, V, C>> {
        self.head.forward[0].map(|index| self.node(index))
    }

    /// Largest node.
    pub fn last_node(&self) -> Option<SkipListNode<'_, K, V, C>> {
        self.tail.map(|index| self.node(index))
    }

    /// Tightest node `<= key`, or `None` if every key is greater.
    pub fn last_node_smaller_or_equal(&self, key: &K) -> Option<SkipListNode<'_, K, V, C>> {
        self.last_before(|k| self.comparer.compare(k, key) != Ordering::Greater)
            .map(|index| self.node(index))
    }

    /// Tightest node `>= key`, or `None` if every key is smaller.
    pub fn first_node_greater_or_equal(&self, key: &K) -> Option<SkipListNode<'_, K, V, C>> {
        let at = self.last_before(|k| self.comparer.compare(k, key) == Ordering::Less);
        self.tower(at).forward[0].map(|index| self.node(index))
    }

    pub fn cursor(&self) -> SkipListCursor<'_, K, V, C> {
        SkipListCursor {
            list: self,
            state: Slot::Unpositioned,
        }
    }

    fn node(&self, index: usize) -> SkipListNode<'_, K, V, C> {
        SkipListNode { list: self, index }
    }

    /// `None` addresses the head tower.
    fn tower(&self, at: Option<usize>) -> &Tower {
        match at {
            Some(index) => &self.nodes[index].tower,
            None => &self.head,
        }
    }

    fn tower_mut(&mut self, at: Option<usize>) -> &mut Tower {
        match at {
            Some(index) => &mut self.nodes[index].tower,
            None => &mut self.head,
        }
    }

    fn successor_if_equal(&self, at: Option<usize>, key: &K) -> Option<usize> {
        self.tower(at).forward[0]
            .filter(|&next| self.comparer.compare(&self.nodes[next].key, key) == Ordering::Equal)
    }

    /// Last node whose key is `before` the bound (`None` = head).
    fn last_before(&self, before: impl Fn(&K) -> bool) -> Option<usize> {
        let mut at = None;
        for level in (0..self.max_level).rev() {
            while let Some(next) = self.tower(at).forward[level] {
                if !before(&self.nodes[next].key) {
                    break;
                }
                at = Some(next);
            }
        }
        at
    }

    /// Per-level predecessors of `key` and their 1-based positions (head = 0).
    fn predecessors(&self, key: &K) -> (Vec<Option<usize>>, Vec<usize>) {
        let mut update = vec![None; self.max_level];
        let mut rank = vec![0; self.max_level];
        let mut at = None;
        let mut pos = 0;
        for level in (0..self.max_level).rev() {
            loop {
                let tower = self.tower(at);
                match tower.forward[level] {
                    Some(next)
                        if self.comparer.compare(&self.nodes[next].key, key) == Ordering::Less =>
                    {
                        pos += tower.width[level];
                        at = Some(next);
                    }
                    _ => break,
                }
            }
            update[level] = at;
            rank[level] = pos;
        }
        (update, rank)
    }

    fn link(&mut self, key: K, value: V, update: &[Option<usize>], rank: &[usize]) {
        let height = self.random_height();
        let index = self.nodes.len();
        let mut tower = Tower {
            forward: vec![None; height],
            width: vec![0; height],
        };
        for level in 0..height {
            let pred = self.tower_mut(update[level]);
            tower.forward[level] = pred.forward[level];
            tower.width[level] = rank[level] + pred.width[level] - rank[0];
            pred.forward[level] = Some(index);
            pred.width[level] = rank[0] + 1 - rank[level];
        }
        for level in height..self.max_level {
            self.tower_mut(update[level]).width[level] += 1;
        }

        let successor = tower.forward[0];
        self.nodes.push(SkipNode {
            key,
            value,
            tower,
            previous: update[0],
        });
        match successor {
            Some(next) => self.nodes[next].previous = Some(index),
            None => self.tail = Some(index),
        }
    }

    /// Coin flips, capped at `max_level`.
    fn random_height(&mut self) -> usize {
        let mut height = 1;
        while height < self.max_level && self.rng.gen_bool(0.5) {
            height += 1;
        }
        height
    }

    /// Arena index of the element at 0-based `rank`.
    fn index_at_rank(&self, rank: usize) -> Option<usize> {
        if rank >= self.len() {
            return None;
        }
        let target = rank + 1;
        let mut at = None;
        let mut pos = 0;
        for level in (0..self.max_level).rev() {
            loop {
                let tower = self.tower(at);
                match tower.forward[level] {
                    Some(next) if pos + tower.width[level] <= target => {
                        pos += tower.width[level];
                        at = Some(next);
                    }
                    _ => break,
                }
            }
            if pos == target {
                break;
            }
        }
        at
    }
}

/// Rank-based (0-based, ascending) access into an ordered structure.
pub trait IndexedReader<K, V> {
    /// Number of addressable ranks, `0..element_count()`.
    fn element_count(&self) -> usize;

    /// Key at `rank`, or `None` past the end.
    fn get_key(&self, rank: usize) -> Option<&K>;

    /// Value at `rank`, or `None` past the end.
    fn get_value(&self, rank: usize) -> Option<&V>;
}

impl<K, V, C: Comparer<K>> IndexedReader<K, V> for SkipList<K, V, C> {
    fn element_count(&self) -> usize {
        self.len()
    }

    fn get_key(&self, rank: usize) -> Option<&K> {
        self.index_at_rank(rank).map(|index| &self.nodes[index].key)
    }

    fn get_value(&self, rank: usize) -> Option<&V> {
        self.index_at_rank(rank).map(|index| &self.nodes[index].value)
    }
}

/// A borrowed handle to one skip list element.
pub struct SkipListNode<'a, K, V, C> {
    list: &'a SkipList<K, V, C>,
    index: usize,
}

impl<'a, K, V, C> Clone for SkipListNode<'a, K, V, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, K, V, C> Copy for SkipListNode<'a, K, V, C> {}

impl<'a, K, V, C> SkipListNode<'a, K, V, C> {
    pub fn key(&self) -> &'a K {
        &self.list.nodes[self.index].key
    }

    pub fn value(&self) -> &'a V {
        &self.list.nodes[self.index].value
    }

    /// The next larger element.
    pub fn next_node(&self) -> Option<Self> {
        self.list.nodes[self.index].tower.forward[0].map(|index| Self {
            list: self.list,
            index,
        })
    }

    /// The next smaller element.
    pub fn previous_node(&self) -> Option<Self> {
        self.list.nodes[self.index].previous.map(|index| Self {
            list: self.list,
            index,
        })
    }
}

#[derive(Clone, Copy)]
enum Slot {
    Unpositioned,
    BeforeBegin,
    PastEnd,
    At(usize),
}

/// A cursor over a [`SkipList`], with the same sentinel rules as
/// [`crate::BTreeCursor`].
pub struct SkipListCursor<'a, K, V, C> {
    list: &'a SkipList<K, V, C>,
    state: Slot,
}

impl<'a, K, V, C> SkipListCursor<'a, K, V, C> {
    fn land(&mut self, found: Option<usize>, miss: Slot) -> bool {
        match found {
            Some(index) => {
                self.state = Slot::At(index);
                true
            }
            None => {
                self.state = miss;
                false
            }
        }
    }
}

impl<'a, K, V, C: Comparer<K>> SeekableCursor<K, V> for SkipListCursor<'a, K, V, C> {
    fn next(&mut self) -> bool {
        let found = match self.state {
            Slot::PastEnd => return false,
            Slot::Unpositioned | Slot::BeforeBegin => self.list.head.forward[0],
            Slot::At(index) => self.list.nodes[index].tower.forward[0],
        };
        self.land(found, Slot::PastEnd)
    }

    fn prev(&mut self) -> bool {
        let found = match self.state {
            Slot::BeforeBegin => return false,
            Slot::Unpositioned | Slot::PastEnd => self.list.tail,
            Slot::At(index) => self.list.nodes[index].previous,
        };
        self.land(found, Slot::BeforeBegin)
    }

    fn seek_begin(&mut self) -> bool {
        let found = self.list.head.forward[0];
        self.land(found, Slot::Unpositioned)
    }

    fn seek_end(&mut self) -> bool {
        let found = self.list.tail;
        self.land(found, Slot::Unpositioned)
    }

    fn seek_to_first_greater_or_equal(&mut self, key: &K) -> Result<(), IndexError> {
        let node = self
            .list
            .first_node_greater_or_equal(key)
            .ok_or(IndexError::OutOfRange)?;
        self.state = Slot::At(node.index);
        Ok(())
    }

    fn seek_to_last_smaller_or_equal(&mut self, key: &K) -> Result<(), IndexError> {
        let node = self
            .list
            .last_node_smaller_or_equal(key)
            .ok_or(IndexError::OutOfRange)?;
        self.state = Slot::At(node.index);
        Ok(())
    }

    fn current_key(&self) -> Option<&K> {
        match self.state {
            Slot::At(index) => Some(&self.list.nodes[index].key),
            _ => None,
        }
    }

    fn current_value(&self) -> Option<&V> {
        match self.state {
            Slot::At(index) => Some(&self.list.nodes[index].value),
            _ => None,
        }
    }
}
