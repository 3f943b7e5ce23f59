//! Concurrent linked-leaf B+tree.
//!
//! Every node carries its own latch. Writers crab down the tree: the common
//! path read-latches interiors and write-latches only the target leaf; when
//! the leaf is full the insert restarts on a pessimistic path that
//! write-latches the chain of ancestors a split could reach, releasing them
//! as soon as a node with spare capacity is found.
//!
//! Cursors never touch interior nodes. They hold one leaf latch for one step
//! and rely on the leaf chain growing by splits only.

use std::cmp::Ordering;
use std::marker::PhantomData;
use std::sync::atomic::{self, AtomicUsize};
use std::sync::{Arc, Weak};

use config::{DEFAULT_INTERIOR_CAPACITY, DEFAULT_LEAF_CAPACITY, MIN_NODE_CAPACITY};
use parking_lot::lock_api::{ArcRwLockReadGuard, ArcRwLockWriteGuard};
use parking_lot::{RawRwLock, RwLock};

use crate::cursor::{BTreeCursor, Iter};
use crate::{AddOrUpdateResult, Comparer};

pub(crate) type LeafRef<K, V> = Arc<RwLock<Leaf<K, V>>>;
type InteriorRef<K, V> = Arc<RwLock<Interior<K, V>>>;
type ReadLatch<T> = ArcRwLockReadGuard<RawRwLock, T>;
type WriteLatch<T> = ArcRwLockWriteGuard<RawRwLock, T>;

/// A leaf: parallel key/value arrays plus sibling links.
///
/// `keys.len() == values.len()` whenever the latch is released.
pub(crate) struct Leaf<K, V> {
    pub(crate) keys: Vec<K>,
    pub(crate) values: Vec<V>,
    pub(crate) next: Option<LeafRef<K, V>>,
    pub(crate) previous: Weak<RwLock<Leaf<K, V>>>,
}

impl<K, V> Leaf<K, V> {
    fn empty() -> Self {
        Self {
            keys: Vec::new(),
            values: Vec::new(),
            next: None,
            previous: Weak::new(),
        }
    }
}

/// `children[i]` holds keys in `[keys[i - 1], keys[i])`.
struct Interior<K, V> {
    keys: Vec<K>,
    children: Vec<Child<K, V>>,
}

enum Child<K, V> {
    Leaf(LeafRef<K, V>),
    Interior(InteriorRef<K, V>),
}

impl<K, V> Clone for Child<K, V> {
    fn clone(&self) -> Self {
        match self {
            Child::Leaf(leaf) => Child::Leaf(Arc::clone(leaf)),
            Child::Interior(node) => Child::Interior(Arc::clone(node)),
        }
    }
}

/// An ordered map safe for concurrent inserts and scans.
///
/// There is no delete: once linked, a leaf stays in the chain for the life
/// of the tree, which is what lets cursors run without a tree-wide lock.
///
/// Keys and values are cloned out to readers, so both must be `Clone`.
pub struct BTree<K, V, C> {
    root: RwLock<Child<K, V>>,
    /// Leftmost leaf. Splits keep the lower half in place, so this never moves.
    head: LeafRef<K, V>,
    len: AtomicUsize,
    comparer: C,
    leaf_capacity: usize,
    interior_capacity: usize,
}

impl<K, V, C> BTree<K, V, C> {
    /// Number of entries.
    ///
    /// Under concurrent inserts this is a lower bound: every entry counted
    /// here is already reachable by a scan that starts afterwards.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len.load(atomic::Ordering::Acquire)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The ordering every key in this tree is kept in.
    pub fn comparer(&self) -> &C {
        &self.comparer
    }
}

impl<K, V, C> BTree<K, V, C>
where
    K: Clone,
    V: Clone,
    C: Comparer<K>,
{
    /// Creates an empty tree with default node capacities.
    pub fn new(comparer: C) -> Self {
        Self::with_capacity(comparer, DEFAULT_LEAF_CAPACITY, DEFAULT_INTERIOR_CAPACITY)
    }

    /// Creates an empty tree with the given node capacities (clamped to
    /// [`MIN_NODE_CAPACITY`]).
    pub fn with_capacity(comparer: C, leaf_capacity: usize, interior_capacity: usize) -> Self {
        let head = Arc::new(RwLock::new(Leaf::empty()));
        Self {
            root: RwLock::new(Child::Leaf(Arc::clone(&head))),
            head,
            len: AtomicUsize::new(0),
            comparer,
            leaf_capacity: leaf_capacity.max(MIN_NODE_CAPACITY),
            interior_capacity: interior_capacity.max(MIN_NODE_CAPACITY),
        }
    }

    /// Returns a clone of the value stored under `key`.
    pub fn get(&self, key: &K) -> Option<V> {
        let (_, leaf) = self.descend(key, |leaf| leaf.read_arc());
        let idx = self.search(&leaf.keys, key).ok()?;
        Some(leaf.values[idx].clone())
    }

    pub fn contains_key(&self, key: &K) -> bool {
        let (_, leaf) = self.descend(key, |leaf| leaf.read_arc());
        self.search(&leaf.keys, key).is_ok()
    }

    /// Inserts `key` if absent. Returns `false` without touching the tree
    /// when the key already exists.
    pub fn try_insert(&self, key: K, value: V) -> bool {
        self.compute(key, move |slot| match slot {
            Some(_) => (None, false),
            None => (Some(value), true),
        })
    }

    /// Inserts `key` or overwrites its value.
    pub fn insert_or_replace(&self, key: K, value: V) -> AddOrUpdateResult {
        self.compute(key, move |slot| match slot {
            Some(existing) => {
                *existing = value;
                (None, AddOrUpdateResult::Updated)
            }
            None => (Some(value), AddOrUpdateResult::Added),
        })
    }

    /// Runs exactly one of the callbacks under the owning leaf's latch.
    ///
    /// `on_add` receives a default-initialized slot that becomes the new
    /// value; `on_update` receives the stored value. Concurrent callers only
    /// contend when they land on the same leaf (or on the ancestors of a
    /// splitting leaf).
    pub fn add_or_update<A, U>(&self, key: K, on_add: A, on_update: U) -> AddOrUpdateResult
    where
        V: Default,
        A: FnOnce(&mut V) -> AddOrUpdateResult,
        U: FnOnce(&mut V) -> AddOrUpdateResult,
    {
        self.compute(key, move |slot| match slot {
            Some(existing) => (None, on_update(existing)),
            None => {
                let mut value = V::default();
                let result = on_add(&mut value);
                (Some(value), result)
            }
        })
    }

    /// Head of the leaf chain.
    pub fn first(&self) -> LeafNode<'_, K, V> {
        LeafNode::new(Arc::clone(&self.head))
    }

    /// Tail of the leaf chain as of this call.
    pub fn last(&self) -> LeafNode<'_, K, V> {
        let mut leaf = self.last_leaf();
        loop {
            let next = leaf.read().next.clone();
            match next {
                Some(next) => leaf = next,
                None => return LeafNode::new(leaf),
            }
        }
    }

    /// A cursor that has not been positioned yet.
    pub fn cursor(&self) -> BTreeCursor<'_, K, V, C> {
        BTreeCursor::new(self)
    }

    /// Ascending iterator over cloned entries.
    pub fn iter(&self) -> Iter<'_, K, V, C> {
        Iter::new(self.cursor())
    }

    pub(crate) fn head(&self) -> LeafRef<K, V> {
        Arc::clone(&self.head)
    }

    /// Leaf whose key range covers `key`, unlatched.
    pub(crate) fn leaf_for(&self, key: &K) -> LeafRef<K, V> {
        self.descend(key, |_| ()).0
    }

    /// Rightmost leaf reachable from the root.
    pub(crate) fn last_leaf(&self) -> LeafRef<K, V> {
        let root = self.root.read();
        let mut parent: ReadLatch<Interior<K, V>> = match &*root {
            Child::Leaf(leaf) => return Arc::clone(leaf),
            Child::Interior(node) => node.read_arc(),
        };
        drop(root);
        loop {
            let child = parent.children[parent.children.len() - 1].clone();
            match child {
                Child::Leaf(leaf) => return leaf,
                Child::Interior(node) => parent = node.read_arc(),
            }
        }
    }

    fn search(&self, keys: &[K], key: &K) -> Result<usize, usize> {
        keys.binary_search_by(|k| self.comparer.compare(k, key))
    }

    fn child_index(&self, separators: &[K], key: &K) -> usize {
        separators.partition_point(|sep| self.comparer.compare(sep, key) != Ordering::Greater)
    }

    /// Read-latch crabbing from the root down to the leaf covering `key`.
    /// `latch` runs while the leaf's parent is still latched.
    fn descend<G>(&self, key: &K, latch: impl Fn(&LeafRef<K, V>) -> G) -> (LeafRef<K, V>, G) {
        let root = self.root.read();
        let mut parent: ReadLatch<Interior<K, V>> = match &*root {
            Child::Leaf(leaf) => {
                let guard = latch(leaf);
                return (Arc::clone(leaf), guard);
            }
            Child::Interior(node) => node.read_arc(),
        };
        drop(root);
        loop {
            let child = parent.children[self.child_index(&parent.keys, key)].clone();
            match child {
                Child::Leaf(leaf) => {
                    let guard = latch(&leaf);
                    return (leaf, guard);
                }
                Child::Interior(node) => parent = node.read_arc(),
            }
        }
    }

    /// The general mutation entry point, run under the owning leaf's latch.
    ///
    /// `f` runs exactly once. It sees `Some(value)` when the key is present
    /// and may update it in place; when the key is absent it sees `None` and
    /// returns the value to insert, or `None` to leave the tree unchanged.
    /// Callers racing on the same key are serialized, so `f` can pair the
    /// mutation with an ordered side effect such as a log append.
    pub fn compute<F, R>(&self, key: K, f: F) -> R
    where
        F: FnOnce(Option<&mut V>) -> (Option<V>, R),
    {
        match self.upsert_optimistic(key, f) {
            Ok(result) => result,
            Err((key, f)) => self.upsert_pessimistic(key, f),
        }
    }

    /// Gives `key` and `f` back untouched when the insert would split the leaf.
    fn upsert_optimistic<F, R>(&self, key: K, f: F) -> Result<R, (K, F)>
    where
        F: FnOnce(Option<&mut V>) -> (Option<V>, R),
    {
        let (_, mut leaf) = self.descend(&key, |leaf| leaf.write_arc());
        match self.search(&leaf.keys, &key) {
            Ok(idx) => {
                let (_, result) = f(Some(&mut leaf.values[idx]));
                Ok(result)
            }
            Err(_) if leaf.keys.len() >= self.leaf_capacity => Err((key, f)),
            Err(idx) => {
                let (value, result) = f(None);
                if let Some(value) = value {
                    leaf.keys.insert(idx, key);
                    leaf.values.insert(idx, value);
                    self.len.fetch_add(1, atomic::Ordering::AcqRel);
                }
                Ok(result)
            }
        }
    }

    fn upsert_pessimistic<F, R>(&self, key: K, f: F) -> R
    where
        F: FnOnce(Option<&mut V>) -> (Option<V>, R),
    {
        let root = self.root.write();
        let mut child = (*root).clone();
        let mut root = Some(root);
        let mut path: Vec<(WriteLatch<Interior<K, V>>, usize)> = Vec::new();

        let leaf_ref = loop {
            match child {
                Child::Leaf(leaf) => break leaf,
                Child::Interior(node) => {
                    let guard = node.write_arc();
                    if guard.keys.len() < self.interior_capacity {
                        // A split below stops here; nothing above can change.
                        root = None;
                        path.clear();
                    }
                    let idx = self.child_index(&guard.keys, &key);
                    child = guard.children[idx].clone();
                    path.push((guard, idx));
                }
            }
        };

        let mut leaf = leaf_ref.write_arc();
        let idx = match self.search(&leaf.keys, &key) {
            Ok(idx) => {
                let (_, result) = f(Some(&mut leaf.values[idx]));
                return result;
            }
            Err(idx) => idx,
        };
        let (value, result) = f(None);
        let Some(value) = value else {
            return result;
        };
        leaf.keys.insert(idx, key);
        leaf.values.insert(idx, value);
        self.len.fetch_add(1, atomic::Ordering::AcqRel);
        if leaf.keys.len() <= self.leaf_capacity {
            return result;
        }

        let (mut separator, right) = split_leaf(&leaf_ref, &mut leaf);
        drop(leaf);
        let mut new_child = Child::Leaf(right);

        while let Some((mut parent, idx)) = path.pop() {
            parent.keys.insert(idx, separator);
            parent.children.insert(idx + 1, new_child);
            if parent.keys.len() <= self.interior_capacity {
                return result;
            }
            let (up, right) = split_interior(&mut parent);
            separator = up;
            new_child = Child::Interior(right);
        }

        let Some(mut root) = root else {
            unreachable!("split propagated above a node with spare capacity");
        };
        let left = (*root).clone();
        *root = Child::Interior(Arc::new(RwLock::new(Interior {
            keys: vec![separator],
            children: vec![left, new_child],
        })));
        result
    }
}

/// Moves the upper half of `left` into a new right sibling and links it into
/// the chain. Returns the separator (the sibling's first key) and the sibling.
fn split_leaf<K: Clone, V>(left_ref: &LeafRef<K, V>, left: &mut Leaf<K, V>) -> (K, LeafRef<K, V>) {
    let mid = left.keys.len() / 2;
    let keys = left.keys.split_off(mid);
    let values = left.values.split_off(mid);
    let separator = keys[0].clone();
    let next = left.next.take();

    let right = Arc::new(RwLock::new(Leaf {
        keys,
        values,
        next: next.clone(),
        previous: Arc::downgrade(left_ref),
    }));
    if let Some(next) = next {
        next.write().previous = Arc::downgrade(&right);
    }
    left.next = Some(Arc::clone(&right));
    (separator, right)
}

/// Splits an overfull interior node around its middle separator, which moves
/// up to the parent.
fn split_interior<K, V>(node: &mut Interior<K, V>) -> (K, InteriorRef<K, V>) {
    let mid = node.keys.len() / 2;
    let keys = node.keys.split_off(mid + 1);
    let children = node.children.split_off(mid + 1);
    let up = node.keys.remove(mid);
    (up, Arc::new(RwLock::new(Interior { keys, children })))
}

impl<K, V, C> Drop for BTree<K, V, C> {
    fn drop(&mut self) {
        // Unlink iteratively so a long chain is not dropped recursively.
        let mut next = self.head.write().next.take();
        while let Some(leaf) = next {
            next = leaf.write().next.take();
        }
    }
}

/// A handle to one leaf of a [`BTree`], borrowed from the tree.
pub struct LeafNode<'t, K, V> {
    leaf: LeafRef<K, V>,
    _tree: PhantomData<&'t ()>,
}

impl<'t, K: Clone, V: Clone> LeafNode<'t, K, V> {
    fn new(leaf: LeafRef<K, V>) -> Self {
        Self {
            leaf,
            _tree: PhantomData,
        }
    }

    /// Number of entries currently held by this leaf.
    pub fn len(&self) -> usize {
        self.leaf.read().keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of this leaf's keys.
    pub fn keys(&self) -> Vec<K> {
        self.leaf.read().keys.clone()
    }

    /// Snapshot of this leaf's entries, in key order.
    pub fn entries(&self) -> Vec<(K, V)> {
        let leaf = self.leaf.read();
        leaf.keys.iter().cloned().zip(leaf.values.iter().cloned()).collect()
    }

    /// Right sibling, following the chain as it stands now.
    pub fn next_node(&self) -> Option<Self> {
        self.leaf.read().next.clone().map(Self::new)
    }

    /// Left sibling, or `None` on the head leaf.
    pub fn previous_node(&self) -> Option<Self> {
        self.leaf.read().previous.upgrade().map(Self::new)
    }
}
