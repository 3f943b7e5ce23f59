/// Read path: point lookups and ordered scans. Reads never touch the log.
use index::{BTreeCursor, Comparer, Iter};

use crate::Segment;

impl<K, V, C> Segment<K, V, C>
where
    K: Clone,
    V: Clone,
    C: Comparer<K>,
{
    /// Returns a clone of the value stored under `key`.
    pub fn get(&self, key: &K) -> Option<V> {
        self.tree.get(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.tree.contains_key(key)
    }

    /// Number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// A cursor over the segment, safe to use while others write.
    pub fn cursor(&self) -> BTreeCursor<'_, K, V, C> {
        self.tree.cursor()
    }

    /// Ascending iterator over cloned entries.
    pub fn iter(&self) -> Iter<'_, K, V, C> {
        self.tree.iter()
    }
}
