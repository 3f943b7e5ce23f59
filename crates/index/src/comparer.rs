use std::cmp::Ordering;

/// Three-way total order over keys, injected into every index.
///
/// Any `Fn(&K, &K) -> Ordering` closure is a comparer, so ad-hoc orderings
/// need no wrapper type.
pub trait Comparer<K: ?Sized>: Send + Sync {
    fn compare(&self, a: &K, b: &K) -> Ordering;
}

/// The key type's natural [`Ord`] order.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ascending;

/// The reverse of the key type's natural [`Ord`] order.
#[derive(Debug, Clone, Copy, Default)]
pub struct Descending;

impl<K: Ord + ?Sized> Comparer<K> for Ascending {
    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        a.cmp(b)
    }
}

impl<K: Ord + ?Sized> Comparer<K> for Descending {
    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        b.cmp(a)
    }
}

impl<K, F> Comparer<K> for F
where
    F: Fn(&K, &K) -> Ordering + Send + Sync,
{
    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        self(a, b)
    }
}
