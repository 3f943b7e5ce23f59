use super::shuffled;
use crate::*;

// -------------------- Basic inserts --------------------

#[test]
fn empty_tree() {
    let tree: BTree<i64, i64, _> = BTree::new(Ascending);
    assert!(tree.is_empty());
    assert_eq!(tree.len(), 0);
    assert!(tree.get(&1).is_none());
    assert_eq!(tree.iter().count(), 0);
    assert!(tree.first().is_empty());
    assert!(tree.first().next_node().is_none());
}

#[test]
fn try_insert_keeps_first_value() {
    let tree = BTree::new(Ascending);
    assert!(tree.try_insert(7, "first"));
    assert!(!tree.try_insert(7, "second"));
    assert_eq!(tree.get(&7), Some("first"));
    assert_eq!(tree.len(), 1);
}

#[test]
fn insert_or_replace_reports_outcome() {
    let tree = BTree::new(Ascending);
    assert_eq!(tree.insert_or_replace(1, 10), AddOrUpdateResult::Added);
    assert_eq!(tree.insert_or_replace(1, 11), AddOrUpdateResult::Updated);
    assert_eq!(tree.get(&1), Some(11));
    assert_eq!(tree.len(), 1);
}

#[test]
fn add_or_update_runs_one_callback() {
    let tree: BTree<&str, u32, _> = BTree::new(Ascending);
    for word in ["a", "b", "a", "c", "a"] {
        tree.add_or_update(
            word,
            |v| {
                *v = 1;
                AddOrUpdateResult::Added
            },
            |v| {
                *v += 1;
                AddOrUpdateResult::Updated
            },
        );
    }
    assert_eq!(tree.get(&"a"), Some(3));
    assert_eq!(tree.get(&"b"), Some(1));
    assert_eq!(tree.len(), 3);
}

#[test]
fn contains_key_after_splits() {
    let tree = BTree::with_capacity(Ascending, 4, 4);
    for k in shuffled(500, 1) {
        tree.try_insert(k, k);
    }
    assert!(tree.contains_key(&0));
    assert!(tree.contains_key(&499));
    assert!(!tree.contains_key(&500));
    assert!(!tree.contains_key(&-1));
}

#[test]
fn compute_can_decline_insert() {
    let tree = BTree::new(Ascending);
    let inserted = tree.compute(1, |slot: Option<&mut i32>| match slot {
        Some(_) => (None, false),
        None => (None, false),
    });
    assert!(!inserted);
    assert!(tree.is_empty());

    tree.compute(1, |slot| {
        assert!(slot.is_none());
        (Some(5), ())
    });
    let old = tree.compute(1, |slot| {
        let v = slot.unwrap();
        let old = *v;
        *v += 1;
        (None, old)
    });
    assert_eq!(old, 5);
    assert_eq!(tree.get(&1), Some(6));
}

// -------------------- Ordering --------------------

#[test]
fn iter_yields_sorted_entries() {
    let tree = BTree::with_capacity(Ascending, 4, 4);
    for k in shuffled(2000, 7) {
        assert!(tree.try_insert(k, k * 2));
    }
    assert_eq!(tree.len(), 2000);
    let entries: Vec<(i64, i64)> = tree.iter().collect();
    assert_eq!(entries.len(), 2000);
    for (i, (k, v)) in entries.into_iter().enumerate() {
        assert_eq!(k, i as i64);
        assert_eq!(v, k * 2);
    }
}

#[test]
fn descending_comparer_reverses_order() {
    let tree = BTree::with_capacity(Descending, 4, 4);
    for k in shuffled(100, 3) {
        tree.try_insert(k, ());
    }
    let keys: Vec<i64> = tree.iter().map(|(k, _)| k).collect();
    let expected: Vec<i64> = (0..100).rev().collect();
    assert_eq!(keys, expected);
}

#[test]
fn closure_comparer() {
    // Order by absolute value.
    let tree = BTree::new(|a: &i64, b: &i64| a.abs().cmp(&b.abs()));
    tree.try_insert(-3, "minus three");
    tree.try_insert(2, "two");
    assert!(!tree.try_insert(3, "three"));
    let keys: Vec<i64> = tree.iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec![2, -3]);
}

#[test]
fn string_keys() {
    let tree = BTree::with_capacity(Ascending, 4, 4);
    for i in 0..50 {
        tree.try_insert(format!("key{:03}", i), i);
    }
    assert_eq!(tree.get(&"key042".to_string()), Some(42));
    let first = tree.iter().next().map(|(k, _)| k);
    assert_eq!(first.as_deref(), Some("key000"));
}

// -------------------- Leaf chain --------------------

#[test]
fn leaf_chain_covers_every_key_in_order() {
    let tree = BTree::with_capacity(Ascending, 4, 4);
    for k in shuffled(300, 11) {
        tree.try_insert(k, ());
    }

    let mut keys = Vec::new();
    let mut leaves = 0;
    let mut node = Some(tree.first());
    while let Some(leaf) = node {
        assert!(!leaf.is_empty());
        assert!(leaf.len() <= 4);
        keys.extend(leaf.keys());
        leaves += 1;
        node = leaf.next_node();
    }
    assert!(leaves > 1);
    assert_eq!(keys, (0..300).collect::<Vec<_>>());
}

#[test]
fn leaf_chain_walks_backward_from_last() {
    let tree = BTree::with_capacity(Ascending, 4, 4);
    for k in 0..100 {
        tree.try_insert(k, k);
    }

    let last = tree.last();
    assert!(last.next_node().is_none());
    assert_eq!(last.entries().last(), Some(&(99, 99)));

    let mut keys = Vec::new();
    let mut node = Some(last);
    while let Some(leaf) = node {
        keys.extend(leaf.keys().into_iter().rev());
        node = leaf.previous_node();
    }
    assert_eq!(keys, (0..100).rev().collect::<Vec<_>>());
}

#[test]
fn first_leaf_has_no_previous() {
    let tree = BTree::with_capacity(Ascending, 4, 4);
    for k in 0..20 {
        tree.try_insert(k, ());
    }
    assert!(tree.first().previous_node().is_none());
    assert_eq!(tree.first().keys()[0], 0);
}

#[test]
fn large_tree_drops_cleanly() {
    let tree = BTree::with_capacity(Ascending, 4, 4);
    for k in 0..100_000 {
        tree.try_insert(k, ());
    }
    assert_eq!(tree.len(), 100_000);
    drop(tree);
}
