use super::shuffled;
use crate::*;

#[test]
fn insert_overwrites_and_returns_old_value() {
    let mut list = SkipList::with_default_height(Ascending);
    assert_eq!(list.max_level(), config::DEFAULT_SKIP_LIST_MAX_LEVEL);
    assert_eq!(list.insert("k", 1), None);
    assert_eq!(list.insert("k", 2), Some(1));
    assert_eq!(list.get(&"k"), Some(&2));
    assert_eq!(list.len(), 1);
}

#[test]
fn try_insert_rejects_duplicates() {
    let mut list = SkipList::new(Ascending, 8);
    assert!(list.try_insert(1, "a"));
    assert!(!list.try_insert(1, "b"));
    assert_eq!(list.get(&1), Some(&"a"));
    assert!(list.contains_key(&1));
    assert!(!list.contains_key(&2));
}

#[test]
fn get_missing_key() {
    let mut list = SkipList::new(Ascending, 8);
    assert!(list.get(&5).is_none());
    list.insert(4, ());
    list.insert(6, ());
    assert!(list.get(&5).is_none());
    assert!(!list.is_empty());
}

#[test]
fn node_handles_walk_the_list() {
    let mut list = SkipList::with_seed(Ascending, 6, 1);
    for k in shuffled(200, 2) {
        list.insert(k, k * 3);
    }

    let mut keys = Vec::new();
    let mut node = list.first_node();
    while let Some(n) = node {
        assert_eq!(*n.value(), *n.key() * 3);
        keys.push(*n.key());
        node = n.next_node();
    }
    assert_eq!(keys, (0..200).collect::<Vec<_>>());

    let mut keys = Vec::new();
    let mut node = list.last_node();
    while let Some(n) = node {
        keys.push(*n.key());
        node = n.previous_node();
    }
    assert_eq!(keys, (0..200).rev().collect::<Vec<_>>());
}

#[test]
fn bound_queries() {
    let mut list = SkipList::with_seed(Ascending, 4, 3);
    for k in [1, 3, 5, 7, 9] {
        list.insert(k, ());
    }
    let ge = |k: i64| list.first_node_greater_or_equal(&k).map(|n| *n.key());
    let le = |k: i64| list.last_node_smaller_or_equal(&k).map(|n| *n.key());

    assert_eq!(ge(0), Some(1));
    assert_eq!(ge(4), Some(5));
    assert_eq!(ge(9), Some(9));
    assert_eq!(ge(10), None);
    assert_eq!(le(0), None);
    assert_eq!(le(4), Some(3));
    assert_eq!(le(1), Some(1));
    assert_eq!(le(100), Some(9));
}

#[test]
fn rank_access_matches_sorted_order() {
    let mut list = SkipList::with_seed(Ascending, 10, 99);
    for k in shuffled(1000, 4) {
        list.insert(k * 5, k);
    }
    assert_eq!(list.element_count(), 1000);
    for rank in 0..1000 {
        assert_eq!(list.get_key(rank), Some(&(rank as i64 * 5)));
        assert_eq!(list.get_value(rank), Some(&(rank as i64)));
    }
    assert_eq!(list.get_key(1000), None);
    assert_eq!(list.get_value(usize::MAX), None);
}

#[test]
fn rank_access_survives_overwrites() {
    let mut list = SkipList::with_seed(Ascending, 5, 8);
    for k in 0..100 {
        list.insert(k, 0);
    }
    for k in (0..100).step_by(3) {
        list.insert(k, 1);
    }
    assert_eq!(list.len(), 100);
    assert_eq!(list.get_key(99), Some(&99));
    assert_eq!(list.get_value(3), Some(&1));
    assert_eq!(list.get_value(4), Some(&0));
}

#[test]
fn single_level_list_still_works() {
    let mut list = SkipList::with_seed(Ascending, 1, 0);
    for k in shuffled(100, 6) {
        list.insert(k, ());
    }
    assert_eq!(list.max_level(), 1);
    assert_eq!(list.get_key(50), Some(&50));
    assert_eq!(list.first_node().map(|n| *n.key()), Some(0));
    assert_eq!(list.last_node().map(|n| *n.key()), Some(99));
}

#[test]
fn descending_skiplist() {
    let mut list = SkipList::new(Descending, 8);
    for k in shuffled(50, 10) {
        list.insert(k, ());
    }
    assert_eq!(list.get_key(0), Some(&49));
    assert_eq!(list.first_node_greater_or_equal(&20).map(|n| *n.key()), Some(20));
    assert_eq!(list.last_node_smaller_or_equal(&25).map(|n| *n.key()), Some(25));
}
