use std::thread;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use index::{Ascending, BTree, IndexedReader, SeekableCursor, SkipList};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

const N_KEYS: i64 = 100_000;
const THREADS: usize = 4;

fn shuffled_keys() -> Vec<i64> {
    let mut keys: Vec<i64> = (0..N_KEYS).collect();
    keys.shuffle(&mut StdRng::seed_from_u64(0x5eed));
    keys
}

fn btree_insert_benchmark(c: &mut Criterion) {
    c.bench_function("btree_random_inserts_100k", |b| {
        b.iter_batched(
            shuffled_keys,
            |keys| {
                let tree = BTree::new(Ascending);
                for k in keys {
                    tree.try_insert(k, k);
                }
                tree
            },
            BatchSize::LargeInput,
        );
    });

    c.bench_function("btree_sequential_inserts_100k", |b| {
        b.iter(|| {
            let tree = BTree::new(Ascending);
            for k in 0..N_KEYS {
                tree.try_insert(k, k);
            }
            tree
        });
    });
}

fn btree_parallel_insert_benchmark(c: &mut Criterion) {
    c.bench_function("btree_parallel_random_inserts_100k", |b| {
        b.iter_batched(
            shuffled_keys,
            |keys| {
                let tree = BTree::new(Ascending);
                thread::scope(|s| {
                    for chunk in keys.chunks(keys.len() / THREADS) {
                        let tree = &tree;
                        s.spawn(move || {
                            for &k in chunk {
                                tree.try_insert(k, k);
                            }
                        });
                    }
                });
                tree
            },
            BatchSize::LargeInput,
        );
    });
}

fn btree_scan_benchmark(c: &mut Criterion) {
    let tree = BTree::new(Ascending);
    for k in shuffled_keys() {
        tree.try_insert(k, k);
    }
    c.bench_function("btree_cursor_scan_100k", |b| {
        b.iter(|| {
            let mut cursor = tree.cursor();
            let mut n = 0;
            while cursor.next() {
                n += 1;
            }
            assert_eq!(n, N_KEYS);
        });
    });
}

fn skiplist_benchmark(c: &mut Criterion) {
    c.bench_function("skiplist_random_inserts_100k", |b| {
        b.iter_batched(
            shuffled_keys,
            |keys| {
                let mut list = SkipList::new(Ascending, 17);
                for k in keys {
                    list.insert(k, k);
                }
                list
            },
            BatchSize::LargeInput,
        );
    });

    let mut list = SkipList::with_seed(Ascending, 17, 1);
    for k in shuffled_keys() {
        list.insert(k, k);
    }
    c.bench_function("skiplist_rank_lookup_100k", |b| {
        b.iter(|| {
            for rank in (0..N_KEYS as usize).step_by(7) {
                assert!(list.get_key(rank).is_some());
            }
        });
    });
}

criterion_group!(
    benches,
    btree_insert_benchmark,
    btree_parallel_insert_benchmark,
    btree_scan_benchmark,
    skiplist_benchmark
);
criterion_main!(benches);
