mod btree_tests;
mod skiplist_tests;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// `0..n` in a reproducible random order.
pub fn shuffled(n: i64, seed: u64) -> Vec<i64> {
    let mut keys: Vec<i64> = (0..n).collect();
    keys.shuffle(&mut StdRng::seed_from_u64(seed));
    keys
}
