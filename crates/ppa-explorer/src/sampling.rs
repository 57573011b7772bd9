//! Lazily materialized, seeded permutations of grid indices.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;

/// A Fisher-Yates shuffle of `0..len` produced one element at a time.
///
/// Only displaced slots are stored, so drawing `k` indices from a huge grid
/// costs `O(k)` memory. The same seed always yields the same order.
#[derive(Debug, Clone)]
pub struct LazyPermutation<R = ChaCha8Rng> {
    rng: R,
    len: u64,
    cursor: u64,
    displaced: HashMap<u64, u64>,
}

impl LazyPermutation<ChaCha8Rng> {
    pub fn seeded(len: u64, seed: u64) -> Self {
        Self::with_rng(len, ChaCha8Rng::seed_from_u64(seed))
    }
}

impl<R: Rng> LazyPermutation<R> {
    pub fn with_rng(len: u64, rng: R) -> Self {
        Self {
            rng,
            len,
            cursor: 0,
            displaced: HashMap::new(),
        }
    }
}

impl<R: Rng> Iterator for LazyPermutation<R> {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        if self.cursor >= self.len {
            return None;
        }
        let i = self.cursor;
        let j = self.rng.random_range(i..self.len);
        let at_j = self.displaced.get(&j).copied().unwrap_or(j);
        let at_i = self.displaced.remove(&i).unwrap_or(i);
        if j != i {
            self.displaced.insert(j, at_i);
        }
        self.cursor += 1;
        Some(at_j)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.len - self.cursor).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}
