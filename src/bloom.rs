//! Per-SSTable Bloom filter with injectable hash functions.
//!
//! Capacity `m` is derived from the false-positive target `p` and
//! expected element count `n`; `k`, the hash function count, is left to
//! the caller (so a fixed reference pair can be injected) but is checked
//! against the capacity-derived optimum at construction time. Matches
//! `original_source/bloom_filter/BloomFilter.go`'s
//! `GetCapacityFromErrorMargin` / `GetOptimalNumberOfHashFunctions`.

use std::sync::Arc;

use tracing::warn;

use crate::hash::HashFunction;

/// A fixed-capacity bit array tested against `k` independent hash functions.
pub struct BloomFilter {
    bits: Vec<bool>,
    hash_functions: Vec<Arc<dyn HashFunction>>,
}

impl BloomFilter {
    /// Computes the optimal bit-array capacity for `n` expected elements
    /// and a target false-positive rate `p`.
    pub fn capacity_from_error_margin(n: usize, p: f64) -> usize {
        let n = n.max(1) as f64;
        (-(n * p.ln()) / std::f64::consts::LN_2).ceil() as usize
    }

    /// Computes the optimal number of hash functions for a filter of
    /// capacity `m` holding `n` expected elements.
    pub fn optimal_hash_count(m: usize, n: usize) -> usize {
        let m = m.max(1) as f64;
        let n = n.max(1) as f64;
        (((m / n) * std::f64::consts::LN_2).ceil() as usize).max(1)
    }

    /// Builds a new, empty filter sized for `n` expected elements at false
    /// positive rate `p`, using every hash function in `hash_functions`
    /// (at least one is required). `k`, the number of hash functions
    /// actually used, is `hash_functions.len()` rather than the computed
    /// `optimal_hash_count` — a caller is free to inject its own reference
    /// pair — but a `k` that departs far from the optimum degrades either
    /// the false-positive rate (`k` too low) or lookup cost (`k` too high),
    /// so a large departure is logged.
    pub fn new(n: usize, p: f64, hash_functions: Vec<Arc<dyn HashFunction>>) -> Self {
        let capacity = Self::capacity_from_error_margin(n, p);
        let optimal_k = Self::optimal_hash_count(capacity, n);
        let actual_k = hash_functions.len();
        if actual_k == 0 {
            warn!("bloom filter built with zero hash functions; every lookup will report a match");
        } else if actual_k.abs_diff(optimal_k) > optimal_k {
            warn!(actual_k, optimal_k, n, capacity, "hash function count departs far from the optimum for this filter's size");
        }
        Self {
            bits: vec![false; capacity.max(1)],
            hash_functions,
        }
    }

    /// Number of bits in the underlying array.
    pub fn capacity(&self) -> usize {
        self.bits.len()
    }

    /// Sets the bit for every hash function's digest of `key_bytes`.
    pub fn add(&mut self, key_bytes: &[u8]) {
        let capacity = self.bits.len();
        for h in &self.hash_functions {
            let idx = (h.hash(key_bytes) as usize) % capacity;
            self.bits[idx] = true;
        }
    }

    /// Returns `true` if every hash function's bit for `key_bytes` is set.
    ///
    /// A `true` result may be a false positive; a `false` result is a
    /// guaranteed miss.
    pub fn contains(&self, key_bytes: &[u8]) -> bool {
        let capacity = self.bits.len();
        self.hash_functions
            .iter()
            .all(|h| self.bits[(h.hash(key_bytes) as usize) % capacity])
    }
}
