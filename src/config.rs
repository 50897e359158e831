//! Engine-wide configuration.
//!
//! Every tunable the specification names lives here rather than as
//! process-wide constants or a global RNG seed — the teacher's engine
//! takes the same approach with `EngineConfig` in `engine/mod.rs`.

use std::sync::Arc;

use crate::hash::{Fnv1a64, HashFunction, SipHash64};

/// Tunables for an [`crate::lsm::Engine`] instance.
pub struct EngineConfig {
    /// Memtable capacity `B`: the record count at which L0 reports full.
    pub memtable_capacity: usize,

    /// Growth factor `G`: `MaxCount(Li) = memtable_capacity * growth_factor^i`.
    pub growth_factor: u64,

    /// Number of levels, L0..=L(max_level - 1).
    pub max_level: usize,

    /// Independent hash functions fed to each SSTable's Bloom filter.
    /// Must contain at least one entry. Held behind `Arc` so every
    /// freshly built SSTable can cheaply clone the same injected set.
    pub hash_functions: Vec<Arc<dyn HashFunction>>,

    /// Target false-positive rate for Bloom filters (default `0.001`).
    pub bloom_fp_rate: f64,

    /// Skip list level-up probability (default `0.5`), passed through to
    /// every memtable and per-SSTable index built for this engine.
    pub skip_list_p: f64,

    /// Skip list maximum tower height (default `4`), passed through to
    /// every memtable and per-SSTable index built for this engine.
    pub skip_list_max_level: usize,
}

impl EngineConfig {
    /// Returns `MaxCount(Li) = memtable_capacity * growth_factor^i`.
    pub fn max_count(&self, level: usize) -> u64 {
        self.memtable_capacity as u64 * self.growth_factor.pow(level as u32)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            memtable_capacity: 3,
            growth_factor: 2,
            max_level: 4,
            hash_functions: vec![Arc::new(Fnv1a64), Arc::new(SipHash64::new(0x5EED))],
            bloom_fp_rate: 0.001,
            skip_list_p: 0.5,
            skip_list_max_level: 4,
        }
    }
}
