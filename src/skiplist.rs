//! Randomised skip list used both as the mutable memtable (L0) and as the
//! dense in-memory index rebuilt for every SSTable.
//!
//! Nodes live in an arena (`Vec<Node>`) addressed by index rather than as a
//! graph of raw pointers or `Box`-linked nodes, so the whole structure is
//! safe Rust with no `unsafe` blocks. Index 0 is always the sentinel head;
//! real nodes start at index 1.

use rand::RngCore;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Default maximum tower height.
pub const DEFAULT_MAX_LEVEL: usize = 4;

/// Default probability of promoting a node to the next level.
pub const DEFAULT_P: f64 = 0.5;

const HEAD: usize = 0;

struct Node {
    key: u64,
    value: u64,
    /// `next[level]` is the arena index of this node's successor at
    /// `level`, or `None` at the tail.
    next: Vec<Option<usize>>,
}

/// An ordered map from `u64` key to `u64` value with probabilistic
/// logarithmic-expected-time search.
pub struct SkipList {
    nodes: Vec<Node>,
    max_level: usize,
    p: f64,
    rng: Box<dyn RngCore + Send>,
    len: usize,
}

impl SkipList {
    /// Creates an empty skip list with the default parameters, seeding
    /// its tower-height RNG from OS entropy. `StdRng` is used (rather
    /// than boxing the thread-local `rand::rng()` directly) so the
    /// stored RNG is unconditionally `Send`.
    pub fn new() -> Self {
        Self::with_params(DEFAULT_MAX_LEVEL, DEFAULT_P, Box::new(StdRng::from_os_rng()))
    }

    /// Creates an empty skip list with an explicit, injectable RNG —
    /// used by tests that need deterministic tower heights.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_params(
            DEFAULT_MAX_LEVEL,
            DEFAULT_P,
            Box::new(StdRng::seed_from_u64(seed)),
        )
    }

    /// Creates an empty skip list with a configured tower height and
    /// level-up probability, seeding its RNG from OS entropy. Used by
    /// production callers (the memtable, the per-SSTable index) that
    /// thread `EngineConfig`'s `skip_list_max_level`/`skip_list_p`
    /// through rather than accepting the hardcoded defaults.
    pub fn with_level_params(max_level: usize, p: f64) -> Self {
        Self::with_params(max_level, p, Box::new(StdRng::from_os_rng()))
    }

    /// Creates an empty skip list with fully explicit parameters.
    pub fn with_params(max_level: usize, p: f64, rng: Box<dyn RngCore + Send>) -> Self {
        let max_level = max_level.max(1);
        Self {
            nodes: vec![Node {
                key: 0,
                value: 0,
                next: vec![None; max_level],
            }],
            max_level,
            p,
            rng,
            len: 0,
        }
    }

    /// Number of real (non-sentinel) nodes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// `true` if the list holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The smallest key currently stored, if any.
    pub fn head(&self) -> Option<(u64, u64)> {
        self.nodes[HEAD].next[0].map(|idx| (self.nodes[idx].key, self.nodes[idx].value))
    }

    /// The largest key currently stored, if any.
    pub fn tail(&self) -> Option<(u64, u64)> {
        let mut current = HEAD;
        while let Some(next) = self.nodes[current].next[0] {
            current = next;
        }
        if current == HEAD {
            None
        } else {
            Some((self.nodes[current].key, self.nodes[current].value))
        }
    }

    fn random_level(&mut self) -> usize {
        let mut level = 1;
        while level < self.max_level && self.rng.random::<f64>() < self.p {
            level += 1;
        }
        level
    }

    /// Finds, for each level, the arena index of the last node whose key
    /// is strictly less than `key`.
    fn predecessors(&self, key: u64) -> Vec<usize> {
        let mut update = vec![HEAD; self.max_level];
        let mut current = HEAD;
        for level in (0..self.max_level).rev() {
            while let Some(next) = self.nodes[current].next[level] {
                if self.nodes[next].key < key {
                    current = next;
                } else {
                    break;
                }
            }
            update[level] = current;
        }
        update
    }

    /// Looks up `key`, returning its value if present.
    pub fn get(&self, key: u64) -> Option<u64> {
        let update = self.predecessors(key);
        let candidate = self.nodes[update[0]].next[0];
        candidate
            .filter(|&idx| self.nodes[idx].key == key)
            .map(|idx| self.nodes[idx].value)
    }

    /// Inserts `(key, value)`. If `key` is already present its value is
    /// replaced in place — this fixes the degenerate "always append a new
    /// node" behaviour that would otherwise make `get` return the oldest
    /// write instead of the newest.
    pub fn insert(&mut self, key: u64, value: u64) {
        let update = self.predecessors(key);
        if let Some(existing) = self.nodes[update[0]].next[0]
            && self.nodes[existing].key == key
        {
            self.nodes[existing].value = value;
            return;
        }

        let level = self.random_level();
        let mut next = vec![None; level];
        for (l, slot) in next.iter_mut().enumerate() {
            *slot = self.nodes[update[l]].next[l];
        }

        let new_idx = self.nodes.len();
        self.nodes.push(Node { key, value, next });

        for (l, &pred) in update.iter().enumerate().take(level) {
            self.nodes[pred].next[l] = Some(new_idx);
        }

        self.len += 1;
    }

    /// Updates the value of an existing key. No-op if the key is absent.
    pub fn update(&mut self, key: u64, value: u64) {
        let update = self.predecessors(key);
        if let Some(existing) = self.nodes[update[0]].next[0]
            && self.nodes[existing].key == key
        {
            self.nodes[existing].value = value;
        }
    }

    /// Removes `key`, unlinking it from every level of its tower.
    ///
    /// The node's arena slot is left in place (tombstoned by unlinking)
    /// rather than compacted, since the arena is addressed by index and
    /// shifting would invalidate every other `next` pointer.
    pub fn delete(&mut self, key: u64) -> bool {
        let update = self.predecessors(key);
        let Some(target) = self.nodes[update[0]].next[0] else {
            return false;
        };
        if self.nodes[target].key != key {
            return false;
        }

        let target_height = self.nodes[target].next.len();
        for (l, &pred) in update.iter().enumerate().take(target_height) {
            if self.nodes[pred].next[l] == Some(target) {
                self.nodes[pred].next[l] = self.nodes[target].next[l];
            }
        }
        self.len -= 1;
        true
    }

    /// Iterates all entries in ascending key order (the level-0 chain).
    pub fn iter(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        SkipListIter {
            nodes: &self.nodes,
            current: self.nodes[HEAD].next[0],
        }
    }
}

impl Default for SkipList {
    fn default() -> Self {
        Self::new()
    }
}

struct SkipListIter<'a> {
    nodes: &'a [Node],
    current: Option<usize>,
}

impl Iterator for SkipListIter<'_> {
    type Item = (u64, u64);

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.current?;
        let node = &self.nodes[idx];
        self.current = node.next[0];
        Some((node.key, node.value))
    }
}
