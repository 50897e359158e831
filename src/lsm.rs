//! The LSM coordinator: the public [`Engine`] that routes inserts,
//! deletes, and gets across L0 (the memory level) and L1..L(max_level-1)
//! (the storage levels), cascading flushes as levels fill.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, trace};

use crate::codec;
use crate::config::EngineConfig;
use crate::level::LevelError;
use crate::memory_level::MemoryLevel;
use crate::sstable::SSTableError;
use crate::storage_level::StorageLevel;

/// Errors returned by [`Engine`] operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// `get` found no record for the key at any level.
    #[error("key not found")]
    KeyNotFound,

    /// `get` found a tombstone for the key — it was deleted and the
    /// delete has not yet been compacted away.
    #[error("key was deleted (tombstone not yet compacted)")]
    KeyTombstoned,

    /// Error from a memory or storage level.
    #[error("level error: {0}")]
    Level(#[from] LevelError),

    /// Error from an underlying SSTable operation.
    #[error("SSTable error: {0}")]
    SSTable(#[from] SSTableError),

    /// Underlying filesystem I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One zero-based level directory name under the engine's root.
fn level_dir(root: &Path, index: usize) -> PathBuf {
    root.join(index.to_string())
}

/// The embedded LSM key-value store.
///
/// `Engine` is deliberately `!Sync`-by-convention: the specification
/// rules out concurrent writers, so engine state is a plain owned
/// struct rather than behind an `Arc<RwLock<_>>` the way a
/// multi-writer-capable engine would need — that ceremony would have no
/// remaining purpose here.
pub struct Engine {
    root_dir: PathBuf,
    config: Arc<EngineConfig>,
    l0: MemoryLevel,
    levels: Vec<StorageLevel>, // L1..L(max_level - 1), indices 0..len map to levels 1..max_level
}

impl Engine {
    /// Opens (or creates) an engine rooted at `root_dir` with `config`.
    /// Ensures every level's subdirectory exists, then loads each level
    /// from whatever is already on disk.
    pub fn open(root_dir: impl Into<PathBuf>, config: EngineConfig) -> Result<Self, EngineError> {
        let root_dir = root_dir.into();
        let config = Arc::new(config);

        let mut l0 = MemoryLevel::new(
            level_dir(&root_dir, 0),
            config.memtable_capacity,
            config.skip_list_max_level,
            config.skip_list_p,
        );
        l0.load()?;

        let mut levels = Vec::with_capacity(config.max_level.saturating_sub(1));
        for index in 1..config.max_level {
            let mut level = StorageLevel::new(
                level_dir(&root_dir, index),
                index,
                config.max_count(index),
                config.memtable_capacity,
                config.bloom_fp_rate,
                config.skip_list_max_level,
                config.skip_list_p,
                config.hash_functions.clone(),
            );
            level.load()?;
            levels.push(level);
        }

        info!(root = %root_dir.display(), max_level = config.max_level, "engine opened");
        Ok(Self {
            root_dir,
            config,
            l0,
            levels,
        })
    }

    /// Root directory this engine is rooted at.
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Inserts `(key, value)`. If L0 is now full, cascades flushes down
    /// the level stack: pop L0 (or `Li`)'s oldest component, merge it
    /// into the overlapping components of the next level, and repeat
    /// while that next level is itself full.
    pub fn insert(&mut self, key: u64, value: u64) -> Result<(), EngineError> {
        match self.l0.insert(key, value) {
            Ok(()) => return Ok(()),
            Err(LevelError::Full) => {}
            Err(e) => return Err(e.into()),
        }
        self.cascade_flush()
    }

    fn cascade_flush(&mut self) -> Result<(), EngineError> {
        let deepest = self.config.max_level.saturating_sub(1);

        // i = 0 means L0; i >= 1 means self.levels[i - 1].
        let mut i = 0usize;
        loop {
            let is_full = if i == 0 {
                self.l0.is_full()
            } else {
                self.levels[i - 1].is_full()
            };
            if !is_full || i >= deepest {
                break;
            }

            let (payload, min_key, max_key) = if i == 0 {
                self.l0.flush_first_component()?
            } else {
                self.levels[i - 1].flush_first_component()?
            };

            let next_index = i + 1;
            let is_deepest_level = next_index == deepest;
            self.levels[next_index - 1].insert_flushed_data(payload, min_key, max_key, is_deepest_level)?;

            if i == 0 {
                self.l0.remove_flushed_component()?;
            } else {
                self.levels[i - 1].remove_flushed_component()?;
            }
            self.levels[next_index - 1].remove_flushed_component()?;

            trace!(from = i, to = next_index, "cascaded flush");
            i = next_index;
        }
        Ok(())
    }

    /// Deletes `key` by inserting a tombstone.
    pub fn delete(&mut self, key: u64) -> Result<(), EngineError> {
        self.insert(key, codec::TOMBSTONE)
    }

    /// Looks up `key`, querying levels in ascending order and returning
    /// the first hit. A tombstone hit is reported distinctly from a miss.
    pub fn get(&self, key: u64) -> Result<u64, EngineError> {
        if let Some(value) = self.l0.get(key) {
            return Self::interpret(value);
        }
        for level in &self.levels {
            if let Some(value) = level.get(key)? {
                return Self::interpret(value);
            }
        }
        Err(EngineError::KeyNotFound)
    }

    fn interpret(value: u64) -> Result<u64, EngineError> {
        if codec::is_tombstone(value) {
            Err(EngineError::KeyTombstoned)
        } else {
            Ok(value)
        }
    }

    /// Closes every level's file descriptors.
    pub fn close(&mut self) -> Result<(), EngineError> {
        self.l0.close();
        for level in &mut self.levels {
            level.close();
        }
        info!(root = %self.root_dir.display(), "engine closed");
        Ok(())
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.l0.close();
        for level in &mut self.levels {
            level.close();
        }
    }
}
