//! Shared plumbing for the two level kinds: the mutable memory level
//! ([`crate::memory_level`]) and the immutable storage levels
//! ([`crate::storage_level`]).
//!
//! Both levels need the same small set of filesystem helpers (directory
//! bootstrap, a random component name) and report through the same error
//! enum, mirroring how the teacher's `memtable`/`wal`/`sstable` modules
//! each get their own `thiserror` enum that the engine aggregates.

use std::fs;
use std::path::Path;

use rand::Rng;
use thiserror::Error;

use crate::sstable::SSTableError;

/// Errors produced by [`crate::memory_level::MemoryLevel`] and
/// [`crate::storage_level::StorageLevel`].
#[derive(Debug, Error)]
pub enum LevelError {
    /// The level has reached or exceeded its configured capacity. This is
    /// an internal signal consumed by the coordinator to trigger a flush
    /// cascade — it is never surfaced to an `Engine` caller.
    #[error("level is full")]
    Full,

    /// `remove_flushed_component` was called with nothing pending deletion.
    #[error("no component is pending deletion")]
    NoPendingDeletion,

    /// Error from an underlying SSTable operation.
    #[error("SSTable error: {0}")]
    SSTable(#[from] SSTableError),

    /// Underlying filesystem I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Creates `dir` (and any missing parents) if it does not already exist.
pub fn ensure_dir(dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dir)
}

const ALNUM: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generates a random 32-character alphanumeric string, used as the
/// unpredictable suffix of WAL and SSTable filenames.
pub fn random_alnum32() -> String {
    let mut rng = rand::rng();
    (0..32)
        .map(|_| ALNUM[rng.random_range(0..ALNUM.len())] as char)
        .collect()
}
