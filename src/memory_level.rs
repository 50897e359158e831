//! Memory level (L0): the mutable memtable plus its write-ahead log.
//!
//! `MemoryLevel` is the only level that accepts writes directly. Every
//! `insert` both mutates the in-memory skip list and appends to the
//! currently-open log file, so a record that reached `insert` survives a
//! crash even if the memtable itself is lost. `flush_first_component`
//! swaps in a fresh, empty memtable and log under a new random name; the
//! old log is unlinked only once the coordinator confirms the flushed
//! payload has been durably absorbed by L1.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::codec;
use crate::level::{LevelError, ensure_dir, random_alnum32};
use crate::skiplist::SkipList;

/// Filename extension for L0's write-ahead log.
pub const LOG_EXTENSION: &str = "sl";

/// The mutable top level of the LSM tree.
pub struct MemoryLevel {
    dir: PathBuf,
    capacity: usize,
    skip_list_max_level: usize,
    skip_list_p: f64,
    memtable: SkipList,
    log_file: Option<File>,
    log_path: Option<PathBuf>,
    pending_delete: Option<PathBuf>,
}

impl MemoryLevel {
    /// Creates an L0 handle rooted at `dir` with record-count `capacity`
    /// (the spec's `B`), building its memtable with `skip_list_max_level`
    /// tower height and `skip_list_p` level-up probability. The memtable
    /// starts empty; call [`Self::load`] to bootstrap from an existing
    /// directory.
    pub fn new(
        dir: impl Into<PathBuf>,
        capacity: usize,
        skip_list_max_level: usize,
        skip_list_p: f64,
    ) -> Self {
        Self {
            dir: dir.into(),
            capacity,
            skip_list_max_level,
            skip_list_p,
            memtable: SkipList::with_level_params(skip_list_max_level, skip_list_p),
            log_file: None,
            log_path: None,
            pending_delete: None,
        }
    }

    /// Number of records currently resident in the memtable.
    pub fn len(&self) -> usize {
        self.memtable.len()
    }

    /// `true` if the memtable holds no records.
    pub fn is_empty(&self) -> bool {
        self.memtable.is_empty()
    }

    /// `true` once `len() >= capacity`.
    pub fn is_full(&self) -> bool {
        self.memtable.len() >= self.capacity
    }

    /// Looks up `key` in the memtable.
    pub fn get(&self, key: u64) -> Option<u64> {
        self.memtable.get(key)
    }

    /// Bootstraps this level: ensures its directory exists, then either
    /// opens the single log file found there and replays it into the
    /// memtable, or creates a fresh empty log. Replay runs in on-disk
    /// order, so the last write to a key in the file wins (the skip
    /// list's replace-on-duplicate `insert` makes this automatic).
    pub fn load(&mut self) -> Result<(), LevelError> {
        ensure_dir(&self.dir)?;

        let mut existing = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some(LOG_EXTENSION));

        match existing.next() {
            None => {
                self.open_fresh_log()?;
            }
            Some(path) => {
                let bytes = fs::read(&path)?;
                for block in bytes.chunks(codec::BLOCK_SIZE) {
                    if block.len() != codec::BLOCK_SIZE {
                        break;
                    }
                    let (key, value) = codec::decode(block)
                        .map_err(|e| LevelError::Io(std::io::Error::other(e)))?;
                    self.memtable.insert(key, value);
                }
                self.log_file = Some(OpenOptions::new().append(true).open(&path)?);
                self.log_path = Some(path);
            }
        }
        Ok(())
    }

    fn open_fresh_log(&mut self) -> Result<(), LevelError> {
        let path = self.dir.join(format!("{}.{}", random_alnum32(), LOG_EXTENSION));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        self.log_file = Some(file);
        self.log_path = Some(path);
        Ok(())
    }

    /// Inserts `(key, value)` into the memtable and appends it to the log.
    /// Returns [`LevelError::Full`] once the level has reached capacity —
    /// the record is already durable and resident by the time that error
    /// is returned; the coordinator uses it only as a cue to cascade a
    /// flush.
    pub fn insert(&mut self, key: u64, value: u64) -> Result<(), LevelError> {
        let block = codec::encode(key, value);
        let log = self.log_file.as_mut().expect("load() called before insert");
        log.write_all(&block)?;
        log.sync_data()?;

        self.memtable.insert(key, value);
        trace!(key, "L0 insert");

        if self.is_full() {
            return Err(LevelError::Full);
        }
        Ok(())
    }

    /// Snapshots the memtable into a sorted record buffer, rotates the
    /// log to a fresh empty file under a new random name, and resets the
    /// memtable to empty. The old log filename is remembered so
    /// [`Self::remove_flushed_component`] can unlink it once the payload
    /// has been absorbed downstream.
    pub fn flush_first_component(&mut self) -> Result<(Vec<(u64, u64)>, u64, u64), LevelError> {
        let payload: Vec<(u64, u64)> = self.memtable.iter().collect();
        let min_key = self.memtable.head().map(|(k, _)| k).unwrap_or(0);
        let max_key = self.memtable.tail().map(|(k, _)| k).unwrap_or(0);

        self.pending_delete = self.log_path.take();
        self.log_file = None; // drop closes the descriptor

        self.open_fresh_log()?;
        self.memtable = SkipList::with_level_params(self.skip_list_max_level, self.skip_list_p);

        debug!(records = payload.len(), min_key, max_key, "L0 flushed");
        Ok((payload, min_key, max_key))
    }

    /// Unlinks the log file set aside by the last `flush_first_component`.
    pub fn remove_flushed_component(&mut self) -> Result<(), LevelError> {
        let path = self.pending_delete.take().ok_or(LevelError::NoPendingDeletion)?;
        fs::remove_file(path)?;
        Ok(())
    }

    /// Directory this level's log lives under.
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Drops the open log file descriptor.
    pub fn close(&mut self) {
        self.log_file = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn insert_then_get_roundtrips() {
        let dir = tempdir().unwrap();
        let mut level = MemoryLevel::new(dir.path(), 3, 4, 0.5);
        level.load().unwrap();
        level.insert(1, 10).unwrap();
        assert_eq!(level.get(1), Some(10));
    }

    #[test]
    fn reports_full_once_capacity_reached() {
        let dir = tempdir().unwrap();
        let mut level = MemoryLevel::new(dir.path(), 2, 4, 0.5);
        level.load().unwrap();
        level.insert(1, 10).unwrap();
        let err = level.insert(2, 20).unwrap_err();
        assert!(matches!(err, LevelError::Full));
        // The record is still resident despite the `Full` signal.
        assert_eq!(level.get(2), Some(20));
    }

    #[test]
    fn flush_resets_memtable_and_returns_sorted_payload() {
        let dir = tempdir().unwrap();
        let mut level = MemoryLevel::new(dir.path(), 3, 4, 0.5);
        level.load().unwrap();
        level.insert(3, 30).unwrap();
        level.insert(1, 10).unwrap();
        level.insert(2, 20).unwrap();

        let (payload, min_key, max_key) = level.flush_first_component().unwrap();
        assert_eq!(payload, vec![(1, 10), (2, 20), (3, 30)]);
        assert_eq!(min_key, 1);
        assert_eq!(max_key, 3);
        assert!(level.is_empty());

        level.remove_flushed_component().unwrap();
        assert!(matches!(
            level.remove_flushed_component().unwrap_err(),
            LevelError::NoPendingDeletion
        ));
    }

    #[test]
    fn load_replays_log_in_on_disk_order_latest_wins() {
        let dir = tempdir().unwrap();
        {
            let mut level = MemoryLevel::new(dir.path(), 10, 4, 0.5);
            level.load().unwrap();
            level.insert(5, 50).unwrap();
            level.insert(5, 51).unwrap();
            level.close();
        }

        let mut reloaded = MemoryLevel::new(dir.path(), 10, 4, 0.5);
        reloaded.load().unwrap();
        assert_eq!(reloaded.get(5), Some(51));
        assert_eq!(reloaded.len(), 1);
    }

    #[test]
    fn load_creates_log_file_when_directory_is_empty() {
        let dir = tempdir().unwrap();
        let mut level = MemoryLevel::new(dir.path(), 3, 4, 0.5);
        level.load().unwrap();
        let logs: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .collect();
        assert_eq!(logs.len(), 1);
    }
}
