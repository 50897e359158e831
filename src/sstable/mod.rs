//! Immutable, on-disk sorted runs.
//!
//! A table is a 16-byte metadata header (`min_key`, `max_key`, both
//! little-endian `u64`) followed by a contiguous run of 16-byte records,
//! strictly ascending by key. There is no block structure, no footer, no
//! checksum — the file is written once and never updated in place.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, trace};

use crate::bloom::BloomFilter;
use crate::codec::{self, BLOCK_SIZE, CodecError};
use crate::hash::HashFunction;
use crate::skiplist::SkipList;

/// Size in bytes of the metadata header (`min_key` || `max_key`).
pub const HEADER_SIZE: usize = 16;

/// Errors produced by [`SSTable`] operations.
#[derive(Debug, Error)]
pub enum SSTableError {
    /// An operation that requires an open file descriptor was attempted
    /// before `create`/`open` or after `close`.
    #[error("SSTable file is not open")]
    FileNotOpen,

    /// `create`/`open` was called on an instance that already holds an
    /// open file descriptor.
    #[error("SSTable file is already open")]
    FileAlreadyOpen,

    /// `create` was called but a file already exists at the target path.
    #[error("SSTable file already exists")]
    FileAlreadyExists,

    /// `get`/`create_index`/`create_bloom_filter` was called before
    /// `load_metadata` populated non-zero min/max keys.
    #[error("SSTable metadata has not been loaded")]
    MetadataEmpty,

    /// `get` was called before `create_index` built the in-memory index.
    #[error("SSTable index has not been built")]
    IndexNotBuilt,

    /// `create_index`/`create_bloom_filter` was called before
    /// `load_data_to_memory` populated the in-memory body.
    #[error("SSTable data has not been loaded into memory")]
    DataNotLoaded,

    /// A malformed record was encountered while decoding the body.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Underlying filesystem I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// The 16-byte (min_key, max_key) metadata header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metadata {
    pub min_key: u64,
    pub max_key: u64,
}

impl Metadata {
    fn is_empty(&self) -> bool {
        self.min_key == 0 && self.max_key == 0
    }

    fn to_bytes(self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[..8].copy_from_slice(&self.min_key.to_le_bytes());
        buf[8..].copy_from_slice(&self.max_key.to_le_bytes());
        buf
    }

    fn from_bytes(bytes: &[u8; HEADER_SIZE]) -> Self {
        Self {
            min_key: u64::from_le_bytes(bytes[..8].try_into().expect("8 bytes")),
            max_key: u64::from_le_bytes(bytes[8..].try_into().expect("8 bytes")),
        }
    }
}

/// A single immutable on-disk sorted run plus its rebuilt in-memory
/// accelerators (dense skip-list index and Bloom filter).
pub struct SSTable {
    path: PathBuf,
    file: Option<File>,
    metadata: Option<Metadata>,
    data: Option<Vec<u8>>,
    index: Option<SkipList>,
    bloom: Option<BloomFilter>,
}

impl SSTable {
    /// Creates a handle for `path` with no open file descriptor yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
            metadata: None,
            data: None,
            index: None,
            bloom: None,
        }
    }

    /// Opens and returns the path this table is rooted at.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates a brand-new file. Fails if the instance already has an
    /// open descriptor, or if a file already exists at `self.path()`.
    pub fn create(&mut self) -> Result<(), SSTableError> {
        if self.file.is_some() {
            return Err(SSTableError::FileAlreadyOpen);
        }
        if self.path.exists() {
            return Err(SSTableError::FileAlreadyExists);
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&self.path)?;
        self.file = Some(file);
        Ok(())
    }

    /// Opens an existing file. Fails if the instance already has an open
    /// descriptor, or if no file exists at `self.path()`.
    pub fn open(&mut self) -> Result<(), SSTableError> {
        if self.file.is_some() {
            return Err(SSTableError::FileAlreadyOpen);
        }
        let file = OpenOptions::new().read(true).write(true).open(&self.path)?;
        self.file = Some(file);
        Ok(())
    }

    /// Reads the 16-byte header and populates `min_key`/`max_key`.
    pub fn load_metadata(&mut self) -> Result<(), SSTableError> {
        let file = self.file.as_mut().ok_or(SSTableError::FileNotOpen)?;
        file.seek(SeekFrom::Start(0))?;
        let mut header = [0u8; HEADER_SIZE];
        file.read_exact(&mut header)?;
        self.metadata = Some(Metadata::from_bytes(&header));
        Ok(())
    }

    /// Reads the body (file size minus the header) into a contiguous
    /// in-memory buffer.
    pub fn load_data_to_memory(&mut self) -> Result<(), SSTableError> {
        let file = self.file.as_mut().ok_or(SSTableError::FileNotOpen)?;
        let total_len = file.metadata()?.len();
        let body_len = total_len.saturating_sub(HEADER_SIZE as u64) as usize;
        let mut buf = vec![0u8; body_len];
        file.seek(SeekFrom::Start(HEADER_SIZE as u64))?;
        file.read_exact(&mut buf)?;
        self.data = Some(buf);
        Ok(())
    }

    /// Scans the in-memory body block by block and builds a dense skip
    /// list index for point lookups, with tower height `skip_list_max_level`
    /// and level-up probability `skip_list_p`.
    pub fn create_index(&mut self, skip_list_max_level: usize, skip_list_p: f64) -> Result<(), SSTableError> {
        let data = self.data.as_ref().ok_or(SSTableError::DataNotLoaded)?;
        let mut index = SkipList::with_level_params(skip_list_max_level, skip_list_p);
        for block in data.chunks(BLOCK_SIZE) {
            let (key, value) = codec::decode(block)?;
            index.insert(key, value);
        }
        self.index = Some(index);
        Ok(())
    }

    /// Scans the in-memory body and builds a Bloom filter sized for `n`
    /// expected records at `p` target false-positive rate, using
    /// `hash_functions`. Tombstoned keys are not inserted, so a deleted
    /// key's presence can still be short-circuited by a miss.
    pub fn create_bloom_filter(
        &mut self,
        hash_functions: &[Arc<dyn HashFunction>],
        n: usize,
        p: f64,
    ) -> Result<(), SSTableError> {
        let data = self.data.as_ref().ok_or(SSTableError::DataNotLoaded)?;
        let mut filter = BloomFilter::new(n, p, hash_functions.to_vec());
        for block in data.chunks(BLOCK_SIZE) {
            let (key, value) = codec::decode(block)?;
            if !codec::is_tombstone(value) {
                filter.add(&key.to_le_bytes());
            }
        }
        self.bloom = Some(filter);
        Ok(())
    }

    /// Looks up `key`. Consults the Bloom filter first; on a positive,
    /// consults the index. The returned value may itself be the
    /// tombstone sentinel — callers above interpret that.
    pub fn get(&self, key: u64) -> Result<Option<u64>, SSTableError> {
        let metadata = self.metadata.ok_or(SSTableError::MetadataEmpty)?;
        if metadata.is_empty() {
            return Err(SSTableError::MetadataEmpty);
        }
        let index = self.index.as_ref().ok_or(SSTableError::IndexNotBuilt)?;

        if let Some(bloom) = &self.bloom
            && !bloom.contains(&key.to_le_bytes())
        {
            trace!(key, path = %self.path.display(), "bloom filter miss");
            return Ok(None);
        }

        Ok(index.get(key))
    }

    /// Returns the loaded metadata, if any.
    pub fn metadata(&self) -> Option<Metadata> {
        self.metadata
    }

    /// Decodes the in-memory body back into an ordered `(key, value)`
    /// vector. Used by compaction to feed a resident table's records into
    /// the k-way merge without a fresh disk read.
    pub fn records(&self) -> Result<Vec<(u64, u64)>, SSTableError> {
        let data = self.data.as_ref().ok_or(SSTableError::DataNotLoaded)?;
        data.chunks(BLOCK_SIZE)
            .map(|block| codec::decode(block).map_err(SSTableError::from))
            .collect()
    }

    /// Writes `records` (already sorted strictly ascending by key) as
    /// `header || body` in a single write call. Also populates the
    /// in-memory metadata and body buffer so a freshly created table can
    /// have its accelerators built without a round trip through disk.
    pub fn write(&mut self, records: &[(u64, u64)]) -> Result<(), SSTableError> {
        let file = self.file.as_mut().ok_or(SSTableError::FileNotOpen)?;

        let min_key = records.first().map(|(k, _)| *k).unwrap_or(0);
        let max_key = records.last().map(|(k, _)| *k).unwrap_or(0);
        let metadata = Metadata { min_key, max_key };

        let mut buf = Vec::with_capacity(HEADER_SIZE + records.len() * BLOCK_SIZE);
        buf.extend_from_slice(&metadata.to_bytes());
        for &(key, value) in records {
            buf.extend_from_slice(&codec::encode(key, value));
        }

        file.seek(SeekFrom::Start(0))?;
        file.write_all(&buf)?;
        file.sync_data()?;

        debug!(
            path = %self.path.display(),
            records = records.len(),
            min_key,
            max_key,
            "SSTable written"
        );

        self.metadata = Some(metadata);
        self.data = Some(buf[HEADER_SIZE..].to_vec());
        Ok(())
    }

    /// Total file length on disk (16 + 16 * record count).
    pub fn file_size(&self) -> io::Result<u64> {
        fs::metadata(&self.path).map(|m| m.len())
    }

    /// Drops the open file descriptor, if any. Accelerators already built
    /// remain in memory.
    pub fn close(&mut self) {
        self.file = None;
    }

    /// Closes (if open) and unlinks the backing file.
    pub fn delete(&mut self) -> Result<(), SSTableError> {
        self.close();
        fs::remove_file(&self.path)?;
        Ok(())
    }
}
