//! A storage level (Li, i >= 1): a tiered set of SSTables in arrival
//! order. Unlike a leveled design, components within a level may have
//! overlapping key ranges — compaction replaces overlapping components
//! wholesale rather than slotting into disjoint ranges.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use crate::compaction;
use crate::hash::HashFunction;
use crate::level::{LevelError, ensure_dir, random_alnum32};
use crate::sstable::SSTable;

/// Filename extension for on-disk sorted runs.
pub const SSTABLE_EXTENSION: &str = "sst";

/// One level of the LSM tree's immutable tier (i >= 1).
pub struct StorageLevel {
    dir: PathBuf,
    index: usize,
    max_count: u64,
    component_budget: usize,
    bloom_fp_rate: f64,
    skip_list_max_level: usize,
    skip_list_p: f64,
    hash_functions: Vec<Arc<dyn HashFunction>>,
    tables: HashMap<String, SSTable>,
    order: Vec<String>,
    pending_delete: Vec<String>,
    next_seq: u64,
    count: u64,
}

impl StorageLevel {
    /// Creates a handle for level `index`, rooted at `dir`.
    ///
    /// `max_count` is `MaxCount(Li) = B * G^i`; `component_budget` is `B`,
    /// the per-component record budget used both to size each flushed
    /// slice and each slice's Bloom filter. `skip_list_max_level`/
    /// `skip_list_p` configure the dense index rebuilt for every resident
    /// SSTable.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        dir: impl Into<PathBuf>,
        index: usize,
        max_count: u64,
        component_budget: usize,
        bloom_fp_rate: f64,
        skip_list_max_level: usize,
        skip_list_p: f64,
        hash_functions: Vec<Arc<dyn HashFunction>>,
    ) -> Self {
        Self {
            dir: dir.into(),
            index,
            max_count,
            component_budget,
            bloom_fp_rate,
            skip_list_max_level,
            skip_list_p,
            hash_functions,
            tables: HashMap::new(),
            order: Vec::new(),
            pending_delete: Vec::new(),
            next_seq: 0,
            count: 0,
        }
    }

    /// Number of records across every resident SSTable.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// `true` once `count() >= max_count`.
    pub fn is_full(&self) -> bool {
        self.count >= self.max_count
    }

    /// `MaxCount(Li)` for this level.
    pub fn max_count(&self) -> u64 {
        self.max_count
    }

    /// Bootstraps this level from disk: ensures its directory exists,
    /// then opens every `.sst` file found, builds its accelerators, and
    /// closes its file descriptor (the accelerators remain resident).
    /// Components are ordered by the monotonically increasing sequence
    /// number embedded at the front of each filename, reconstructing
    /// write order across a restart rather than trusting directory-scan
    /// order.
    pub fn load(&mut self) -> Result<(), LevelError> {
        ensure_dir(&self.dir)?;

        let mut entries: Vec<(u64, String, PathBuf)> = fs::read_dir(&self.dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some(SSTABLE_EXTENSION))
            .filter_map(|path| {
                let name = path.file_name()?.to_str()?.to_string();
                let seq: u64 = name.split('_').next()?.parse().ok()?;
                Some((seq, name, path))
            })
            .collect();
        entries.sort_by_key(|(seq, _, _)| *seq);

        for (seq, name, path) in entries {
            let mut sst = SSTable::new(&path);
            sst.open()?;
            sst.load_metadata()?;
            sst.load_data_to_memory()?;
            sst.create_index(self.skip_list_max_level, self.skip_list_p)?;
            sst.create_bloom_filter(&self.hash_functions, self.component_budget, self.bloom_fp_rate)?;
            sst.close();

            self.next_seq = self.next_seq.max(seq + 1);
            self.count += sst.records()?.len() as u64;
            self.order.push(name.clone());
            self.tables.insert(name, sst);
        }
        info!(level = self.index, components = self.order.len(), "storage level loaded");
        Ok(())
    }

    /// Looks up `key`, consulting components newest-first so that, among
    /// overlapping ranges, the most recently arrived component wins.
    pub fn get(&self, key: u64) -> Result<Option<u64>, LevelError> {
        for name in self.order.iter().rev() {
            let sst = self.tables.get(name).expect("order/tables in sync");
            let Some(meta) = sst.metadata() else { continue };
            if meta.min_key <= key && key <= meta.max_key
                && let Some(value) = sst.get(key)?
            {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    fn next_filename(&mut self, min_key: u64, max_key: u64) -> String {
        let seq = self.next_seq;
        self.next_seq += 1;
        format!("{seq:020}_{min_key}_{max_key}_{}.{SSTABLE_EXTENSION}", random_alnum32())
    }

    /// Writes `records` (sorted strictly ascending) as a new SSTable,
    /// builds its accelerators, and appends it to the arrival order.
    fn add(&mut self, records: &[(u64, u64)]) -> Result<(), LevelError> {
        let min_key = records.first().map(|(k, _)| *k).unwrap_or(0);
        let max_key = records.last().map(|(k, _)| *k).unwrap_or(0);
        let name = self.next_filename(min_key, max_key);
        let path = self.dir.join(&name);

        let mut sst = SSTable::new(&path);
        sst.create()?;
        sst.write(records)?;
        sst.create_index(self.skip_list_max_level, self.skip_list_p)?;
        sst.create_bloom_filter(&self.hash_functions, self.component_budget, self.bloom_fp_rate)?;
        sst.close();

        self.count += records.len() as u64;
        self.order.push(name.clone());
        self.tables.insert(name, sst);
        Ok(())
    }

    /// Picks the oldest component, marks it for deletion, and returns its
    /// records plus min/max keys. The table itself stays resident until
    /// [`Self::remove_flushed_component`] runs.
    pub fn flush_first_component(&mut self) -> Result<(Vec<(u64, u64)>, u64, u64), LevelError> {
        let name = self.order.first().cloned().expect("flush requires a full level");
        let sst = self.tables.get(&name).expect("order/tables in sync");
        let meta = sst.metadata().ok_or(LevelError::SSTable(crate::sstable::SSTableError::MetadataEmpty))?;
        let records = sst.records()?;
        self.pending_delete.push(name);
        Ok((records, meta.min_key, meta.max_key))
    }

    /// Merges `payload` (the newest data, from a higher level's flush)
    /// with every resident component whose range overlaps
    /// `[min_key, max_key]`, runs the compaction pipeline, and re-adds
    /// the result as fresh, size-bounded components.
    ///
    /// Tombstones are purged only when `is_deepest_level` is set — a
    /// shallower merge keeps them, since an older live copy of the same
    /// key might still live farther down the level stack.
    pub fn insert_flushed_data(
        &mut self,
        payload: Vec<(u64, u64)>,
        min_key: u64,
        max_key: u64,
        is_deepest_level: bool,
    ) -> Result<(), LevelError> {
        let mut inputs = vec![payload];

        // Newest-first among the overlapping set too: walk arrival order
        // in reverse so a more recently flushed overlapping table's
        // duplicate keys beat an older one's during dedup.
        for name in self.order.iter().rev() {
            let sst = self.tables.get(name).expect("order/tables in sync");
            let Some(meta) = sst.metadata() else { continue };
            if min_key <= meta.max_key && meta.min_key <= max_key {
                inputs.push(sst.records()?);
                self.pending_delete.push(name.clone());
            }
        }

        let merged = compaction::compact(inputs, is_deepest_level);

        let mut added = 0usize;
        for chunk in merged.chunks(self.component_budget.max(1)) {
            self.add(chunk)?;
            added += 1;
        }
        debug!(level = self.index, records = merged.len(), components = added, "merge applied");
        Ok(())
    }

    /// Closes and unlinks every component queued by
    /// `flush_first_component`/`insert_flushed_data`.
    pub fn remove_flushed_component(&mut self) -> Result<(), LevelError> {
        for name in self.pending_delete.drain(..) {
            if let Some(mut sst) = self.tables.remove(&name) {
                self.count -= sst.records()?.len() as u64;
                sst.delete()?;
            }
            self.order.retain(|n| n != &name);
        }
        Ok(())
    }

    /// Closes every resident SSTable's file descriptor (a no-op in the
    /// common case, since `load`/`add` already close after building
    /// accelerators).
    pub fn close(&mut self) {
        for sst in self.tables.values_mut() {
            sst.close();
        }
    }
}
