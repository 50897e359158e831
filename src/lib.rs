//! # AeternusDB
//!
//! An embedded, ordered key-value store built around a log-structured
//! merge (LSM) tree with tiered compaction, plus an in-memory B+ tree as
//! an alternative ordered index.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        Engine (lsm)                      │
//! │  ┌────────────┐   cascade   ┌─────────────────────────┐  │
//! │  │  L0         │  flush  ->  │  L1 .. L(max_level-1)   │  │
//! │  │  memtable   │             │  tiered SSTable sets    │  │
//! │  │  + WAL      │             │                         │  │
//! │  └─────┬───────┘             └───────────┬─────────────┘  │
//! │        │ memory_level              storage_level          │
//! │        └─────────────────┬───────────────┘                │
//! │                          ▼                                │
//! │              compaction (dedup -> tombstone purge -> merge)│
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`lsm`] | The public [`lsm::Engine`] — routes insert/get/delete across levels, cascades flushes |
//! | [`memory_level`] | L0: the skip-list memtable plus its write-ahead log |
//! | [`storage_level`] | Lᵢ, i≥1: a tiered set of immutable SSTables |
//! | [`sstable`] | Immutable on-disk sorted runs with a rebuildable index and Bloom filter |
//! | [`compaction`] | K-way merge, duplicate reconciliation, tombstone purge |
//! | [`skiplist`] | Ordered in-memory map used as the memtable and as each SSTable's index |
//! | [`bloom`] | Per-SSTable Bloom filter with injectable hash functions |
//! | [`hash`] | Independent 64-bit hash functions fed to [`bloom::BloomFilter`] |
//! | [`codec`] | Fixed-width 16-byte (key, value) block encoding |
//! | [`config`] | Engine-wide tunables ([`config::EngineConfig`]) |
//! | [`level`] | Shared filesystem plumbing and error type for the two level kinds |
//! | [`btree`] | An in-memory B+ tree, an auxiliary ordered index independent of the LSM engine |
//!
//! ## Key properties
//!
//! - **Fixed-size records** — keys and values are 64-bit integers, so
//!   on-disk offsets are computed arithmetically; there is no block
//!   structure, checksum, or compression.
//! - **Write-ahead logging** — every memtable insert is appended to L0's
//!   log before being acknowledged, so it survives a restart even if the
//!   memtable itself is lost.
//! - **Tiered compaction** — a full level's oldest component is merged
//!   with every overlapping component of the next level; tombstones are
//!   purged only once a key's newest version has reached the deepest
//!   level that could hold an older copy.
//! - **Bloom filter + dense index per SSTable** — both accelerators are
//!   rebuilt in memory whenever a table is opened or created, never
//!   persisted.
//! - **Single-threaded** — no concurrent writer support, no
//!   transactions, no snapshots; callers serialize their own access.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use aeternusdb::config::EngineConfig;
//! use aeternusdb::lsm::Engine;
//!
//! let mut engine = Engine::open("/tmp/aeternusdb-demo", EngineConfig::default()).unwrap();
//!
//! engine.insert(1, 10).unwrap();
//! assert_eq!(engine.get(1).unwrap(), 10);
//!
//! engine.delete(1).unwrap();
//! assert!(engine.get(1).is_err());
//!
//! engine.close().unwrap();
//! ```

#![allow(dead_code)]

pub mod bloom;
pub mod btree;
pub mod codec;
pub mod compaction;
pub mod config;
pub mod hash;
pub mod level;
pub mod lsm;
pub mod memory_level;
pub mod skiplist;
pub mod sstable;
pub mod storage_level;
