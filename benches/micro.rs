//! Micro-benchmarks for AeternusDB core operations.
//!
//! Uses Criterion for statistically rigorous measurement with regression
//! detection and HTML reports.
//!
//! # Running
//!
//! ```bash
//! cargo bench --bench micro              # run all micro-benchmarks
//! cargo bench --bench micro -- insert    # filter by name
//! ```
//!
//! Reports are generated in `target/criterion/report/index.html`.

use criterion::{BatchSize, BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use aeternusdb::config::EngineConfig;
use aeternusdb::lsm::Engine;
use tempfile::TempDir;

// ------------------------------------------------------------------------------------------------
// Helpers
// ------------------------------------------------------------------------------------------------

/// A memtable capacity large enough that 10,000 sequential inserts never
/// trigger a flush — isolates the pure WAL + skip-list insert path.
fn open_memtable_only(dir: &std::path::Path) -> Engine {
    let config = EngineConfig {
        memtable_capacity: 1 << 20,
        max_level: 2,
        ..EngineConfig::default()
    };
    Engine::open(dir, config).expect("open")
}

/// A tiny memtable capacity so sustained inserts force frequent cascades
/// down through several storage levels.
fn open_small_capacity(dir: &std::path::Path) -> Engine {
    let config = EngineConfig {
        memtable_capacity: 64,
        growth_factor: 2,
        max_level: 6,
        ..EngineConfig::default()
    };
    Engine::open(dir, config).expect("open")
}

/// Pre-populates an engine with `count` sequential keys and closes it, so
/// the data is resident in on-disk SSTables rather than a memtable.
fn prepopulate(dir: &std::path::Path, count: u64) {
    let mut engine = open_small_capacity(dir);
    for k in 0..count {
        engine.insert(k, k.wrapping_mul(2654435761)).unwrap();
    }
    engine.close().unwrap();
}

// ================================================================================================
// Write benchmarks
// ================================================================================================

/// Benchmark group for `insert` operations.
///
/// # Sub-benchmarks
///
/// ## `memtable_only`
///
/// **Scenario:** Inserts a single sequential key-value pair into an
/// engine whose memtable capacity is large enough that no flush is ever
/// triggered during measurement.
///
/// **What it measures:** The raw cost of appending a 16-byte record to
/// the WAL (with `sync_data`) plus a skip-list insert.
///
/// **Expected behaviour:** Dominated by the WAL fsync; skip-list insert
/// cost is a small, roughly constant fraction of total latency.
///
/// ## `sequential_with_cascade`
///
/// **Scenario:** Inserts sequential keys into an engine with a tiny
/// memtable capacity (64), forcing a cascade on almost every insert.
///
/// **What it measures:** Sustained write throughput including the
/// amortised cost of flushing L0 and merging into deeper levels.
fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");

    group.bench_function("memtable_only", |b| {
        let dir = TempDir::new().unwrap();
        let mut engine = open_memtable_only(dir.path());
        let mut seq = 0u64;

        b.iter(|| {
            engine.insert(black_box(seq), black_box(seq * 2)).unwrap();
            seq += 1;
        });
    });

    group.bench_function("sequential_with_cascade", |b| {
        let dir = TempDir::new().unwrap();
        let mut engine = open_small_capacity(dir.path());
        let mut seq = 0u64;

        b.iter(|| {
            engine.insert(black_box(seq), black_box(seq)).unwrap();
            seq += 1;
        });
    });

    group.finish();
}

// ================================================================================================
// Read benchmarks
// ================================================================================================

/// Benchmark group for `get` operations.
///
/// # Sub-benchmarks
///
/// ## `memtable_hit`
///
/// **Scenario:** Reads randomly from 10,000 keys that all reside in the
/// active memtable (nothing ever flushed).
///
/// **What it measures:** Pure in-memory skip-list lookup latency — the
/// fastest read path in the engine.
///
/// ## `sstable_hit`
///
/// **Scenario:** Reads randomly from keys that have been flushed to
/// SSTables. The engine is reopened so the memtable is empty and every
/// hit must go through the Bloom filter and the in-memory index.
///
/// **What it measures:** The full on-disk read path: Bloom filter probe
/// followed by an index lookup.
///
/// ## `miss`
///
/// **Scenario:** Queries keys that were never inserted, against an
/// engine populated the same way as `sstable_hit`.
///
/// **What it measures:** The negative-lookup path, which should usually
/// short-circuit at the Bloom filter before consulting any index.
fn bench_get(c: &mut Criterion) {
    const MEMTABLE_KEYS: u64 = 10_000;
    const SSTABLE_KEYS: u64 = 5_000;

    let mut group = c.benchmark_group("get");

    group.bench_function("memtable_hit", |b| {
        let dir = TempDir::new().unwrap();
        let mut engine = open_memtable_only(dir.path());
        for k in 0..MEMTABLE_KEYS {
            engine.insert(k, k).unwrap();
        }

        let mut probe = 0u64;
        b.iter(|| {
            let key = probe % MEMTABLE_KEYS;
            black_box(engine.get(key).unwrap());
            probe += 1;
        });
    });

    group.bench_function("sstable_hit", |b| {
        let dir = TempDir::new().unwrap();
        prepopulate(dir.path(), SSTABLE_KEYS);
        let engine = Engine::open(
            dir.path(),
            EngineConfig {
                memtable_capacity: 64,
                growth_factor: 2,
                max_level: 6,
                ..EngineConfig::default()
            },
        )
        .unwrap();

        let mut probe = 0u64;
        b.iter(|| {
            let key = probe % SSTABLE_KEYS;
            black_box(engine.get(key).unwrap());
            probe += 1;
        });
    });

    group.bench_function("miss", |b| {
        let dir = TempDir::new().unwrap();
        prepopulate(dir.path(), SSTABLE_KEYS);
        let engine = Engine::open(
            dir.path(),
            EngineConfig {
                memtable_capacity: 64,
                growth_factor: 2,
                max_level: 6,
                ..EngineConfig::default()
            },
        )
        .unwrap();

        let mut probe = 0u64;
        b.iter(|| {
            let key = SSTABLE_KEYS + (probe % SSTABLE_KEYS);
            black_box(engine.get(key).is_err());
            probe += 1;
        });
    });

    group.finish();
}

// ================================================================================================
// Delete benchmarks
// ================================================================================================

/// Benchmark group for `delete` (tombstone insert) operations.
///
/// **Scenario:** Deletes sequential, previously-written keys from an
/// engine whose memtable capacity is large enough to avoid a flush
/// during measurement.
///
/// **What it measures:** The cost of `delete`, which is exactly
/// `insert(key, TOMBSTONE)` — this benchmark exists to confirm it carries
/// no overhead beyond a normal insert.
fn bench_delete(c: &mut Criterion) {
    c.bench_function("delete/memtable_only", |b| {
        b.iter_batched(
            || {
                let dir = TempDir::new().unwrap();
                let mut engine = open_memtable_only(dir.path());
                for k in 0..1_000u64 {
                    engine.insert(k, k).unwrap();
                }
                (dir, engine)
            },
            |(_dir, mut engine)| {
                for k in 0..1_000u64 {
                    engine.delete(black_box(k)).unwrap();
                }
            },
            BatchSize::SmallInput,
        );
    });
}

// ================================================================================================
// Compaction benchmarks
// ================================================================================================

/// Benchmark group measuring the cost of the compaction pipeline itself
/// (dedup -> tombstone purge -> k-way merge), independent of any engine.
///
/// **Scenario:** Merges `n` already-sorted runs of `m` records each, with
/// 10% key overlap between adjacent runs to exercise deduplication.
fn bench_compaction(c: &mut Criterion) {
    use aeternusdb::compaction;

    let mut group = c.benchmark_group("compaction");

    for &(runs, per_run) in &[(4usize, 256usize), (8, 512)] {
        group.bench_function(BenchmarkId::new("k_way_merge", format!("{runs}x{per_run}")), |b| {
            b.iter_batched(
                || {
                    (0..runs)
                        .map(|r| {
                            let offset = (r as u64) * (per_run as u64 / 2);
                            (0..per_run as u64)
                                .map(|i| (offset + i, offset + i))
                                .collect::<Vec<_>>()
                        })
                        .collect::<Vec<_>>()
                },
                |inputs| black_box(compaction::compact(inputs, false)),
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_insert, bench_get, bench_delete, bench_compaction);
criterion_main!(benches);
