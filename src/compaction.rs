//! K-way merge compaction: duplicate reconciliation, tombstone purge, and
//! the heap-based merge of N already-sorted runs into one.
//!
//! The three passes must run in this fixed order: `merge_duplicated_keys`
//! -> (optionally) `remove_tombstones` -> `k_way_merge`. Deduplication
//! depends on the caller supplying inputs newest-first; tombstone purge
//! must only run after a key's newest version has been chosen, or an
//! older live value could survive a newer delete.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::collections::HashSet;

use crate::codec;

/// Deduplicates across the ordered input list, keeping the **first**
/// occurrence of each key. `inputs` must be supplied newest-first so the
/// surviving record is the most recent write. Each input's own internal
/// ascending order is preserved.
pub fn merge_duplicated_keys(inputs: Vec<Vec<(u64, u64)>>) -> Vec<Vec<(u64, u64)>> {
    let mut seen: HashSet<u64> = HashSet::new();
    inputs
        .into_iter()
        .map(|run| {
            run.into_iter()
                .filter(|(key, _)| seen.insert(*key))
                .collect()
        })
        .collect()
}

/// Drops every record whose value is the tombstone sentinel.
pub fn remove_tombstones(inputs: Vec<Vec<(u64, u64)>>) -> Vec<Vec<(u64, u64)>> {
    inputs
        .into_iter()
        .map(|run| {
            run.into_iter()
                .filter(|(_, value)| !codec::is_tombstone(*value))
                .collect()
        })
        .collect()
}

#[derive(Eq, PartialEq)]
struct Cursor {
    key: u64,
    value: u64,
    run: usize,
    pos: usize,
}

impl Ord for Cursor {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Break ties by insertion (run) order so that, if two equal keys
        // ever reach the heap simultaneously, the earlier run wins —
        // matching the caller's newest-first convention.
        self.key.cmp(&other.key).then(self.run.cmp(&other.run))
    }
}

impl PartialOrd for Cursor {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Merges N already-ascending runs into a single ascending output via a
/// min-heap of per-run cursors.
pub fn k_way_merge(inputs: Vec<Vec<(u64, u64)>>) -> Vec<(u64, u64)> {
    let total: usize = inputs.iter().map(Vec::len).sum();
    let mut heap = BinaryHeap::with_capacity(inputs.len());

    for (run, records) in inputs.iter().enumerate() {
        if let Some(&(key, value)) = records.first() {
            heap.push(Reverse(Cursor {
                key,
                value,
                run,
                pos: 0,
            }));
        }
    }

    let mut output = Vec::with_capacity(total);
    while let Some(Reverse(cursor)) = heap.pop() {
        output.push((cursor.key, cursor.value));
        let next_pos = cursor.pos + 1;
        if let Some(&(key, value)) = inputs[cursor.run].get(next_pos) {
            heap.push(Reverse(Cursor {
                key,
                value,
                run: cursor.run,
                pos: next_pos,
            }));
        }
    }

    output
}

/// The full compaction pipeline: dedup, optional tombstone purge, k-way
/// merge. `purge_tombstones` must only be `true` when the merge target is
/// the deepest configured level — otherwise an older live copy farther
/// down the level stack could be resurrected by dropping a tombstone too
/// early.
pub fn compact(inputs: Vec<Vec<(u64, u64)>>, purge_tombstones: bool) -> Vec<(u64, u64)> {
    let deduped = merge_duplicated_keys(inputs);
    let ready = if purge_tombstones {
        remove_tombstones(deduped)
    } else {
        deduped
    };
    k_way_merge(ready)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_keeps_first_occurrence_across_runs() {
        let inputs = vec![vec![(5, 51)], vec![(5, 50), (6, 60)]];
        let deduped = merge_duplicated_keys(inputs);
        assert_eq!(deduped, vec![vec![(5, 51)], vec![(6, 60)]]);
    }

    #[test]
    fn dedup_of_unique_input_is_noop() {
        let inputs = vec![vec![(1, 10), (2, 20)]];
        assert_eq!(merge_duplicated_keys(inputs.clone()), inputs);
    }

    #[test]
    fn remove_tombstones_drops_only_tombstones() {
        let inputs = vec![vec![(1, codec::TOMBSTONE), (2, 20)]];
        assert_eq!(remove_tombstones(inputs), vec![vec![(2, 20)]]);
    }

    #[test]
    fn remove_tombstones_of_tombstone_free_input_is_noop() {
        let inputs = vec![vec![(1, 10), (2, 20)]];
        assert_eq!(remove_tombstones(inputs.clone()), inputs);
    }

    #[test]
    fn k_way_merge_of_single_sorted_input_is_identity() {
        let input = vec![vec![(1, 10), (2, 20), (3, 30)]];
        assert_eq!(k_way_merge(input.clone()), input[0]);
    }

    #[test]
    fn k_way_merge_interleaves_multiple_runs() {
        let inputs = vec![vec![(1, 10), (4, 40)], vec![(2, 20), (3, 30)]];
        assert_eq!(
            k_way_merge(inputs),
            vec![(1, 10), (2, 20), (3, 30), (4, 40)]
        );
    }

    #[test]
    fn full_pipeline_newest_wins_and_drops_purged_tombstone() {
        // Newest-first: the payload (key 5 tombstoned) precedes the
        // older SSTable runs that still hold (5, 50).
        let inputs = vec![
            vec![(5, codec::TOMBSTONE)],
            vec![(1, 10), (5, 50)],
            vec![(2, 20)],
        ];
        let merged = compact(inputs, true);
        assert_eq!(merged, vec![(1, 10), (2, 20)]);
    }

    #[test]
    fn shallow_merge_preserves_tombstone() {
        let inputs = vec![vec![(5, codec::TOMBSTONE)], vec![(1, 10), (5, 50)]];
        let merged = compact(inputs, false);
        assert_eq!(merged, vec![(1, 10), (5, codec::TOMBSTONE)]);
    }
}
