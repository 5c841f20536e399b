//! Does a followup delete lines an earlier commit introduced?
//!
//! Line numbers are compared as-is across file versions: the original
//! commit's post-image positions against the followup's pre-image positions.
//! Edits made in between can shift lines, so this is a heuristic, not a
//! tracked-line proof.

use std::collections::BTreeSet;

use fixup_core::{AttributionRecord, ChangeFilter, ChangeSet, HunkSet, Observed};
use tracing::{debug, trace};

use crate::backend::HistoryBackend;
use crate::observe;

/// Files of `hunks` in which `followup` removed at least one introduced line.
///
/// Only files the followup modified are examined. Files whose reverse
/// attribution fails contribute nothing. `Unavailable` when the followup's
/// own diff cannot be computed.
///
/// # Examples
///
/// ```
/// use fixup_core::{HunkSet, LineRange};
/// use fixup_engine::memory::MemoryBackend;
/// use fixup_engine::overlap::fixed_files;
///
/// let mut history = MemoryBackend::default();
/// history.commit("b", 1).modifies("x.txt").removes("x.txt", 7, 2);
///
/// let mut hunks = HunkSet::default();
/// hunks.push("x.txt", LineRange::new(5, 5));
///
/// let fixed = fixed_files(&history, &hunks, "b").into_data_or_default();
/// assert!(fixed.contains("x.txt"));
/// ```
pub fn fixed_files<B: HistoryBackend + ?Sized>(
    backend: &B,
    hunks: &HunkSet,
    followup: &str,
) -> Observed<ChangeSet> {
    let touched = match observe(backend.changed_files(followup, ChangeFilter::Modified), followup) {
        Observed::Data(set) => set,
        Observed::Unavailable { reason } => return Observed::Unavailable { reason },
    };

    let fixed = touched
        .iter()
        .filter(|path| hunks.contains_file(path))
        .filter(|path| {
            let records = match backend.reverse_attribution(followup, path) {
                Ok(records) => records,
                Err(err) => {
                    debug!(followup, path, error = %err, "skipping file without reverse attribution");
                    return false;
                }
            };
            let overlaps = overlaps(&hunks.added_lines(path), &deleted_lines(&records));
            trace!(followup, path, overlaps, "compared");
            overlaps
        })
        .map(str::to_string)
        .collect();
    Observed::Data(fixed)
}

/// Pre-image lines the blamed commit removed.
///
/// The first record anchors the boundary: its commit stands for "before the
/// followup", and every record attributed to that same boundary adds its
/// range.
///
/// # Examples
///
/// ```
/// use fixup_core::AttributionRecord;
/// use fixup_engine::overlap::deleted_lines;
///
/// let records = vec![
///     AttributionRecord::new("parent", 12, 12, 2),
///     AttributionRecord::new("followup", 1, 1, 11),
///     AttributionRecord::new("parent", 30, 30, 1),
/// ];
/// let deleted: Vec<u32> = deleted_lines(&records).into_iter().collect();
/// assert_eq!(deleted, vec![12, 13, 30]);
/// ```
pub fn deleted_lines(records: &[AttributionRecord]) -> BTreeSet<u32> {
    let Some(first) = records.first() else {
        return BTreeSet::new();
    };
    records
        .iter()
        .filter(|r| r.commit == first.commit)
        .flat_map(|r| r.orig_range().lines())
        .collect()
}

/// A file counts as fixed when the two line sets share any line.
pub fn overlaps(added: &BTreeSet<u32>, deleted: &BTreeSet<u32>) -> bool {
    !added.is_disjoint(deleted)
}
