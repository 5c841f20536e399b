//! Line ranges a commit introduced, via forward blame.

use fixup_core::{AttributionRecord, ChangeSet, HunkSet, LineRange};
use tracing::debug;

use crate::backend::HistoryBackend;

/// Hunks `commit` introduced in each file of `changeset`.
///
/// Files whose attribution cannot be retrieved or parsed contribute nothing.
///
/// # Examples
///
/// ```
/// use fixup_core::{ChangeSet, LineRange};
/// use fixup_engine::memory::MemoryBackend;
/// use fixup_engine::provenance::introduced_hunks;
///
/// let mut history = MemoryBackend::default();
/// history.commit("a", 1).adds("x.txt").introduces("x.txt", 5, 5);
///
/// let hunks = introduced_hunks(&history, "a", &ChangeSet::new(["x.txt"]));
/// assert_eq!(hunks.get("x.txt"), Some(&[LineRange::new(5, 5)][..]));
/// ```
pub fn introduced_hunks<B: HistoryBackend + ?Sized>(
    backend: &B,
    commit: &str,
    changeset: &ChangeSet,
) -> HunkSet {
    let mut hunks = HunkSet::default();
    for path in changeset.iter() {
        let records = match backend.forward_attribution(commit, path) {
            Ok(records) => records,
            Err(err) => {
                debug!(commit, path, error = %err, "skipping file without attribution");
                continue;
            }
        };
        if let Some(ranges) = ranges_owned_by(commit, &records) {
            hunks.insert(path, ranges);
        }
    }
    hunks
}

/// Ranges attributed to `commit`, positioned in the blamed file version.
///
/// The first record is always kept: it anchors the file's change footprint
/// even when it belongs to an earlier commit. Later records count only when
/// `commit` owns them. `None` when there are no records at all.
pub fn ranges_owned_by(commit: &str, records: &[AttributionRecord]) -> Option<Vec<LineRange>> {
    let (first, rest) = records.split_first()?;
    let mut ranges = vec![first.final_range()];
    ranges.extend(
        rest.iter()
            .filter(|r| r.commit == commit)
            .map(AttributionRecord::final_range),
    );
    Some(ranges)
}
