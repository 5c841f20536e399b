//! Time-windowed commit selection.
//!
//! Selects the commits an analysis run covers, and the later commits that
//! are close enough in time to count as fix-ups of a given commit.

use fixup_core::{CommitId, DateRange, Observed, Result};

use crate::backend::{CommitQuery, HistoryBackend};
use crate::observe;

/// Non-merge commits inside `range`, oldest first.
///
/// An empty range yields an empty list.
///
/// # Errors
///
/// Propagates the backend error when history cannot be listed at all; there
/// is nothing to analyze in that case.
///
/// # Examples
///
/// ```
/// use fixup_core::DateRange;
/// use fixup_engine::memory::MemoryBackend;
/// use fixup_engine::window::select_commits;
///
/// let mut history = MemoryBackend::default();
/// history.commit("old", 0);
/// history.commit("in", 1_282_694_400); // 2010-08-25
///
/// let range: DateRange = "2010-08-25..2010-08-31".parse().unwrap();
/// assert_eq!(select_commits(&history, &range).unwrap(), vec!["in"]);
/// ```
pub fn select_commits<B: HistoryBackend + ?Sized>(
    backend: &B,
    range: &DateRange,
) -> Result<Vec<CommitId>> {
    backend.list_commits(&CommitQuery::between(
        range.since_timestamp(),
        range.until_timestamp(),
    ))
}

/// Commits built on `commit` whose timestamp lies strictly between the
/// commit's own timestamp and `window_seconds` later, oldest first.
///
/// Returns `Unavailable` when the commit's timestamp or the listing cannot
/// be resolved.
pub fn find_followups<B: HistoryBackend + ?Sized>(
    backend: &B,
    commit: &str,
    window_seconds: i64,
) -> Observed<Vec<CommitId>> {
    let timestamp = match observe(backend.commit_timestamp(commit), commit) {
        Observed::Data(ts) => ts,
        Observed::Unavailable { reason } => return Observed::Unavailable { reason },
    };
    let query = CommitQuery::descendants_of(commit, timestamp + 1, timestamp + window_seconds - 1);
    observe(backend.list_commits(&query), commit)
}
