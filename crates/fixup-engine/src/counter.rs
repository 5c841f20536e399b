//! Fix-up chain counting.
//!
//! For a subject commit, every followup inside the fix-up window that
//! deletes lines the subject introduced is a fix-up; the followup is then
//! analyzed the same way, restricted to the files it fixed. The subject's
//! chain length is the depth of its longest fix-up branch.
//!
//! The traversal is an explicit depth-first walk. Followups are visited in
//! chronological order and each qualifying one is fully explored before the
//! next is considered, because exploring it may consume later followups.

use std::collections::BTreeSet;

use fixup_core::{AnalysisConfig, ChangeSet, CommitId, DateRange, HunkSet, Result};
use tracing::{debug, info};

use crate::backend::HistoryBackend;
use crate::changeset::resolve_changeset;
use crate::overlap::fixed_files;
use crate::provenance::introduced_hunks;
use crate::window::{find_followups, select_commits};

/// Options for fix-up counting.
///
/// # Examples
///
/// ```
/// use fixup_engine::EngineOptions;
///
/// let opts = EngineOptions::default();
/// assert_eq!(opts.window_days, 5);
/// assert_eq!(opts.window_seconds(), 432_000);
/// ```
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Days after a commit during which followups count (default: 5).
    pub window_days: u32,
    /// Paths never analyzed (default: `Testing/Data`).
    pub ignored_paths: Vec<String>,
}

impl EngineOptions {
    pub fn window_seconds(&self) -> i64 {
        i64::from(self.window_days) * 86_400
    }
}

impl Default for EngineOptions {
    fn default() -> Self {
        AnalysisConfig::default().into()
    }
}

impl From<AnalysisConfig> for EngineOptions {
    fn from(config: AnalysisConfig) -> Self {
        Self {
            window_days: config.window_days,
            ignored_paths: config.ignored_paths,
        }
    }
}

/// Commits already consumed as fix-ups during one analysis run.
///
/// A commit enters the set at most once and is never examined again, either
/// as a top-level subject or as another commit's followup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitedSet {
    commits: BTreeSet<CommitId>,
}

impl VisitedSet {
    pub fn contains(&self, commit: &str) -> bool {
        self.commits.contains(commit)
    }

    /// Check-and-insert: `true` if `commit` was not yet consumed.
    pub fn mark(&mut self, commit: &str) -> bool {
        self.commits.insert(commit.to_string())
    }

    pub fn len(&self) -> usize {
        self.commits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.commits.iter().map(String::as_str)
    }

    pub fn into_inner(self) -> BTreeSet<CommitId> {
        self.commits
    }
}

/// Result of analyzing one top-level commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixupRecord {
    pub commit: CommitId,
    /// Edges in the longest fix-up chain rooted here; 0 if never fixed up.
    pub chain_length: u32,
    /// Followups consumed anywhere in this commit's fix-up tree, in discovery order.
    pub consumed: Vec<CommitId>,
}

/// One commit on the traversal stack.
struct Frame {
    commit: CommitId,
    hunks: HunkSet,
    followups: std::vec::IntoIter<CommitId>,
    longest: u32,
}

/// Counts fix-up chains against a [`HistoryBackend`].
pub struct FixupCounter<B> {
    backend: B,
    options: EngineOptions,
}

impl<B: HistoryBackend> FixupCounter<B> {
    pub fn new(backend: B, options: EngineOptions) -> Self {
        Self { backend, options }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Analyze every commit in `range` that is not already in `visited`.
    ///
    /// `on_commit(i, n)` is called before the i-th of n commits is examined.
    ///
    /// # Errors
    ///
    /// Fails only when the commits of `range` cannot be listed. Per-commit
    /// failures degrade that commit's contribution to nothing.
    ///
    /// # Examples
    ///
    /// ```
    /// use fixup_core::DateRange;
    /// use fixup_engine::memory::MemoryBackend;
    /// use fixup_engine::{EngineOptions, FixupCounter, VisitedSet};
    ///
    /// let day = 86_400;
    /// let t0 = 1_282_694_400; // 2010-08-25
    /// let mut history = MemoryBackend::default();
    /// history.commit("a", t0).adds("x.txt").introduces("x.txt", 5, 5);
    /// history.commit("b", t0 + 2 * day).modifies("x.txt").removes("x.txt", 7, 2);
    ///
    /// let counter = FixupCounter::new(&history, EngineOptions::default());
    /// let mut visited = VisitedSet::default();
    /// let range: DateRange = "2010-08-25..2010-09-30".parse().unwrap();
    /// let records = counter.count_window(&range, &mut visited, |_, _| {}).unwrap();
    ///
    /// assert_eq!(records.len(), 1);
    /// assert_eq!(records[0].chain_length, 1);
    /// assert!(visited.contains("b"));
    /// ```
    pub fn count_window(
        &self,
        range: &DateRange,
        visited: &mut VisitedSet,
        mut on_commit: impl FnMut(usize, usize),
    ) -> Result<Vec<FixupRecord>> {
        let commits = select_commits(&self.backend, range)?;
        info!(%range, commits = commits.len(), "analyzing window");

        let total = commits.len();
        let mut records = Vec::new();
        for (index, commit) in commits.iter().enumerate() {
            on_commit(index + 1, total);
            // Already credited to an earlier chain
            if visited.contains(commit) {
                continue;
            }
            let changeset = resolve_changeset(&self.backend, commit, &self.options.ignored_paths)
                .into_data_or_default();
            records.push(self.count_commit(commit, &changeset, visited));
        }

        info!(
            %range,
            analyzed = records.len(),
            fixups = visited.len(),
            "window complete"
        );
        Ok(records)
    }

    /// Length of the longest fix-up chain rooted at `commit`, tracing only
    /// the files in `changeset`.
    ///
    /// Every followup found to be a fix-up is added to `visited` before its
    /// own fix-ups are explored.
    pub fn count_commit(
        &self,
        commit: &str,
        changeset: &ChangeSet,
        visited: &mut VisitedSet,
    ) -> FixupRecord {
        let mut consumed = Vec::new();
        let mut chain_length = 0;
        let mut stack = vec![self.open(commit, changeset)];

        while let Some(top) = stack.last_mut() {
            if let Some((followup, fixed)) = self.next_fixup(top, visited) {
                visited.mark(&followup);
                let frame = self.open(&followup, &fixed);
                consumed.push(followup);
                stack.push(frame);
                continue;
            }

            let longest = top.longest;
            stack.pop();
            match stack.last_mut() {
                Some(parent) => parent.longest = parent.longest.max(longest + 1),
                None => chain_length = longest,
            }
        }

        debug!(commit, chain = chain_length, consumed = consumed.len(), "counted");
        FixupRecord {
            commit: commit.to_string(),
            chain_length,
            consumed,
        }
    }

    fn open(&self, commit: &str, changeset: &ChangeSet) -> Frame {
        let hunks = introduced_hunks(&self.backend, commit, changeset);
        let followups = if hunks.is_empty() {
            Vec::new()
        } else {
            find_followups(&self.backend, commit, self.options.window_seconds()).into_data_or_default()
        };
        Frame {
            commit: commit.to_string(),
            hunks,
            followups: followups.into_iter(),
            longest: 0,
        }
    }

    /// Advance `frame` to its next unconsumed followup that fixes something.
    fn next_fixup(&self, frame: &mut Frame, visited: &VisitedSet) -> Option<(CommitId, ChangeSet)> {
        for followup in frame.followups.by_ref() {
            if followup.is_empty() || visited.contains(&followup) {
                continue;
            }
            let fixed = fixed_files(&self.backend, &frame.hunks, &followup).into_data_or_default();
            if !fixed.is_empty() {
                debug!(commit = %frame.commit, followup = %followup, files = fixed.len(), "fix-up");
                return Some((followup, fixed));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;
    use fixup_core::AttributionRecord;

    const DAY: i64 = 86_400;
    const T0: i64 = 1_282_694_400; // 2010-08-25

    fn range() -> DateRange {
        "2010-08-25..2010-12-31".parse().unwrap()
    }

    fn run(history: &MemoryBackend) -> (Vec<FixupRecord>, VisitedSet) {
        let counter = FixupCounter::new(history, EngineOptions::default());
        let mut visited = VisitedSet::default();
        let records = counter.count_window(&range(), &mut visited, |_, _| {}).unwrap();
        (records, visited)
    }

    fn chain(records: &[FixupRecord], commit: &str) -> Option<u32> {
        records
            .iter()
            .find(|r| r.commit == commit)
            .map(|r| r.chain_length)
    }

    #[test]
    fn single_fixup_is_credited_to_origin() {
        let mut history = MemoryBackend::default();
        history.commit("A", T0).adds("x.txt").introduces("x.txt", 5, 5);
        history
            .commit("B", T0 + 2 * DAY)
            .modifies("x.txt")
            .removes("x.txt", 7, 2);
        history
            .commit("C", T0 + 3 * DAY)
            .modifies("y.txt")
            .removes("y.txt", 1, 3)
            .introduces("y.txt", 1, 1);

        let (records, visited) = run(&history);
        assert_eq!(chain(&records, "A"), Some(1));
        assert_eq!(chain(&records, "B"), None, "B was consumed, not analyzed");
        assert_eq!(chain(&records, "C"), Some(0));
        assert_eq!(visited.iter().collect::<Vec<_>>(), vec!["B"]);
    }

    #[test]
    fn linear_chain_counts_every_edge() {
        let mut history = MemoryBackend::default();
        history.commit("A", T0).adds("x.txt").introduces("x.txt", 1, 10);
        history
            .commit("B", T0 + DAY)
            .modifies("x.txt")
            .removes("x.txt", 3, 1)
            .introduces("x.txt", 3, 2);
        history
            .commit("C", T0 + 2 * DAY)
            .modifies("x.txt")
            .removes("x.txt", 4, 1)
            .introduces("x.txt", 4, 1);
        history
            .commit("D", T0 + 3 * DAY)
            .modifies("x.txt")
            .removes("x.txt", 4, 1);

        let (records, visited) = run(&history);
        assert_eq!(records.len(), 1);
        assert_eq!(chain(&records, "A"), Some(3));
        assert_eq!(records[0].consumed, vec!["B", "C", "D"]);
        assert_eq!(visited.iter().collect::<Vec<_>>(), vec!["B", "C", "D"]);
    }

    #[test]
    fn branching_takes_the_longest_branch() {
        // A is fixed by B and by C; only C is itself fixed (by D).
        let mut history = MemoryBackend::default();
        history
            .commit("A", T0)
            .adds("a.c")
            .adds("b.c")
            .introduces("a.c", 1, 5)
            .introduces("b.c", 1, 5);
        history
            .commit("B", T0 + DAY)
            .modifies("a.c")
            .removes("a.c", 2, 1)
            .introduces("a.c", 2, 1);
        history
            .commit("C", T0 + 2 * DAY)
            .modifies("b.c")
            .removes("b.c", 2, 1)
            .introduces("b.c", 2, 1);
        history
            .commit("D", T0 + 3 * DAY)
            .modifies("b.c")
            .removes("b.c", 2, 1);

        let (records, visited) = run(&history);
        assert_eq!(chain(&records, "A"), Some(2));
        assert_eq!(visited.len(), 3);
    }

    #[test]
    fn earlier_followup_consumes_later_one() {
        // C fixes both A and B; B explores it first because B is A's first followup.
        let mut history = MemoryBackend::default();
        history.commit("A", T0).adds("x.c").introduces("x.c", 1, 10);
        history
            .commit("B", T0 + DAY)
            .modifies("x.c")
            .removes("x.c", 1, 1)
            .introduces("x.c", 1, 1);
        history
            .commit("C", T0 + 2 * DAY)
            .modifies("x.c")
            .removes("x.c", 1, 1);

        let (records, _) = run(&history);
        assert_eq!(chain(&records, "A"), Some(2));
        assert_eq!(records[0].consumed, vec!["B", "C"]);
    }

    #[test]
    fn followup_outside_window_is_ignored() {
        let mut history = MemoryBackend::default();
        history.commit("A", T0).adds("x.c").introduces("x.c", 1, 10);
        history
            .commit("late", T0 + 5 * DAY)
            .modifies("x.c")
            .removes("x.c", 1, 1);

        let (records, visited) = run(&history);
        assert_eq!(chain(&records, "A"), Some(0));
        assert_eq!(chain(&records, "late"), Some(0));
        assert!(visited.is_empty());
    }

    #[test]
    fn window_option_is_respected() {
        let mut history = MemoryBackend::default();
        history.commit("A", T0).adds("x.c").introduces("x.c", 1, 10);
        history
            .commit("B", T0 + 6 * DAY)
            .modifies("x.c")
            .removes("x.c", 1, 1);

        let options = EngineOptions {
            window_days: 7,
            ..EngineOptions::default()
        };
        let counter = FixupCounter::new(&history, options);
        let mut visited = VisitedSet::default();
        let records = counter.count_window(&range(), &mut visited, |_, _| {}).unwrap();
        assert_eq!(chain(&records, "A"), Some(1));
    }

    #[test]
    fn recursion_only_traces_fixed_files() {
        // B fixes A in a.c and also writes b.c; D later edits B's b.c lines
        // but must not count, because only a.c is traced for B.
        let mut history = MemoryBackend::default();
        history.commit("A", T0).adds("a.c").introduces("a.c", 1, 5);
        history
            .commit("B", T0 + DAY)
            .modifies("a.c")
            .adds("b.c")
            .removes("a.c", 2, 1)
            .introduces("a.c", 40, 1)
            .introduces("b.c", 1, 9);
        history
            .commit("D", T0 + 2 * DAY)
            .modifies("b.c")
            .removes("b.c", 3, 1);

        let (records, visited) = run(&history);
        assert_eq!(chain(&records, "A"), Some(1));
        assert!(!visited.contains("D"));
        assert_eq!(chain(&records, "D"), Some(0));
    }

    #[test]
    fn ignored_path_contributes_nothing() {
        let mut history = MemoryBackend::default();
        history
            .commit("A", T0)
            .modifies("Testing/Data")
            .introduces("Testing/Data", 1, 1);
        history
            .commit("B", T0 + DAY)
            .modifies("Testing/Data")
            .removes("Testing/Data", 1, 1);

        let (records, visited) = run(&history);
        assert_eq!(chain(&records, "A"), Some(0));
        assert!(visited.is_empty());
    }

    #[test]
    fn unreadable_followup_is_skipped() {
        let mut history = MemoryBackend::default();
        history.commit("A", T0).adds("x.c").introduces("x.c", 1, 10);
        history
            .commit("B", T0 + DAY)
            .modifies("x.c")
            .removes("x.c", 1, 1)
            .unreadable();
        history
            .commit("C", T0 + 2 * DAY)
            .modifies("x.c")
            .removes("x.c", 2, 1);

        let (records, visited) = run(&history);
        assert_eq!(chain(&records, "A"), Some(1));
        assert!(visited.contains("C"));
        assert!(!visited.contains("B"));
    }

    #[test]
    fn consumed_commit_is_not_a_subject_twice() {
        let mut history = MemoryBackend::default();
        history.commit("A", T0).adds("x.c").introduces("x.c", 1, 10);
        history
            .commit("B", T0 + DAY)
            .modifies("x.c")
            .removes("x.c", 1, 1);

        let counter = FixupCounter::new(&history, EngineOptions::default());
        let mut visited = VisitedSet::default();
        counter.count_window(&range(), &mut visited, |_, _| {}).unwrap();
        let again = counter.count_window(&range(), &mut visited, |_, _| {}).unwrap();
        assert!(again.iter().all(|r| r.commit != "B"));
    }

    #[test]
    fn progress_reports_every_commit() {
        let mut history = MemoryBackend::default();
        history.commit("A", T0);
        history.commit("B", T0 + 1);
        let counter = FixupCounter::new(&history, EngineOptions::default());
        let mut seen = Vec::new();
        counter
            .count_window(&range(), &mut VisitedSet::default(), |i, n| seen.push((i, n)))
            .unwrap();
        assert_eq!(seen, vec![(1, 2), (2, 2)]);
    }

    #[test]
    fn long_chains_do_not_recurse_on_the_call_stack() {
        let mut history = MemoryBackend::default();
        history.commit("c0", T0).adds("x.c").introduces("x.c", 1, 1);
        for i in 1..=500 {
            history
                .commit(&format!("c{i}"), T0 + i)
                .modifies("x.c")
                .removes("x.c", 1, 1)
                .introduces("x.c", 1, 1);
        }
        let (records, visited) = run(&history);
        assert_eq!(chain(&records, "c0"), Some(500));
        assert_eq!(visited.len(), 500);
    }

    #[test]
    fn foreign_first_blame_line_anchors_the_origin() {
        // A owns only line 20, but the first record (lines 1-10, from P) is kept.
        let mut history = MemoryBackend::default();
        history.commit("A", T0).modifies("x.c").forward_records(
            "x.c",
            vec![
                AttributionRecord::new("P", 1, 1, 10),
                AttributionRecord::new("A", 20, 20, 1),
            ],
        );
        history
            .commit("B", T0 + 2 * DAY)
            .modifies("x.c")
            .removes("x.c", 5, 1);

        let (records, visited) = run(&history);
        assert_eq!(chain(&records, "A"), Some(1));
        assert!(visited.contains("B"));
    }

    #[test]
    fn later_boundary_records_count_as_deleted() {
        let mut history = MemoryBackend::default();
        history.commit("A", T0).adds("x.c").introduces("x.c", 30, 1);
        history.commit("B", T0 + DAY).modifies("x.c").reverse_records(
            "x.c",
            vec![
                AttributionRecord::new("B^", 3, 3, 2),
                AttributionRecord::new("B", 5, 5, 10),
                AttributionRecord::new("B^", 30, 30, 1),
            ],
        );

        let (records, _) = run(&history);
        assert_eq!(chain(&records, "A"), Some(1));
    }

    #[test]
    fn first_reverse_record_sets_the_boundary() {
        // The first record is a surviving line owned by B, so B's records are
        // read as deleted and the real boundary at line 20 is not.
        let survivor_first = vec![
            AttributionRecord::new("B", 1, 1, 10),
            AttributionRecord::new("B^", 20, 20, 1),
        ];

        let mut history = MemoryBackend::default();
        history.commit("A", T0).adds("x.c").introduces("x.c", 20, 1);
        history
            .commit("B", T0 + DAY)
            .modifies("x.c")
            .reverse_records("x.c", survivor_first.clone());
        let (records, visited) = run(&history);
        assert_eq!(chain(&records, "A"), Some(0));
        assert!(visited.is_empty());

        let mut history = MemoryBackend::default();
        history.commit("A", T0).adds("x.c").introduces("x.c", 4, 1);
        history
            .commit("B", T0 + DAY)
            .modifies("x.c")
            .reverse_records("x.c", survivor_first);
        let (records, _) = run(&history);
        assert_eq!(chain(&records, "A"), Some(1));
    }
}
