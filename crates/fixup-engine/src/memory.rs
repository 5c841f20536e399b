//! Scripted in-memory history.
//!
//! Models a linear history (each commit's first parent is the one added
//! before it) with explicit line attribution, so the engine can be exercised
//! without a repository on disk.

use std::collections::{BTreeMap, BTreeSet};

use fixup_core::{AttributionRecord, ChangeFilter, ChangeSet, CommitId, FixupError, Result};

use crate::backend::{CommitQuery, HistoryBackend};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileChange {
    Added,
    Modified,
    Deleted,
}

/// One scripted commit. Built through [`MemoryBackend::commit`].
#[derive(Debug, Clone)]
pub struct MemoryCommit {
    id: CommitId,
    timestamp: i64,
    merge: bool,
    unreadable: bool,
    changes: BTreeMap<String, FileChange>,
    forward: BTreeMap<String, Vec<AttributionRecord>>,
    reverse: BTreeMap<String, Vec<AttributionRecord>>,
    blame_failures: BTreeSet<String>,
}

impl MemoryCommit {
    /// Boundary id used for lines that predate this commit.
    fn parent_marker(&self) -> String {
        format!("{}^", self.id)
    }

    pub fn adds(&mut self, path: &str) -> &mut Self {
        self.changes.insert(path.into(), FileChange::Added);
        self
    }

    pub fn modifies(&mut self, path: &str) -> &mut Self {
        self.changes.insert(path.into(), FileChange::Modified);
        self
    }

    pub fn deletes_file(&mut self, path: &str) -> &mut Self {
        self.changes.insert(path.into(), FileChange::Deleted);
        self
    }

    /// Record that this commit wrote lines `start..start+count` of `path`.
    pub fn introduces(&mut self, path: &str, start: u32, count: u32) -> &mut Self {
        let record = AttributionRecord::new(self.id.clone(), start, start, count);
        self.forward.entry(path.into()).or_default().push(record);
        self
    }

    /// Record that this commit removed pre-image lines `start..start+count` of `path`.
    pub fn removes(&mut self, path: &str, start: u32, count: u32) -> &mut Self {
        let record = AttributionRecord::new(self.parent_marker(), start, start, count);
        self.reverse.entry(path.into()).or_default().push(record);
        self
    }

    /// Replace the forward attribution for `path` verbatim.
    pub fn forward_records(&mut self, path: &str, records: Vec<AttributionRecord>) -> &mut Self {
        self.forward.insert(path.into(), records);
        self
    }

    /// Replace the reverse attribution for `path` verbatim.
    pub fn reverse_records(&mut self, path: &str, records: Vec<AttributionRecord>) -> &mut Self {
        self.reverse.insert(path.into(), records);
        self
    }

    pub fn merge(&mut self) -> &mut Self {
        self.merge = true;
        self
    }

    /// Every query about this commit fails, as for a missing object.
    pub fn unreadable(&mut self) -> &mut Self {
        self.unreadable = true;
        self
    }

    /// Blame of `path` at this commit fails in both directions.
    pub fn blame_fails(&mut self, path: &str) -> &mut Self {
        self.blame_failures.insert(path.into());
        self
    }
}

/// A [`HistoryBackend`] over scripted commits.
///
/// # Examples
///
/// ```
/// use fixup_engine::backend::{CommitQuery, HistoryBackend};
/// use fixup_engine::memory::MemoryBackend;
///
/// let mut history = MemoryBackend::default();
/// history.commit("a", 100).adds("x.txt").introduces("x.txt", 1, 3);
/// history.commit("b", 200).modifies("x.txt").removes("x.txt", 2, 1);
///
/// let all = history.list_commits(&CommitQuery::between(0, 1_000)).unwrap();
/// assert_eq!(all, vec!["a", "b"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    commits: Vec<MemoryCommit>,
}

impl MemoryBackend {
    /// Append a commit on top of the current history.
    pub fn commit(&mut self, id: &str, timestamp: i64) -> &mut MemoryCommit {
        self.commits.push(MemoryCommit {
            id: id.into(),
            timestamp,
            merge: false,
            unreadable: false,
            changes: BTreeMap::new(),
            forward: BTreeMap::new(),
            reverse: BTreeMap::new(),
            blame_failures: BTreeSet::new(),
        });
        let last = self.commits.len() - 1;
        &mut self.commits[last]
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.commits.iter().position(|c| c.id == id)
    }

    fn readable(&self, id: &str, command: &str) -> Result<&MemoryCommit> {
        match self.position(id).map(|i| &self.commits[i]) {
            Some(commit) if !commit.unreadable => Ok(commit),
            Some(_) => Err(FixupError::tool(command, format!("cannot read object {id}"))),
            None => Err(FixupError::tool(command, format!("unknown revision {id}"))),
        }
    }

    fn blame(
        &self,
        id: &str,
        path: &str,
        command: &str,
        pick: impl Fn(&MemoryCommit) -> &BTreeMap<String, Vec<AttributionRecord>>,
    ) -> Result<Vec<AttributionRecord>> {
        let commit = self.readable(id, command)?;
        if commit.blame_failures.contains(path) {
            return Err(FixupError::tool(command, format!("no such path {path} in {id}")));
        }
        Ok(pick(commit).get(path).cloned().unwrap_or_default())
    }
}

impl HistoryBackend for MemoryBackend {
    fn list_commits(&self, query: &CommitQuery) -> Result<Vec<CommitId>> {
        let first = match &query.after {
            Some(after) => {
                self.position(after)
                    .ok_or_else(|| FixupError::tool("rev-list", format!("unknown revision {after}")))?
                    + 1
            }
            None => 0,
        };
        let mut selected: Vec<&MemoryCommit> = self.commits[first..]
            .iter()
            .filter(|c| !c.merge && query.contains(c.timestamp))
            .collect();
        selected.sort_by_key(|c| c.timestamp);
        Ok(selected.into_iter().map(|c| c.id.clone()).collect())
    }

    fn commit_timestamp(&self, id: &str) -> Result<i64> {
        self.readable(id, "show").map(|c| c.timestamp)
    }

    fn changed_files(&self, id: &str, filter: ChangeFilter) -> Result<ChangeSet> {
        let commit = self.readable(id, "diff")?;
        Ok(commit
            .changes
            .iter()
            .filter(|(_, change)| match (filter, change) {
                (_, FileChange::Modified) => true,
                (ChangeFilter::AddedOrModified, FileChange::Added) => true,
                _ => false,
            })
            .map(|(path, _)| path.clone())
            .collect())
    }

    fn forward_attribution(&self, id: &str, path: &str) -> Result<Vec<AttributionRecord>> {
        self.blame(id, path, "blame", |c| &c.forward)
    }

    fn reverse_attribution(&self, id: &str, path: &str) -> Result<Vec<AttributionRecord>> {
        self.blame(id, path, "blame --reverse", |c| &c.reverse)
    }
}
