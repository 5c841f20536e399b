//! The revision-control queries the engine depends on.
//!
//! Every query is read-only and assumed to run against a static snapshot of
//! history for the duration of an analysis.

use fixup_core::{AttributionRecord, ChangeFilter, ChangeSet, CommitId, Result};

/// Parameters for listing commits.
///
/// `since` and `until` are inclusive committer timestamps. When `after` is
/// set, that commit and all of its ancestors are hidden, so only commits
/// built on top of it are listed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitQuery {
    pub since: i64,
    pub until: i64,
    pub after: Option<CommitId>,
}

impl CommitQuery {
    pub fn between(since: i64, until: i64) -> Self {
        Self {
            since,
            until,
            after: None,
        }
    }

    pub fn descendants_of(after: impl Into<String>, since: i64, until: i64) -> Self {
        Self {
            since,
            until,
            after: Some(after.into()),
        }
    }

    pub fn contains(&self, timestamp: i64) -> bool {
        (self.since..=self.until).contains(&timestamp)
    }
}

/// Read-only access to a repository's history.
///
/// Implementations report failures as [`fixup_core::FixupError`]; the engine
/// decides which failures are fatal.
pub trait HistoryBackend {
    /// Non-merge commits matching `query`, oldest first.
    fn list_commits(&self, query: &CommitQuery) -> Result<Vec<CommitId>>;

    /// Committer timestamp of `id`, in seconds since the epoch.
    fn commit_timestamp(&self, id: &str) -> Result<i64>;

    /// Files touched by `id` relative to its first parent, restricted by `filter`.
    fn changed_files(&self, id: &str, filter: ChangeFilter) -> Result<ChangeSet>;

    /// `git blame --incremental <id>^! -- <path>`: which lines of `path` as
    /// of `id` come from `id` itself and which from before it.
    fn forward_attribution(&self, id: &str, path: &str) -> Result<Vec<AttributionRecord>>;

    /// `git blame --incremental --reverse <id>^! -- <path>`: for each line of
    /// `path` just before `id`, whether it survives `id`.
    fn reverse_attribution(&self, id: &str, path: &str) -> Result<Vec<AttributionRecord>>;
}

impl<B: HistoryBackend + ?Sized> HistoryBackend for &B {
    fn list_commits(&self, query: &CommitQuery) -> Result<Vec<CommitId>> {
        (**self).list_commits(query)
    }

    fn commit_timestamp(&self, id: &str) -> Result<i64> {
        (**self).commit_timestamp(id)
    }

    fn changed_files(&self, id: &str, filter: ChangeFilter) -> Result<ChangeSet> {
        (**self).changed_files(id, filter)
    }

    fn forward_attribution(&self, id: &str, path: &str) -> Result<Vec<AttributionRecord>> {
        (**self).forward_attribution(id, path)
    }

    fn reverse_attribution(&self, id: &str, path: &str) -> Result<Vec<AttributionRecord>> {
        (**self).reverse_attribution(id, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_bounds_are_inclusive() {
        let q = CommitQuery::between(100, 200);
        assert!(q.contains(100));
        assert!(q.contains(200));
        assert!(!q.contains(99));
        assert!(!q.contains(201));
        assert!(q.after.is_none());
    }

    #[test]
    fn descendants_query_keeps_anchor() {
        let q = CommitQuery::descendants_of("abc", 1, 2);
        assert_eq!(q.after.as_deref(), Some("abc"));
    }
}
