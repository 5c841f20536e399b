//! Which files of a commit are worth tracing.

use fixup_core::{ChangeFilter, ChangeSet, Observed};

use crate::backend::HistoryBackend;
use crate::observe;

/// Files `commit` added or modified, minus `ignored` paths.
///
/// An empty [`ChangeSet`] means there is nothing to analyze. Backend failures
/// yield `Unavailable`, which callers treat the same way.
///
/// # Examples
///
/// ```
/// use fixup_engine::changeset::resolve_changeset;
/// use fixup_engine::memory::MemoryBackend;
///
/// let mut history = MemoryBackend::default();
/// history.commit("a", 1).adds("src/new.cxx").modifies("Testing/Data");
///
/// let set = resolve_changeset(&history, "a", &["Testing/Data".into()]).into_data_or_default();
/// assert_eq!(set.iter().collect::<Vec<_>>(), vec!["src/new.cxx"]);
/// ```
pub fn resolve_changeset<B: HistoryBackend + ?Sized>(
    backend: &B,
    commit: &str,
    ignored: &[String],
) -> Observed<ChangeSet> {
    observe(
        backend.changed_files(commit, ChangeFilter::AddedOrModified),
        commit,
    )
    .map(|set| set.without(ignored))
}
