//! [`HistoryBackend`] over a real git repository.
//!
//! Commit listing, timestamps, and name-only diffs go through git2. Line
//! attribution shells out to `git blame --incremental`, because libgit2 has
//! no reverse blame. Each invocation runs under `tokio::time::timeout` on a
//! private current-thread runtime, so the backend itself stays synchronous.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use fixup_core::{AttributionRecord, ChangeFilter, ChangeSet, CommitId, FixupError, Result};
use git2::{Delta, DiffFindOptions, DiffOptions, Repository, Sort};
use tracing::{debug, trace};

use crate::backend::{CommitQuery, HistoryBackend};
use crate::blame::parse_incremental;

/// A repository opened for fix-up mining.
pub struct GitBackend {
    repo: Repository,
    workdir: PathBuf,
    timeout: Duration,
    /// Drives `git` subprocesses under a timeout.
    runtime: tokio::runtime::Runtime,
}

impl GitBackend {
    /// Open the repository containing `path`.
    ///
    /// # Errors
    ///
    /// Returns [`FixupError::Git`] if no repository is found, or
    /// [`FixupError::Io`] if the subprocess runtime cannot start.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::path::Path;
    /// use std::time::Duration;
    /// use fixup_engine::git::GitBackend;
    ///
    /// let backend = GitBackend::open(Path::new("."), Duration::from_secs(60)).unwrap();
    /// ```
    pub fn open(path: &Path, timeout: Duration) -> Result<Self> {
        let repo = Repository::discover(path)
            .map_err(|e| FixupError::Git(format!("failed to open repository: {e}")))?;
        let workdir = repo
            .workdir()
            .unwrap_or_else(|| repo.path())
            .to_path_buf();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self {
            repo,
            workdir,
            timeout,
            runtime,
        })
    }

    fn resolve(&self, id: &str, command: &str) -> Result<git2::Commit<'_>> {
        self.repo
            .revparse_single(id)
            .and_then(|object| object.peel_to_commit())
            .map_err(|e| FixupError::tool(command, e))
    }

    fn blame(&self, id: &str, path: &str, reverse: bool) -> Result<Vec<AttributionRecord>> {
        let range = format!("{id}^!");
        let mut args = vec!["blame", "--incremental"];
        if reverse {
            args.push("--reverse");
        }
        args.extend([range.as_str(), "--", path]);
        let output = self.run_git(&args)?;
        parse_incremental(&output)
    }

    /// Run `git <args>` in the work tree, killing it once the budget is spent.
    fn run_git(&self, args: &[&str]) -> Result<String> {
        let command = format!("git {}", args.join(" "));
        trace!(%command, "running");

        let mut git = tokio::process::Command::new("git");
        git.current_dir(&self.workdir)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let result = self
            .runtime
            .block_on(async { tokio::time::timeout(self.timeout, git.output()).await });
        let output = match result {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(FixupError::tool(&command, e)),
            Err(_) => {
                return Err(FixupError::Timeout {
                    command,
                    millis: budget_millis(self.timeout),
                })
            }
        };

        if !output.status.success() {
            return Err(FixupError::tool(
                &command,
                String::from_utf8_lossy(&output.stderr).trim(),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Whole milliseconds, rounded up so sub-millisecond budgets never read as zero.
fn budget_millis(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_nanos().div_ceil(1_000_000)).unwrap_or(u64::MAX)
}

impl HistoryBackend for GitBackend {
    fn list_commits(&self, query: &CommitQuery) -> Result<Vec<CommitId>> {
        let command = "git rev-list --no-merges";
        let mut revwalk = self
            .repo
            .revwalk()
            .map_err(|e| FixupError::tool(command, e))?;
        revwalk
            .set_sorting(Sort::TIME | Sort::REVERSE)
            .map_err(|e| FixupError::tool(command, e))?;
        revwalk
            .push_head()
            .map_err(|e| FixupError::tool(command, e))?;
        if let Some(after) = &query.after {
            let anchor = self.resolve(after, command)?;
            revwalk
                .hide(anchor.id())
                .map_err(|e| FixupError::tool(command, e))?;
        }

        let mut commits = Vec::new();
        for oid in revwalk {
            let oid = oid.map_err(|e| FixupError::tool(command, e))?;
            let commit = self
                .repo
                .find_commit(oid)
                .map_err(|e| FixupError::tool(command, e))?;
            if commit.parent_count() > 1 || !query.contains(commit.time().seconds()) {
                continue;
            }
            commits.push(oid.to_string());
        }
        debug!(
            since = query.since,
            until = query.until,
            after = query.after.as_deref().unwrap_or(""),
            count = commits.len(),
            "listed commits"
        );
        Ok(commits)
    }

    fn commit_timestamp(&self, id: &str) -> Result<i64> {
        let commit = self.resolve(id, "git show -s --format=%ct")?;
        Ok(commit.time().seconds())
    }

    fn changed_files(&self, id: &str, filter: ChangeFilter) -> Result<ChangeSet> {
        let command = format!("git diff {id}^! --name-only --diff-filter={}", filter.letters());
        let commit = self.resolve(id, &command)?;
        let commit_tree = commit.tree().map_err(|e| FixupError::tool(&command, e))?;
        let parent_tree = if commit.parent_count() > 0 {
            let parent = commit.parent(0).map_err(|e| FixupError::tool(&command, e))?;
            Some(parent.tree().map_err(|e| FixupError::tool(&command, e))?)
        } else {
            None
        };

        let mut diff_opts = DiffOptions::new();
        let mut diff = self
            .repo
            .diff_tree_to_tree(parent_tree.as_ref(), Some(&commit_tree), Some(&mut diff_opts))
            .map_err(|e| FixupError::tool(&command, e))?;

        // Renames are neither additions nor modifications
        let mut find_opts = DiffFindOptions::new();
        find_opts.renames(true);
        diff.find_similar(Some(&mut find_opts))
            .map_err(|e| FixupError::tool(&command, e))?;

        let paths = diff
            .deltas()
            .filter(|delta| match (filter, delta.status()) {
                (_, Delta::Modified) => true,
                (ChangeFilter::AddedOrModified, Delta::Added) => true,
                _ => false,
            })
            .filter_map(|delta| delta.new_file().path().map(|p| p.to_string_lossy().into_owned()))
            .collect();
        Ok(paths)
    }

    fn forward_attribution(&self, id: &str, path: &str) -> Result<Vec<AttributionRecord>> {
        self.blame(id, path, false)
    }

    fn reverse_attribution(&self, id: &str, path: &str) -> Result<Vec<AttributionRecord>> {
        self.blame(id, path, true)
    }
}
