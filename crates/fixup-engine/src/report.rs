//! Packaging of per-commit chain lengths for reporting.
//!
//! The report is the engine's only product: a mapping from commit to chain
//! length plus the set of commits consumed as fix-ups. Histograms and
//! summaries are derived views for the CLI.

use std::collections::{BTreeMap, BTreeSet};

use fixup_core::{CommitId, DateRange};
use serde::{Deserialize, Serialize};

use crate::counter::{FixupRecord, VisitedSet};

/// Default number of histogram bins: chain lengths 0 through 5, longer
/// chains folded into the last bin.
pub const DEFAULT_BINS: usize = 6;

/// Fix-up results for one date range.
///
/// # Examples
///
/// ```
/// use fixup_engine::{FixupRecord, FixupReport, VisitedSet};
///
/// let records = vec![
///     FixupRecord { commit: "a".into(), chain_length: 2, consumed: vec!["b".into(), "c".into()] },
///     FixupRecord { commit: "d".into(), chain_length: 0, consumed: vec![] },
/// ];
/// let mut visited = VisitedSet::default();
/// visited.mark("b");
/// visited.mark("c");
///
/// let report = FixupReport::aggregate("2010-08-25..2013-08-25".parse().unwrap(), 5, &records, visited);
/// assert_eq!(report.chain_lengths["a"], 2);
/// assert_eq!(report.fixups.len(), 2);
/// assert_eq!(report.summary().commits_fixed_up, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixupReport {
    /// Analyzed date range.
    pub range: DateRange,
    /// Fix-up window used, in days.
    pub window_days: u32,
    /// Chain length per top-level commit.
    pub chain_lengths: BTreeMap<CommitId, u32>,
    /// Commits consumed as fix-ups.
    pub fixups: BTreeSet<CommitId>,
}

/// One histogram bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistogramBin {
    /// Chain length of this bin; the last bin also holds every longer chain.
    pub chain_length: u32,
    /// Number of commits in this bin.
    pub commits: usize,
    /// `commits / total analyzed` (0.0 when nothing was analyzed).
    pub fraction: f64,
}

/// Headline numbers of a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixupSummary {
    pub commits_analyzed: usize,
    /// Commits with a chain length of at least 1.
    pub commits_fixed_up: usize,
    pub consumed_fixups: usize,
    pub mean_chain_length: f64,
    pub max_chain_length: u32,
}

impl FixupReport {
    pub fn aggregate(
        range: DateRange,
        window_days: u32,
        records: &[FixupRecord],
        visited: VisitedSet,
    ) -> Self {
        Self {
            range,
            window_days,
            chain_lengths: records
                .iter()
                .map(|r| (r.commit.clone(), r.chain_length))
                .collect(),
            fixups: visited.into_inner(),
        }
    }

    /// Share of analyzed commits per chain length.
    ///
    /// Chains of `bins - 1` or longer are folded into the last bin rather
    /// than dropped, so the fractions are shares of every analyzed commit.
    /// A fixed-range histogram over the same lengths would discard the long
    /// chains and normalise over the rest.
    ///
    /// # Examples
    ///
    /// ```
    /// use fixup_engine::{FixupRecord, FixupReport, VisitedSet};
    ///
    /// let records: Vec<FixupRecord> = [0, 0, 1, 9]
    ///     .iter()
    ///     .enumerate()
    ///     .map(|(i, &n)| FixupRecord { commit: i.to_string(), chain_length: n, consumed: vec![] })
    ///     .collect();
    /// let report = FixupReport::aggregate("2010-01-01..2010-12-31".parse().unwrap(), 5, &records, VisitedSet::default());
    ///
    /// let bins = report.histogram(3);
    /// assert_eq!(bins.iter().map(|b| b.commits).collect::<Vec<_>>(), vec![2, 1, 1]);
    /// assert_eq!(bins[0].fraction, 0.5);
    /// ```
    pub fn histogram(&self, bins: usize) -> Vec<HistogramBin> {
        if bins == 0 {
            return Vec::new();
        }
        let last = bins - 1;
        let mut counts = vec![0usize; bins];
        for &length in self.chain_lengths.values() {
            counts[(length as usize).min(last)] += 1;
        }
        let total = self.chain_lengths.len();
        counts
            .into_iter()
            .enumerate()
            .map(|(length, commits)| HistogramBin {
                chain_length: length as u32,
                commits,
                fraction: if total == 0 {
                    0.0
                } else {
                    commits as f64 / total as f64
                },
            })
            .collect()
    }

    pub fn summary(&self) -> FixupSummary {
        let commits_analyzed = self.chain_lengths.len();
        let total: u64 = self.chain_lengths.values().map(|&n| u64::from(n)).sum();
        FixupSummary {
            commits_analyzed,
            commits_fixed_up: self.chain_lengths.values().filter(|&&n| n > 0).count(),
            consumed_fixups: self.fixups.len(),
            mean_chain_length: if commits_analyzed == 0 {
                0.0
            } else {
                total as f64 / commits_analyzed as f64
            },
            max_chain_length: self.chain_lengths.values().copied().max().unwrap_or(0),
        }
    }
}

/// Fix-up results before and after peer review was adopted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonReport {
    pub before: FixupReport,
    pub after: FixupReport,
}

impl ComparisonReport {
    /// Change in the share of commits that needed at least one fix-up,
    /// `after - before`. Negative means fewer fix-ups after adoption.
    pub fn fixed_up_share_delta(&self) -> f64 {
        share_fixed_up(&self.after) - share_fixed_up(&self.before)
    }
}

fn share_fixed_up(report: &FixupReport) -> f64 {
    let summary = report.summary();
    if summary.commits_analyzed == 0 {
        0.0
    } else {
        summary.commits_fixed_up as f64 / summary.commits_analyzed as f64
    }
}
