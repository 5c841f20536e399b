use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::FixupError;

/// Full hexadecimal commit identifier.
pub type CommitId = String;

/// A contiguous run of lines, 1-based.
///
/// # Examples
///
/// ```
/// use fixup_core::LineRange;
///
/// let range = LineRange::new(10, 3);
/// assert_eq!(range.lines().collect::<Vec<_>>(), vec![10, 11, 12]);
/// assert_eq!(range.end(), 13);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LineRange {
    /// First line of the range.
    pub start: u32,
    /// Number of lines covered.
    pub count: u32,
}

impl LineRange {
    pub fn new(start: u32, count: u32) -> Self {
        Self { start, count }
    }

    /// One past the last covered line.
    pub fn end(&self) -> u32 {
        self.start.saturating_add(self.count)
    }

    /// Every line number covered by this range.
    pub fn lines(&self) -> std::ops::Range<u32> {
        self.start..self.end()
    }
}

/// Line ranges a single commit introduced, per file.
///
/// Ranges refer to the file content as it exists immediately after the
/// commit. Files keep insertion order of ranges; files themselves are sorted.
///
/// # Examples
///
/// ```
/// use fixup_core::{HunkSet, LineRange};
///
/// let mut hunks = HunkSet::default();
/// hunks.push("x.txt", LineRange::new(5, 5));
/// hunks.push("x.txt", LineRange::new(20, 1));
///
/// let added = hunks.added_lines("x.txt");
/// assert!(added.contains(&9) && added.contains(&20));
/// assert!(!added.contains(&10));
/// assert!(hunks.added_lines("y.txt").is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HunkSet {
    files: BTreeMap<String, Vec<LineRange>>,
}

impl HunkSet {
    /// Append a range to `path`'s hunk list.
    pub fn push(&mut self, path: impl Into<String>, range: LineRange) {
        self.files.entry(path.into()).or_default().push(range);
    }

    /// Replace `path`'s hunk list wholesale.
    pub fn insert(&mut self, path: impl Into<String>, ranges: Vec<LineRange>) {
        self.files.insert(path.into(), ranges);
    }

    pub fn get(&self, path: &str) -> Option<&[LineRange]> {
        self.files.get(path).map(Vec::as_slice)
    }

    pub fn contains_file(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// Union of every line number covered by `path`'s ranges.
    pub fn added_lines(&self, path: &str) -> BTreeSet<u32> {
        self.files
            .get(path)
            .map(|ranges| ranges.iter().flat_map(LineRange::lines).collect())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }
}

/// Files a commit added or modified that are worth analyzing.
///
/// An empty change set means "no changeset": nothing of interest was touched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    paths: BTreeSet<String>,
}

impl ChangeSet {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Drop every path listed in `ignored`.
    pub fn without(mut self, ignored: &[String]) -> Self {
        self.paths.retain(|p| !ignored.iter().any(|i| i == p));
        self
    }
}

impl FromIterator<String> for ChangeSet {
    fn from_iter<T: IntoIterator<Item = String>>(iter: T) -> Self {
        Self {
            paths: iter.into_iter().collect(),
        }
    }
}

/// Which file changes a diff query reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeFilter {
    /// Files that were added or modified (deletions excluded).
    AddedOrModified,
    /// Files that already existed and were modified.
    Modified,
}

impl ChangeFilter {
    /// The `git diff --diff-filter` letters equivalent to this filter.
    pub fn letters(&self) -> &'static str {
        match self {
            ChangeFilter::AddedOrModified => "AM",
            ChangeFilter::Modified => "M",
        }
    }
}

/// One boundary record of `git blame --incremental` output.
///
/// # Examples
///
/// ```
/// use fixup_core::AttributionRecord;
///
/// let rec = AttributionRecord::new("abc", 3, 7, 2);
/// assert_eq!(rec.final_range().start, 7);
/// assert_eq!(rec.orig_range().start, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributionRecord {
    /// Commit the lines are attributed to.
    pub commit: CommitId,
    /// Line number in the attributed commit's version of the file.
    pub orig_line: u32,
    /// Line number in the blamed version of the file.
    pub final_line: u32,
    /// Number of consecutive lines in this record.
    pub num_lines: u32,
}

impl AttributionRecord {
    pub fn new(commit: impl Into<String>, orig_line: u32, final_line: u32, num_lines: u32) -> Self {
        Self {
            commit: commit.into(),
            orig_line,
            final_line,
            num_lines,
        }
    }

    /// Range in the blamed file version.
    pub fn final_range(&self) -> LineRange {
        LineRange::new(self.final_line, self.num_lines)
    }

    /// Range in the attributed commit's file version.
    pub fn orig_range(&self) -> LineRange {
        LineRange::new(self.orig_line, self.num_lines)
    }
}

/// The outcome of a best-effort history query.
///
/// `Unavailable` means the backend could not answer; `Data` with an empty
/// payload means it answered "nothing". The counting algorithm treats both
/// the same, but callers and tests can tell them apart.
///
/// # Examples
///
/// ```
/// use fixup_core::Observed;
///
/// let missing: Observed<Vec<u32>> = Observed::unavailable("blame failed");
/// assert!(missing.is_unavailable());
/// assert!(missing.into_data_or_default().is_empty());
///
/// let empty: Observed<Vec<u32>> = Observed::Data(Vec::new());
/// assert!(!empty.is_unavailable());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observed<T> {
    /// The backend answered.
    Data(T),
    /// The backend failed; the reason is kept for diagnostics.
    Unavailable {
        /// Human-readable failure reason.
        reason: String,
    },
}

impl<T> Observed<T> {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Observed::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Observed::Unavailable { .. })
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Observed<U> {
        match self {
            Observed::Data(d) => Observed::Data(f(d)),
            Observed::Unavailable { reason } => Observed::Unavailable { reason },
        }
    }
}

impl<T: Default> Observed<T> {
    /// Collapse "unavailable" into the empty value.
    pub fn into_data_or_default(self) -> T {
        match self {
            Observed::Data(d) => d,
            Observed::Unavailable { .. } => T::default(),
        }
    }
}

/// An inclusive range of calendar days (UTC).
///
/// # Examples
///
/// ```
/// use fixup_core::DateRange;
///
/// let range: DateRange = "2010-08-25..2013-08-25".parse().unwrap();
/// assert_eq!(range.since_timestamp(), 1282694400);
/// assert!(range.until_timestamp() > range.since_timestamp());
/// assert!("2013-01-01..2012-01-01".parse::<DateRange>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub since: NaiveDate,
    pub until: NaiveDate,
}

impl DateRange {
    /// # Errors
    ///
    /// Returns [`FixupError::Config`] when `since` is after `until`.
    pub fn new(since: NaiveDate, until: NaiveDate) -> Result<Self, FixupError> {
        if since > until {
            return Err(FixupError::Config(format!(
                "date range starts after it ends: {since} > {until}"
            )));
        }
        Ok(Self { since, until })
    }

    /// First second of `since`.
    pub fn since_timestamp(&self) -> i64 {
        self.since.and_time(NaiveTime::MIN).and_utc().timestamp()
    }

    /// Last second of `until`.
    pub fn until_timestamp(&self) -> i64 {
        self.until.and_time(NaiveTime::MIN).and_utc().timestamp() + 86_399
    }

    /// Number of calendar days covered.
    pub fn days(&self) -> i64 {
        (self.until - self.since).num_days() + 1
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.since, self.until)
    }
}

impl FromStr for DateRange {
    type Err = FixupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (since, until) = s
            .split_once("..")
            .ok_or_else(|| FixupError::Config(format!("expected SINCE..UNTIL, got '{s}'")))?;
        DateRange::new(parse_date(since)?, parse_date(until)?)
    }
}

/// Parse an ISO `YYYY-MM-DD` date.
///
/// # Errors
///
/// Returns [`FixupError::Config`] if the string is not a valid date.
pub(crate) fn parse_date(s: &str) -> Result<NaiveDate, FixupError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| FixupError::Config(format!("invalid date '{s}': {e}")))
}

/// Output format for CLI results.
///
/// # Examples
///
/// ```
/// use fixup_core::OutputFormat;
///
/// let fmt: OutputFormat = "json".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Json);
///
/// let fmt: OutputFormat = "md".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Markdown);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable summaries.
    #[default]
    Text,
    /// Machine-readable JSON with camelCase keys.
    Json,
    /// Markdown-formatted output.
    Markdown,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_range_with_zero_count_is_empty() {
        assert_eq!(LineRange::new(4, 0).lines().count(), 0);
    }

    #[test]
    fn hunk_set_unions_overlapping_ranges() {
        let mut hunks = HunkSet::default();
        hunks.push("a.c", LineRange::new(10, 3));
        hunks.push("a.c", LineRange::new(11, 3));
        let added: Vec<u32> = hunks.added_lines("a.c").into_iter().collect();
        assert_eq!(added, vec![10, 11, 12, 13]);
        assert_eq!(hunks.len(), 1);
    }

    #[test]
    fn change_set_drops_ignored_paths() {
        let set = ChangeSet::new(["Testing/Data", "src/a.cxx"]).without(&["Testing/Data".into()]);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["src/a.cxx"]);

        let only_ignored = ChangeSet::new(["Testing/Data"]).without(&["Testing/Data".into()]);
        assert!(only_ignored.is_empty());
    }

    #[test]
    fn change_filter_letters_match_git() {
        assert_eq!(ChangeFilter::AddedOrModified.letters(), "AM");
        assert_eq!(ChangeFilter::Modified.letters(), "M");
    }

    #[test]
    fn observed_map_keeps_unavailable() {
        let o: Observed<u32> = Observed::unavailable("timeout");
        assert_eq!(
            o.map(|v| v + 1),
            Observed::Unavailable {
                reason: "timeout".into()
            }
        );
        assert_eq!(Observed::Data(1).map(|v| v + 1), Observed::Data(2));
    }

    #[test]
    fn date_range_single_day() {
        let range: DateRange = "2012-03-01..2012-03-01".parse().unwrap();
        assert_eq!(range.days(), 1);
        assert_eq!(range.until_timestamp() - range.since_timestamp(), 86_399);
    }

    #[test]
    fn date_range_rejects_garbage() {
        assert!("2012-03-01".parse::<DateRange>().is_err());
        assert!("yesterday..today".parse::<DateRange>().is_err());
        assert!("2012-02-30..2012-03-01".parse::<DateRange>().is_err());
    }

    #[test]
    fn date_range_display_round_trips() {
        let range: DateRange = "2007-08-25..2010-08-25".parse().unwrap();
        assert_eq!(range.to_string(), "2007-08-25..2010-08-25");
    }

    #[test]
    fn output_format_from_str() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!(
            "markdown".parse::<OutputFormat>().unwrap(),
            OutputFormat::Markdown
        );
        assert!("sarif".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn output_format_default_is_text() {
        assert_eq!(OutputFormat::default(), OutputFormat::Text);
        assert_eq!(OutputFormat::Markdown.to_string(), "markdown");
    }
}
