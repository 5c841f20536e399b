use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::FixupError;
use crate::types::{parse_date, DateRange};

/// Top-level configuration loaded from `.fixups.toml`.
///
/// Supports layered resolution: CLI flags > local config > defaults.
///
/// # Examples
///
/// ```
/// use fixup_core::FixupConfig;
///
/// let config = FixupConfig::default();
/// assert_eq!(config.analysis.window_days, 5);
/// assert_eq!(config.analysis.ignored_paths, vec!["Testing/Data".to_string()]);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixupConfig {
    /// Fix-up detection settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,
    /// Default date range for `fixups count`.
    #[serde(default)]
    pub range: RangeConfig,
    /// Before/after comparison settings.
    #[serde(default)]
    pub compare: CompareConfig,
}

impl FixupConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`FixupError::FileNotFound`] if the file does not exist,
    /// [`FixupError::Io`] if it cannot be read, [`FixupError::Toml`] if the
    /// content is not valid TOML, or [`FixupError::Config`] if a value is
    /// out of range.
    pub fn from_file(path: &Path) -> Result<Self, FixupError> {
        if !path.exists() {
            return Err(FixupError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`FixupError::Toml`] if parsing fails, or
    /// [`FixupError::Config`] if validation fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use fixup_core::FixupConfig;
    ///
    /// let toml = r#"
    /// [analysis]
    /// window_days = 7
    /// "#;
    /// let config = FixupConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.analysis.window_seconds(), 7 * 86_400);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, FixupError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every value that would make an analysis meaningless.
    ///
    /// # Errors
    ///
    /// Returns [`FixupError::Config`] describing the first invalid value.
    pub fn validate(&self) -> Result<(), FixupError> {
        if self.analysis.window_days == 0 {
            return Err(FixupError::Config(
                "analysis.window_days must be at least 1".into(),
            ));
        }
        if self.analysis.git_timeout_secs == 0 {
            return Err(FixupError::Config(
                "analysis.git_timeout_secs must be at least 1".into(),
            ));
        }
        if self.compare.span_days == 0 {
            return Err(FixupError::Config(
                "compare.span_days must be at least 1".into(),
            ));
        }
        self.range.resolve()?;
        if let Some(date) = &self.compare.adoption_date {
            parse_date(date)?;
        }
        Ok(())
    }
}

/// Fix-up detection settings.
///
/// # Examples
///
/// ```
/// use fixup_core::AnalysisConfig;
///
/// let config = AnalysisConfig::default();
/// assert_eq!(config.window_seconds(), 432_000);
/// assert_eq!(config.git_timeout_secs, 120);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Days after a commit during which later commits count as fix-ups (default: 5).
    #[serde(default = "default_window_days")]
    pub window_days: u32,
    /// Paths never analyzed, e.g. submodules that confuse blame.
    #[serde(default = "default_ignored_paths")]
    pub ignored_paths: Vec<String>,
    /// Time budget for a single `git` invocation (default: 120).
    #[serde(default = "default_git_timeout_secs")]
    pub git_timeout_secs: u64,
}

impl AnalysisConfig {
    pub fn window_seconds(&self) -> i64 {
        i64::from(self.window_days) * 86_400
    }
}

fn default_window_days() -> u32 {
    5
}

fn default_ignored_paths() -> Vec<String> {
    vec!["Testing/Data".into()]
}

fn default_git_timeout_secs() -> u64 {
    120
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
            ignored_paths: default_ignored_paths(),
            git_timeout_secs: default_git_timeout_secs(),
        }
    }
}

/// Default date range, as ISO dates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RangeConfig {
    pub since: Option<String>,
    pub until: Option<String>,
}

impl RangeConfig {
    /// The configured range, if both ends are set.
    ///
    /// # Errors
    ///
    /// Returns [`FixupError::Config`] for unparseable dates, an inverted
    /// range, or only one end configured.
    pub fn resolve(&self) -> Result<Option<DateRange>, FixupError> {
        match (&self.since, &self.until) {
            (Some(since), Some(until)) => {
                Ok(Some(DateRange::new(parse_date(since)?, parse_date(until)?)?))
            }
            (None, None) => Ok(None),
            _ => Err(FixupError::Config(
                "range.since and range.until must be set together".into(),
            )),
        }
    }
}

/// Before/after comparison around the date peer review was adopted.
///
/// # Examples
///
/// ```
/// use fixup_core::CompareConfig;
///
/// let config = CompareConfig {
///     adoption_date: Some("2010-08-25".into()),
///     span_days: 1096,
/// };
/// let (before, after) = config.windows().unwrap().unwrap();
/// assert_eq!(before.until, after.since.pred_opt().unwrap());
/// assert_eq!(after.since.to_string(), "2010-08-25");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareConfig {
    /// First day peer review was mandatory.
    pub adoption_date: Option<String>,
    /// Length of each window in days (default: 1096, three years).
    #[serde(default = "default_span_days")]
    pub span_days: u32,
}

fn default_span_days() -> u32 {
    1096
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            adoption_date: None,
            span_days: default_span_days(),
        }
    }
}

impl CompareConfig {
    /// The `(before, after)` windows around the adoption date, if one is set.
    ///
    /// # Errors
    ///
    /// Returns [`FixupError::Config`] for an unparseable date or a span that
    /// leaves the calendar.
    pub fn windows(&self) -> Result<Option<(DateRange, DateRange)>, FixupError> {
        let Some(date) = &self.adoption_date else {
            return Ok(None);
        };
        let adoption = parse_date(date)?;
        comparison_windows(adoption, self.span_days).map(Some)
    }
}

/// Two adjacent windows of `span_days` each, split at `adoption`.
///
/// # Errors
///
/// Returns [`FixupError::Config`] if `span_days` is zero or the windows fall
/// outside the supported calendar.
pub fn comparison_windows(
    adoption: NaiveDate,
    span_days: u32,
) -> Result<(DateRange, DateRange), FixupError> {
    if span_days == 0 {
        return Err(FixupError::Config("span_days must be at least 1".into()));
    }
    let span = chrono::Days::new(u64::from(span_days));
    let out_of_range = || FixupError::Config(format!("{span_days} days around {adoption} is out of range"));

    let before_start = adoption.checked_sub_days(span).ok_or_else(out_of_range)?;
    let before_end = adoption.pred_opt().ok_or_else(out_of_range)?;
    let after_end = adoption
        .checked_add_days(span)
        .and_then(|d| d.pred_opt())
        .ok_or_else(out_of_range)?;

    Ok((
        DateRange::new(before_start, before_end)?,
        DateRange::new(adoption, after_end)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = FixupConfig::default();
        assert_eq!(config.analysis.window_days, 5);
        assert_eq!(config.analysis.git_timeout_secs, 120);
        assert_eq!(config.analysis.ignored_paths, vec!["Testing/Data"]);
        assert!(config.range.since.is_none());
        assert!(config.compare.adoption_date.is_none());
        assert_eq!(config.compare.span_days, 1096);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let config = FixupConfig::from_toml("").unwrap();
        assert_eq!(config.analysis.window_days, 5);
        assert_eq!(config.analysis.window_seconds(), 432_000);
    }

    #[test]
    fn parse_full_toml() {
        let toml = r#"
[analysis]
window_days = 3
ignored_paths = ["third_party/data", "Testing/Data"]
git_timeout_secs = 30

[range]
since = "2010-08-25"
until = "2013-08-25"

[compare]
adoption_date = "2010-08-25"
span_days = 365
"#;
        let config = FixupConfig::from_toml(toml).unwrap();
        assert_eq!(config.analysis.window_days, 3);
        assert_eq!(config.analysis.ignored_paths.len(), 2);
        assert_eq!(config.analysis.git_timeout_secs, 30);

        let range = config.range.resolve().unwrap().unwrap();
        assert_eq!(range.to_string(), "2010-08-25..2013-08-25");

        let (before, after) = config.compare.windows().unwrap().unwrap();
        assert_eq!(before.days(), 365);
        assert_eq!(after.days(), 365);
    }

    #[test]
    fn zero_window_is_rejected() {
        let err = FixupConfig::from_toml("[analysis]\nwindow_days = 0\n").unwrap_err();
        assert!(matches!(err, FixupError::Config(_)));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = FixupConfig::from_toml("[analysis]\ngit_timeout_secs = 0\n").unwrap_err();
        assert!(matches!(err, FixupError::Config(_)));
    }

    #[test]
    fn inverted_range_is_rejected() {
        let toml = "[range]\nsince = \"2013-01-01\"\nuntil = \"2012-01-01\"\n";
        let err = FixupConfig::from_toml(toml).unwrap_err();
        assert!(err.to_string().contains("starts after it ends"));
    }

    #[test]
    fn half_open_range_is_rejected() {
        let err = FixupConfig::from_toml("[range]\nsince = \"2013-01-01\"\n").unwrap_err();
        assert!(matches!(err, FixupError::Config(_)));
    }

    #[test]
    fn bad_adoption_date_is_rejected() {
        let err = FixupConfig::from_toml("[compare]\nadoption_date = \"last summer\"\n").unwrap_err();
        assert!(matches!(err, FixupError::Config(_)));
    }

    #[test]
    fn invalid_toml_returns_error() {
        let result = FixupConfig::from_toml("{{invalid}}");
        assert!(matches!(result, Err(FixupError::Toml(_))));
    }

    #[test]
    fn missing_file_is_reported() {
        let err = FixupConfig::from_file(Path::new("/nonexistent/.fixups.toml")).unwrap_err();
        assert!(matches!(err, FixupError::FileNotFound(_)));
    }

    #[test]
    fn comparison_windows_are_adjacent() {
        let adoption = NaiveDate::from_ymd_opt(2010, 8, 25).unwrap();
        let (before, after) = comparison_windows(adoption, 10).unwrap();
        assert_eq!(before.since.to_string(), "2010-08-15");
        assert_eq!(before.until.to_string(), "2010-08-24");
        assert_eq!(after.since.to_string(), "2010-08-25");
        assert_eq!(after.until.to_string(), "2010-09-03");
        assert_eq!(before.until_timestamp() + 1, after.since_timestamp());
    }
}
