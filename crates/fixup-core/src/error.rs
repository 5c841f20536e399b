use std::path::PathBuf;

/// Errors that can occur while mining fix-up chains.
///
/// Library crates use this type directly; the binary converts to
/// `miette::Report` at the boundary. Tool-level variants are absorbed by the
/// engine and degrade the affected commit or file to "no data".
///
/// # Examples
///
/// ```
/// use fixup_core::FixupError;
///
/// let err = FixupError::Config("window_days must be positive".into());
/// assert!(err.to_string().contains("window_days"));
/// assert!(!err.is_recoverable());
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum FixupError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid date range, window size, or other configuration value.
    #[error("configuration error: {0}")]
    #[diagnostic(help("check .fixups.toml and the command-line dates"))]
    Config(String),

    /// The repository itself could not be opened or walked.
    #[error("git error: {0}")]
    Git(String),

    /// A single revision-control query failed.
    #[error("`{command}` failed: {reason}")]
    Tool {
        /// The query that failed, e.g. `git blame --incremental`.
        command: String,
        /// Backend-provided failure reason.
        reason: String,
    },

    /// A revision-control query exceeded its time budget.
    #[error("`{command}` timed out after {millis}ms")]
    Timeout {
        /// The query that was killed.
        command: String,
        /// The configured timeout in milliseconds.
        millis: u64,
    },

    /// Line-attribution output did not contain the expected fields.
    #[error("malformed attribution output: {0}")]
    MalformedAttribution(String),

    /// JSON serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A required file was not found.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
}

impl FixupError {
    /// Whether this error only invalidates the object being examined.
    ///
    /// Recoverable errors mean "this commit/file contributed nothing"; the
    /// run continues.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            FixupError::Tool { .. } | FixupError::Timeout { .. } | FixupError::MalformedAttribution(_)
        )
    }

    /// Build a [`FixupError::Tool`] from any displayable failure.
    pub fn tool(command: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        FixupError::Tool {
            command: command.into(),
            reason: reason.to_string(),
        }
    }
}
