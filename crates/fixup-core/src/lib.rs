//! Core types, configuration, and error handling for the fix-up census.
//!
//! This crate provides the shared foundation used by the engine and the CLI:
//! - [`FixupError`]: unified error type
//! - [`FixupConfig`]: configuration loaded from `.fixups.toml`
//! - Shared types: [`LineRange`], [`HunkSet`], [`ChangeSet`],
//!   [`AttributionRecord`], [`Observed`], [`DateRange`], [`OutputFormat`]

mod config;
mod error;
mod types;

pub use config::{comparison_windows, AnalysisConfig, CompareConfig, FixupConfig, RangeConfig};
pub use error::FixupError;
pub use types::{
    AttributionRecord, ChangeFilter, ChangeSet, CommitId, DateRange, HunkSet, LineRange,
    Observed, OutputFormat,
};

/// A convenience `Result` type for fix-up census operations.
pub type Result<T> = std::result::Result<T, FixupError>;
