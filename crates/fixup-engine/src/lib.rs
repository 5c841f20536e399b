//! Fix-up chain detection over git history.
//!
//! For every commit in a date range, finds later commits (within a short
//! time window) that delete lines the commit introduced, and measures the
//! longest chain of such fix-ups. Every commit is credited to at most one
//! chain: the one rooted at its earliest originating commit.

pub mod backend;
pub mod blame;
pub mod changeset;
pub mod counter;
pub mod git;
pub mod memory;
pub mod overlap;
pub mod provenance;
pub mod report;
pub mod window;

pub use backend::{CommitQuery, HistoryBackend};
pub use counter::{EngineOptions, FixupCounter, FixupRecord, VisitedSet};
pub use report::{ComparisonReport, FixupReport, FixupSummary, HistogramBin};

use std::fmt::Display;

use fixup_core::{Observed, Result};
use tracing::{debug, warn};

/// Degrade a backend failure to [`Observed::Unavailable`], logging it.
pub(crate) fn observe<T>(result: Result<T>, subject: impl Display) -> Observed<T> {
    match result {
        Ok(data) => Observed::Data(data),
        Err(err) => {
            if err.is_recoverable() {
                debug!(%subject, error = %err, "no data");
            } else {
                warn!(%subject, error = %err, "no data");
            }
            Observed::unavailable(err.to_string())
        }
    }
}
