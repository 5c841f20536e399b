//! Parsing of `git blame --incremental` output.
//!
//! The incremental format emits one block per attributed line range:
//!
//! ```text
//! <40-char sha> <orig_line> <final_line> <num_lines>
//! author <name>
//! ...
//! boundary
//! filename <path>
//! ```
//!
//! Commit metadata lines only appear the first time a commit is seen; every
//! block ends with a `filename` line.

use fixup_core::{AttributionRecord, FixupError, Result};

/// Parse incremental blame output into attribution records, in emission order.
///
/// # Errors
///
/// Returns [`FixupError::MalformedAttribution`] when the output is non-empty
/// but contains no complete record, or a header line is truncated.
///
/// # Examples
///
/// ```
/// use fixup_engine::blame::parse_incremental;
///
/// let sha = "a".repeat(40);
/// let raw = format!("{sha} 1 4 2\nauthor Alice\nsummary Add\nfilename x.txt\n");
/// let records = parse_incremental(&raw).unwrap();
/// assert_eq!(records.len(), 1);
/// assert_eq!(records[0].final_line, 4);
/// assert_eq!(records[0].num_lines, 2);
/// ```
pub fn parse_incremental(raw: &str) -> Result<Vec<AttributionRecord>> {
    let mut records = Vec::new();
    let mut pending: Option<AttributionRecord> = None;

    for line in raw.lines() {
        let line = line.trim_end();
        if line.is_empty() || line.starts_with('\t') {
            continue;
        }

        if looks_like_header(line) {
            pending = Some(parse_header(line)?);
            continue;
        }

        if line.starts_with("filename ") {
            if let Some(record) = pending.take() {
                records.push(record);
            }
        }
    }

    if records.is_empty() && !raw.trim().is_empty() {
        return Err(FixupError::MalformedAttribution(
            "no complete blame record in output".into(),
        ));
    }
    Ok(records)
}

/// A header starts with a full hex object id.
fn looks_like_header(line: &str) -> bool {
    let Some(first) = line.split_whitespace().next() else {
        return false;
    };
    first.len() == 40 && first.chars().all(|c| c.is_ascii_hexdigit())
}

fn parse_header(line: &str) -> Result<AttributionRecord> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 4 {
        return Err(FixupError::MalformedAttribution(format!(
            "truncated header: '{line}'"
        )));
    }
    let number = |s: &str| {
        s.parse::<u32>()
            .map_err(|_| FixupError::MalformedAttribution(format!("bad line number '{s}' in '{line}'")))
    };
    Ok(AttributionRecord {
        commit: parts[0].to_string(),
        orig_line: number(parts[1])?,
        final_line: number(parts[2])?,
        num_lines: number(parts[3])?,
    })
}
