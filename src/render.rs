use std::fmt::Write;

use fixup_core::{OutputFormat, Result};
use fixup_engine::report::DEFAULT_BINS;
use fixup_engine::{ComparisonReport, FixupReport, FixupSummary, HistogramBin};
use serde_json::json;

/// Render a single-window report in `format`.
pub fn report(report: &FixupReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&report_json(report))?),
        OutputFormat::Markdown => Ok(report_markdown(report)),
        OutputFormat::Text => Ok(report_text(report)),
    }
}

/// Render a before/after comparison in `format`.
pub fn comparison(cmp: &ComparisonReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&json!({
            "before": report_json(&cmp.before),
            "after": report_json(&cmp.after),
            "fixedUpShareDelta": cmp.fixed_up_share_delta(),
        }))?),
        OutputFormat::Markdown => Ok(comparison_markdown(cmp)),
        OutputFormat::Text => Ok(comparison_text(cmp)),
    }
}

fn report_json(report: &FixupReport) -> serde_json::Value {
    json!({
        "report": report,
        "summary": report.summary(),
        "histogram": report.histogram(DEFAULT_BINS),
    })
}

fn bin_label(bin: &HistogramBin, bins: usize) -> String {
    if bin.chain_length as usize + 1 == bins {
        format!("{}+", bin.chain_length)
    } else {
        bin.chain_length.to_string()
    }
}

fn percent(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}

fn fixed_up_share(summary: &FixupSummary) -> f64 {
    if summary.commits_analyzed == 0 {
        0.0
    } else {
        summary.commits_fixed_up as f64 / summary.commits_analyzed as f64
    }
}

fn report_text(report: &FixupReport) -> String {
    let summary = report.summary();
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Fix-up chains {} (window: {} days)",
        report.range, report.window_days
    );
    let _ = writeln!(out, "  Commits analyzed:   {}", summary.commits_analyzed);
    let _ = writeln!(
        out,
        "  Commits fixed up:   {} ({})",
        summary.commits_fixed_up,
        percent(fixed_up_share(&summary))
    );
    let _ = writeln!(out, "  Consumed fix-ups:   {}", summary.consumed_fixups);
    let _ = writeln!(out, "  Mean chain length:  {:.3}", summary.mean_chain_length);
    let _ = writeln!(out, "  Longest chain:      {}", summary.max_chain_length);
    let _ = writeln!(out);
    let _ = writeln!(out, "  {:<8} {:>8} {:>8}", "Chain", "Commits", "Share");
    for bin in report.histogram(DEFAULT_BINS) {
        let _ = writeln!(
            out,
            "  {:<8} {:>8} {:>8}",
            bin_label(&bin, DEFAULT_BINS),
            bin.commits,
            percent(bin.fraction)
        );
    }
    out
}

fn report_markdown(report: &FixupReport) -> String {
    let summary = report.summary();
    let mut out = String::new();
    let _ = writeln!(out, "## Fix-up chains {}\n", report.range);
    let _ = writeln!(out, "Fix-up window: {} days\n", report.window_days);
    let _ = writeln!(out, "| Metric | Value |");
    let _ = writeln!(out, "|--------|-------|");
    let _ = writeln!(out, "| Commits analyzed | {} |", summary.commits_analyzed);
    let _ = writeln!(
        out,
        "| Commits fixed up | {} ({}) |",
        summary.commits_fixed_up,
        percent(fixed_up_share(&summary))
    );
    let _ = writeln!(out, "| Consumed fix-ups | {} |", summary.consumed_fixups);
    let _ = writeln!(out, "| Mean chain length | {:.3} |", summary.mean_chain_length);
    let _ = writeln!(out, "| Longest chain | {} |", summary.max_chain_length);
    let _ = writeln!(out);
    let _ = writeln!(out, "| Chain length | Commits | Share |");
    let _ = writeln!(out, "|--------------|---------|-------|");
    for bin in report.histogram(DEFAULT_BINS) {
        let _ = writeln!(
            out,
            "| {} | {} | {} |",
            bin_label(&bin, DEFAULT_BINS),
            bin.commits,
            percent(bin.fraction)
        );
    }
    out
}

fn comparison_text(cmp: &ComparisonReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Before adoption");
    out.push_str(&report_text(&cmp.before));
    let _ = writeln!(out);
    let _ = writeln!(out, "After adoption");
    out.push_str(&report_text(&cmp.after));
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Change in share of commits fixed up: {:+.1} points",
        cmp.fixed_up_share_delta() * 100.0
    );
    out
}

fn comparison_markdown(cmp: &ComparisonReport) -> String {
    let before = cmp.before.histogram(DEFAULT_BINS);
    let after = cmp.after.histogram(DEFAULT_BINS);
    let (b, a) = (cmp.before.summary(), cmp.after.summary());

    let mut out = String::new();
    let _ = writeln!(out, "## Fix-up chains before and after adoption\n");
    let _ = writeln!(out, "| | Before ({}) | After ({}) |", cmp.before.range, cmp.after.range);
    let _ = writeln!(out, "|---|---|---|");
    let _ = writeln!(out, "| Commits analyzed | {} | {} |", b.commits_analyzed, a.commits_analyzed);
    let _ = writeln!(
        out,
        "| Commits fixed up | {} ({}) | {} ({}) |",
        b.commits_fixed_up,
        percent(fixed_up_share(&b)),
        a.commits_fixed_up,
        percent(fixed_up_share(&a))
    );
    let _ = writeln!(out, "| Longest chain | {} | {} |", b.max_chain_length, a.max_chain_length);
    for (before, after) in before.iter().zip(&after) {
        let _ = writeln!(
            out,
            "| Chain length {} | {} | {} |",
            bin_label(before, DEFAULT_BINS),
            percent(before.fraction),
            percent(after.fraction)
        );
    }
    let _ = writeln!(
        out,
        "\nShare of commits fixed up changed by **{:+.1}** points.",
        cmp.fixed_up_share_delta() * 100.0
    );
    out
}
