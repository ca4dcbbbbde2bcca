//! Report persistence and console rendering.

use anyhow::{Context, Result};
use std::path::Path;

use crate::domain::RunSummary;

/// Write the run summary as pretty JSON, creating parent directories.
pub fn write_report_json(path: &Path, summary: &RunSummary) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| format!("create {:?}", parent))?;
    }
    let content = serde_json::to_string_pretty(summary).context("serialize integrity report")?;
    std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

/// Load a report previously written by [`write_report_json`].
pub fn read_report_json(path: &Path) -> Result<RunSummary> {
    let content = std::fs::read_to_string(path).with_context(|| format!("read {:?}", path))?;
    let summary = serde_json::from_str(&content)
        .with_context(|| format!("parse integrity report {:?}", path))?;
    Ok(summary)
}

/// Render the human-readable summary printed at the end of a run.
pub fn render_console_summary(summary: &RunSummary) -> String {
    let rule = "=".repeat(60);
    let mut out = String::new();
    out.push_str(&format!("{rule}\nINTEGRITY VERIFICATION SUMMARY\n{rule}\n"));
    out.push_str(&format!(
        "Repositories: {}  passed: {}  failed: {}\n",
        summary.totals.count, summary.totals.passed, summary.totals.failed
    ));
    out.push_str(&format!("Duration: {:.2}s\n", summary.duration_seconds));

    if !summary.level_summary.is_empty() {
        out.push_str("\nLevel-by-level results:\n");
        for stat in &summary.level_summary {
            out.push_str(&format!(
                "  Level {} ({}): {}/{} passed",
                stat.level.number(),
                stat.level.title(),
                stat.passed,
                stat.total
            ));
            if stat.errored > 0 {
                out.push_str(&format!(", {} errored", stat.errored));
            }
            out.push('\n');
        }
    }

    let failed: Vec<_> = summary.failed_reports().collect();
    if !failed.is_empty() {
        out.push_str("\nFailed repositories:\n");
        for report in failed {
            out.push_str(&format!("  {}\n", report.repo.name));
            for result in report.non_passing() {
                out.push_str(&format!(
                    "    {} {}: {}\n",
                    result.level.key(),
                    result.status,
                    result.message().unwrap_or_default()
                ));
            }
            for missing in summary
                .levels_requested
                .iter()
                .filter(|id| report.level(*id).is_none())
            {
                out.push_str(&format!("    {} missing\n", missing.key()));
            }
        }
    }

    if summary.cancelled || !summary.unverified_repositories.is_empty() {
        out.push_str(&format!(
            "\nUnverified repositories ({}):{}\n",
            summary.unverified_repositories.len(),
            if summary.cancelled { " run was cancelled" } else { "" }
        ));
        for name in &summary.unverified_repositories {
            out.push_str(&format!("  {name}\n"));
        }
    }

    let verdict = if summary.all_passed() { "PASS" } else { "FAIL" };
    out.push_str(&format!("\nOverall: {verdict}\n"));
    out
}
