//! Markdown report generation
//!
//! Renders a watch run as a human-readable report: run metadata, a
//! per-target overview table, and the unified diff of every change.

use crate::output::{OutputError, OutputResult};
use crate::watch::{TargetReport, WatchReport};
use std::fs;
use std::path::Path;

/// Writes the markdown report of a watch run to `output_path`
///
/// Missing parent directories are created.
pub fn generate_change_report(
    report: &WatchReport,
    config_hash: &str,
    output_path: &Path,
) -> OutputResult<()> {
    let markdown = format_change_report(report, config_hash);
    let write_error = |source| OutputError::Write {
        path: output_path.display().to_string(),
        source,
    };

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(write_error)?;
        }
    }

    fs::write(output_path, markdown).map_err(write_error)
}

/// Formats a watch run as markdown
pub fn format_change_report(report: &WatchReport, config_hash: &str) -> String {
    let mut md = String::new();

    md.push_str("# Driftwatch Change Report\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Run ID**: {}\n", report.run_id));
    md.push_str(&format!("- **Started**: {}\n", report.started_at.to_rfc3339()));
    md.push_str(&format!("- **Finished**: {}\n", report.finished_at.to_rfc3339()));
    md.push_str(&format!(
        "- **Duration**: {} seconds\n",
        (report.finished_at - report.started_at).num_seconds()
    ));
    md.push_str(&format!("- **Config Hash**: {}\n", config_hash));
    md.push_str(&format!("- **Pages Crawled**: {}\n", report.total_pages()));
    md.push_str(&format!("- **Changes**: {}\n\n", report.total_changes()));

    // Overview
    md.push_str("## Targets\n\n");
    md.push_str("| Target | Pages | Changed | Unchanged | Baselined | Failed |\n");
    md.push_str("|--------|-------|---------|-----------|-----------|--------|\n");
    for target in &report.targets {
        md.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} |\n",
            target.name,
            target.pages_crawled,
            target.changes.len(),
            target.unchanged,
            target.baselined,
            target.failures.len()
        ));
    }
    md.push('\n');

    for target in &report.targets {
        format_target(&mut md, target);
    }

    md
}

fn format_target(md: &mut String, target: &TargetReport) {
    if target.changes.is_empty() && target.failures.is_empty() {
        return;
    }

    md.push_str(&format!("## {}\n\n", target.name));

    for change in &target.changes {
        md.push_str(&format!("### {}\n\n", change.url));
        if target.is_first_sighting(&change.url) {
            md.push_str("First sighting.\n\n");
        } else {
            md.push_str(&format!(
                "`{}` → `{}`\n\n",
                short_hash(&change.previous_hash),
                short_hash(&change.new_hash)
            ));
        }
        md.push_str("```diff\n");
        md.push_str(&change.diff);
        md.push_str("\n```\n\n");
    }

    if !target.failures.is_empty() {
        md.push_str("### Failed Pages\n\n");
        for failure in &target.failures {
            md.push_str(&format!("- {}: {}\n", failure.url, failure.error));
        }
        md.push('\n');
    }
}

fn short_hash(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}
