//! Report rendering: stable JSON document or grouped text view

use anyhow::{Context, Result};
use colored::{ColoredString, Colorize};
use tabled::{Table, Tabled};
use vmdoctor_core::domain::{Category, CheckResult, CheckStatus, Report};

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Passed")]
    passed: usize,
    #[tabled(rename = "Failed")]
    failed: usize,
    #[tabled(rename = "Warnings")]
    warnings: usize,
    #[tabled(rename = "Skipped")]
    skipped: usize,
}

/// `{results, summary}` as pretty-printed JSON
pub fn render_json(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).context("Failed to serialize report")
}

fn glyph(status: CheckStatus) -> ColoredString {
    match status {
        CheckStatus::Pass => "✓".green().bold(),
        CheckStatus::Fail => "✗".red().bold(),
        CheckStatus::Warn => "!".yellow().bold(),
        CheckStatus::Skip => "-".dimmed(),
    }
}

fn render_result(out: &mut String, result: &CheckResult) {
    out.push_str(&format!(
        "  {} {}: {}\n",
        glyph(result.status),
        result.name.bold(),
        result.message
    ));

    if !matches!(result.status, CheckStatus::Fail | CheckStatus::Warn) {
        return;
    }
    if let Some(suggestion) = &result.suggestion {
        out.push_str(&format!("      {} {}\n", "→".cyan(), suggestion));
    }
    if let Some(details) = &result.details {
        for line in details.lines() {
            out.push_str(&format!("      {}\n", line.dimmed()));
        }
    }
}

/// Results grouped by category in run order, then the summary table
pub fn render_text(report: &Report) -> String {
    let mut categories: Vec<Category> = Vec::new();
    for result in &report.results {
        if !categories.contains(&result.category) {
            categories.push(result.category);
        }
    }

    let mut out = String::new();
    for category in categories {
        out.push_str(&format!("{}\n", category.title().cyan().bold()));
        for result in report.results.iter().filter(|r| r.category == category) {
            render_result(&mut out, result);
        }
        out.push('\n');
    }

    let summary = report.summary;
    let table = Table::new(vec![SummaryRow {
        passed: summary.passed,
        failed: summary.failed,
        warnings: summary.warnings,
        skipped: summary.skipped,
    }])
    .to_string();
    out.push_str(&table);
    out.push('\n');

    let verdict = if report.has_failures() {
        format!("✗ {} check(s) failed", summary.failed).red().bold()
    } else if summary.warnings > 0 {
        format!("! Healthy with {} warning(s)", summary.warnings).yellow().bold()
    } else {
        "✓ Environment is healthy".green().bold()
    };
    out.push_str(&format!("{}\n", verdict));

    out
}
