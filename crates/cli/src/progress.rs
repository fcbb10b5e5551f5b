// Per-phase progress lines on stderr

use colored::Colorize;
use vmdoctor_core::application::{PhaseObserver, PhaseSummary};

pub struct StderrProgress;

impl StderrProgress {
    fn line(summary: &PhaseSummary) -> String {
        let counts = summary.counts;
        let detail = if summary.skipped {
            "skipped".to_string()
        } else {
            format!(
                "{} passed, {} failed, {} warnings, {} skipped",
                counts.passed, counts.failed, counts.warnings, counts.skipped
            )
        };
        format!(
            "{} {:<14} {} ({} ms)",
            "•".dimmed(),
            summary.category.title(),
            detail,
            summary.elapsed.as_millis()
        )
    }
}

impl PhaseObserver for StderrProgress {
    fn phase_completed(&self, summary: &PhaseSummary) {
        eprintln!("{}", Self::line(summary));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use vmdoctor_core::domain::{Category, Summary};

    #[test]
    fn test_progress_line() {
        colored::control::set_override(false);
        let summary = PhaseSummary {
            category: Category::VmHealth,
            counts: Summary {
                passed: 6,
                failed: 0,
                warnings: 1,
                skipped: 1,
            },
            elapsed: Duration::from_millis(840),
            skipped: false,
        };

        let line = StderrProgress::line(&summary);

        assert!(line.contains("VM Health"));
        assert!(line.contains("6 passed, 0 failed, 1 warnings, 1 skipped"));
        assert!(line.ends_with("(840 ms)"));
    }
}
