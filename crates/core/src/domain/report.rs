// Aggregate report - pure fold over check results

use crate::domain::check::{CheckResult, CheckStatus};
use serde::{Deserialize, Serialize};

/// Exit code when at least one check failed
pub const EXIT_FAILURE: i32 = 1;

/// Status counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub passed: usize,
    pub failed: usize,
    pub warnings: usize,
    pub skipped: usize,
}

impl Summary {
    /// Count one status
    pub fn record(&mut self, status: CheckStatus) {
        match status {
            CheckStatus::Pass => self.passed += 1,
            CheckStatus::Fail => self.failed += 1,
            CheckStatus::Warn => self.warnings += 1,
            CheckStatus::Skip => self.skipped += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.passed + self.failed + self.warnings + self.skipped
    }

    pub fn from_results<'a>(results: impl IntoIterator<Item = &'a CheckResult>) -> Self {
        results.into_iter().fold(Summary::default(), |mut summary, result| {
            summary.record(result.status);
            summary
        })
    }
}

/// Report document: `{results, summary}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub results: Vec<CheckResult>,
    pub summary: Summary,
}

impl Report {
    /// Fold results into a report, keeping their order
    pub fn aggregate(results: Vec<CheckResult>) -> Self {
        let summary = Summary::from_results(&results);
        Self { results, summary }
    }

    /// Non-zero iff any check failed; warnings and skips never affect it
    pub fn exit_code(&self) -> i32 {
        if self.summary.failed > 0 {
            EXIT_FAILURE
        } else {
            0
        }
    }

    pub fn has_failures(&self) -> bool {
        self.summary.failed > 0
    }
}
