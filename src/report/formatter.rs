//! Terminal summary of a finished run.

use std::io::{self, Write};

use crate::config::DetailsLevel;
use crate::suite::{CaseStatus, Tests};

/// Formats the end-of-run summary.
pub struct SummaryFormatter {
    details: DetailsLevel,
}

impl SummaryFormatter {
    /// Create a new formatter for the given detail level.
    pub fn new(details: DetailsLevel) -> Self {
        Self { details }
    }

    /// Write the summary: failed case diagnostics (high detail only), then the totals line.
    pub fn report(&self, tests: &Tests, out: &mut impl Write) -> io::Result<()> {
        if self.details == DetailsLevel::High {
            self.write_failures(tests, out)?;
        }
        writeln!(out, "{}", Self::summary_line(tests))
    }

    /// Print the summary to standard error.
    pub fn print(&self, tests: &Tests) {
        let _ = self.report(tests, &mut io::stderr().lock());
    }

    /// `N passed, M failed, K skipped (total T)`.
    pub fn summary_line(tests: &Tests) -> String {
        let status = if tests.is_success() { "ok" } else { "FAILED" };
        format!(
            "result: {status}. {} passed, {} failed, {} skipped (total {})",
            tests.total_ok, tests.total_ko, tests.total_skipped, tests.total
        )
    }

    fn write_failures(&self, tests: &Tests, out: &mut impl Write) -> io::Result<()> {
        for suite in &tests.test_suites {
            for case in &suite.testcases {
                let marker = match case.status() {
                    CaseStatus::Failed => "FAIL",
                    CaseStatus::Errored => "ERROR",
                    CaseStatus::Passed | CaseStatus::Skipped => continue,
                };
                writeln!(out, "[{marker}] {} / {}", suite.name, case.name)?;
                for failure in case.failures.iter().chain(&case.errors) {
                    for line in failure.value.lines() {
                        writeln!(out, "    {line}")?;
                    }
                }
            }
        }
        Ok(())
    }
}
