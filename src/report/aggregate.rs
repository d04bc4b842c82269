use crate::suite::{TestSuite, Tests};

/// Folds completed suites into the run totals.
///
/// Owned by a single thread for the whole run, so totals never race.
#[derive(Debug, Default)]
pub struct Aggregator {
    tests: Tests,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for one completed suite and keep it in the result tree.
    ///
    /// A suite with failures or errors adds them to `ko`; a clean suite adds
    /// its non-skipped cases to `ok`. Skipped cases always count as skipped.
    pub fn push(&mut self, suite: TestSuite) {
        if suite.has_problems() {
            self.tests.total_ko += suite.failures + suite.errors;
        } else {
            self.tests.total_ok += suite.tests.saturating_sub(suite.skipped);
        }
        self.tests.total_skipped += suite.skipped;
        self.tests.total = self.tests.total_ok + self.tests.total_ko + self.tests.total_skipped;

        log::info!(
            "suite {} done: {} case(s), {} failure(s), {} error(s), {} skipped in {:.3}s",
            suite.name,
            suite.tests,
            suite.failures,
            suite.errors,
            suite.skipped,
            suite.time
        );
        self.tests.test_suites.push(suite);
    }

    /// Totals so far.
    pub fn tests(&self) -> &Tests {
        &self.tests
    }

    pub fn finish(self) -> Tests {
        self.tests
    }
}
