//! Runs the cases of a test file in order.

use std::path::Path;

use tracing::{info, warn};

use crate::case::TestCase;
use crate::config::TestFile;
use crate::env::HarnessEnv;
use crate::error::Result;
use crate::report::TestReport;

pub struct TestRunner {
    cases: Vec<TestCase>,
}

impl TestRunner {
    /// Build a runner from a parsed test file.
    ///
    /// With a non-empty `targets`, only the named cases run, in file order,
    /// and a named case runs even if marked `skip`.
    pub fn new(file: TestFile, targets: &[String]) -> Self {
        for target in targets {
            if !file.cases.iter().any(|c| &c.name == target) {
                warn!(case = %target, "No test case with this name");
            }
        }

        let cases = file
            .cases
            .into_iter()
            .filter(|c| targets.is_empty() || targets.contains(&c.name))
            .map(|mut c| {
                if !targets.is_empty() {
                    c.skip = false;
                }
                TestCase::combine(c, &file.global)
            })
            .collect();
        Self { cases }
    }

    pub fn load(path: &Path, targets: &[String]) -> Result<Self> {
        Ok(Self::new(TestFile::load(path)?, targets))
    }

    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }

    /// Run every selected case. A failing case never stops the ones after it.
    pub async fn run(&self, env: &HarnessEnv) -> TestReport {
        let mut report = TestReport::new();
        info!(run_id = %report.run_id, cases = self.cases.len(), "Starting test run");

        for case in &self.cases {
            let outcome = case.run(env).await;
            report.record(case.name(), &outcome);
        }

        report.finish();
        info!(run_id = %report.run_id, success = report.success(), "{}", report.summary());
        report
    }
}
