//! Machine-readable summary of a test run.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::case::{CaseFailure, CaseOutcome};
use crate::error::{FailureKind, Result};

/// A failed case as it appears in the report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FailedCase {
    pub name: String,
    pub kind: FailureKind,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub passed: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<FailedCase>,
    #[serde(default)]
    pub success: bool,
}

impl TestReport {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            finished_at: None,
            passed: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
            success: true,
        }
    }

    /// Record one case's outcome.
    pub fn record(&mut self, name: &str, outcome: &CaseOutcome) {
        match outcome {
            CaseOutcome::Passed => self.passed.push(name.to_string()),
            CaseOutcome::Skipped => self.skipped.push(name.to_string()),
            CaseOutcome::Failed(failure) => self.record_failure(name, failure),
        }
        self.success = self.failed.is_empty();
    }

    fn record_failure(&mut self, name: &str, failure: &CaseFailure) {
        self.failed.push(FailedCase {
            name: name.to_string(),
            kind: failure.kind(),
            message: failure.to_string(),
        });
    }

    /// True when no case failed. Skipped cases don't count against a run.
    pub fn success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Stamp the end time.
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
        self.success = self.success();
    }

    pub fn summary(&self) -> String {
        format!(
            "{} passed, {} failed, {} skipped",
            self.passed.len(),
            self.failed.len(),
            self.skipped.len()
        )
    }

    /// Write the report as pretty-printed JSON, creating parent directories.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

impl Default for TestReport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_outcomes() {
        let mut report = TestReport::new();
        report.record("a", &CaseOutcome::Passed);
        report.record("b", &CaseOutcome::Skipped);
        assert!(report.success());

        report.record(
            "c",
            &CaseOutcome::Failed(CaseFailure::PipelineFailed { exit_code: Some(1) }),
        );
        assert!(!report.success());
        assert_eq!(report.failed[0].kind, FailureKind::PipelineFailed);
        assert_eq!(report.failed[0].message, "pipeline exited with code 1");
        assert_eq!(report.summary(), "1 passed, 1 failed, 1 skipped");
    }

    #[test]
    fn test_write_to_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("run.json");

        let mut report = TestReport::new();
        report.record("a", &CaseOutcome::Passed);
        report.finish();
        report.write_to(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["passed"][0], "a");
        assert_eq!(value["success"], true);
        assert!(value["finished_at"].is_string());
        assert!(Uuid::parse_str(value["run_id"].as_str().unwrap()).is_ok());
    }
}
