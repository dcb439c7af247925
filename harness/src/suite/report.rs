//! Run summary report
//!
//! Machine-readable JSON document for downstream CI tooling.

use std::path::Path;

use chrono::Local;
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::HarnessResult;
use crate::suite::orchestrator::{RunMode, SuiteResult};

#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    pub run_id: Uuid,
    pub timestamp: String,
    pub mode: RunMode,
    pub total_suites: usize,
    pub success_suites: usize,
    pub suites: Vec<SuiteResult>,
}

impl SuiteReport {
    pub fn from_results(mode: RunMode, suites: Vec<SuiteResult>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            mode,
            total_suites: suites.len(),
            success_suites: suites.iter().filter(|s| s.success).count(),
            suites,
        }
    }

    pub fn all_succeeded(&self) -> bool {
        self.success_suites == self.total_suites
    }

    /// Persist as pretty-printed JSON
    pub fn write_to(&self, path: &Path) -> HarnessResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!("📝 Report written to {}", path.display());
        Ok(())
    }

    /// Write the report, logging rather than returning a failure. Returns whether it was saved.
    pub fn persist(&self, path: &Path) -> bool {
        match self.write_to(path) {
            Ok(()) => true,
            Err(e) => {
                error!("❌ Failed to write report to {}: {}", path.display(), e);
                false
            }
        }
    }

    pub fn log_summary(&self) {
        info!("📊 Suites: {} total, {} succeeded", self.total_suites, self.success_suites);

        for suite in &self.suites {
            let passed = suite.test_results.iter().filter(|(_, outcome)| outcome.success()).count();
            if suite.success {
                info!("  ✅ {} ({}/{} tests, {} ms)", suite.name, passed, suite.test_results.len(), suite.duration_ms);
            } else {
                warn!(
                    "  ❌ {} ({}/{} tests, {} ms){}",
                    suite.name,
                    passed,
                    suite.test_results.len(),
                    suite.duration_ms,
                    suite.error.as_deref().map(|e| format!(": {e}")).unwrap_or_default()
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HarnessError;
    use crate::runtime::{TestOutcome, TestResults};
    use std::time::Duration;

    fn passing_suite(name: &str) -> SuiteResult {
        let mut results = TestResults::new();
        results.push("smoke", TestOutcome::completed(0, "ok\n".into(), String::new(), Duration::from_millis(3)));
        SuiteResult {
            name: name.to_string(),
            success: true,
            error: None,
            duration_ms: 10,
            test_results: results,
        }
    }

    #[test]
    fn test_counts_and_success() {
        let report = SuiteReport::from_results(
            RunMode::Serial,
            vec![passing_suite("a"), SuiteResult::failed("b", &HarnessError::Interrupted)],
        );

        assert_eq!(report.total_suites, 2);
        assert_eq!(report.success_suites, 1);
        assert!(!report.all_succeeded());
    }

    #[test]
    fn test_write_to_produces_parseable_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");

        let report = SuiteReport::from_results(RunMode::Parallel, vec![passing_suite("svc")]);
        report.write_to(&path).unwrap();

        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["mode"], "parallel");
        assert_eq!(value["total_suites"], 1);
        assert_eq!(value["success_suites"], 1);
        assert_eq!(value["suites"][0]["name"], "svc");
        assert!(value["suites"][0].get("error").is_none());
        assert_eq!(value["suites"][0]["test_results"]["smoke"]["returncode"], 0);
        assert_eq!(value["timestamp"].as_str().unwrap().len(), 19);
    }

    #[test]
    fn test_unwritable_report_keeps_suite_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("report.json");

        let report = SuiteReport::from_results(RunMode::Serial, vec![passing_suite("svc")]);

        assert!(!report.persist(&path));
        assert!(report.all_succeeded());
        assert!(report.persist(&dir.path().join("report.json")));
    }
}
