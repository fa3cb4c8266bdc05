//! Runs scenarios against the mock tree and checks their reports

use super::scenarios::{ScenarioLibrary, TestScenario};
use crate::repro::{Case, Report};
use log::{debug, info};
use std::time::{Duration, Instant};

/// Result of running a single scenario
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    pub name: String,
    pub case: Case,
    pub passed: bool,
    pub duration: Duration,
    /// Status the case returned, if it ran to a report
    pub status: Option<i32>,
    pub expected_status: i32,
    pub failure_reason: Option<String>,
    pub report: Option<Report>,
}

impl ScenarioResult {
    fn passed(scenario: &TestScenario, duration: Duration, report: Report) -> Self {
        Self {
            name: scenario.name.clone(),
            case: scenario.case,
            passed: true,
            duration,
            status: Some(report.status),
            expected_status: scenario.expected.status,
            failure_reason: None,
            report: Some(report),
        }
    }

    fn failed(
        scenario: &TestScenario,
        duration: Duration,
        reason: String,
        report: Option<Report>,
    ) -> Self {
        Self {
            name: scenario.name.clone(),
            case: scenario.case,
            passed: false,
            duration,
            status: report.as_ref().map(|r| r.status),
            expected_status: scenario.expected.status,
            failure_reason: Some(reason),
            report,
        }
    }
}

/// Summary of a test run
#[derive(Debug, Clone, Default)]
pub struct TestSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub total_duration: Duration,
    pub results: Vec<ScenarioResult>,
}

impl TestSummary {
    /// Pass rate as percentage
    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            (self.passed as f64 / self.total as f64) * 100.0
        }
    }

    pub fn failed_scenarios(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|r| !r.passed)
            .map(|r| r.name.as_str())
            .collect()
    }
}

/// Configuration for the test runner
#[derive(Debug, Clone, Default)]
pub struct TestRunnerConfig {
    /// Print each result and the summary
    pub verbose: bool,
    /// Stop on the first failure
    pub fail_fast: bool,
    /// Keep only scenarios carrying one of these tags
    pub tag_filter: Option<Vec<String>>,
    /// Keep only scenarios whose name contains this
    pub name_filter: Option<String>,
}

/// Executes scenarios and collects results
#[derive(Default)]
pub struct TestRunner {
    config: TestRunnerConfig,
    results: Vec<ScenarioResult>,
}

impl TestRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: TestRunnerConfig) -> Self {
        Self {
            config,
            results: Vec::new(),
        }
    }

    pub fn run_all(&mut self) -> TestSummary {
        self.run_scenarios(ScenarioLibrary::all_scenarios())
    }

    pub fn run_quick(&mut self) -> TestSummary {
        self.run_scenarios(ScenarioLibrary::quick_scenarios())
    }

    pub fn run_by_names(&mut self, names: &[&str]) -> TestSummary {
        let scenarios = ScenarioLibrary::all_scenarios()
            .into_iter()
            .filter(|s| names.contains(&s.name.as_str()))
            .collect();
        self.run_scenarios(scenarios)
    }

    pub fn run_scenarios(&mut self, scenarios: Vec<TestScenario>) -> TestSummary {
        let start = Instant::now();
        self.results.clear();

        let scenarios = self.filter_scenarios(scenarios);
        info!("Running {} scenario(s)", scenarios.len());

        if self.config.verbose {
            println!("\n╔══════════════════════════════════════════════════════════════╗");
            println!("║                 UDEV REPRO - SCENARIO RUNNER                 ║");
            println!("╚══════════════════════════════════════════════════════════════╝");
            println!("  Running {} scenario(s)\n", scenarios.len());
        }

        for scenario in &scenarios {
            let result = Self::run_single(scenario);

            if self.config.verbose {
                Self::print_result(&result);
            }

            let stop = self.config.fail_fast && !result.passed;
            self.results.push(result);
            if stop {
                if self.config.verbose {
                    println!("\n⚠️  Stopping early due to fail-fast mode\n");
                }
                break;
            }
        }

        let passed = self.results.iter().filter(|r| r.passed).count();
        let summary = TestSummary {
            total: self.results.len(),
            passed,
            failed: self.results.len() - passed,
            total_duration: start.elapsed(),
            results: self.results.clone(),
        };

        if self.config.verbose {
            Self::print_summary(&summary);
        }

        summary
    }

    fn filter_scenarios(&self, scenarios: Vec<TestScenario>) -> Vec<TestScenario> {
        let mut filtered = scenarios;

        if let Some(ref tags) = self.config.tag_filter {
            filtered.retain(|s| s.tags.iter().any(|t| tags.contains(t)));
        }

        if let Some(ref pattern) = self.config.name_filter {
            let pattern = pattern.to_lowercase();
            filtered.retain(|s| s.name.to_lowercase().contains(&pattern));
        }

        filtered
    }

    /// Run one scenario and compare its report with the expectations
    pub fn run_single(scenario: &TestScenario) -> ScenarioResult {
        let start = Instant::now();
        debug!("Scenario {}: {}", scenario.name, scenario.description);

        let report = match scenario.case.run(&scenario.tree, &scenario.inputs) {
            Ok(report) => report,
            Err(e) => {
                return ScenarioResult::failed(
                    scenario,
                    start.elapsed(),
                    format!("case did not produce a report: {}", e),
                    None,
                )
            }
        };
        let duration = start.elapsed();

        match Self::compare(scenario, &report) {
            None => ScenarioResult::passed(scenario, duration, report),
            Some(reason) => ScenarioResult::failed(scenario, duration, reason, Some(report)),
        }
    }

    /// First mismatch between `report` and the scenario's expectations
    fn compare(scenario: &TestScenario, report: &Report) -> Option<String> {
        let expected = &scenario.expected;
        if report.status != expected.status {
            return Some(format!(
                "status {} (expected {})",
                report.status, expected.status
            ));
        }
        if let Some(missing) = expected.fragments.iter().find(|f| !report.mentions(f)) {
            return Some(format!("output does not mention '{}'", missing));
        }
        if let Some(present) = expected.absent.iter().find(|f| report.mentions(f)) {
            return Some(format!("output unexpectedly mentions '{}'", present));
        }
        None
    }

    fn print_result(result: &ScenarioResult) {
        let icon = if result.passed { "✓" } else { "✗" };
        println!(
            "  {} {:<40} {:>8.2}ms",
            icon,
            result.name,
            result.duration.as_secs_f64() * 1000.0
        );
        if let Some(ref reason) = result.failure_reason {
            println!("      └─ {}", reason);
        }
    }

    fn print_summary(summary: &TestSummary) {
        println!("\n══════════════════════════════════════════════════════════════");
        println!(
            "  Total: {}  Passed: {}  Failed: {}  ({:.1}%)",
            summary.total,
            summary.passed,
            summary.failed,
            summary.pass_rate()
        );
        println!(
            "  Duration: {:.2}ms",
            summary.total_duration.as_secs_f64() * 1000.0
        );
        let failed = summary.failed_scenarios();
        if !failed.is_empty() {
            println!("  Failed scenarios: {}", failed.join(", "));
        }
        println!("══════════════════════════════════════════════════════════════\n");
    }

    pub fn results(&self) -> &[ScenarioResult] {
        &self.results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testdb::scenarios::ExpectedResults;
    use crate::testdb::MockDeviceTree;

    #[test]
    fn test_every_scenario_passes() {
        let mut runner = TestRunner::new();
        let summary = runner.run_all();
        assert!(summary.total > 0);
        assert!(
            summary.failed_scenarios().is_empty(),
            "failing: {:?}",
            summary
                .results
                .iter()
                .filter(|r| !r.passed)
                .map(|r| (&r.name, &r.failure_reason))
                .collect::<Vec<_>>()
        );
        assert!((summary.pass_rate() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_wrong_expectation_fails() {
        let mut scenario = ScenarioLibrary::subsystemless_omitted();
        scenario.expected = ExpectedResults::status(2);
        let result = TestRunner::run_single(&scenario);
        assert!(!result.passed);
        assert_eq!(result.status, Some(0));
        assert_eq!(
            result.failure_reason.as_deref(),
            Some("status 0 (expected 2)")
        );
    }

    #[test]
    fn test_missing_fragment_fails() {
        let scenario = TestScenario::new(
            "empty",
            "nothing to list",
            Case::MatchParent,
            MockDeviceTree::new(),
            ExpectedResults::status(0).mentioning("memory0"),
        );
        let result = TestRunner::run_single(&scenario);
        assert!(!result.passed);
        assert!(result.failure_reason.unwrap().contains("'memory0'"));
    }

    #[test]
    fn test_filters_and_fail_fast() {
        let mut runner = TestRunner::with_config(TestRunnerConfig {
            name_filter: Some("SYSATTR_FILTER".to_string()),
            ..Default::default()
        });
        assert_eq!(runner.run_all().total, 4);

        let mut runner = TestRunner::with_config(TestRunnerConfig {
            tag_filter: Some(vec!["error".to_string()]),
            ..Default::default()
        });
        let summary = runner.run_all();
        assert!(summary.results.iter().all(|r| r.expected_status != 0));

        let mut failing = ScenarioLibrary::valueless_none();
        failing.expected = ExpectedResults::status(1);
        let mut runner = TestRunner::with_config(TestRunnerConfig {
            fail_fast: true,
            ..Default::default()
        });
        let summary = runner.run_scenarios(vec![failing, ScenarioLibrary::valueless_none()]);
        assert_eq!(summary.total, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(runner.results().len(), 1);
    }

    #[test]
    fn test_summary_pass_rate() {
        let summary = TestSummary {
            total: 10,
            passed: 8,
            failed: 2,
            ..Default::default()
        };
        assert!((summary.pass_rate() - 80.0).abs() < 0.001);
        assert!((TestSummary::default().pass_rate() - 100.0).abs() < 0.001);
    }

    #[test]
    fn test_run_by_names() {
        let mut runner = TestRunner::new();
        let summary = runner.run_by_names(&["binary_sysattr_truncated", "subsystemless_listed"]);
        assert_eq!(summary.total, 2);
        assert_eq!(summary.passed, 2);
    }
}
