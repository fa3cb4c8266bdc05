//! Mock device tree and scenario runner
//!
//! Every reproducer can be run without a host libudev: `MockDeviceTree`
//! implements the same `DeviceTree` trait, with switches for the library
//! behaviors the reproducers are about.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use udev_repro::testdb::{ScenarioLibrary, TestRunner, TestRunnerConfig};
//!
//! let mut runner = TestRunner::new();
//! let summary = runner.run_quick();
//! println!("Passed: {}/{}", summary.passed, summary.total);
//!
//! let mut runner = TestRunner::with_config(TestRunnerConfig {
//!     verbose: true,
//!     ..Default::default()
//! });
//! let summary = runner.run_by_names(&["subsystemless_omitted", "binary_sysattr_truncated"]);
//! ```
//!
//! # Tags
//!
//! Every scenario is tagged with its case name plus one of:
//! - `healthy` - the mock behaves as the reproducer hopes the library would
//! - `defect` - the mock has the library behavior the bug was filed about
//! - `error` - a missing device or a failing library call

pub mod mock_device;
pub mod runner;
pub mod scenarios;

pub use mock_device::{MockAttribute, MockDevice, MockDeviceHandle, MockDeviceTree, MockTreeConfig};
pub use runner::{ScenarioResult, TestRunner, TestRunnerConfig, TestSummary};
pub use scenarios::{ExpectedResults, ScenarioLibrary, TestScenario};

/// Run one healthy scenario per case with verbose output
pub fn run_quick_tests() -> TestSummary {
    let mut runner = TestRunner::with_config(TestRunnerConfig {
        verbose: true,
        ..Default::default()
    });
    runner.run_quick()
}

pub fn list_scenario_names() -> Vec<String> {
    ScenarioLibrary::all_scenarios()
        .into_iter()
        .map(|s| s.name)
        .collect()
}

pub fn list_tags() -> Vec<String> {
    let mut tags: Vec<String> = ScenarioLibrary::all_scenarios()
        .into_iter()
        .flat_map(|s| s.tags)
        .collect();
    tags.sort();
    tags.dedup();
    tags
}

/// Print available scenarios grouped by case
pub fn print_available_scenarios() {
    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║                  AVAILABLE TEST SCENARIOS                    ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let scenarios = ScenarioLibrary::all_scenarios();
    for case in crate::repro::Case::ALL {
        println!("📁 {} (bug {})", case.name(), case.bug());
        for scenario in scenarios.iter().filter(|s| s.case == case) {
            println!(
                "   • {:<38} {:>4}  {}",
                scenario.name, scenario.expected.status, scenario.description
            );
        }
        println!();
    }

    println!("Total: {} scenarios available\n", scenarios.len());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_functions() {
        let names = list_scenario_names();
        assert!(names.contains(&"match_parent_subtree".to_string()));

        let tags = list_tags();
        for tag in ["healthy", "defect", "error", "sysattr-filter"] {
            assert!(tags.contains(&tag.to_string()), "missing tag {}", tag);
        }
    }

    #[test]
    fn test_quick_tests_run() {
        let summary = run_quick_tests();
        assert_eq!(summary.total, crate::repro::Case::ALL.len());
        assert_eq!(summary.failed, 0);
    }
}
