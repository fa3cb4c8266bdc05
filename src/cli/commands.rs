//! Command handler implementations
//!
//! Every handler returns the process exit code. Only `run` passes a
//! reproducer's status through; the rest exit 0 unless they fail outright.

use crate::cli::progress::{
    print_divider, print_error, print_header, print_info, print_success, print_summary_table,
    print_warning, CaseProgress, SummaryRow,
};
use crate::cli::{Args, Commands, TestCommands};
use crate::core::config::{
    get_config_path, init_config, open_config_in_editor, write_default_config, CaseInputs,
    Config, OutputFormat,
};
use crate::device::Udev;
use crate::repro::{Case, Report, Verdict};
use crate::testdb::{self, ScenarioLibrary, TestRunner, TestRunnerConfig};
use anyhow::{anyhow, Context, Result};
use log::{error, info, warn};
use std::path::PathBuf;

/// Run the command selected on the command line
///
/// Without a subcommand the reproducers are listed.
pub fn run_command(args: &Args, config: &Config) -> Result<u8> {
    match &args.command {
        None | Some(Commands::List) => {
            list_cases();
            Ok(0)
        }
        Some(Commands::Info { case }) => {
            show_case_info(&parse_case(case)?, config)?;
            Ok(0)
        }
        Some(Commands::Run { case, format }) => {
            let case = parse_case(case)?;
            let format = format.unwrap_or(config.output.format);
            run_case(args, config, case, format)
        }
        Some(Commands::RunAll { format }) => {
            let format = format.unwrap_or(config.output.format);
            run_all_cases(args, config, format)
        }
        Some(Commands::Simulate { scenario, format }) => {
            let format = format.unwrap_or(config.output.format);
            simulate_scenario(scenario, format)
        }
        Some(Commands::Test { test_command }) => handle_test_command(test_command),
        Some(Commands::Config { path, reset }) => {
            handle_config_command(*path, *reset)?;
            Ok(0)
        }
        Some(Commands::GenerateConfig { output }) => {
            generate_config_file(output.clone())?;
            Ok(0)
        }
        Some(Commands::ShowConfig) => {
            show_config(config);
            Ok(0)
        }
    }
}

fn parse_case(name: &str) -> Result<Case> {
    name.parse::<Case>().map_err(|e| anyhow!(e))
}

fn open_library(args: &Args, config: &Config) -> Result<Udev> {
    let candidates = config.library_candidates(args.library.as_deref());
    let udev = Udev::open(&candidates).context("Failed to open libudev")?;
    info!("Using {}", udev.library_name());
    Ok(udev)
}

fn print_report(report: &Report, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => print!("{}", report.render_text()),
        OutputFormat::Json => println!("{}", report.render_json()?),
    }
    Ok(())
}

// ============================================================================
// Reproducers
// ============================================================================

/// List every reproducer with its bug number and title
pub fn list_cases() {
    print_header("UDEV REPRODUCERS");
    for case in Case::ALL {
        println!("  {:<28} bug {:<9} {}", case.name(), case.bug(), case.title());
    }
    println!();
    print_info("Run one with: udev-repro run <case|bug>");
    print_info("Try one without libudev: udev-repro test list");
    println!();
}

/// Describe one reproducer and the inputs it will use
pub fn show_case_info(case: &Case, config: &Config) -> Result<()> {
    print_header(&format!("{} (bug {})", case.name(), case.bug()));
    println!("  {}", case.title());
    println!();
    println!("{}", textwrap_description(case.description()));
    println!();
    println!("  Status codes:");
    for (code, meaning) in case.status_codes() {
        println!("    {:>4}  {}", code, meaning);
    }
    println!();
    println!("  Configured inputs ([cases.{}]):", input_section(case));
    print_divider();
    for line in case_inputs_toml(case, &config.cases)?.lines() {
        println!("  {}", line);
    }
    print_divider();
    Ok(())
}

/// Indent the description and fold it to a readable width
fn textwrap_description(text: &str) -> String {
    let mut out = String::new();
    let mut width = 0;
    for word in text.split_whitespace() {
        if width == 0 {
            out.push_str("  ");
        } else if width + word.len() > 70 {
            out.push_str("\n  ");
            width = 0;
        } else {
            out.push(' ');
            width += 1;
        }
        out.push_str(word);
        width += word.len();
    }
    out
}

/// Name of the `[cases.*]` table holding this case's inputs
fn input_section(case: &Case) -> String {
    case.name().replace('-', "_")
}

/// The inputs of one case, rendered as the TOML table a config file holds
fn case_inputs_toml(case: &Case, inputs: &CaseInputs) -> Result<String> {
    let rendered = match case {
        Case::MatchParent => toml::to_string_pretty(&inputs.match_parent),
        Case::SubsystemSysname => toml::to_string_pretty(&inputs.subsystem_sysname),
        Case::SysnameRoundTrip => toml::to_string_pretty(&inputs.sysname_round_trip),
        Case::SysattrValues => toml::to_string_pretty(&inputs.sysattr_values),
        Case::ValuelessAttributes => toml::to_string_pretty(&inputs.valueless_attributes),
        Case::SubsystemlessEnumeration => {
            toml::to_string_pretty(&inputs.subsystemless_enumeration)
        }
        Case::BinarySysattr => toml::to_string_pretty(&inputs.binary_sysattr),
        Case::SubsystemFilter => toml::to_string_pretty(&inputs.subsystem_filter),
        Case::SysattrFilter => toml::to_string_pretty(&inputs.sysattr_filter),
    };
    rendered.context("Failed to render case inputs")
}

/// Run one case against the host's libudev; the exit code is its status
pub fn run_case(args: &Args, config: &Config, case: Case, format: OutputFormat) -> Result<u8> {
    let udev = open_library(args, config)?;
    let report = case
        .run(&udev, &config.cases)
        .with_context(|| format!("{} could not run", case))?;

    print_report(&report, format)?;
    if report.verdict == Verdict::Deviation {
        warn!("{} finished with status {}", case, report.status);
    }
    Ok(report.exit_code())
}

/// Run every case against the host's libudev and summarise
pub fn run_all_cases(args: &Args, config: &Config, format: OutputFormat) -> Result<u8> {
    let udev = open_library(args, config)?;
    let progress = CaseProgress::new(Case::ALL.len());
    let mut reports = Vec::new();
    let mut rows = Vec::new();

    for case in Case::ALL {
        progress.start_case(case.name());
        match case.run(&udev, &config.cases) {
            Ok(report) => {
                rows.push(SummaryRow::from_report(&report));
                reports.push(report);
            }
            Err(e) => {
                progress.println(&format!("  ✗ {}: {}", case, e));
                rows.push(SummaryRow {
                    case: case.name().to_string(),
                    bug: case.bug().to_string(),
                    outcome: Err(e.to_string()),
                });
            }
        }
        progress.finish_case();
    }

    let deviations = rows
        .iter()
        .filter(|row| !matches!(row.outcome, Ok((_, Verdict::Expected))))
        .count();
    progress.finish(deviations);

    match format {
        OutputFormat::Text => {
            for report in &reports {
                println!();
                print!("{}", report.render_text());
            }
            print_summary_table(&rows);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&reports)?);
        }
    }

    Ok(0)
}

/// Run one scenario on the mock tree and print its report
pub fn simulate_scenario(name: &str, format: OutputFormat) -> Result<u8> {
    let scenario = ScenarioLibrary::scenario(name).ok_or_else(|| {
        anyhow!(
            "Unknown scenario '{}'. Run 'udev-repro test list' to see all scenarios",
            name
        )
    })?;

    info!("Simulating {}: {}", scenario.name, scenario.description);
    let result = TestRunner::run_single(&scenario);

    match &result.report {
        Some(report) => print_report(report, format)?,
        None => print_error("The case did not produce a report"),
    }

    if format == OutputFormat::Text {
        println!();
        match &result.failure_reason {
            None => print_success(&format!(
                "Matches the scenario's expectations (status {})",
                result.expected_status
            )),
            Some(reason) => print_warning(&format!("Differs from the scenario: {}", reason)),
        }
    }

    Ok(if result.passed { 0 } else { 1 })
}

// ============================================================================
// Mock scenarios
// ============================================================================

/// Handle `test` subcommands
pub fn handle_test_command(test_command: &TestCommands) -> Result<u8> {
    match test_command {
        TestCommands::RunAll { fail_fast, tag } => test_run_all(*fail_fast, tag.as_deref()),
        TestCommands::List { tag } => {
            test_list_scenarios(tag.as_deref());
            Ok(0)
        }
    }
}

fn test_run_all(fail_fast: bool, tag: Option<&str>) -> Result<u8> {
    let config = TestRunnerConfig {
        verbose: true,
        fail_fast,
        tag_filter: tag.map(|t| vec![t.to_string()]),
        ..Default::default()
    };

    let mut runner = TestRunner::with_config(config);
    let summary = runner.run_all();

    if summary.total == 0 {
        warn!("No scenarios matched");
    }

    Ok(if summary.failed > 0 { 1 } else { 0 })
}

fn test_list_scenarios(tag: Option<&str>) {
    let Some(tag) = tag else {
        testdb::print_available_scenarios();
        return;
    };

    let scenarios = ScenarioLibrary::scenarios_by_tag(tag);
    if scenarios.is_empty() {
        println!("No scenarios found with tag '{}'", tag);
        println!("Available tags: {}", testdb::list_tags().join(", "));
        return;
    }

    println!("\nScenarios tagged '{}':\n", tag);
    for scenario in &scenarios {
        println!(
            "  • {:<38} {:>4}  {}",
            scenario.name, scenario.expected.status, scenario.description
        );
    }
    println!("\nTotal: {} scenarios\n", scenarios.len());
}

// ============================================================================
// Configuration
// ============================================================================

/// Handle the config command
pub fn handle_config_command(show_path: bool, reset: bool) -> Result<()> {
    if reset {
        if let Some(config_path) = get_config_path() {
            if config_path.exists() {
                std::fs::remove_file(&config_path)?;
                info!("Removed existing config file");
            }
        }
        let path = init_config()?;
        print_success(&format!("Created fresh config file at: {}", path.display()));
        return Ok(());
    }

    if show_path {
        let path = Config::get_active_config_path();
        println!("{}", path.display());
        if path.exists() {
            info!("Config file exists at: {}", path.display());
        } else {
            info!("Config file would be created at: {}", path.display());
        }
        return Ok(());
    }

    info!("Opening configuration file in default editor...");
    match open_config_in_editor() {
        Ok(path) => {
            print_info(&format!("Config file: {}", path.display()));
            print_info("Run 'udev-repro show-config' to verify your settings.");
        }
        Err(e) => {
            error!("Failed to open config file: {}", e);
            if let Some(path) = get_config_path() {
                print_info(&format!("You can edit the config at: {}", path.display()));
            }
        }
    }

    Ok(())
}

/// Write the commented template to `output`, or to the standard location
pub fn generate_config_file(output: Option<PathBuf>) -> Result<()> {
    let output_path = match output {
        Some(path) => {
            write_default_config(&path)?;
            path
        }
        None => init_config()?,
    };

    print_success(&format!("Configuration file: {}", output_path.display()));
    print_info("Adjust the [cases.*] tables to devices that exist on this host.");
    Ok(())
}

/// Show the current configuration settings
pub fn show_config(config: &Config) {
    let config_path = Config::get_active_config_path();
    println!("Configuration file: {}", config_path.display());
    if !config_path.exists() {
        println!("(Using default settings - no config file found)");
    }
    println!();

    match toml::to_string_pretty(config) {
        Ok(rendered) => println!("{}", rendered),
        Err(e) => error!("Failed to render configuration: {}", e),
    }
}
