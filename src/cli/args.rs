//! Command-line argument definitions
//!
//! This module defines all CLI arguments and subcommands using clap.

use crate::core::config::OutputFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Reproducers for libudev device discovery, attribute and enumeration bugs
#[derive(Parser, Debug)]
#[command(name = "udev-repro")]
#[command(version)]
#[command(about = "Run small libudev reproducers and report what the library returned", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level: error, warn, info, debug, trace (overrides config)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// libudev shared object to try before the configured candidates
    #[arg(long, global = true, value_name = "NAME")]
    pub library: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List every reproducer with its bug number
    List,

    /// Describe a reproducer: behavior, status codes and configured inputs
    Info {
        /// Case name or bug number
        case: String,
    },

    /// Run one reproducer against the host's libudev
    ///
    /// The process exits with the reproducer's status code.
    Run {
        /// Case name or bug number
        case: String,

        /// Report format (overrides config)
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Run every reproducer against the host's libudev and summarise
    RunAll {
        /// Report format (overrides config)
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Run one scenario against the mock device tree and print its report
    Simulate {
        /// Scenario name (see `test list`)
        scenario: String,

        /// Report format (overrides config)
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Run scenarios against the mock device tree (no libudev required)
    Test {
        #[command(subcommand)]
        test_command: TestCommands,
    },

    /// Open the configuration file in your default editor
    ///
    /// The config file is stored at ~/.config/udev_repro/config.toml.
    /// If no config file exists, a default one will be created.
    Config {
        /// Show the config file path without opening it
        #[arg(long)]
        path: bool,

        /// Reset config to defaults (creates a fresh config file)
        #[arg(long)]
        reset: bool,
    },

    /// Generate a configuration file at a specific location
    GenerateConfig {
        /// Output path for the config file (defaults to standard location)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show current configuration
    ShowConfig,
}

#[derive(Subcommand, Debug)]
pub enum TestCommands {
    /// Run all scenarios
    RunAll {
        /// Stop on first failure
        #[arg(long)]
        fail_fast: bool,

        /// Only run scenarios carrying this tag (case name, healthy, defect, error)
        #[arg(short, long)]
        tag: Option<String>,
    },

    /// List all scenarios
    List {
        /// Filter by tag
        #[arg(short, long)]
        tag: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_run_with_format() {
        let args = Args::parse_from(["udev-repro", "run", "1297512", "--format", "json"]);
        match args.command {
            Some(Commands::Run { case, format }) => {
                assert_eq!(case, "1297512");
                assert_eq!(format, Some(OutputFormat::Json));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let args = Args::parse_from([
            "udev-repro",
            "list",
            "--library",
            "/usr/lib/libudev.so.1",
            "-l",
            "debug",
        ]);
        assert_eq!(args.library.as_deref(), Some("/usr/lib/libudev.so.1"));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_parse_test_run_all() {
        let args = Args::parse_from(["udev-repro", "test", "run-all", "--fail-fast", "-t", "defect"]);
        match args.command {
            Some(Commands::Test {
                test_command: TestCommands::RunAll { fail_fast, tag },
            }) => {
                assert!(fail_fast);
                assert_eq!(tag.as_deref(), Some("defect"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
