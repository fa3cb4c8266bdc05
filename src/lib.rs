//! libudev reproducers
//!
//! Small, self-contained programs that each issue a fixed sequence of
//! libudev calls and report what the library returned. Each one documents a
//! behavior that was filed as a bug: enumeration below a parent, lookups by
//! subsystem and sysname, sysattr values, devices without a subsystem,
//! binary attributes and enumeration filters.
//!
//! # Architecture
//!
//! - [`core`] - Configuration and error types
//! - [`device`] - libudev loaded at runtime, behind the `DeviceTree` traits
//! - [`repro`] - The reproducers and their reports
//! - [`testdb`] - A mock device tree and named scenarios for every case
//! - [`cli`] - Command-line interface (only used by the binary)
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use udev_repro::core::config::Config;
//! use udev_repro::device::Udev;
//! use udev_repro::repro::Case;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::load_default()?;
//!     let udev = Udev::open(&config.library_candidates(None))?;
//!
//!     let report = Case::MatchParent.run(&udev, &config.cases)?;
//!     print!("{}", report.render_text());
//!     std::process::exit(report.exit_code() as i32);
//! }
//! ```
//!
//! # Testing Without libudev
//!
//! ```rust,no_run
//! use udev_repro::testdb::TestRunner;
//!
//! let mut runner = TestRunner::new();
//! let summary = runner.run_all();
//! println!("Passed: {}/{}", summary.passed, summary.total);
//!
//! udev_repro::testdb::print_available_scenarios();
//! ```
//!
//! # Platform Support
//!
//! Linux only: libudev reads the kernel's sysfs tree. Without the library
//! the mock scenarios still run.

pub mod cli;
pub mod core;
pub mod device;
pub mod repro;
pub mod testdb;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
