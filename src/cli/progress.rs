//! Progress bar and console output utilities for the CLI
//!
//! - A progress bar for `run-all` that suspends cleanly when logging
//! - Boxed headers and status lines shared by every command
//! - `DualWriter` for logging to stderr and a file at once

use crate::repro::{Report, Verdict};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::time::{Duration, Instant};

// ============================================================================
// Styles
// ============================================================================

fn progress_bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("  {spinner:.green} [{bar:40.cyan/dim}] {pos}/{len} {msg}")
        .map(|style| style.progress_chars("━━╾─"))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

fn completed_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("  ✓ [{bar:40.green/dim}] {pos}/{len} {msg}")
        .map(|style| style.progress_chars("━━━"))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

// ============================================================================
// Console output helpers
// ============================================================================

/// Print a header section with a box
pub fn print_header(title: &str) {
    let width = 68;
    let title_padded = format!("{:^width$}", title, width = width - 2);
    println!();
    println!("╔{}╗", "═".repeat(width - 2));
    println!("║{}║", title_padded);
    println!("╚{}╝", "═".repeat(width - 2));
    println!();
}

pub fn print_divider() {
    println!("{}", "─".repeat(68));
}

pub fn print_success(msg: &str) {
    println!("  ✓ {}", msg);
}

pub fn print_info(msg: &str) {
    println!("  • {}", msg);
}

pub fn print_warning(msg: &str) {
    println!("  ⚠ {}", msg);
}

pub fn print_error(msg: &str) {
    println!("  ✗ {}", msg);
}

/// Format duration as human-readable string
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if duration.as_millis() >= 1000 {
        format!("{:.1}s", duration.as_secs_f64())
    } else {
        format!("{}ms", duration.as_millis())
    }
}

// ============================================================================
// run-all progress
// ============================================================================

/// Progress across the cases of a `run-all`
pub struct CaseProgress {
    bar: ProgressBar,
    start_time: Instant,
}

impl CaseProgress {
    pub fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(progress_bar_style());
        bar.enable_steady_tick(Duration::from_millis(100));

        Self {
            bar,
            start_time: Instant::now(),
        }
    }

    pub fn start_case(&self, name: &str) {
        self.bar.set_message(name.to_string());
    }

    /// Print a line above the bar without tearing it
    pub fn println(&self, msg: &str) {
        self.bar.suspend(|| println!("{}", msg));
    }

    pub fn finish_case(&self) {
        self.bar.inc(1);
    }

    pub fn finish(&self, deviations: usize) {
        self.bar.set_style(completed_style());
        self.bar.finish_with_message(format!(
            "{} deviation(s) in {}",
            deviations,
            format_duration(self.start_time.elapsed())
        ));
    }
}

/// One line per case: name, bug, status, verdict
pub fn print_summary_table(rows: &[SummaryRow]) {
    println!();
    println!(
        "  {:<28} {:>8} {:>7}  {}",
        "case", "bug", "status", "verdict"
    );
    print_divider();
    for row in rows {
        let verdict = match &row.outcome {
            Ok((_, Verdict::Expected)) => "expected".to_string(),
            Ok((_, Verdict::Deviation)) => "DEVIATION".to_string(),
            Err(e) => format!("not run: {}", e),
        };
        let status = match &row.outcome {
            Ok((status, _)) => status.to_string(),
            Err(_) => "-".to_string(),
        };
        println!(
            "  {:<28} {:>8} {:>7}  {}",
            row.case, row.bug, status, verdict
        );
    }
    println!();
}

/// A `run-all` table row
#[derive(Debug, Clone)]
pub struct SummaryRow {
    pub case: String,
    pub bug: String,
    pub outcome: Result<(i32, Verdict), String>,
}

impl SummaryRow {
    pub fn from_report(report: &Report) -> Self {
        Self {
            case: report.case.clone(),
            bug: report.bug.clone(),
            outcome: Ok((report.status, report.verdict)),
        }
    }
}

// ============================================================================
// Dual writer for file + console logging
// ============================================================================

/// A writer that writes to both console and file
///
/// Used for logging to both stderr and a log file simultaneously.
pub struct DualWriter {
    pub console: std::io::Stderr,
    pub file: std::fs::File,
}

impl Write for DualWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let _ = self.console.write(buf);
        self.file.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let _ = self.console.flush();
        self.file.flush()
    }
}
